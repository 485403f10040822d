//! Resolution of lazy barriers against the states left by earlier submissions.

use std::sync::Arc;
use nadir_core::collections::hashmap::HashMap;
use nadir_core::log;
use crate::backend::{Backend, Resource};
use crate::barrier::{LazyResourceBarrierDesc, ResourceBarrierDesc};
use crate::command_list::CommandListBox;
use crate::handle::Handle;
use crate::state_tracker::ResourceStateTracker;
use crate::types::ResourceState;
use crate::utility::subresources;

/// Resource states as of the end of the last submitted command list.
pub struct GlobalResourceStates<B: Backend> {
    trackers: HashMap<Handle<B::Resource>, ResourceStateTracker>,
}

impl<B: Backend> Default for GlobalResourceStates<B> {
    fn default() -> Self {
        Self { trackers: HashMap::default() }
    }
}

impl<B: Backend> GlobalResourceStates<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource_state_tracker(&self, resource: &Arc<B::Resource>) -> Option<&ResourceStateTracker> {
        self.trackers.get(&Handle::from(resource))
    }

    #[inline]
    pub fn tracked_resource_count(&self) -> usize {
        self.trackers.len()
    }

    /// Barriers `command_list` needs before it runs, then fold its final states in.
    ///
    /// The returned barriers belong on a list submitted right before `command_list`.
    pub fn patch(&mut self, command_list: &CommandListBox<B>) -> Vec<ResourceBarrierDesc<B>> {
        let barriers = self.patch_lazy_barriers(command_list.lazy_barriers());
        self.merge(command_list.resource_state_trackers());
        barriers
    }

    /// Fill in the before-state of every lazy barrier, dropping those already satisfied.
    ///
    /// Resources never seen before start out `Unknown`.
    pub fn patch_lazy_barriers(&self, lazy_barriers: &[LazyResourceBarrierDesc<B>]) -> Vec<ResourceBarrierDesc<B>> {
        let mut barriers = Vec::with_capacity(lazy_barriers.len());
        for lazy_barrier in lazy_barriers {
            let lazy_barrier = lazy_barrier.clone().resolved();
            let desc = lazy_barrier.resource.desc();
            let fresh;
            let tracker = match self.trackers.get(&Handle::from(&lazy_barrier.resource)) {
                Some(tracker) => tracker,
                None => {
                    fresh = ResourceStateTracker::for_resource(desc);
                    &fresh
                }
            };

            let whole_range = lazy_barrier.base_mip_level == 0
                && lazy_barrier.level_count == desc.level_count()
                && lazy_barrier.base_array_layer == 0
                && lazy_barrier.layer_count == desc.layer_count();

            if whole_range && tracker.has_resource_state() {
                let state_before = tracker.resource_state();
                if state_before != lazy_barrier.state {
                    barriers.push(ResourceBarrierDesc {
                        resource: lazy_barrier.resource.clone(),
                        state_before,
                        state_after: lazy_barrier.state,
                        base_mip_level: 0,
                        level_count: lazy_barrier.level_count,
                        base_array_layer: 0,
                        layer_count: lazy_barrier.layer_count,
                    });
                }
                continue;
            }

            for (mip_level, array_layer) in subresources(
                lazy_barrier.base_mip_level,
                lazy_barrier.level_count,
                lazy_barrier.base_array_layer,
                lazy_barrier.layer_count,
            ) {
                let state_before = tracker.subresource_state(mip_level, array_layer);
                if state_before != lazy_barrier.state {
                    barriers.push(ResourceBarrierDesc {
                        resource: lazy_barrier.resource.clone(),
                        state_before,
                        state_after: lazy_barrier.state,
                        base_mip_level: mip_level,
                        level_count: 1,
                        base_array_layer: array_layer,
                        layer_count: 1,
                    });
                }
            }
        }

        if !barriers.is_empty() {
            log::trace!("patched {} of {} lazy barriers", barriers.len(), lazy_barriers.len());
        }
        barriers
    }

    /// Fold the final states of one command list into the global ledger.
    pub fn merge(&mut self, trackers: &HashMap<Handle<B::Resource>, ResourceStateTracker>) {
        for (resource, tracker) in trackers {
            self.trackers
                .entry(resource.clone())
                .or_insert_with(|| ResourceStateTracker::new(tracker.level_count(), tracker.layer_count()))
                .merge(tracker);
        }
    }

    /// Forget resources nothing but this ledger still references.
    pub fn release_unused(&mut self) {
        let before = self.trackers.len();
        self.trackers.retain(|resource, _| Arc::strong_count(resource.arc()) > 1);
        let released = before - self.trackers.len();
        if released > 0 {
            log::debug!("released state of {released} dropped resources");
        }
    }

    /// Current state of `resource` as a whole, if it is tracked and uniform.
    pub fn resource_state(&self, resource: &Arc<B::Resource>) -> Option<ResourceState> {
        self.resource_state_tracker(resource)
            .filter(|tracker| tracker.has_resource_state())
            .map(|tracker| tracker.resource_state())
    }
}
