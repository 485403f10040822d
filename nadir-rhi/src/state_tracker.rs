//! Per-resource state ledger used to derive minimal barriers.

use crate::types::{ResourceDesc, ResourceState};
use crate::utility::subresources;

/// Current state of one resource, either as a whole or per (mip, layer).
///
/// A tracker starts in whole-resource mode with [`ResourceState::Unknown`]. The first
/// per-subresource write materializes a grid seeded with the whole-resource state; the
/// tracker stays in grid mode from then on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceStateTracker {
    level_count: u32,
    layer_count: u32,
    resource_state: ResourceState,
    subresource_states: Option<Vec<ResourceState>>,
}

impl ResourceStateTracker {
    pub fn new(level_count: u32, layer_count: u32) -> Self {
        Self {
            level_count: level_count.max(1),
            layer_count: layer_count.max(1),
            resource_state: ResourceState::Unknown,
            subresource_states: None,
        }
    }

    pub fn for_resource(desc: &ResourceDesc) -> Self {
        Self::new(desc.level_count(), desc.layer_count())
    }

    #[inline]
    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    /// `true` while a single state describes every subresource.
    #[inline]
    pub fn has_resource_state(&self) -> bool {
        self.subresource_states.is_none()
    }

    #[inline]
    pub fn resource_state(&self) -> ResourceState {
        debug_assert!(self.has_resource_state(), "whole-resource state queried on a per-subresource tracker");
        self.resource_state
    }

    #[inline]
    pub fn set_resource_state(&mut self, state: ResourceState) {
        debug_assert!(self.has_resource_state(), "whole-resource state set on a per-subresource tracker");
        self.resource_state = state;
    }

    pub fn subresource_state(&self, mip_level: u32, array_layer: u32) -> ResourceState {
        let index = self.index(mip_level, array_layer);
        match &self.subresource_states {
            Some(states) => states[index],
            None => self.resource_state,
        }
    }

    pub fn set_subresource_state(&mut self, mip_level: u32, array_layer: u32, state: ResourceState) {
        let index = self.index(mip_level, array_layer);
        let seed = self.resource_state;
        let len = (self.level_count * self.layer_count) as usize;
        let states = self.subresource_states.get_or_insert_with(|| vec![seed; len]);
        states[index] = state;
    }

    /// Fold the known states of `other` into this tracker.
    ///
    /// Subresources `other` never touched keep their current state here.
    pub fn merge(&mut self, other: &ResourceStateTracker) {
        if other.has_resource_state() {
            let state = other.resource_state;
            if state == ResourceState::Unknown {
                return;
            }
            if self.has_resource_state() {
                self.resource_state = state;
            } else {
                for (mip, layer) in subresources(0, self.level_count, 0, self.layer_count) {
                    self.set_subresource_state(mip, layer, state);
                }
            }
            return;
        }

        let level_count = self.level_count.min(other.level_count);
        let layer_count = self.layer_count.min(other.layer_count);
        for (mip, layer) in subresources(0, level_count, 0, layer_count) {
            let state = other.subresource_state(mip, layer);
            if state != ResourceState::Unknown {
                self.set_subresource_state(mip, layer, state);
            }
        }
    }

    #[inline]
    fn index(&self, mip_level: u32, array_layer: u32) -> usize {
        assert!(
            mip_level < self.level_count && array_layer < self.layer_count,
            "subresource ({mip_level}, {array_layer}) outside a {}x{} resource",
            self.level_count, self.layer_count,
        );
        (array_layer * self.level_count + mip_level) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown_and_whole() {
        let tracker = ResourceStateTracker::new(4, 2);
        assert!(tracker.has_resource_state());
        assert_eq!(tracker.resource_state(), ResourceState::Unknown);
        assert_eq!(tracker.subresource_state(3, 1), ResourceState::Unknown);
    }

    #[test]
    fn first_partial_write_seeds_the_grid() {
        let mut tracker = ResourceStateTracker::new(3, 2);
        tracker.set_resource_state(ResourceState::PixelShaderResource);
        tracker.set_subresource_state(1, 1, ResourceState::CopyDest);

        assert!(!tracker.has_resource_state());
        assert_eq!(tracker.subresource_state(1, 1), ResourceState::CopyDest);
        for (mip, layer) in [(0, 0), (1, 0), (2, 0), (0, 1), (2, 1)] {
            assert_eq!(tracker.subresource_state(mip, layer), ResourceState::PixelShaderResource);
        }
    }

    #[test]
    fn grid_never_collapses() {
        let mut tracker = ResourceStateTracker::new(2, 1);
        tracker.set_subresource_state(0, 0, ResourceState::RenderTarget);
        tracker.set_subresource_state(1, 0, ResourceState::RenderTarget);

        assert!(!tracker.has_resource_state());
    }

    #[test]
    fn merge_skips_unknown_states() {
        let mut global = ResourceStateTracker::new(2, 1);
        global.set_resource_state(ResourceState::CopyDest);

        let mut local = ResourceStateTracker::new(2, 1);
        local.set_subresource_state(1, 0, ResourceState::PixelShaderResource);
        global.merge(&local);

        assert_eq!(global.subresource_state(0, 0), ResourceState::CopyDest);
        assert_eq!(global.subresource_state(1, 0), ResourceState::PixelShaderResource);

        let untouched = ResourceStateTracker::new(2, 1);
        global.merge(&untouched);
        assert_eq!(global.subresource_state(0, 0), ResourceState::CopyDest);
    }

    #[test]
    fn whole_merge_into_grid_overwrites_every_subresource() {
        let mut global = ResourceStateTracker::new(2, 2);
        global.set_subresource_state(0, 1, ResourceState::CopySource);

        let mut local = ResourceStateTracker::new(2, 2);
        local.set_resource_state(ResourceState::UnorderedAccess);
        global.merge(&local);

        assert!(!global.has_resource_state());
        for (mip, layer) in subresources(0, 2, 0, 2) {
            assert_eq!(global.subresource_state(mip, layer), ResourceState::UnorderedAccess);
        }
    }

    #[test]
    #[should_panic]
    fn out_of_range_subresource_panics() {
        let tracker = ResourceStateTracker::new(1, 1);
        tracker.subresource_state(1, 0);
    }
}
