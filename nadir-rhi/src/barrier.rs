//! Barrier descriptions exchanged between the recording facade and the backends.

use std::sync::Arc;
use crate::backend::{Backend, Resource, View};
use crate::types::{ResourceState, ALL_LAYERS, ALL_MIPS};
use crate::utility::{impl_backend_clone, resolve_count_u32};

/// A fully resolved state transition of a subresource range.
#[derive(Debug)]
pub struct ResourceBarrierDesc<B: Backend> {
    pub resource: Arc<B::Resource>,
    pub state_before: ResourceState,
    pub state_after: ResourceState,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl_backend_clone!(ResourceBarrierDesc { resource, state_before, state_after, base_mip_level, level_count, base_array_layer, layer_count });

/// A transition request: "make this range be in `state`", before-state unknown to the caller.
#[derive(Debug)]
pub struct LazyResourceBarrierDesc<B: Backend> {
    pub resource: Arc<B::Resource>,
    pub state: ResourceState,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl_backend_clone!(LazyResourceBarrierDesc { resource, state, base_mip_level, level_count, base_array_layer, layer_count });

impl<B: Backend> LazyResourceBarrierDesc<B> {
    /// Every subresource of `resource`.
    pub fn whole(resource: &Arc<B::Resource>, state: ResourceState) -> Self {
        Self {
            resource: resource.clone(),
            state,
            base_mip_level: 0,
            level_count: ALL_MIPS,
            base_array_layer: 0,
            layer_count: ALL_LAYERS,
        }
    }

    pub fn range(
        resource: &Arc<B::Resource>,
        base_mip_level: u32,
        level_count: u32,
        base_array_layer: u32,
        layer_count: u32,
        state: ResourceState,
    ) -> Self {
        Self {
            resource: resource.clone(),
            state,
            base_mip_level,
            level_count,
            base_array_layer,
            layer_count,
        }
    }

    /// The subresource range `view` covers, or `None` for a null view.
    pub fn for_view(view: &B::View, state: ResourceState) -> Option<Self> {
        let resource = view.resource()?;
        Some(Self::range(
            resource,
            view.base_mip_level(),
            view.level_count(),
            view.base_array_layer(),
            view.layer_count(),
            state,
        ))
    }

    /// Same request with open-ended counts clamped to the resource.
    pub fn resolved(mut self) -> Self {
        let desc = self.resource.desc();
        self.level_count = resolve_count_u32(self.base_mip_level, self.level_count, desc.level_count());
        self.layer_count = resolve_count_u32(self.base_array_layer, self.layer_count, desc.layer_count());
        self
    }
}
