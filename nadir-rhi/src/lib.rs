//! Nadir RHI (Render Hardware Interface) - backend-agnostic command recording core.
//!
//! Tracks per-subresource resource states, derives the barriers a command stream needs,
//! resolves views and binding sets lazily at draw time and memoizes pipeline-like objects.
//! Native backends plug in through the traits in [`backend`].

pub mod backend;
pub mod barrier;
pub mod command_list;
pub mod deferred;
pub mod device;
pub mod format;
pub mod handle;
pub mod object_cache;
pub mod recording;
pub mod state_tracker;
pub mod submission;
pub mod types;
pub mod vulkan;
mod utility;

pub(crate) use paste::paste;

pub use ash::vk;
pub use backend::{
    Backend, CommandList, Device, Pipeline, Program, RenderPass, Resource, Shader, View,
};
pub use barrier::{LazyResourceBarrierDesc, ResourceBarrierDesc};
pub use command_list::CommandListBox;
pub use deferred::{DeferredView, ResolvedView, TransientView};
pub use device::RenderDevice;
pub use format::{Format, FormatInfo};
pub use handle::Handle;
pub use object_cache::{ObjectCache, ObjectCacheStats};
pub use state_tracker::ResourceStateTracker;
pub use submission::GlobalResourceStates;
pub use types::*;
