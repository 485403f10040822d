//! A backend that performs no GPU work and records what it was asked to do.
//!
//! Objects get sequential ids, host-visible memory is real, and every command list keeps
//! its command stream so callers (tests, the sandbox) can inspect exactly what the
//! recording core emitted.

mod command;
mod device;
mod objects;

pub use command::{Command, RecordedBarrier, RecordingCommandList};
pub use device::{CreationStats, RecordingDevice, SHADER_GROUP_HANDLE_SIZE, SHADER_TABLE_ALIGNMENT, TEXTURE_DATA_PITCH_ALIGNMENT};
pub use objects::{
    RecordingBindingSet, RecordingBindingSetLayout, RecordingFramebuffer, RecordingPipeline, RecordingProgram,
    RecordingRenderPass, RecordingResource, RecordingShader, RecordingView,
};

use crate::backend::Backend;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Recording;

impl Backend for Recording {
    type Device = RecordingDevice;
    type CommandList = RecordingCommandList;
    type Resource = RecordingResource;
    type View = RecordingView;
    type Shader = RecordingShader;
    type Program = RecordingProgram;
    type Pipeline = RecordingPipeline;
    type RenderPass = RecordingRenderPass;
    type Framebuffer = RecordingFramebuffer;
    type BindingSetLayout = RecordingBindingSetLayout;
    type BindingSet = RecordingBindingSet;
}
