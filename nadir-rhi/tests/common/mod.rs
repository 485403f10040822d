#![allow(dead_code)]

use std::sync::Arc;
use nadir_rhi::recording::{Command, RecordedBarrier, Recording, RecordingDevice, RecordingProgram, RecordingResource, RecordingShader};
use nadir_rhi::*;

pub type Cmd = CommandListBox<Recording>;

pub fn render_device() -> (Arc<RecordingDevice>, RenderDevice<Recording>) {
    let device = Arc::new(RecordingDevice::new());
    (device.clone(), RenderDevice::new(device))
}

pub fn texture(render_device: &RenderDevice<Recording>, name: &str, width: u32, mip_levels: u32, array_layers: u32, format: Format) -> Arc<RecordingResource> {
    let desc = TextureDescBuilder::default()
        .name(name)
        .format(format)
        .width(width)
        .height(width)
        .mip_levels(mip_levels)
        .array_layers(array_layers)
        .bind_flags(BindFlag::ShaderResource | BindFlag::RenderTarget | BindFlag::UnorderedAccess)
        .build()
        .unwrap();
    render_device.create_texture(&desc).unwrap()
}

pub fn color_target(render_device: &RenderDevice<Recording>, name: &str) -> Arc<RecordingResource> {
    texture(render_device, name, 64, 1, 1, Format::R8G8B8A8Unorm)
}

pub fn buffer(render_device: &RenderDevice<Recording>, size: u64, memory_type: MemoryType) -> Arc<RecordingResource> {
    let desc = BufferDesc::new(BindFlag::UnorderedAccess | BindFlag::IndirectBuffer | BindFlag::IndexBuffer, size, memory_type);
    render_device.create_buffer(&desc).unwrap()
}

pub fn pixel_srv(slot: u32) -> BindKey {
    BindKey::new(ShaderType::Pixel, ViewType::Texture, slot, 0)
}

pub fn compute_srv(slot: u32) -> BindKey {
    BindKey::new(ShaderType::Compute, ViewType::Texture, slot, 0)
}

pub fn compute_uav(slot: u32) -> BindKey {
    BindKey::new(ShaderType::Compute, ViewType::RWTexture, slot, 0)
}

pub fn compute_buffer_uav(slot: u32) -> BindKey {
    BindKey::new(ShaderType::Compute, ViewType::RWStructuredBuffer, slot, 0)
}

/// Vertex shader with a position input, pixel shader sampling two textures.
pub fn graphics_program(pixel_return_type: ReturnType) -> Arc<RecordingProgram> {
    let vertex = RecordingShader::new(ShaderType::Vertex)
        .with_input(InputLayoutDesc { slot: 0, location: 0, format: Format::R32G32B32Float, stride: 12 })
        .with_binding(ResourceBindingDesc::new("camera", ViewType::ConstantBuffer, 0, 0));
    let pixel = RecordingShader::new(ShaderType::Pixel)
        .with_binding(
            ResourceBindingDesc::new("albedo", ViewType::Texture, 0, 0)
                .with_dimension(ViewDimension::Texture2D)
                .with_return_type(pixel_return_type),
        )
        .with_binding(
            ResourceBindingDesc::new("normal", ViewType::Texture, 1, 0)
                .with_dimension(ViewDimension::Texture2D)
                .with_return_type(ReturnType::Float),
        );
    Arc::new(RecordingProgram::new(vec![vertex, pixel]))
}

/// Compute shader reading `t0`, writing `u0` and a structured buffer at `u1`.
pub fn compute_program() -> Arc<RecordingProgram> {
    let compute = RecordingShader::new(ShaderType::Compute)
        .with_binding(
            ResourceBindingDesc::new("input", ViewType::Texture, 0, 0)
                .with_dimension(ViewDimension::Texture2D)
                .with_return_type(ReturnType::Float),
        )
        .with_binding(
            ResourceBindingDesc::new("output", ViewType::RWTexture, 0, 0)
                .with_dimension(ViewDimension::Texture2D)
                .with_return_type(ReturnType::Float),
        )
        .with_binding(
            ResourceBindingDesc::new("arguments", ViewType::RWStructuredBuffer, 1, 0)
                .with_dimension(ViewDimension::Buffer)
                .with_structure_stride(16),
        );
    Arc::new(RecordingProgram::new(vec![compute]))
}

pub fn commands(cmd: &Cmd) -> Vec<Command> {
    cmd.command_list().commands().to_vec()
}

pub fn barriers(commands: &[Command]) -> Vec<RecordedBarrier> {
    commands.iter().flat_map(|command| command.barriers().iter().copied()).collect()
}

pub fn barrier_count(commands: &[Command]) -> usize {
    commands.iter().filter(|command| matches!(command, Command::ResourceBarrier(_))).count()
}

/// Position of the first command matching `predicate`.
pub fn position(commands: &[Command], predicate: impl Fn(&Command) -> bool) -> usize {
    commands
        .iter()
        .position(predicate)
        .unwrap_or_else(|| panic!("no matching command in {commands:#?}"))
}
