use std::sync::Arc;
use anyhow::{bail, Result};
use crate::backend::CommandList;
use crate::barrier::ResourceBarrierDesc;
use crate::format::Format;
use crate::types::*;
use super::objects::{RecordingBindingSet, RecordingFramebuffer, RecordingPipeline, RecordingRenderPass, RecordingResource};
use super::Recording;

/// One resource transition as it reached the native list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedBarrier {
    pub resource: u64,
    pub state_before: ResourceState,
    pub state_after: ResourceState,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl From<&ResourceBarrierDesc<Recording>> for RecordedBarrier {
    fn from(barrier: &ResourceBarrierDesc<Recording>) -> Self {
        Self {
            resource: barrier.resource.id(),
            state_before: barrier.state_before,
            state_after: barrier.state_after,
            base_mip_level: barrier.base_mip_level,
            level_count: barrier.level_count,
            base_array_layer: barrier.base_array_layer,
            layer_count: barrier.layer_count,
        }
    }
}

/// A native command, objects referenced by id.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BindPipeline { pipeline: u64 },
    BindBindingSet { binding_set: u64 },
    BeginRenderPass { render_pass: u64, framebuffer: u64, clear: ClearDesc },
    EndRenderPass,
    BeginEvent(String),
    EndEvent,
    Draw { vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32 },
    DrawIndexed { index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32 },
    DrawIndirect { argument_buffer: u64, offset: u64, indexed: bool },
    DrawIndirectCount {
        argument_buffer: u64,
        argument_buffer_offset: u64,
        count_buffer: u64,
        count_buffer_offset: u64,
        max_draw_count: u32,
        stride: u32,
        indexed: bool,
    },
    Dispatch { x: u32, y: u32, z: u32 },
    DispatchIndirect { argument_buffer: u64, offset: u64 },
    DispatchMesh { x: u32 },
    DispatchRays { shader_table: Option<u64>, offsets: [u64; 4], width: u32, height: u32, depth: u32 },
    ResourceBarrier(Vec<RecordedBarrier>),
    UavBarrier { resource: Option<u64> },
    SetViewport { x: f32, y: f32, width: f32, height: f32 },
    SetScissorRect { left: i32, top: i32, right: u32, bottom: u32 },
    SetIndexBuffer { buffer: u64, format: Format },
    SetVertexBuffer { slot: u32, buffer: u64 },
    SetShadingRate { shading_rate: ShadingRate, combiners: [ShadingRateCombiner; 2] },
    BuildBottomLevelAs { src: Option<u64>, dst: u64, scratch: u64, geometry_count: usize },
    BuildTopLevelAs { src: Option<u64>, dst: u64, scratch: u64, instance_data: u64, instance_count: u32 },
    CopyAccelerationStructure { src: u64, dst: u64, mode: CopyAccelerationStructureMode },
    CopyBuffer { src: u64, dst: u64, regions: Vec<BufferCopyRegion> },
    CopyBufferToTexture { src: u64, dst: u64, regions: Vec<BufferToTextureCopyRegion> },
    CopyTexture { src: u64, dst: u64, regions: Vec<TextureCopyRegion> },
}

impl Command {
    /// Barriers carried by this command, empty for anything else.
    pub fn barriers(&self) -> &[RecordedBarrier] {
        match self {
            Command::ResourceBarrier(barriers) => barriers,
            _ => &[],
        }
    }
}

#[derive(Debug)]
pub struct RecordingCommandList {
    list_type: CommandListType,
    commands: Vec<Command>,
    closed: bool,
}

impl RecordingCommandList {
    pub(super) fn new(list_type: CommandListType) -> Self {
        Self {
            list_type,
            commands: Vec::new(),
            closed: false,
        }
    }

    #[inline]
    pub fn list_type(&self) -> CommandListType {
        self.list_type
    }

    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn record(&mut self, command: Command) {
        debug_assert!(!self.closed, "{command:?} recorded into a closed command list");
        self.commands.push(command);
    }
}

impl CommandList<Recording> for RecordingCommandList {
    fn reset(&mut self) -> Result<()> {
        self.commands.clear();
        self.closed = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            bail!("command list closed twice");
        }
        self.closed = true;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<RecordingPipeline>) {
        self.record(Command::BindPipeline { pipeline: pipeline.id() });
    }

    fn bind_binding_set(&mut self, binding_set: &Arc<RecordingBindingSet>) {
        self.record(Command::BindBindingSet { binding_set: binding_set.id });
    }

    fn begin_render_pass(&mut self, render_pass: &Arc<RecordingRenderPass>, framebuffer: &Arc<RecordingFramebuffer>, clear_desc: &ClearDesc) {
        self.record(Command::BeginRenderPass {
            render_pass: render_pass.id(),
            framebuffer: framebuffer.id,
            clear: clear_desc.clone(),
        });
    }

    fn end_render_pass(&mut self) {
        self.record(Command::EndRenderPass);
    }

    fn begin_event(&mut self, name: &str) {
        self.record(Command::BeginEvent(name.to_owned()));
    }

    fn end_event(&mut self) {
        self.record(Command::EndEvent);
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.record(Command::Draw { vertex_count, instance_count, first_vertex, first_instance });
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32) {
        self.record(Command::DrawIndexed { index_count, instance_count, first_index, vertex_offset, first_instance });
    }

    fn draw_indirect(&mut self, argument_buffer: &Arc<RecordingResource>, argument_buffer_offset: u64) {
        self.record(Command::DrawIndirect {
            argument_buffer: argument_buffer.id(),
            offset: argument_buffer_offset,
            indexed: false,
        });
    }

    fn draw_indexed_indirect(&mut self, argument_buffer: &Arc<RecordingResource>, argument_buffer_offset: u64) {
        self.record(Command::DrawIndirect {
            argument_buffer: argument_buffer.id(),
            offset: argument_buffer_offset,
            indexed: true,
        });
    }

    fn draw_indirect_count(
        &mut self,
        argument_buffer: &Arc<RecordingResource>,
        argument_buffer_offset: u64,
        count_buffer: &Arc<RecordingResource>,
        count_buffer_offset: u64,
        max_draw_count: u32,
        stride: u32,
    ) {
        self.record(Command::DrawIndirectCount {
            argument_buffer: argument_buffer.id(),
            argument_buffer_offset,
            count_buffer: count_buffer.id(),
            count_buffer_offset,
            max_draw_count,
            stride,
            indexed: false,
        });
    }

    fn draw_indexed_indirect_count(
        &mut self,
        argument_buffer: &Arc<RecordingResource>,
        argument_buffer_offset: u64,
        count_buffer: &Arc<RecordingResource>,
        count_buffer_offset: u64,
        max_draw_count: u32,
        stride: u32,
    ) {
        self.record(Command::DrawIndirectCount {
            argument_buffer: argument_buffer.id(),
            argument_buffer_offset,
            count_buffer: count_buffer.id(),
            count_buffer_offset,
            max_draw_count,
            stride,
            indexed: true,
        });
    }

    fn dispatch(&mut self, thread_group_count_x: u32, thread_group_count_y: u32, thread_group_count_z: u32) {
        self.record(Command::Dispatch {
            x: thread_group_count_x,
            y: thread_group_count_y,
            z: thread_group_count_z,
        });
    }

    fn dispatch_indirect(&mut self, argument_buffer: &Arc<RecordingResource>, argument_buffer_offset: u64) {
        self.record(Command::DispatchIndirect {
            argument_buffer: argument_buffer.id(),
            offset: argument_buffer_offset,
        });
    }

    fn dispatch_mesh(&mut self, thread_group_count_x: u32) {
        self.record(Command::DispatchMesh { x: thread_group_count_x });
    }

    fn dispatch_rays(&mut self, shader_tables: &RayTracingShaderTables<Recording>, width: u32, height: u32, depth: u32) {
        self.record(Command::DispatchRays {
            shader_table: shader_tables.raygen.resource.as_ref().map(|resource| resource.id()),
            offsets: [
                shader_tables.raygen.offset,
                shader_tables.miss.offset,
                shader_tables.callable.offset,
                shader_tables.hit.offset,
            ],
            width,
            height,
            depth,
        });
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrierDesc<Recording>]) {
        if barriers.is_empty() {
            return;
        }
        self.record(Command::ResourceBarrier(barriers.iter().map(RecordedBarrier::from).collect()));
    }

    fn uav_resource_barrier(&mut self, resource: Option<&Arc<RecordingResource>>) {
        self.record(Command::UavBarrier { resource: resource.map(|resource| resource.id()) });
    }

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.record(Command::SetViewport { x, y, width, height });
    }

    fn set_scissor_rect(&mut self, left: i32, top: i32, right: u32, bottom: u32) {
        self.record(Command::SetScissorRect { left, top, right, bottom });
    }

    fn ia_set_index_buffer(&mut self, resource: &Arc<RecordingResource>, format: Format) {
        self.record(Command::SetIndexBuffer { buffer: resource.id(), format });
    }

    fn ia_set_vertex_buffer(&mut self, slot: u32, resource: &Arc<RecordingResource>) {
        self.record(Command::SetVertexBuffer { slot, buffer: resource.id() });
    }

    fn rs_set_shading_rate(&mut self, shading_rate: ShadingRate, combiners: [ShadingRateCombiner; 2]) {
        self.record(Command::SetShadingRate { shading_rate, combiners });
    }

    fn build_bottom_level_as(
        &mut self,
        src: Option<&Arc<RecordingResource>>,
        dst: &Arc<RecordingResource>,
        scratch: &Arc<RecordingResource>,
        _scratch_offset: u64,
        descs: &[RaytracingGeometryDesc<Recording>],
        _flags: BuildAccelerationStructureFlags,
    ) {
        self.record(Command::BuildBottomLevelAs {
            src: src.map(|resource| resource.id()),
            dst: dst.id(),
            scratch: scratch.id(),
            geometry_count: descs.len(),
        });
    }

    fn build_top_level_as(
        &mut self,
        src: Option<&Arc<RecordingResource>>,
        dst: &Arc<RecordingResource>,
        scratch: &Arc<RecordingResource>,
        _scratch_offset: u64,
        instance_data: &Arc<RecordingResource>,
        _instance_offset: u64,
        instance_count: u32,
        _flags: BuildAccelerationStructureFlags,
    ) {
        self.record(Command::BuildTopLevelAs {
            src: src.map(|resource| resource.id()),
            dst: dst.id(),
            scratch: scratch.id(),
            instance_data: instance_data.id(),
            instance_count,
        });
    }

    fn copy_acceleration_structure(&mut self, src: &Arc<RecordingResource>, dst: &Arc<RecordingResource>, mode: CopyAccelerationStructureMode) {
        self.record(Command::CopyAccelerationStructure { src: src.id(), dst: dst.id(), mode });
    }

    fn copy_buffer(&mut self, src_buffer: &Arc<RecordingResource>, dst_buffer: &Arc<RecordingResource>, regions: &[BufferCopyRegion]) {
        self.record(Command::CopyBuffer {
            src: src_buffer.id(),
            dst: dst_buffer.id(),
            regions: regions.to_vec(),
        });
    }

    fn copy_buffer_to_texture(&mut self, src_buffer: &Arc<RecordingResource>, dst_texture: &Arc<RecordingResource>, regions: &[BufferToTextureCopyRegion]) {
        self.record(Command::CopyBufferToTexture {
            src: src_buffer.id(),
            dst: dst_texture.id(),
            regions: regions.to_vec(),
        });
    }

    fn copy_texture(&mut self, src_texture: &Arc<RecordingResource>, dst_texture: &Arc<RecordingResource>, regions: &[TextureCopyRegion]) {
        self.record(Command::CopyTexture {
            src: src_texture.id(),
            dst: dst_texture.id(),
            regions: regions.to_vec(),
        });
    }
}
