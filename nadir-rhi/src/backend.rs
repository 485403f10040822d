//! Contracts a native graphics API implements to host the recording core.
//!
//! Everything here is opaque to the core: it creates objects through [`Device`], records
//! into a [`CommandList`] and reads back only the few properties it needs to derive views,
//! barriers and pipeline descriptions.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use anyhow::{anyhow, Result};
use crate::types::*;
use crate::utility::resolve_count_u32;

/// A native graphics API, chosen at compile time.
///
/// The marker type itself carries no data; it only names the concrete object types.
pub trait Backend: 'static + Sized + Copy + Debug + Eq + Hash {
    type Device: Device<Self>;
    type CommandList: CommandList<Self>;
    type Resource: Resource;
    type View: View<Self>;
    type Shader: Shader;
    type Program: Program<Self>;
    type Pipeline: Pipeline;
    type RenderPass: RenderPass;
    type Framebuffer: Debug + 'static;
    type BindingSetLayout: Debug + 'static;
    type BindingSet: Debug + 'static;
}

pub trait Device<B: Backend>: 'static {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<B::Resource>>;

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<B::Resource>>;

    /// `resource` is `None` for a null descriptor.
    fn create_view(&self, resource: Option<&Arc<B::Resource>>, desc: &ViewDesc) -> Result<Arc<B::View>>;

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<B::RenderPass>>;

    fn create_framebuffer(&self, desc: &FramebufferDesc<B>) -> Result<Arc<B::Framebuffer>>;

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<B>) -> Result<Arc<B::Pipeline>>;

    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc<B>) -> Result<Arc<B::Pipeline>>;

    fn create_ray_tracing_pipeline(&self, desc: &RayTracingPipelineDesc<B>) -> Result<Arc<B::Pipeline>>;

    fn create_binding_set_layout(&self, bind_keys: &[BindKey]) -> Result<Arc<B::BindingSetLayout>>;

    /// Allocate a binding set from `layout` and write `bindings` into it.
    fn create_binding_set(&self, layout: &Arc<B::BindingSetLayout>, bindings: &[BindingDesc<B>]) -> Result<Arc<B::BindingSet>>;

    fn create_command_list(&self, list_type: CommandListType) -> Result<B::CommandList>;

    /// Submit closed command lists, in order, to the graphics queue.
    fn execute_command_lists(&self, command_lists: &[&B::CommandList]) -> Result<()>;

    /// Row pitch alignment required for buffer-to-texture copies.
    fn texture_data_pitch_alignment(&self) -> u32;

    fn shader_group_handle_size(&self) -> u32;

    fn shader_table_alignment(&self) -> u32;

    fn blas_prebuild_info(&self, descs: &[RaytracingGeometryDesc<B>], flags: BuildAccelerationStructureFlags) -> RaytracingASPrebuildInfo;

    fn tlas_prebuild_info(&self, instance_count: u32, flags: BuildAccelerationStructureFlags) -> RaytracingASPrebuildInfo;
}

/// A native command buffer.
///
/// Recording calls cannot fail; errors surface when the list is closed or submitted.
pub trait CommandList<B: Backend>: 'static {
    fn reset(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    fn bind_pipeline(&mut self, pipeline: &Arc<B::Pipeline>);
    fn bind_binding_set(&mut self, binding_set: &Arc<B::BindingSet>);

    fn begin_render_pass(&mut self, render_pass: &Arc<B::RenderPass>, framebuffer: &Arc<B::Framebuffer>, clear_desc: &ClearDesc);
    fn end_render_pass(&mut self);

    fn begin_event(&mut self, name: &str);
    fn end_event(&mut self);

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);
    fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32);
    fn draw_indirect(&mut self, argument_buffer: &Arc<B::Resource>, argument_buffer_offset: u64);
    fn draw_indexed_indirect(&mut self, argument_buffer: &Arc<B::Resource>, argument_buffer_offset: u64);
    fn draw_indirect_count(
        &mut self,
        argument_buffer: &Arc<B::Resource>,
        argument_buffer_offset: u64,
        count_buffer: &Arc<B::Resource>,
        count_buffer_offset: u64,
        max_draw_count: u32,
        stride: u32,
    );
    fn draw_indexed_indirect_count(
        &mut self,
        argument_buffer: &Arc<B::Resource>,
        argument_buffer_offset: u64,
        count_buffer: &Arc<B::Resource>,
        count_buffer_offset: u64,
        max_draw_count: u32,
        stride: u32,
    );
    fn dispatch(&mut self, thread_group_count_x: u32, thread_group_count_y: u32, thread_group_count_z: u32);
    fn dispatch_indirect(&mut self, argument_buffer: &Arc<B::Resource>, argument_buffer_offset: u64);
    fn dispatch_mesh(&mut self, thread_group_count_x: u32);
    fn dispatch_rays(&mut self, shader_tables: &RayTracingShaderTables<B>, width: u32, height: u32, depth: u32);

    fn resource_barrier(&mut self, barriers: &[crate::barrier::ResourceBarrierDesc<B>]);
    fn uav_resource_barrier(&mut self, resource: Option<&Arc<B::Resource>>);

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn set_scissor_rect(&mut self, left: i32, top: i32, right: u32, bottom: u32);
    fn ia_set_index_buffer(&mut self, resource: &Arc<B::Resource>, format: crate::format::Format);
    fn ia_set_vertex_buffer(&mut self, slot: u32, resource: &Arc<B::Resource>);
    fn rs_set_shading_rate(&mut self, shading_rate: ShadingRate, combiners: [ShadingRateCombiner; 2]);

    #[allow(clippy::too_many_arguments)]
    fn build_bottom_level_as(
        &mut self,
        src: Option<&Arc<B::Resource>>,
        dst: &Arc<B::Resource>,
        scratch: &Arc<B::Resource>,
        scratch_offset: u64,
        descs: &[RaytracingGeometryDesc<B>],
        flags: BuildAccelerationStructureFlags,
    );
    #[allow(clippy::too_many_arguments)]
    fn build_top_level_as(
        &mut self,
        src: Option<&Arc<B::Resource>>,
        dst: &Arc<B::Resource>,
        scratch: &Arc<B::Resource>,
        scratch_offset: u64,
        instance_data: &Arc<B::Resource>,
        instance_offset: u64,
        instance_count: u32,
        flags: BuildAccelerationStructureFlags,
    );
    fn copy_acceleration_structure(&mut self, src: &Arc<B::Resource>, dst: &Arc<B::Resource>, mode: CopyAccelerationStructureMode);

    fn copy_buffer(&mut self, src_buffer: &Arc<B::Resource>, dst_buffer: &Arc<B::Resource>, regions: &[BufferCopyRegion]);
    fn copy_buffer_to_texture(&mut self, src_buffer: &Arc<B::Resource>, dst_texture: &Arc<B::Resource>, regions: &[BufferToTextureCopyRegion]);
    fn copy_texture(&mut self, src_texture: &Arc<B::Resource>, dst_texture: &Arc<B::Resource>, regions: &[TextureCopyRegion]);
}

pub trait Resource: Debug + 'static {
    fn desc(&self) -> &ResourceDesc;

    /// Write `data` at `offset` into host-visible memory.
    fn update_upload_buffer(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Handle the GPU uses to reference this resource as a bottom-level acceleration structure.
    fn acceleration_structure_handle(&self) -> u64;

    /// Copy tightly or loosely packed texel rows into host-visible memory, re-pitching each row.
    fn update_upload_buffer_with_texture_data(&self, offset: u64, layout: &TextureDataLayout, data: &[u8]) -> Result<()> {
        let row_size = layout.src_row_pitch.min(layout.dst_row_pitch);
        for slice in 0..u64::from(layout.num_slices) {
            for row in 0..layout.num_rows {
                let src = slice * layout.src_depth_pitch + row * layout.src_row_pitch;
                let src_row = usize::try_from(src)
                    .ok()
                    .zip(usize::try_from(src + row_size).ok())
                    .and_then(|(begin, end)| data.get(begin..end))
                    .ok_or_else(|| anyhow!(
                        "texture data of {} bytes is too small for row {} of slice {}",
                        data.len(), row, slice,
                    ))?;
                let dst = offset + slice * layout.dst_depth_pitch + row * layout.dst_row_pitch;
                self.update_upload_buffer(dst, src_row)?;
            }
        }
        Ok(())
    }
}

pub trait View<B: Backend>: Debug + 'static {
    fn resource(&self) -> Option<&Arc<B::Resource>>;

    fn desc(&self) -> &ViewDesc;

    #[inline]
    fn base_mip_level(&self) -> u32 {
        self.desc().base_mip_level
    }

    /// Mip count with open-ended requests clamped to the resource.
    fn level_count(&self) -> u32 {
        match self.resource() {
            Some(resource) => resolve_count_u32(self.desc().base_mip_level, self.desc().level_count, resource.desc().level_count()),
            None => 0,
        }
    }

    #[inline]
    fn base_array_layer(&self) -> u32 {
        self.desc().base_array_layer
    }

    /// Layer count with open-ended requests clamped to the resource.
    fn layer_count(&self) -> u32 {
        match self.resource() {
            Some(resource) => resolve_count_u32(self.desc().base_array_layer, self.desc().layer_count, resource.desc().layer_count()),
            None => 0,
        }
    }
}

pub trait Shader: Debug + 'static {
    fn shader_type(&self) -> ShaderType;

    /// Reflection for the binding at `bind_key`, if this shader declares it.
    fn resource_binding(&self, bind_key: &BindKey) -> Option<&ResourceBindingDesc>;

    fn input_layouts(&self) -> &[InputLayoutDesc];

    fn entry_points(&self) -> &[EntryPoint];

    /// Identifier of the entry point `name` inside a ray tracing pipeline.
    fn group_id(&self, name: &str) -> u64;
}

pub trait Program<B: Backend>: Debug + 'static {
    fn shaders(&self) -> &[Arc<B::Shader>];

    /// Every bind key of every shader, sorted.
    fn bindings(&self) -> &[BindKey];

    fn shader(&self, shader_type: ShaderType) -> Option<&Arc<B::Shader>> {
        self.shaders().iter().find(|shader| shader.shader_type() == shader_type)
    }

    #[inline]
    fn has_shader(&self, shader_type: ShaderType) -> bool {
        self.shader(shader_type).is_some()
    }
}

pub trait Pipeline: Debug + 'static {
    fn pipeline_type(&self) -> PipelineType;

    /// Opaque shader group handles of a ray tracing pipeline, tightly packed.
    fn ray_tracing_shader_group_handles(&self, first_group: u32, group_count: u32) -> Result<Vec<u8>>;
}

pub trait RenderPass: Debug + 'static {
    fn desc(&self) -> &RenderPassDesc;
}
