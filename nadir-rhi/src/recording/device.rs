use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use nadir_core::log;
use crate::backend::{Device, Resource};
use crate::format::Format;
use crate::types::*;
use crate::utility::align_up;
use super::command::{Command, RecordingCommandList};
use super::objects::*;
use super::Recording;

pub const TEXTURE_DATA_PITCH_ALIGNMENT: u32 = 256;
pub const SHADER_GROUP_HANDLE_SIZE: u32 = 32;
pub const SHADER_TABLE_ALIGNMENT: u32 = 64;

/// How many objects of each kind the device has created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreationStats {
    pub buffers: usize,
    pub textures: usize,
    pub views: usize,
    pub render_passes: usize,
    pub framebuffers: usize,
    pub graphics_pipelines: usize,
    pub compute_pipelines: usize,
    pub ray_tracing_pipelines: usize,
    pub binding_set_layouts: usize,
    pub binding_sets: usize,
    pub command_lists: usize,
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: AtomicU64,
    stats: Mutex<CreationStats>,
    submissions: Mutex<Vec<Vec<Command>>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creation_stats(&self) -> CreationStats {
        *self.stats.lock()
    }

    /// Command streams of every list submitted so far, in submission order.
    pub fn submissions(&self) -> Vec<Vec<Command>> {
        self.submissions.lock().clone()
    }

    pub fn clear_submissions(&self) {
        self.submissions.lock().clear();
    }

    /// A swapchain-like render target whose views and framebuffers are never cached.
    pub fn create_back_buffer(&self, width: u32, height: u32, format: Format) -> Arc<RecordingResource> {
        let desc = TextureDesc::new_2d(width, height, format, BindFlag::RenderTarget);
        let mut resource_desc = ResourceDesc::from_texture(&desc);
        resource_desc.name = "back buffer".to_owned();
        resource_desc.is_back_buffer = true;
        self.stats.lock().textures += 1;
        Arc::new(RecordingResource::new(self.next_id(), resource_desc, None))
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

fn host_size(memory_type: MemoryType, size: u64) -> Result<Option<usize>> {
    match memory_type {
        MemoryType::Default => Ok(None),
        MemoryType::Upload | MemoryType::Readback => {
            let size = usize::try_from(size).with_context(|| format!("{size} bytes of host memory"))?;
            Ok(Some(size))
        }
    }
}

impl Device<Recording> for RecordingDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<RecordingResource>> {
        let host_size = host_size(desc.memory_type, desc.size)?;
        self.stats.lock().buffers += 1;
        Ok(Arc::new(RecordingResource::new(self.next_id(), ResourceDesc::from_buffer(desc), host_size)))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<RecordingResource>> {
        if desc.width == 0 || desc.height == 0 {
            bail!("texture `{}` has an empty extent {}x{}", desc.name, desc.width, desc.height);
        }
        let slice_size = desc.format.format_info(desc.width, desc.height, 1).num_bytes;
        let host_size = host_size(desc.memory_type, slice_size * u64::from(desc.depth * desc.array_layers))?;
        self.stats.lock().textures += 1;
        Ok(Arc::new(RecordingResource::new(self.next_id(), ResourceDesc::from_texture(desc), host_size)))
    }

    fn create_view(&self, resource: Option<&Arc<RecordingResource>>, desc: &ViewDesc) -> Result<Arc<RecordingView>> {
        if let Some(resource) = resource {
            if desc.base_mip_level >= resource.desc().level_count() {
                bail!("view of mip {} on `{}` with {} mips", desc.base_mip_level, resource.desc().name, resource.desc().level_count());
            }
        }
        self.stats.lock().views += 1;
        Ok(Arc::new(RecordingView::new(self.next_id(), resource.cloned(), *desc)))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<RecordingRenderPass>> {
        self.stats.lock().render_passes += 1;
        Ok(Arc::new(RecordingRenderPass::new(self.next_id(), desc.clone())))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc<Recording>) -> Result<Arc<RecordingFramebuffer>> {
        let attachment_count = desc.colors.iter().flatten().count() + usize::from(desc.depth_stencil.is_some());
        self.stats.lock().framebuffers += 1;
        Ok(Arc::new(RecordingFramebuffer {
            id: self.next_id(),
            width: desc.width,
            height: desc.height,
            attachment_count,
        }))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<Recording>) -> Result<Arc<RecordingPipeline>> {
        if desc.render_pass.is_none() {
            bail!("graphics pipeline created outside a render pass");
        }
        self.stats.lock().graphics_pipelines += 1;
        Ok(Arc::new(RecordingPipeline::new(self.next_id(), PipelineType::Graphics, 0, SHADER_GROUP_HANDLE_SIZE)))
    }

    fn create_compute_pipeline(&self, _desc: &ComputePipelineDesc<Recording>) -> Result<Arc<RecordingPipeline>> {
        self.stats.lock().compute_pipelines += 1;
        Ok(Arc::new(RecordingPipeline::new(self.next_id(), PipelineType::Compute, 0, SHADER_GROUP_HANDLE_SIZE)))
    }

    fn create_ray_tracing_pipeline(&self, desc: &RayTracingPipelineDesc<Recording>) -> Result<Arc<RecordingPipeline>> {
        self.stats.lock().ray_tracing_pipelines += 1;
        Ok(Arc::new(RecordingPipeline::new(
            self.next_id(),
            PipelineType::RayTracing,
            desc.groups.len() as u32,
            SHADER_GROUP_HANDLE_SIZE,
        )))
    }

    fn create_binding_set_layout(&self, bind_keys: &[BindKey]) -> Result<Arc<RecordingBindingSetLayout>> {
        self.stats.lock().binding_set_layouts += 1;
        Ok(Arc::new(RecordingBindingSetLayout {
            id: self.next_id(),
            bind_keys: bind_keys.to_vec(),
        }))
    }

    fn create_binding_set(&self, layout: &Arc<RecordingBindingSetLayout>, bindings: &[BindingDesc<Recording>]) -> Result<Arc<RecordingBindingSet>> {
        for binding in bindings {
            let key = &binding.bind_key;
            let declared = layout.bind_keys.iter().any(|declared| {
                declared.shader_type == key.shader_type
                    && declared.view_type == key.view_type
                    && declared.slot == key.slot
                    && declared.space == key.space
            });
            if !declared {
                bail!("binding {key:?} is not part of layout {}", layout.id);
            }
        }

        self.stats.lock().binding_sets += 1;
        Ok(Arc::new(RecordingBindingSet {
            id: self.next_id(),
            layout: layout.id,
            bindings: bindings.iter().map(|binding| (binding.bind_key, binding.view.id())).collect(),
        }))
    }

    fn create_command_list(&self, list_type: CommandListType) -> Result<RecordingCommandList> {
        self.stats.lock().command_lists += 1;
        Ok(RecordingCommandList::new(list_type))
    }

    fn execute_command_lists(&self, command_lists: &[&RecordingCommandList]) -> Result<()> {
        let mut submissions = self.submissions.lock();
        for command_list in command_lists {
            if !command_list.is_closed() {
                bail!("command list submitted before close");
            }
            log::trace!("recording device: executing {} commands", command_list.commands().len());
            submissions.push(command_list.commands().to_vec());
        }
        Ok(())
    }

    fn texture_data_pitch_alignment(&self) -> u32 {
        TEXTURE_DATA_PITCH_ALIGNMENT
    }

    fn shader_group_handle_size(&self) -> u32 {
        SHADER_GROUP_HANDLE_SIZE
    }

    fn shader_table_alignment(&self) -> u32 {
        SHADER_TABLE_ALIGNMENT
    }

    fn blas_prebuild_info(&self, descs: &[RaytracingGeometryDesc<Recording>], _flags: BuildAccelerationStructureFlags) -> RaytracingASPrebuildInfo {
        let geometry_size: u64 = descs
            .iter()
            .map(|desc| u64::from(desc.vertex.count) * 32 + u64::from(desc.index.count) * 4)
            .sum();
        let size = align_up(geometry_size + 256, 256);
        RaytracingASPrebuildInfo {
            acceleration_structure_size: size,
            build_scratch_data_size: size,
            update_scratch_data_size: size / 2,
        }
    }

    fn tlas_prebuild_info(&self, instance_count: u32, _flags: BuildAccelerationStructureFlags) -> RaytracingASPrebuildInfo {
        let size = align_up(u64::from(instance_count) * 64 + 256, 256);
        RaytracingASPrebuildInfo {
            acceleration_structure_size: size,
            build_scratch_data_size: size,
            update_scratch_data_size: size / 2,
        }
    }
}
