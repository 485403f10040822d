use std::sync::Arc;
use anyhow::{Context, Result};
use glam::Mat4;
use crate::backend::{Backend, CommandList, Device, Resource};
use crate::barrier::LazyResourceBarrierDesc;
use crate::types::*;
use super::CommandListBox;

impl<B: Backend> CommandListBox<B> {
    /// Build (or update, when `src` is given) a bottom-level acceleration structure into `dst`.
    #[profiling::function]
    pub fn build_bottom_level_as(
        &mut self,
        src: Option<&Arc<B::Resource>>,
        dst: &Arc<B::Resource>,
        descs: &[RaytracingGeometryDesc<B>],
        flags: BuildAccelerationStructureFlags,
    ) -> Result<()> {
        self.assert_recording();
        for desc in descs {
            for geometry_buffer in [&desc.vertex, &desc.index] {
                if let Some(resource) = geometry_buffer.resource.as_ref() {
                    self.lazy_resource_barrier(LazyResourceBarrierDesc::whole(resource, ResourceState::NonPixelShaderResource));
                }
            }
        }

        let prebuild_info = self.device.blas_prebuild_info(descs, flags);
        let scratch = self.create_scratch_buffer(&prebuild_info, src.is_some(), "blas scratch")?;

        self.flush_barriers();
        self.command_list.build_bottom_level_as(src, dst, &scratch, 0, descs, flags);
        self.command_list.uav_resource_barrier(Some(dst));
        self.cmd_resources.push(scratch);
        Ok(())
    }

    /// Build a top-level acceleration structure with one instance per `(bottom level, transform)` pair.
    ///
    /// Instances get their index as id and a full visibility mask.
    #[profiling::function]
    pub fn build_top_level_as(
        &mut self,
        src: Option<&Arc<B::Resource>>,
        dst: &Arc<B::Resource>,
        instances: &[(Arc<B::Resource>, Mat4)],
        flags: BuildAccelerationStructureFlags,
    ) -> Result<()> {
        self.assert_recording();
        let instance_descs: Vec<RaytracingGeometryInstance> = instances
            .iter()
            .enumerate()
            .map(|(index, (blas, transform))| RaytracingGeometryInstance::new(transform, index as u32, 0xff, blas.acceleration_structure_handle()))
            .collect();
        let instance_bytes: &[u8] = bytemuck::cast_slice(&instance_descs);

        let instance_data = self
            .device
            .create_buffer(&BufferDesc::new(BindFlag::RayTracing, instance_bytes.len() as u64, MemoryType::Upload).with_name("tlas instances"))
            .context("failed to create instance buffer")?;
        instance_data.update_upload_buffer(0, instance_bytes)?;

        let instance_count = instance_descs.len() as u32;
        let prebuild_info = self.device.tlas_prebuild_info(instance_count, flags);
        let scratch = self.create_scratch_buffer(&prebuild_info, src.is_some(), "tlas scratch")?;

        self.flush_barriers();
        self.command_list.build_top_level_as(src, dst, &scratch, 0, &instance_data, 0, instance_count, flags);
        self.command_list.uav_resource_barrier(Some(dst));
        self.cmd_resources.push(scratch);
        self.cmd_resources.push(instance_data);
        Ok(())
    }

    pub fn copy_acceleration_structure(&mut self, src: &Arc<B::Resource>, dst: &Arc<B::Resource>, mode: CopyAccelerationStructureMode) {
        self.assert_recording();
        self.flush_barriers();
        self.command_list.copy_acceleration_structure(src, dst, mode);
    }

    fn create_scratch_buffer(&self, prebuild_info: &RaytracingASPrebuildInfo, update: bool, name: &str) -> Result<Arc<B::Resource>> {
        let size = if update {
            prebuild_info.update_scratch_data_size
        } else {
            prebuild_info.build_scratch_data_size
        };
        self.device
            .create_buffer(&BufferDesc::new(BindFlag::RayTracing, size, MemoryType::Default).with_name(name))
            .with_context(|| format!("failed to create {size} byte {name} buffer"))
    }
}
