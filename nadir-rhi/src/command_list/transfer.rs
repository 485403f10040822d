use std::sync::Arc;
use anyhow::{bail, Context, Result};
use crate::backend::{Backend, CommandList, Device, Resource};
use crate::barrier::LazyResourceBarrierDesc;
use crate::types::*;
use super::CommandListBox;

impl<B: Backend> CommandListBox<B> {
    pub fn copy_buffer(&mut self, src_buffer: &Arc<B::Resource>, dst_buffer: &Arc<B::Resource>, regions: &[BufferCopyRegion]) {
        self.assert_recording();
        self.lazy_resource_barrier(LazyResourceBarrierDesc::whole(src_buffer, ResourceState::CopySource));
        self.lazy_resource_barrier(LazyResourceBarrierDesc::whole(dst_buffer, ResourceState::CopyDest));
        self.flush_barriers();
        self.command_list.copy_buffer(src_buffer, dst_buffer, regions);
    }

    pub fn copy_buffer_to_texture(&mut self, src_buffer: &Arc<B::Resource>, dst_texture: &Arc<B::Resource>, regions: &[BufferToTextureCopyRegion]) {
        self.assert_recording();
        self.lazy_resource_barrier(LazyResourceBarrierDesc::whole(src_buffer, ResourceState::CopySource));
        for region in regions {
            self.lazy_resource_barrier(LazyResourceBarrierDesc::range(
                dst_texture,
                region.texture_mip_level,
                1,
                region.texture_array_layer,
                1,
                ResourceState::CopyDest,
            ));
        }
        self.flush_barriers();
        self.command_list.copy_buffer_to_texture(src_buffer, dst_texture, regions);
    }

    pub fn copy_texture(&mut self, src_texture: &Arc<B::Resource>, dst_texture: &Arc<B::Resource>, regions: &[TextureCopyRegion]) {
        self.assert_recording();
        for region in regions {
            self.lazy_resource_barrier(LazyResourceBarrierDesc::range(
                src_texture,
                region.src_mip_level,
                1,
                region.src_array_layer,
                1,
                ResourceState::CopySource,
            ));
            self.lazy_resource_barrier(LazyResourceBarrierDesc::range(
                dst_texture,
                region.dst_mip_level,
                1,
                region.dst_array_layer,
                1,
                ResourceState::CopyDest,
            ));
        }
        self.flush_barriers();
        self.command_list.copy_texture(src_texture, dst_texture, regions);
    }

    /// Upload `data` into one subresource of `resource`.
    ///
    /// Host-visible resources are written in place. Device-local ones go through a staging
    /// buffer owned by this list until the next reset. For textures `subresource` is
    /// `array_layer * level_count + mip_level`, and `row_pitch` / `depth_pitch` describe
    /// the layout of `data`.
    #[profiling::function]
    pub fn update_subresource(
        &mut self,
        resource: &Arc<B::Resource>,
        subresource: u32,
        data: &[u8],
        row_pitch: u64,
        depth_pitch: u64,
    ) -> Result<()> {
        self.assert_recording();
        let desc = resource.desc();
        match desc.memory_type {
            MemoryType::Upload => resource
                .update_upload_buffer(0, data)
                .with_context(|| format!("failed to write upload resource `{}`", desc.name)),
            MemoryType::Readback => bail!("resource `{}` lives in readback memory and cannot be updated", desc.name),
            MemoryType::Default if desc.is_buffer() => self.update_buffer(resource, data),
            MemoryType::Default => self.update_texture(resource, subresource, data, row_pitch, depth_pitch),
        }
    }

    fn update_buffer(&mut self, buffer: &Arc<B::Resource>, data: &[u8]) -> Result<()> {
        let size = buffer.desc().width;
        let staging = self
            .device
            .create_buffer(&BufferDesc::new(BindFlag::CopySource, size, MemoryType::Upload).with_name("staging buffer"))
            .context("failed to create staging buffer")?;
        staging.update_upload_buffer(0, data)?;

        self.lazy_resource_barrier(LazyResourceBarrierDesc::whole(buffer, ResourceState::CopyDest));
        self.flush_barriers();
        self.command_list.copy_buffer(&staging, buffer, &[BufferCopyRegion {
            src_offset: 0,
            dst_offset: 0,
            num_bytes: size,
        }]);
        self.cmd_resources.push(staging);
        Ok(())
    }

    fn update_texture(&mut self, texture: &Arc<B::Resource>, subresource: u32, data: &[u8], row_pitch: u64, depth_pitch: u64) -> Result<()> {
        let desc = texture.desc();
        let mip_level = subresource % desc.level_count();
        let array_layer = subresource / desc.level_count();
        assert!(
            array_layer < desc.layer_count(),
            "subresource {subresource} is outside texture `{}` ({} mips, {} layers)",
            desc.name, desc.level_count(), desc.layer_count(),
        );

        let width = desc.mip_width(mip_level);
        let height = desc.mip_height(mip_level);
        let info = desc.format.format_info(width, height, self.device.texture_data_pitch_alignment());

        let staging = self
            .device
            .create_buffer(&BufferDesc::new(BindFlag::CopySource, info.num_bytes, MemoryType::Upload).with_name("texture staging buffer"))
            .context("failed to create texture staging buffer")?;
        let layout = TextureDataLayout {
            dst_row_pitch: info.row_bytes,
            dst_depth_pitch: info.num_bytes,
            src_row_pitch: row_pitch,
            src_depth_pitch: depth_pitch,
            num_rows: info.num_rows,
            num_slices: 1,
        };
        staging
            .update_upload_buffer_with_texture_data(0, &layout, data)
            .with_context(|| format!("failed to stage mip {mip_level} layer {array_layer} of `{}`", desc.name))?;

        self.lazy_resource_barrier(LazyResourceBarrierDesc::range(texture, mip_level, 1, array_layer, 1, ResourceState::CopyDest));
        self.flush_barriers();
        self.command_list.copy_buffer_to_texture(&staging, texture, &[BufferToTextureCopyRegion {
            buffer_offset: 0,
            buffer_row_pitch: info.row_bytes,
            texture_mip_level: mip_level,
            texture_array_layer: array_layer,
            texture_offset: Offset3D::default(),
            texture_extent: Extent3D { width, height, depth: 1 },
        }]);
        self.cmd_resources.push(staging);
        Ok(())
    }
}
