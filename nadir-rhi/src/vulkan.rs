//! Translation of the core's state and format vocabulary into Vulkan (sync2) terms.
//!
//! A Vulkan backend records [`ResourceBarrierDesc`]s with the barriers built here.

use ash::vk;
use crate::backend::{Backend, Resource};
use crate::barrier::ResourceBarrierDesc;
use crate::format::Format;
use crate::types::*;

fn shader_stages() -> vk::PipelineStageFlags2 {
    vk::PipelineStageFlags2::VERTEX_SHADER
        | vk::PipelineStageFlags2::GEOMETRY_SHADER
        | vk::PipelineStageFlags2::COMPUTE_SHADER
        | vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR
        | vk::PipelineStageFlags2::TASK_SHADER_EXT
        | vk::PipelineStageFlags2::MESH_SHADER_EXT
}

impl ResourceState {
    pub fn to_vk_image_layout(self) -> vk::ImageLayout {
        match self {
            ResourceState::Unknown | ResourceState::Undefined => vk::ImageLayout::UNDEFINED,
            ResourceState::Common | ResourceState::UnorderedAccess | ResourceState::GenericRead => vk::ImageLayout::GENERAL,
            ResourceState::RenderTarget => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            ResourceState::DepthStencilWrite => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            ResourceState::DepthStencilRead => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            ResourceState::NonPixelShaderResource | ResourceState::PixelShaderResource => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            ResourceState::CopyDest => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            ResourceState::CopySource => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            ResourceState::ShadingRateSource => vk::ImageLayout::FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR,
            ResourceState::Present => vk::ImageLayout::PRESENT_SRC_KHR,
            ResourceState::VertexAndConstantBuffer
            | ResourceState::IndexBuffer
            | ResourceState::IndirectArgument
            | ResourceState::RaytracingAccelerationStructure => vk::ImageLayout::GENERAL,
        }
    }

    pub fn to_vk_access_flags(self) -> vk::AccessFlags2 {
        match self {
            ResourceState::Unknown | ResourceState::Undefined | ResourceState::Present => vk::AccessFlags2::NONE,
            ResourceState::Common => vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE,
            ResourceState::VertexAndConstantBuffer => vk::AccessFlags2::VERTEX_ATTRIBUTE_READ | vk::AccessFlags2::UNIFORM_READ,
            ResourceState::IndexBuffer => vk::AccessFlags2::INDEX_READ,
            ResourceState::RenderTarget => vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
            ResourceState::UnorderedAccess => vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE,
            ResourceState::DepthStencilWrite => {
                vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE
            }
            ResourceState::DepthStencilRead => vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ,
            ResourceState::NonPixelShaderResource | ResourceState::PixelShaderResource => vk::AccessFlags2::SHADER_READ,
            ResourceState::IndirectArgument => vk::AccessFlags2::INDIRECT_COMMAND_READ,
            ResourceState::CopyDest => vk::AccessFlags2::TRANSFER_WRITE,
            ResourceState::CopySource => vk::AccessFlags2::TRANSFER_READ,
            ResourceState::RaytracingAccelerationStructure => {
                vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR | vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR
            }
            ResourceState::ShadingRateSource => vk::AccessFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_READ_KHR,
            ResourceState::GenericRead => vk::AccessFlags2::MEMORY_READ,
        }
    }

    pub fn to_vk_pipeline_stages(self) -> vk::PipelineStageFlags2 {
        match self {
            ResourceState::Unknown | ResourceState::Undefined => vk::PipelineStageFlags2::TOP_OF_PIPE,
            ResourceState::Present => vk::PipelineStageFlags2::BOTTOM_OF_PIPE,
            ResourceState::Common | ResourceState::GenericRead => vk::PipelineStageFlags2::ALL_COMMANDS,
            ResourceState::VertexAndConstantBuffer => vk::PipelineStageFlags2::VERTEX_ATTRIBUTE_INPUT | shader_stages(),
            ResourceState::IndexBuffer => vk::PipelineStageFlags2::INDEX_INPUT,
            ResourceState::RenderTarget => vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            ResourceState::UnorderedAccess => shader_stages() | vk::PipelineStageFlags2::FRAGMENT_SHADER,
            ResourceState::DepthStencilWrite | ResourceState::DepthStencilRead => {
                vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS
            }
            ResourceState::NonPixelShaderResource => shader_stages(),
            ResourceState::PixelShaderResource => vk::PipelineStageFlags2::FRAGMENT_SHADER,
            ResourceState::IndirectArgument => vk::PipelineStageFlags2::DRAW_INDIRECT,
            ResourceState::CopyDest | ResourceState::CopySource => vk::PipelineStageFlags2::TRANSFER,
            ResourceState::RaytracingAccelerationStructure => {
                vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR | vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR
            }
            ResourceState::ShadingRateSource => vk::PipelineStageFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR,
        }
    }
}

impl Format {
    pub fn to_vk(self) -> vk::Format {
        match self {
            Format::Undefined => vk::Format::UNDEFINED,
            Format::R8Unorm => vk::Format::R8_UNORM,
            Format::R8Uint => vk::Format::R8_UINT,
            Format::R8G8Unorm => vk::Format::R8G8_UNORM,
            Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
            Format::R8G8B8A8Srgb => vk::Format::R8G8B8A8_SRGB,
            Format::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
            Format::B8G8R8A8Srgb => vk::Format::B8G8R8A8_SRGB,
            Format::R10G10B10A2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
            Format::R11G11B10Float => vk::Format::B10G11R11_UFLOAT_PACK32,
            Format::R16Uint => vk::Format::R16_UINT,
            Format::R16Float => vk::Format::R16_SFLOAT,
            Format::R16G16Float => vk::Format::R16G16_SFLOAT,
            Format::R16G16B16A16Float => vk::Format::R16G16B16A16_SFLOAT,
            Format::R32Uint => vk::Format::R32_UINT,
            Format::R32Float => vk::Format::R32_SFLOAT,
            Format::R32G32Float => vk::Format::R32G32_SFLOAT,
            Format::R32G32B32Float => vk::Format::R32G32B32_SFLOAT,
            Format::R32G32B32A32Float => vk::Format::R32G32B32A32_SFLOAT,
            Format::D16Unorm => vk::Format::D16_UNORM,
            Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
            Format::D32Float => vk::Format::D32_SFLOAT,
            Format::D32FloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
            Format::Bc1Unorm => vk::Format::BC1_RGBA_UNORM_BLOCK,
            Format::Bc3Unorm => vk::Format::BC3_UNORM_BLOCK,
            Format::Bc5Unorm => vk::Format::BC5_UNORM_BLOCK,
            Format::Bc7Unorm => vk::Format::BC7_UNORM_BLOCK,
        }
    }

    pub fn to_vk_aspect_mask(self) -> vk::ImageAspectFlags {
        match (self.is_depth(), self.is_stencil()) {
            (true, true) => vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
            (true, false) => vk::ImageAspectFlags::DEPTH,
            (false, true) => vk::ImageAspectFlags::STENCIL,
            (false, false) => vk::ImageAspectFlags::COLOR,
        }
    }
}

impl RenderPassLoadOp {
    pub fn to_vk(self) -> vk::AttachmentLoadOp {
        match self {
            RenderPassLoadOp::Load => vk::AttachmentLoadOp::LOAD,
            RenderPassLoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
            RenderPassLoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
        }
    }
}

impl RenderPassStoreOp {
    pub fn to_vk(self) -> vk::AttachmentStoreOp {
        match self {
            RenderPassStoreOp::Store => vk::AttachmentStoreOp::STORE,
            RenderPassStoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
        }
    }
}

impl ShadingRate {
    /// Fragment size of this shading rate.
    pub fn to_vk_extent(self) -> vk::Extent2D {
        let (width, height) = match self {
            ShadingRate::Rate1x1 => (1, 1),
            ShadingRate::Rate1x2 => (1, 2),
            ShadingRate::Rate2x1 => (2, 1),
            ShadingRate::Rate2x2 => (2, 2),
            ShadingRate::Rate2x4 => (2, 4),
            ShadingRate::Rate4x2 => (4, 2),
            ShadingRate::Rate4x4 => (4, 4),
        };
        vk::Extent2D { width, height }
    }
}

impl ShadingRateCombiner {
    pub fn to_vk(self) -> vk::FragmentShadingRateCombinerOpKHR {
        match self {
            ShadingRateCombiner::Passthrough => vk::FragmentShadingRateCombinerOpKHR::KEEP,
            ShadingRateCombiner::Override => vk::FragmentShadingRateCombinerOpKHR::REPLACE,
            ShadingRateCombiner::Min => vk::FragmentShadingRateCombinerOpKHR::MIN,
            ShadingRateCombiner::Max => vk::FragmentShadingRateCombinerOpKHR::MAX,
            ShadingRateCombiner::Sum => vk::FragmentShadingRateCombinerOpKHR::MUL,
        }
    }
}

/// Image barrier for `barrier`, whose resource is backed by `image`.
pub fn image_memory_barrier<'a, B: Backend>(image: vk::Image, barrier: &ResourceBarrierDesc<B>) -> vk::ImageMemoryBarrier2<'a> {
    let aspect_mask = barrier.resource.desc().format.to_vk_aspect_mask();
    let subresource_range = vk::ImageSubresourceRange::default()
        .aspect_mask(aspect_mask)
        .base_mip_level(barrier.base_mip_level)
        .level_count(barrier.level_count)
        .base_array_layer(barrier.base_array_layer)
        .layer_count(barrier.layer_count);

    vk::ImageMemoryBarrier2::default()
        .src_stage_mask(barrier.state_before.to_vk_pipeline_stages())
        .src_access_mask(barrier.state_before.to_vk_access_flags())
        .dst_stage_mask(barrier.state_after.to_vk_pipeline_stages())
        .dst_access_mask(barrier.state_after.to_vk_access_flags())
        .old_layout(barrier.state_before.to_vk_image_layout())
        .new_layout(barrier.state_after.to_vk_image_layout())
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(subresource_range)
}

/// Whole-buffer barrier for `barrier`, whose resource is backed by `buffer`.
pub fn buffer_memory_barrier<'a, B: Backend>(buffer: vk::Buffer, barrier: &ResourceBarrierDesc<B>) -> vk::BufferMemoryBarrier2<'a> {
    vk::BufferMemoryBarrier2::default()
        .src_stage_mask(barrier.state_before.to_vk_pipeline_stages())
        .src_access_mask(barrier.state_before.to_vk_access_flags())
        .dst_stage_mask(barrier.state_after.to_vk_pipeline_stages())
        .dst_access_mask(barrier.state_after.to_vk_access_flags())
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .buffer(buffer)
        .offset(0)
        .size(vk::WHOLE_SIZE)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use ash::vk::Handle as _;
    use super::*;
    use crate::backend::Device;
    use crate::recording::{Recording, RecordingDevice};

    #[test]
    fn attachment_states_map_to_attachment_layouts() {
        assert_eq!(ResourceState::RenderTarget.to_vk_image_layout(), vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(ResourceState::DepthStencilWrite.to_vk_image_layout(), vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert_eq!(ResourceState::Unknown.to_vk_image_layout(), vk::ImageLayout::UNDEFINED);
        assert_eq!(ResourceState::PixelShaderResource.to_vk_pipeline_stages(), vk::PipelineStageFlags2::FRAGMENT_SHADER);
        assert!(ResourceState::NonPixelShaderResource.to_vk_pipeline_stages().contains(vk::PipelineStageFlags2::COMPUTE_SHADER));
    }

    #[test]
    fn depth_formats_use_depth_aspects() {
        assert_eq!(Format::D32Float.to_vk_aspect_mask(), vk::ImageAspectFlags::DEPTH);
        assert_eq!(
            Format::D24UnormS8Uint.to_vk_aspect_mask(),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        );
        assert_eq!(Format::R8G8B8A8Unorm.to_vk_aspect_mask(), vk::ImageAspectFlags::COLOR);
        assert_eq!(Format::R16G16B16A16Float.to_vk(), vk::Format::R16G16B16A16_SFLOAT);
    }

    #[test]
    fn image_barrier_covers_the_subresource_range() {
        let device = RecordingDevice::new();
        let mut desc = TextureDesc::new_2d(64, 64, Format::D32Float, BindFlag::DepthStencil);
        desc.mip_levels = 4;
        let texture = device.create_texture(&desc).unwrap();

        let barrier = ResourceBarrierDesc::<Recording> {
            resource: Arc::clone(&texture),
            state_before: ResourceState::CopyDest,
            state_after: ResourceState::DepthStencilWrite,
            base_mip_level: 2,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        let vk_barrier = image_memory_barrier(vk::Image::from_raw(7), &barrier);

        assert_eq!(vk_barrier.old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(vk_barrier.new_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert_eq!(vk_barrier.src_access_mask, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!(vk_barrier.subresource_range.base_mip_level, 2);
        assert_eq!(vk_barrier.subresource_range.level_count, 1);
        assert_eq!(vk_barrier.subresource_range.aspect_mask, vk::ImageAspectFlags::DEPTH);
        assert_eq!(vk_barrier.image.as_raw(), 7);
    }
}
