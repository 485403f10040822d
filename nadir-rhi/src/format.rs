//! Pixel, depth and vertex-attribute formats the recording core reasons about.

use crate::utility::align_up;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Format {
    #[default]
    Undefined,
    R8Unorm,
    R8Uint,
    R8G8Unorm,
    R8G8B8A8Unorm,
    R8G8B8A8Srgb,
    B8G8R8A8Unorm,
    B8G8R8A8Srgb,
    R10G10B10A2Unorm,
    R11G11B10Float,
    R16Uint,
    R16Float,
    R16G16Float,
    R16G16B16A16Float,
    R32Uint,
    R32Float,
    R32G32Float,
    R32G32B32Float,
    R32G32B32A32Float,
    D16Unorm,
    D24UnormS8Uint,
    D32Float,
    D32FloatS8Uint,
    Bc1Unorm,
    Bc3Unorm,
    Bc5Unorm,
    Bc7Unorm,
}

/// Byte layout of one 2D slice of a texture in linear (buffer) memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormatInfo {
    pub num_bytes: u64,
    pub row_bytes: u64,
    pub num_rows: u64,
}

impl Format {
    #[inline]
    pub fn is_depth(self) -> bool {
        matches!(self, Format::D16Unorm | Format::D24UnormS8Uint | Format::D32Float | Format::D32FloatS8Uint)
    }

    #[inline]
    pub fn is_stencil(self) -> bool {
        matches!(self, Format::D24UnormS8Uint | Format::D32FloatS8Uint)
    }

    #[inline]
    pub fn is_compressed(self) -> bool {
        matches!(self, Format::Bc1Unorm | Format::Bc3Unorm | Format::Bc5Unorm | Format::Bc7Unorm)
    }

    /// Size in bytes of one texel, or of one 4x4 block for compressed formats.
    pub fn block_size(self) -> u32 {
        match self {
            Format::Undefined => 0,
            Format::R8Unorm | Format::R8Uint => 1,
            Format::R8G8Unorm | Format::R16Uint | Format::R16Float | Format::D16Unorm => 2,
            Format::R8G8B8A8Unorm
            | Format::R8G8B8A8Srgb
            | Format::B8G8R8A8Unorm
            | Format::B8G8R8A8Srgb
            | Format::R10G10B10A2Unorm
            | Format::R11G11B10Float
            | Format::R16G16Float
            | Format::R32Uint
            | Format::R32Float
            | Format::D24UnormS8Uint
            | Format::D32Float => 4,
            Format::R16G16B16A16Float | Format::R32G32Float | Format::D32FloatS8Uint => 8,
            Format::R32G32B32Float => 12,
            Format::R32G32B32A32Float => 16,
            Format::Bc1Unorm => 8,
            Format::Bc3Unorm | Format::Bc5Unorm | Format::Bc7Unorm => 16,
        }
    }

    /// Linear layout of a `width` x `height` slice, with rows padded to `pitch_alignment`.
    pub fn format_info(self, width: u32, height: u32, pitch_alignment: u32) -> FormatInfo {
        let (row_bytes, num_rows) = if self.is_compressed() {
            let blocks_wide = u64::from(width.div_ceil(4).max(1));
            let blocks_high = u64::from(height.div_ceil(4).max(1));
            (blocks_wide * u64::from(self.block_size()), blocks_high)
        } else {
            (u64::from(width) * u64::from(self.block_size()), u64::from(height))
        };

        let row_bytes = align_up(row_bytes, u64::from(pitch_alignment));
        FormatInfo {
            num_bytes: row_bytes * num_rows,
            row_bytes,
            num_rows,
        }
    }
}
