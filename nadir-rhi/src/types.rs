//! Plain descriptions shared by the recording core and the backends.

use std::sync::Arc;
use derive_builder::Builder;
use enumflags2::{bitflags, BitFlags};
use glam::Mat4;
use bytemuck::{Pod, Zeroable};
use crate::backend::Backend;
use crate::format::Format;
use crate::handle::Handle;
use crate::utility::{impl_backend_clone, impl_backend_key};

/// Mip count that extends a view or barrier to the last level of the resource.
pub const ALL_MIPS: u32 = u32::MAX;
/// Layer count that extends a barrier to the last array layer of the resource.
pub const ALL_LAYERS: u32 = u32::MAX;
/// Byte size that extends a buffer view to the end of the buffer.
pub const WHOLE_SIZE: u64 = u64::MAX;

/// GPU usage state of a resource or of one of its subresources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceState {
    /// Never used in the current scope; the prior state is decided at submission.
    #[default]
    Unknown,
    Common,
    VertexAndConstantBuffer,
    IndexBuffer,
    RenderTarget,
    UnorderedAccess,
    DepthStencilWrite,
    DepthStencilRead,
    NonPixelShaderResource,
    PixelShaderResource,
    IndirectArgument,
    CopyDest,
    CopySource,
    RaytracingAccelerationStructure,
    ShadingRateSource,
    Present,
    GenericRead,
    Undefined,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    #[default]
    Unknown,
    Buffer,
    Texture,
    Sampler,
    AccelerationStructure,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureType {
    Texture1D,
    #[default]
    Texture2D,
    Texture3D,
}

/// Where a resource's memory lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemoryType {
    /// Device local, not host addressable.
    #[default]
    Default,
    /// Host visible, written through a mapping.
    Upload,
    Readback,
}

#[bitflags]
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindFlag {
    RenderTarget = 1 << 0,
    DepthStencil = 1 << 1,
    ShaderResource = 1 << 2,
    UnorderedAccess = 1 << 3,
    ConstantBuffer = 1 << 4,
    IndexBuffer = 1 << 5,
    VertexBuffer = 1 << 6,
    AccelerationStructure = 1 << 7,
    RayTracing = 1 << 8,
    CopyDest = 1 << 9,
    CopySource = 1 << 10,
    ShadingRateSource = 1 << 11,
    ShaderTable = 1 << 12,
    IndirectBuffer = 1 << 13,
}

pub type BindFlags = BitFlags<BindFlag>;

/// Buffer creation parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    pub name: String,
    pub size: u64,
    pub bind_flags: BindFlags,
    pub memory_type: MemoryType,
}

impl BufferDesc {
    pub fn new(bind_flags: impl Into<BindFlags>, size: u64, memory_type: MemoryType) -> Self {
        Self {
            name: String::new(),
            size,
            bind_flags: bind_flags.into(),
            memory_type,
        }
    }

    #[inline]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }
}

/// Texture creation parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Builder)]
pub struct TextureDesc {
    #[builder(default, setter(into))]
    pub name: String,
    #[builder(default)]
    pub texture_type: TextureType,
    pub format: Format,
    pub width: u32,
    #[builder(default = "1")]
    pub height: u32,
    #[builder(default = "1")]
    pub depth: u32,
    #[builder(default = "1")]
    pub array_layers: u32,
    #[builder(default = "1")]
    pub mip_levels: u32,
    #[builder(default = "1")]
    pub sample_count: u32,
    #[builder(default)]
    pub memory_type: MemoryType,
    #[builder(default = "BindFlags::empty()")]
    pub bind_flags: BindFlags,
}

impl TextureDesc {
    /// A single-mip, single-layer 2D texture in device memory.
    pub fn new_2d(width: u32, height: u32, format: Format, bind_flags: impl Into<BindFlags>) -> Self {
        Self {
            name: String::new(),
            texture_type: TextureType::Texture2D,
            format,
            width,
            height,
            depth: 1,
            array_layers: 1,
            mip_levels: 1,
            sample_count: 1,
            memory_type: MemoryType::Default,
            bind_flags: bind_flags.into(),
        }
    }
}

/// Shape and placement of a created resource.
///
/// For buffers `width` is the size in bytes and the subresource grid is 1x1.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceDesc {
    pub name: String,
    pub resource_type: ResourceType,
    pub texture_type: TextureType,
    pub format: Format,
    pub width: u64,
    pub height: u32,
    pub depth: u32,
    pub array_layers: u32,
    pub mip_levels: u32,
    pub sample_count: u32,
    pub memory_type: MemoryType,
    pub bind_flags: BindFlags,
    pub is_back_buffer: bool,
}

impl ResourceDesc {
    pub fn from_buffer(desc: &BufferDesc) -> Self {
        Self {
            name: desc.name.clone(),
            resource_type: ResourceType::Buffer,
            texture_type: TextureType::default(),
            format: Format::Undefined,
            width: desc.size,
            height: 1,
            depth: 1,
            array_layers: 1,
            mip_levels: 1,
            sample_count: 1,
            memory_type: desc.memory_type,
            bind_flags: desc.bind_flags,
            is_back_buffer: false,
        }
    }

    pub fn from_texture(desc: &TextureDesc) -> Self {
        Self {
            name: desc.name.clone(),
            resource_type: ResourceType::Texture,
            texture_type: desc.texture_type,
            format: desc.format,
            width: u64::from(desc.width),
            height: desc.height,
            depth: desc.depth,
            array_layers: desc.array_layers,
            mip_levels: desc.mip_levels,
            sample_count: desc.sample_count,
            memory_type: desc.memory_type,
            bind_flags: desc.bind_flags,
            is_back_buffer: false,
        }
    }

    #[inline]
    pub fn level_count(&self) -> u32 {
        self.mip_levels.max(1)
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.array_layers.max(1)
    }

    #[inline]
    pub fn is_buffer(&self) -> bool {
        self.resource_type == ResourceType::Buffer
    }

    #[inline]
    pub fn is_texture(&self) -> bool {
        self.resource_type == ResourceType::Texture
    }

    /// Width of `mip`, never below one texel.
    #[inline]
    pub fn mip_width(&self, mip: u32) -> u32 {
        u32::try_from(self.width >> mip).unwrap_or(u32::MAX).max(1)
    }

    /// Height of `mip`, never below one texel.
    #[inline]
    pub fn mip_height(&self, mip: u32) -> u32 {
        (self.height >> mip).max(1)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewType {
    #[default]
    Unknown,
    ConstantBuffer,
    Sampler,
    Texture,
    RWTexture,
    Buffer,
    RWBuffer,
    StructuredBuffer,
    RWStructuredBuffer,
    AccelerationStructure,
    ShadingRateSource,
    RenderTarget,
    DepthStencil,
}

impl ViewType {
    /// Read-only shader resource views.
    #[inline]
    pub fn is_shader_resource(self) -> bool {
        matches!(self, ViewType::Texture | ViewType::Buffer | ViewType::StructuredBuffer)
    }

    #[inline]
    pub fn is_unordered_access(self) -> bool {
        matches!(self, ViewType::RWTexture | ViewType::RWBuffer | ViewType::RWStructuredBuffer)
    }

    /// Render pass attachments, whose views depend on the resource alone.
    #[inline]
    pub fn is_attachment(self) -> bool {
        matches!(self, ViewType::RenderTarget | ViewType::DepthStencil | ViewType::ShadingRateSource)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewDimension {
    #[default]
    Unknown,
    Buffer,
    Texture1D,
    Texture1DArray,
    Texture2D,
    Texture2DArray,
    Texture2DMS,
    Texture2DMSArray,
    Texture3D,
    TextureCube,
    TextureCubeArray,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderType {
    #[default]
    Unknown,
    Vertex,
    Pixel,
    Compute,
    Geometry,
    Amplification,
    Mesh,
    Library,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderKind {
    #[default]
    Unknown,
    Pixel,
    Vertex,
    Geometry,
    Compute,
    Amplification,
    Mesh,
    RayGeneration,
    Intersection,
    AnyHit,
    ClosestHit,
    Miss,
    Callable,
}

/// The four regions of a ray tracing shader binding table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderTableKind {
    RayGeneration,
    Miss,
    Callable,
    Hit,
}

impl ShaderKind {
    /// Shader table region this entry point lives in, if it is a ray tracing stage.
    pub fn shader_table_kind(self) -> Option<ShaderTableKind> {
        match self {
            ShaderKind::RayGeneration => Some(ShaderTableKind::RayGeneration),
            ShaderKind::Miss => Some(ShaderTableKind::Miss),
            ShaderKind::Callable => Some(ShaderTableKind::Callable),
            ShaderKind::AnyHit | ShaderKind::ClosestHit | ShaderKind::Intersection => Some(ShaderTableKind::Hit),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryPoint {
    pub name: String,
    pub kind: ShaderKind,
}

impl EntryPoint {
    pub fn new(name: &str, kind: ShaderKind) -> Self {
        Self { name: name.to_owned(), kind }
    }
}

/// Component type a shader reads from a bound texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReturnType {
    #[default]
    Unknown,
    Float,
    Uint,
    Int,
    Double,
}

/// Address of one binding slot in a program's layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindKey {
    pub shader_type: ShaderType,
    pub view_type: ViewType,
    pub slot: u32,
    pub space: u32,
    pub count: u32,
}

impl BindKey {
    pub fn new(shader_type: ShaderType, view_type: ViewType, slot: u32, space: u32) -> Self {
        Self { shader_type, view_type, slot, space, count: 1 }
    }

    #[inline]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// Reflection data for one resource binding of a shader.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResourceBindingDesc {
    pub name: String,
    pub view_type: ViewType,
    pub slot: u32,
    pub space: u32,
    pub count: u32,
    pub dimension: ViewDimension,
    pub return_type: ReturnType,
    pub structure_stride: u32,
}

impl ResourceBindingDesc {
    pub fn new(name: &str, view_type: ViewType, slot: u32, space: u32) -> Self {
        Self {
            name: name.to_owned(),
            view_type,
            slot,
            space,
            count: 1,
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_dimension(mut self, dimension: ViewDimension) -> Self {
        self.dimension = dimension;
        self
    }

    #[inline]
    pub fn with_return_type(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }

    #[inline]
    pub fn with_structure_stride(mut self, structure_stride: u32) -> Self {
        self.structure_stride = structure_stride;
        self
    }

    /// The bind key this binding occupies when compiled for `shader_type`.
    pub fn bind_key(&self, shader_type: ShaderType) -> BindKey {
        BindKey::new(shader_type, self.view_type, self.slot, self.space).with_count(self.count)
    }
}

/// The part of a view description the caller controls; the rest comes from reflection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LazyViewDesc {
    pub level: u32,
    pub count: u32,
    pub buffer_format: Format,
}

impl Default for LazyViewDesc {
    fn default() -> Self {
        Self {
            level: 0,
            count: ALL_MIPS,
            buffer_format: Format::Undefined,
        }
    }
}

impl LazyViewDesc {
    /// A view of the single mip `level`.
    pub fn mip(level: u32) -> Self {
        Self { level, count: 1, ..Default::default() }
    }

    #[inline]
    pub fn with_buffer_format(mut self, buffer_format: Format) -> Self {
        self.buffer_format = buffer_format;
        self
    }
}

/// Full view creation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewDesc {
    pub view_type: ViewType,
    pub dimension: ViewDimension,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
    pub plane_slice: u32,
    pub offset: u64,
    pub buffer_size: u64,
    pub structure_stride: u32,
    pub buffer_format: Format,
    pub bindless: bool,
}

impl Default for ViewDesc {
    fn default() -> Self {
        Self {
            view_type: ViewType::Unknown,
            dimension: ViewDimension::Unknown,
            base_mip_level: 0,
            level_count: ALL_MIPS,
            base_array_layer: 0,
            layer_count: ALL_LAYERS,
            plane_slice: 0,
            offset: 0,
            buffer_size: WHOLE_SIZE,
            structure_stride: 0,
            buffer_format: Format::Undefined,
            bindless: false,
        }
    }
}

/// One entry of a binding set: a slot and the view written into it.
#[derive(Debug)]
pub struct BindingDesc<B: Backend> {
    pub bind_key: BindKey,
    pub view: Handle<B::View>,
}

impl_backend_key!(BindingDesc { bind_key, view });

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InputLayoutDesc {
    pub slot: u32,
    pub location: u32,
    pub format: Format,
    pub stride: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillMode {
    Wireframe,
    #[default]
    Solid,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RasterizerDesc {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub depth_bias: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Blend {
    #[default]
    Zero,
    One,
    SrcAlpha,
    InvSrcAlpha,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendDesc {
    pub blend_enable: bool,
    pub blend_src: Blend,
    pub blend_dest: Blend,
    pub blend_op: BlendOp,
    pub blend_src_alpha: Blend,
    pub blend_dest_alpha: Blend,
    pub blend_op_alpha: BlendOp,
}

impl Default for BlendDesc {
    fn default() -> Self {
        Self {
            blend_enable: false,
            blend_src: Blend::One,
            blend_dest: Blend::Zero,
            blend_op: BlendOp::Add,
            blend_src_alpha: Blend::One,
            blend_dest_alpha: Blend::Zero,
            blend_op_alpha: BlendOp::Add,
        }
    }
}

impl BlendDesc {
    /// Classic `src * a + dst * (1 - a)` blending.
    pub fn alpha_blend() -> Self {
        Self {
            blend_enable: true,
            blend_src: Blend::SrcAlpha,
            blend_dest: Blend::InvSrcAlpha,
            blend_op: BlendOp::Add,
            blend_src_alpha: Blend::SrcAlpha,
            blend_dest_alpha: Blend::InvSrcAlpha,
            blend_op_alpha: BlendOp::Add,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ComparisonFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrSat,
    DecrSat,
    Invert,
    Incr,
    Decr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StencilOpDesc {
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub func: ComparisonFunc,
}

impl Default for StencilOpDesc {
    fn default() -> Self {
        Self {
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            func: ComparisonFunc::Always,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthStencilDesc {
    pub depth_test_enable: bool,
    pub depth_func: ComparisonFunc,
    pub depth_write_enable: bool,
    pub depth_bounds_test_enable: bool,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front_face: StencilOpDesc,
    pub back_face: StencilOpDesc,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_func: ComparisonFunc::Less,
            depth_write_enable: true,
            depth_bounds_test_enable: false,
            stencil_enable: false,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            front_face: StencilOpDesc::default(),
            back_face: StencilOpDesc::default(),
        }
    }
}

impl DepthStencilDesc {
    pub fn disabled() -> Self {
        Self {
            depth_test_enable: false,
            depth_write_enable: false,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderPassLoadOp {
    Load,
    #[default]
    Clear,
    DontCare,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderPassStoreOp {
    #[default]
    Store,
    DontCare,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderPassColorDesc {
    pub format: Format,
    pub load_op: RenderPassLoadOp,
    pub store_op: RenderPassStoreOp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderPassDepthStencilDesc {
    pub format: Format,
    pub depth_load_op: RenderPassLoadOp,
    pub depth_store_op: RenderPassStoreOp,
    pub stencil_load_op: RenderPassLoadOp,
    pub stencil_store_op: RenderPassStoreOp,
}

/// Attachment formats and operations of a render pass; the render pass cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderPassDesc {
    pub colors: Vec<RenderPassColorDesc>,
    pub depth_stencil: RenderPassDepthStencilDesc,
    pub shading_rate_format: Format,
    pub sample_count: u32,
}

impl Default for RenderPassDesc {
    fn default() -> Self {
        Self {
            colors: Vec::new(),
            depth_stencil: RenderPassDepthStencilDesc::default(),
            shading_rate_format: Format::Undefined,
            sample_count: 1,
        }
    }
}

#[derive(Debug)]
pub struct FramebufferDesc<B: Backend> {
    pub render_pass: Handle<B::RenderPass>,
    pub width: u32,
    pub height: u32,
    pub colors: Vec<Option<Handle<B::View>>>,
    pub depth_stencil: Option<Handle<B::View>>,
    pub shading_rate_image: Option<Handle<B::View>>,
}

impl_backend_key!(FramebufferDesc { render_pass, width, height, colors, depth_stencil, shading_rate_image });

/// Color attachment of a render pass about to begin.
#[derive(Debug)]
pub struct RenderPassBeginColorDesc<B: Backend> {
    pub texture: Option<Arc<B::Resource>>,
    pub view_desc: LazyViewDesc,
    pub load_op: RenderPassLoadOp,
    pub store_op: RenderPassStoreOp,
    pub clear_color: [f32; 4],
}

impl_backend_clone!(RenderPassBeginColorDesc { texture, view_desc, load_op, store_op, clear_color });

impl<B: Backend> RenderPassBeginColorDesc<B> {
    pub fn new(texture: &Arc<B::Resource>) -> Self {
        Self {
            texture: Some(texture.clone()),
            ..Self::empty()
        }
    }

    /// An unused color slot.
    pub fn empty() -> Self {
        Self {
            texture: None,
            view_desc: LazyViewDesc::default(),
            load_op: RenderPassLoadOp::Clear,
            store_op: RenderPassStoreOp::Store,
            clear_color: [0.0; 4],
        }
    }

    #[inline]
    pub fn with_load_op(mut self, load_op: RenderPassLoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    #[inline]
    pub fn with_store_op(mut self, store_op: RenderPassStoreOp) -> Self {
        self.store_op = store_op;
        self
    }

    #[inline]
    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    #[inline]
    pub fn with_view_desc(mut self, view_desc: LazyViewDesc) -> Self {
        self.view_desc = view_desc;
        self
    }
}

#[derive(Debug)]
pub struct RenderPassBeginDepthStencilDesc<B: Backend> {
    pub texture: Option<Arc<B::Resource>>,
    pub view_desc: LazyViewDesc,
    pub depth_load_op: RenderPassLoadOp,
    pub depth_store_op: RenderPassStoreOp,
    pub stencil_load_op: RenderPassLoadOp,
    pub stencil_store_op: RenderPassStoreOp,
    pub clear_depth: f32,
    pub clear_stencil: u8,
}

impl_backend_clone!(RenderPassBeginDepthStencilDesc { texture, view_desc, depth_load_op, depth_store_op, stencil_load_op, stencil_store_op, clear_depth, clear_stencil });

impl<B: Backend> Default for RenderPassBeginDepthStencilDesc<B> {
    fn default() -> Self {
        Self {
            texture: None,
            view_desc: LazyViewDesc::default(),
            depth_load_op: RenderPassLoadOp::Clear,
            depth_store_op: RenderPassStoreOp::Store,
            stencil_load_op: RenderPassLoadOp::DontCare,
            stencil_store_op: RenderPassStoreOp::DontCare,
            clear_depth: 1.0,
            clear_stencil: 0,
        }
    }
}

impl<B: Backend> RenderPassBeginDepthStencilDesc<B> {
    pub fn new(texture: &Arc<B::Resource>) -> Self {
        Self {
            texture: Some(texture.clone()),
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_depth_ops(mut self, load_op: RenderPassLoadOp, store_op: RenderPassStoreOp) -> Self {
        self.depth_load_op = load_op;
        self.depth_store_op = store_op;
        self
    }

    #[inline]
    pub fn with_stencil_ops(mut self, load_op: RenderPassLoadOp, store_op: RenderPassStoreOp) -> Self {
        self.stencil_load_op = load_op;
        self.stencil_store_op = store_op;
        self
    }

    #[inline]
    pub fn with_clear(mut self, depth: f32, stencil: u8) -> Self {
        self.clear_depth = depth;
        self.clear_stencil = stencil;
        self
    }
}

#[derive(Debug)]
pub struct RenderPassBeginDesc<B: Backend> {
    pub colors: Vec<RenderPassBeginColorDesc<B>>,
    pub depth_stencil: RenderPassBeginDepthStencilDesc<B>,
}

impl_backend_clone!(RenderPassBeginDesc { colors, depth_stencil });

impl<B: Backend> Default for RenderPassBeginDesc<B> {
    fn default() -> Self {
        Self {
            colors: Vec::new(),
            depth_stencil: RenderPassBeginDepthStencilDesc::default(),
        }
    }
}

impl<B: Backend> RenderPassBeginDesc<B> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_color(mut self, color: RenderPassBeginColorDesc<B>) -> Self {
        self.colors.push(color);
        self
    }

    #[inline]
    pub fn with_depth_stencil(mut self, depth_stencil: RenderPassBeginDepthStencilDesc<B>) -> Self {
        self.depth_stencil = depth_stencil;
        self
    }
}

/// Clear values handed to the native render pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClearDesc {
    pub colors: Vec<[f32; 4]>,
    pub depth: f32,
    pub stencil: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PipelineType {
    #[default]
    Graphics,
    Compute,
    RayTracing,
}

#[derive(Debug)]
pub struct GraphicsPipelineDesc<B: Backend> {
    pub program: Handle<B::Program>,
    pub layout: Handle<B::BindingSetLayout>,
    pub input: Vec<InputLayoutDesc>,
    pub render_pass: Option<Handle<B::RenderPass>>,
    pub depth_stencil_desc: DepthStencilDesc,
    pub blend_desc: BlendDesc,
    pub rasterizer_desc: RasterizerDesc,
}

impl_backend_key!(GraphicsPipelineDesc { program, layout, input, render_pass, depth_stencil_desc, blend_desc, rasterizer_desc });

#[derive(Debug)]
pub struct ComputePipelineDesc<B: Backend> {
    pub program: Handle<B::Program>,
    pub layout: Handle<B::BindingSetLayout>,
}

impl_backend_key!(ComputePipelineDesc { program, layout });

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RayTracingShaderGroupType {
    #[default]
    General,
    TrianglesHitGroup,
    ProceduralHitGroup,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RayTracingShaderGroup {
    pub group_type: RayTracingShaderGroupType,
    pub general: u64,
    pub closest_hit: u64,
    pub any_hit: u64,
    pub intersection: u64,
}

impl RayTracingShaderGroup {
    /// The group a single entry point of `kind` forms on its own.
    pub fn for_entry_point(kind: ShaderKind, id: u64) -> Option<Self> {
        let group = match kind {
            ShaderKind::RayGeneration | ShaderKind::Miss | ShaderKind::Callable => Self { general: id, ..Default::default() },
            ShaderKind::ClosestHit => Self {
                group_type: RayTracingShaderGroupType::TrianglesHitGroup,
                closest_hit: id,
                ..Default::default()
            },
            ShaderKind::AnyHit => Self {
                group_type: RayTracingShaderGroupType::TrianglesHitGroup,
                any_hit: id,
                ..Default::default()
            },
            ShaderKind::Intersection => Self {
                group_type: RayTracingShaderGroupType::ProceduralHitGroup,
                intersection: id,
                ..Default::default()
            },
            _ => return None,
        };
        Some(group)
    }
}

#[derive(Debug)]
pub struct RayTracingPipelineDesc<B: Backend> {
    pub program: Handle<B::Program>,
    pub layout: Handle<B::BindingSetLayout>,
    pub groups: Vec<RayTracingShaderGroup>,
}

impl_backend_key!(RayTracingPipelineDesc { program, layout, groups });

/// One region of the shader binding table.
#[derive(Debug)]
pub struct RayTracingShaderTable<B: Backend> {
    pub resource: Option<Arc<B::Resource>>,
    pub offset: u64,
    pub size: u64,
    pub stride: u64,
}

impl_backend_clone!(RayTracingShaderTable { resource, offset, size, stride });

impl<B: Backend> Default for RayTracingShaderTable<B> {
    fn default() -> Self {
        Self { resource: None, offset: 0, size: 0, stride: 0 }
    }
}

#[derive(Debug)]
pub struct RayTracingShaderTables<B: Backend> {
    pub raygen: RayTracingShaderTable<B>,
    pub miss: RayTracingShaderTable<B>,
    pub hit: RayTracingShaderTable<B>,
    pub callable: RayTracingShaderTable<B>,
}

impl_backend_clone!(RayTracingShaderTables { raygen, miss, hit, callable });

impl<B: Backend> Default for RayTracingShaderTables<B> {
    fn default() -> Self {
        Self {
            raygen: RayTracingShaderTable::default(),
            miss: RayTracingShaderTable::default(),
            hit: RayTracingShaderTable::default(),
            callable: RayTracingShaderTable::default(),
        }
    }
}

impl<B: Backend> RayTracingShaderTables<B> {
    pub fn get(&self, kind: ShaderTableKind) -> &RayTracingShaderTable<B> {
        match kind {
            ShaderTableKind::RayGeneration => &self.raygen,
            ShaderTableKind::Miss => &self.miss,
            ShaderTableKind::Callable => &self.callable,
            ShaderTableKind::Hit => &self.hit,
        }
    }

    pub fn get_mut(&mut self, kind: ShaderTableKind) -> &mut RayTracingShaderTable<B> {
        match kind {
            ShaderTableKind::RayGeneration => &mut self.raygen,
            ShaderTableKind::Miss => &mut self.miss,
            ShaderTableKind::Callable => &mut self.callable,
            ShaderTableKind::Hit => &mut self.hit,
        }
    }

    /// Regions in table layout order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RayTracingShaderTable<B>> {
        [&mut self.raygen, &mut self.miss, &mut self.callable, &mut self.hit].into_iter()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RaytracingGeometryFlags {
    #[default]
    None,
    Opaque,
    NoDuplicateAnyHitInvocation,
}

#[derive(Debug)]
pub struct RaytracingGeometryBuffer<B: Backend> {
    pub resource: Option<Arc<B::Resource>>,
    pub format: Format,
    pub count: u32,
    pub offset: u64,
}

impl_backend_clone!(RaytracingGeometryBuffer { resource, format, count, offset });

impl<B: Backend> Default for RaytracingGeometryBuffer<B> {
    fn default() -> Self {
        Self { resource: None, format: Format::Undefined, count: 0, offset: 0 }
    }
}

#[derive(Debug)]
pub struct RaytracingGeometryDesc<B: Backend> {
    pub vertex: RaytracingGeometryBuffer<B>,
    pub index: RaytracingGeometryBuffer<B>,
    pub flags: RaytracingGeometryFlags,
}

impl_backend_clone!(RaytracingGeometryDesc { vertex, index, flags });

impl<B: Backend> RaytracingGeometryDesc<B> {
    pub fn triangles(vertex: &Arc<B::Resource>, vertex_format: Format, vertex_count: u32) -> Self {
        Self {
            vertex: RaytracingGeometryBuffer {
                resource: Some(vertex.clone()),
                format: vertex_format,
                count: vertex_count,
                offset: 0,
            },
            index: RaytracingGeometryBuffer::default(),
            flags: RaytracingGeometryFlags::Opaque,
        }
    }

    #[inline]
    pub fn with_index(mut self, index: &Arc<B::Resource>, index_format: Format, index_count: u32) -> Self {
        self.index = RaytracingGeometryBuffer {
            resource: Some(index.clone()),
            format: index_format,
            count: index_count,
            offset: 0,
        };
        self
    }
}

#[bitflags]
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildAccelerationStructureFlag {
    AllowUpdate = 1 << 0,
    AllowCompaction = 1 << 1,
    PreferFastTrace = 1 << 2,
    PreferFastBuild = 1 << 3,
    MinimizeMemory = 1 << 4,
}

pub type BuildAccelerationStructureFlags = BitFlags<BuildAccelerationStructureFlag>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CopyAccelerationStructureMode {
    #[default]
    Clone,
    Compact,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RaytracingASPrebuildInfo {
    pub acceleration_structure_size: u64,
    pub build_scratch_data_size: u64,
    pub update_scratch_data_size: u64,
}

/// Top-level acceleration structure instance in the layout the GPU consumes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RaytracingGeometryInstance {
    /// Row-major 3x4 object-to-world transform.
    pub transform: [[f32; 4]; 3],
    /// Instance id in the low 24 bits, visibility mask in the high 8.
    pub instance_id_and_mask: u32,
    /// Hit group offset in the low 24 bits, instance flags in the high 8.
    pub instance_offset_and_flags: u32,
    pub acceleration_structure_handle: u64,
}

impl RaytracingGeometryInstance {
    pub fn new(transform: &Mat4, instance_id: u32, instance_mask: u8, acceleration_structure_handle: u64) -> Self {
        let rows = transform.transpose().to_cols_array_2d();
        Self {
            transform: [rows[0], rows[1], rows[2]],
            instance_id_and_mask: (instance_id & 0x00ff_ffff) | (u32::from(instance_mask) << 24),
            instance_offset_and_flags: 0,
            acceleration_structure_handle,
        }
    }

    #[inline]
    pub fn instance_id(&self) -> u32 {
        self.instance_id_and_mask & 0x00ff_ffff
    }

    #[inline]
    pub fn instance_mask(&self) -> u8 {
        (self.instance_id_and_mask >> 24) as u8
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Offset3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferCopyRegion {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub num_bytes: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferToTextureCopyRegion {
    pub buffer_offset: u64,
    pub buffer_row_pitch: u64,
    pub texture_mip_level: u32,
    pub texture_array_layer: u32,
    pub texture_offset: Offset3D,
    pub texture_extent: Extent3D,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureCopyRegion {
    pub extent: Extent3D,
    pub src_mip_level: u32,
    pub src_array_layer: u32,
    pub src_offset: Offset3D,
    pub dst_mip_level: u32,
    pub dst_array_layer: u32,
    pub dst_offset: Offset3D,
}

/// Source and destination pitches of a host-side texture upload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureDataLayout {
    pub dst_row_pitch: u64,
    pub dst_depth_pitch: u64,
    pub src_row_pitch: u64,
    pub src_depth_pitch: u64,
    pub num_rows: u64,
    pub num_slices: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CommandListType {
    #[default]
    Graphics,
    Compute,
    Copy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShadingRate {
    #[default]
    Rate1x1,
    Rate1x2,
    Rate2x1,
    Rate2x2,
    Rate2x4,
    Rate4x2,
    Rate4x4,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShadingRateCombiner {
    #[default]
    Passthrough,
    Override,
    Min,
    Max,
    Sum,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_descriptor_is_64_bytes() {
        assert_eq!(std::mem::size_of::<RaytracingGeometryInstance>(), 64);
    }

    #[test]
    fn instance_transform_is_row_major() {
        let transform = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let instance = RaytracingGeometryInstance::new(&transform, 7, 0xff, 42);

        assert_eq!(instance.transform[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(instance.transform[1], [0.0, 1.0, 0.0, 2.0]);
        assert_eq!(instance.transform[2], [0.0, 0.0, 1.0, 3.0]);
        assert_eq!(instance.instance_id(), 7);
        assert_eq!(instance.instance_mask(), 0xff);
        assert_eq!(instance.acceleration_structure_handle, 42);
    }

    #[test]
    fn texture_builder_defaults() {
        let desc = TextureDescBuilder::default()
            .name("gbuffer")
            .format(Format::R8G8B8A8Unorm)
            .width(64)
            .bind_flags(BindFlag::RenderTarget | BindFlag::ShaderResource)
            .build()
            .unwrap();

        assert_eq!(desc.height, 1);
        assert_eq!(desc.mip_levels, 1);
        assert_eq!(desc.memory_type, MemoryType::Default);
        assert!(desc.bind_flags.contains(BindFlag::ShaderResource));

        let resource = ResourceDesc::from_texture(&desc);
        assert_eq!(resource.level_count(), 1);
        assert_eq!(resource.mip_width(3), 8);
    }

    #[test]
    fn texture_builder_requires_format() {
        assert!(TextureDescBuilder::default().width(4).build().is_err());
    }

    #[test]
    fn shader_groups_follow_entry_kind() {
        let hit = RayTracingShaderGroup::for_entry_point(ShaderKind::ClosestHit, 3).unwrap();
        assert_eq!(hit.group_type, RayTracingShaderGroupType::TrianglesHitGroup);
        assert_eq!(hit.closest_hit, 3);
        assert!(RayTracingShaderGroup::for_entry_point(ShaderKind::Pixel, 0).is_none());
        assert_eq!(ShaderKind::Intersection.shader_table_kind(), Some(ShaderTableKind::Hit));
    }
}
