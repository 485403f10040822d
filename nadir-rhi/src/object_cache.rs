//! Memoization of pipelines, render passes, framebuffers, binding sets and views.

use std::sync::Arc;
use std::hash::Hash;
use anyhow::{Context, Result};
use derive_more::From;
use nadir_core::collections::hashmap::{EntryRef, HashMap};
use nadir_core::log;
use crate::backend::{Backend, Device, Program, Resource, Shader, View};
use crate::handle::Handle;
use crate::types::*;
use crate::utility::impl_backend_key;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectCacheStats {
    pub graphics_pipeline_count: usize,
    pub compute_pipeline_count: usize,
    pub ray_tracing_pipeline_count: usize,
    pub render_pass_count: usize,
    pub framebuffer_count: usize,
    pub binding_set_layout_count: usize,
    pub binding_set_count: usize,
    pub view_count: usize,
}

/// Any of the three pipeline descriptions.
#[derive(Debug, From)]
pub enum PipelineDesc<B: Backend> {
    Graphics(GraphicsPipelineDesc<B>),
    Compute(ComputePipelineDesc<B>),
    RayTracing(RayTracingPipelineDesc<B>),
}

impl<B: Backend> Clone for PipelineDesc<B> {
    fn clone(&self) -> Self {
        match self {
            PipelineDesc::Graphics(desc) => PipelineDesc::Graphics(desc.clone()),
            PipelineDesc::Compute(desc) => PipelineDesc::Compute(desc.clone()),
            PipelineDesc::RayTracing(desc) => PipelineDesc::RayTracing(desc.clone()),
        }
    }
}

#[derive(Debug)]
struct BindingSetKey<B: Backend> {
    layout: Handle<B::BindingSetLayout>,
    bindings: Vec<BindingDesc<B>>,
}

impl_backend_key!(BindingSetKey { layout, bindings });

#[derive(Debug)]
struct ViewKey<B: Backend> {
    program: Option<Handle<B::Program>>,
    bind_key: BindKey,
    resource: Option<Handle<B::Resource>>,
    view_desc: LazyViewDesc,
}

impl_backend_key!(ViewKey { program, bind_key, resource, view_desc });

/// Long-lived cache of device objects keyed by their structural description.
///
/// Outlives command list resets; a description that compares equal always yields the
/// same object, except for framebuffers and views that touch a back buffer. Keys hold
/// strong handles, so every resource, view and program a cached object was built from
/// stays alive until [`clear`](Self::clear).
pub struct ObjectCache<B: Backend> {
    device: Arc<B::Device>,
    graphics_pipelines: HashMap<GraphicsPipelineDesc<B>, Arc<B::Pipeline>>,
    compute_pipelines: HashMap<ComputePipelineDesc<B>, Arc<B::Pipeline>>,
    ray_tracing_pipelines: HashMap<RayTracingPipelineDesc<B>, Arc<B::Pipeline>>,
    render_passes: HashMap<RenderPassDesc, Arc<B::RenderPass>>,
    framebuffers: HashMap<FramebufferDesc<B>, Arc<B::Framebuffer>>,
    binding_set_layouts: HashMap<Vec<BindKey>, Arc<B::BindingSetLayout>>,
    binding_sets: HashMap<BindingSetKey<B>, Arc<B::BindingSet>>,
    views: HashMap<ViewKey<B>, Arc<B::View>>,
}

fn get_or_create<K, V>(cache: &mut HashMap<K, Arc<V>>, key: &K, kind: &str, create: impl FnOnce() -> Result<Arc<V>>) -> Result<Arc<V>>
where
    K: Eq + Hash + Clone,
    V: ?Sized,
{
    if let Some(cached) = cache.get(key) {
        return Ok(cached.clone());
    }

    let object = create().with_context(|| format!("failed to create {kind}"))?;
    cache.insert(key.clone(), object.clone());
    log::debug!("object cache: created {kind} ({} cached)", cache.len());
    Ok(object)
}

impl<B: Backend> ObjectCache<B> {
    pub fn new(device: Arc<B::Device>) -> Self {
        Self {
            device,
            graphics_pipelines: HashMap::default(),
            compute_pipelines: HashMap::default(),
            ray_tracing_pipelines: HashMap::default(),
            render_passes: HashMap::default(),
            framebuffers: HashMap::default(),
            binding_set_layouts: HashMap::default(),
            binding_sets: HashMap::default(),
            views: HashMap::default(),
        }
    }

    #[inline]
    pub fn device(&self) -> &Arc<B::Device> {
        &self.device
    }

    pub fn get_pipeline(&mut self, desc: &PipelineDesc<B>) -> Result<Arc<B::Pipeline>> {
        match desc {
            PipelineDesc::Graphics(desc) => self.get_graphics_pipeline(desc),
            PipelineDesc::Compute(desc) => self.get_compute_pipeline(desc),
            PipelineDesc::RayTracing(desc) => self.get_ray_tracing_pipeline(desc),
        }
    }

    pub fn get_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc<B>) -> Result<Arc<B::Pipeline>> {
        get_or_create(&mut self.graphics_pipelines, desc, "graphics pipeline", || {
            self.device.create_graphics_pipeline(desc)
        })
    }

    pub fn get_compute_pipeline(&mut self, desc: &ComputePipelineDesc<B>) -> Result<Arc<B::Pipeline>> {
        get_or_create(&mut self.compute_pipelines, desc, "compute pipeline", || {
            self.device.create_compute_pipeline(desc)
        })
    }

    pub fn get_ray_tracing_pipeline(&mut self, desc: &RayTracingPipelineDesc<B>) -> Result<Arc<B::Pipeline>> {
        get_or_create(&mut self.ray_tracing_pipelines, desc, "ray tracing pipeline", || {
            self.device.create_ray_tracing_pipeline(desc)
        })
    }

    pub fn get_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<B::RenderPass>> {
        get_or_create(&mut self.render_passes, desc, "render pass", || self.device.create_render_pass(desc))
    }

    /// Framebuffers over a back buffer are recreated every time, since the swapchain
    /// image behind the view changes from frame to frame.
    pub fn get_framebuffer(&mut self, desc: &FramebufferDesc<B>) -> Result<Arc<B::Framebuffer>> {
        let touches_back_buffer = desc
            .colors
            .iter()
            .flatten()
            .chain(desc.depth_stencil.iter())
            .any(|view| view.resource().is_some_and(|resource| resource.desc().is_back_buffer));
        if touches_back_buffer {
            log::trace!("object cache: back buffer framebuffer {}x{} bypasses the cache", desc.width, desc.height);
            return self.device.create_framebuffer(desc).context("failed to create back buffer framebuffer");
        }

        get_or_create(&mut self.framebuffers, desc, "framebuffer", || self.device.create_framebuffer(desc))
    }

    pub fn get_binding_set_layout(&mut self, bind_keys: &[BindKey]) -> Result<Arc<B::BindingSetLayout>> {
        match self.binding_set_layouts.entry_ref(bind_keys) {
            EntryRef::Occupied(entry) => Ok(entry.get().clone()),
            EntryRef::Vacant(entry) => {
                let layout = self
                    .device
                    .create_binding_set_layout(bind_keys)
                    .context("failed to create binding set layout")?;
                log::debug!("object cache: created binding set layout with {} bindings", bind_keys.len());
                Ok(entry.insert(layout).clone())
            }
        }
    }

    pub fn get_binding_set(&mut self, layout: &Arc<B::BindingSetLayout>, bindings: &[BindingDesc<B>]) -> Result<Arc<B::BindingSet>> {
        let key = BindingSetKey {
            layout: Handle::from(layout),
            bindings: bindings.to_vec(),
        };
        get_or_create(&mut self.binding_sets, &key, "binding set", || {
            self.device.create_binding_set(layout, bindings)
        })
    }

    /// Resolve the view `program` expects at `bind_key` over `resource`.
    ///
    /// Shader-visible views take their dimension, stride and plane from the program's
    /// reflection; attachments derive theirs from the resource shape and are shared
    /// across programs.
    ///
    /// # Panics
    ///
    /// Panics when `bind_key` is a shader binding and `program` does not declare it.
    #[profiling::function]
    pub fn get_view(
        &mut self,
        program: Option<&Arc<B::Program>>,
        bind_key: &BindKey,
        resource: Option<&Arc<B::Resource>>,
        view_desc: &LazyViewDesc,
    ) -> Result<Arc<B::View>> {
        let key = ViewKey {
            program: program.filter(|_| !bind_key.view_type.is_attachment()).map(Handle::from),
            bind_key: *bind_key,
            resource: resource.map(Handle::from),
            view_desc: *view_desc,
        };
        if let Some(cached) = self.views.get(&key) {
            return Ok(cached.clone());
        }

        let desc = build_view_desc::<B>(program, bind_key, resource, view_desc);
        let view = self
            .device
            .create_view(resource, &desc)
            .with_context(|| format!("failed to create {:?} view for {:?}", bind_key.view_type, bind_key))?;

        if resource.is_some_and(|resource| resource.desc().is_back_buffer) {
            log::trace!("object cache: back buffer view at {bind_key:?} is not cached");
        } else {
            self.views.insert(key, view.clone());
        }
        Ok(view)
    }

    pub fn stats(&self) -> ObjectCacheStats {
        ObjectCacheStats {
            graphics_pipeline_count: self.graphics_pipelines.len(),
            compute_pipeline_count: self.compute_pipelines.len(),
            ray_tracing_pipeline_count: self.ray_tracing_pipelines.len(),
            render_pass_count: self.render_passes.len(),
            framebuffer_count: self.framebuffers.len(),
            binding_set_layout_count: self.binding_set_layouts.len(),
            binding_set_count: self.binding_sets.len(),
            view_count: self.views.len(),
        }
    }

    /// Drop every cached object.
    pub fn clear(&mut self) {
        self.graphics_pipelines.clear();
        self.compute_pipelines.clear();
        self.ray_tracing_pipelines.clear();
        self.render_passes.clear();
        self.framebuffers.clear();
        self.binding_set_layouts.clear();
        self.binding_sets.clear();
        self.views.clear();
    }
}

fn build_view_desc<B: Backend>(
    program: Option<&Arc<B::Program>>,
    bind_key: &BindKey,
    resource: Option<&Arc<B::Resource>>,
    view_desc: &LazyViewDesc,
) -> ViewDesc {
    if let Some(resource) = resource {
        let resource = resource.desc();
        assert!(
            view_desc.level < resource.level_count(),
            "view of `{}` starts at mip {} but it has {} mips",
            resource.name,
            view_desc.level,
            resource.level_count()
        );
    }

    let mut desc = ViewDesc {
        view_type: bind_key.view_type,
        base_mip_level: view_desc.level,
        level_count: view_desc.count,
        buffer_format: view_desc.buffer_format,
        ..Default::default()
    };

    match bind_key.view_type {
        view_type if view_type.is_attachment() => {
            desc.dimension = resource.map_or(ViewDimension::Texture2D, |resource| attachment_dimension(resource.desc()));
        }
        _ => {
            let binding = program
                .and_then(|program| program.shader(bind_key.shader_type))
                .and_then(|shader| shader.resource_binding(bind_key))
                .unwrap_or_else(|| panic!("no shader binding matches {bind_key:?}; attach targets a slot the program does not declare"));
            desc.dimension = binding.dimension;
            desc.structure_stride = binding.structure_stride;
            desc.plane_slice = plane_slice(resource.map(|resource| resource.desc()), bind_key.view_type, binding.return_type);
        }
    }
    desc
}

/// Depth-stencil textures read as `uint` address the stencil plane.
fn plane_slice(resource: Option<&ResourceDesc>, view_type: ViewType, return_type: ReturnType) -> u32 {
    let Some(resource) = resource else {
        return 0;
    };
    if view_type != ViewType::Texture {
        return 0;
    }
    if (resource.format.is_depth() || resource.format.is_stencil()) && return_type == ReturnType::Uint {
        return 1;
    }
    0
}

fn attachment_dimension(resource: &ResourceDesc) -> ViewDimension {
    match (resource.sample_count > 1, resource.layer_count() > 1) {
        (true, true) => ViewDimension::Texture2DMSArray,
        (true, false) => ViewDimension::Texture2DMS,
        (false, true) => ViewDimension::Texture2DArray,
        (false, false) => ViewDimension::Texture2D,
    }
}
