//! Per-submission recording facade over a native command list.
//!
//! [`CommandListBox`] owns everything a single submission needs: the pipeline description
//! being assembled, bound views, per-resource state trackers and the transient resources
//! (staging buffers, scratch memory, shader tables) that must outlive GPU execution.

mod acceleration;
mod transfer;

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::mem;
use std::rc::Rc;
use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use nadir_core::collections::hashmap::HashMap;
use nadir_core::log;
use crate::backend::{Backend, CommandList, Device, Pipeline, Program, Resource, Shader, View};
use crate::barrier::{LazyResourceBarrierDesc, ResourceBarrierDesc};
use crate::deferred::{DeferredView, ResolvedView};
use crate::format::Format;
use crate::handle::Handle;
use crate::object_cache::{ObjectCache, PipelineDesc};
use crate::state_tracker::ResourceStateTracker;
use crate::types::*;
use crate::utility::{impl_backend_clone, subresources};

/// Fixed-function state folded into the graphics pipeline description.
#[derive(Debug)]
struct GraphicsState<B: Backend> {
    input: Vec<InputLayoutDesc>,
    render_pass: Option<Handle<B::RenderPass>>,
    depth_stencil: DepthStencilDesc,
    blend: BlendDesc,
    rasterizer: RasterizerDesc,
}

impl_backend_clone!(GraphicsState { input, render_pass, depth_stencil, blend, rasterizer });

impl<B: Backend> Default for GraphicsState<B> {
    fn default() -> Self {
        Self {
            input: Vec::new(),
            render_pass: None,
            depth_stencil: DepthStencilDesc::default(),
            blend: BlendDesc::default(),
            rasterizer: RasterizerDesc::default(),
        }
    }
}

pub struct CommandListBox<B: Backend> {
    device: Arc<B::Device>,
    object_cache: Rc<RefCell<ObjectCache<B>>>,
    command_list: B::CommandList,
    list_type: CommandListType,
    closed: bool,

    program: Option<Arc<B::Program>>,
    layout: Option<Arc<B::BindingSetLayout>>,
    pipeline_type: PipelineType,
    pipeline: Option<Arc<B::Pipeline>>,
    graphics_state: GraphicsState<B>,
    ray_tracing_groups: Vec<(ShaderTableKind, RayTracingShaderGroup)>,
    shader_tables: RayTracingShaderTables<B>,

    bound_resources: BTreeMap<BindKey, Arc<B::View>>,
    bound_deferred_views: BTreeMap<BindKey, Rc<dyn DeferredView<B>>>,
    resolved_deferred_views: Vec<(Rc<dyn DeferredView<B>>, ResolvedView<B>)>,
    binding_sets: Vec<Arc<B::BindingSet>>,
    framebuffers: Vec<Arc<B::Framebuffer>>,
    cmd_resources: Vec<Arc<B::Resource>>,

    state_trackers: HashMap<Handle<B::Resource>, ResourceStateTracker>,
    lazy_barriers: Vec<LazyResourceBarrierDesc<B>>,
    pending_barriers: Vec<ResourceBarrierDesc<B>>,

    viewport_width: f32,
    viewport_height: f32,
    shading_rate_image: Option<Arc<B::View>>,
    shading_rate_combiner: ShadingRateCombiner,
}

impl<B: Backend> CommandListBox<B> {
    pub fn new(device: Arc<B::Device>, object_cache: Rc<RefCell<ObjectCache<B>>>, list_type: CommandListType) -> Result<Self> {
        let command_list = device
            .create_command_list(list_type)
            .with_context(|| format!("failed to create {list_type:?} command list"))?;

        Ok(Self {
            device,
            object_cache,
            command_list,
            list_type,
            closed: false,
            program: None,
            layout: None,
            pipeline_type: PipelineType::Graphics,
            pipeline: None,
            graphics_state: GraphicsState::default(),
            ray_tracing_groups: Vec::new(),
            shader_tables: RayTracingShaderTables::default(),
            bound_resources: BTreeMap::new(),
            bound_deferred_views: BTreeMap::new(),
            resolved_deferred_views: Vec::new(),
            binding_sets: Vec::new(),
            framebuffers: Vec::new(),
            cmd_resources: Vec::new(),
            state_trackers: HashMap::default(),
            lazy_barriers: Vec::new(),
            pending_barriers: Vec::new(),
            viewport_width: 0.0,
            viewport_height: 0.0,
            shading_rate_image: None,
            shading_rate_combiner: ShadingRateCombiner::Passthrough,
        })
    }

    #[inline]
    pub fn device(&self) -> &Arc<B::Device> {
        &self.device
    }

    #[inline]
    pub fn object_cache(&self) -> Ref<'_, ObjectCache<B>> {
        self.object_cache.borrow()
    }

    #[inline]
    pub fn object_cache_mut(&self) -> RefMut<'_, ObjectCache<B>> {
        self.object_cache.borrow_mut()
    }

    #[inline]
    pub fn command_list(&self) -> &B::CommandList {
        &self.command_list
    }

    #[inline]
    pub fn list_type(&self) -> CommandListType {
        self.list_type
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Barriers whose before-state was unknown while recording; resolved at submission.
    #[inline]
    pub fn lazy_barriers(&self) -> &[LazyResourceBarrierDesc<B>] {
        &self.lazy_barriers
    }

    #[inline]
    pub fn resource_state_trackers(&self) -> &HashMap<Handle<B::Resource>, ResourceStateTracker> {
        &self.state_trackers
    }

    pub fn resource_state_tracker(&self, resource: &Arc<B::Resource>) -> Option<&ResourceStateTracker> {
        self.state_trackers.get(&Handle::from(resource))
    }

    /// Resources kept alive until this list is reset: staging, scratch, instance data, shader tables.
    #[inline]
    pub fn cmd_resources(&self) -> &[Arc<B::Resource>] {
        &self.cmd_resources
    }

    /// Drop all per-submission state and reopen the native list for recording.
    ///
    /// Resolved deferred views are released first; the object cache is left untouched.
    pub fn reset(&mut self) -> Result<()> {
        for (deferred_view, resolved) in self.resolved_deferred_views.drain(..) {
            deferred_view.release(&resolved);
        }

        self.program = None;
        self.layout = None;
        self.pipeline_type = PipelineType::Graphics;
        self.pipeline = None;
        self.graphics_state = GraphicsState::default();
        self.ray_tracing_groups.clear();
        self.shader_tables = RayTracingShaderTables::default();

        self.bound_resources.clear();
        self.bound_deferred_views.clear();
        self.binding_sets.clear();
        self.framebuffers.clear();
        self.cmd_resources.clear();

        self.state_trackers.clear();
        self.lazy_barriers.clear();
        self.pending_barriers.clear();

        self.viewport_width = 0.0;
        self.viewport_height = 0.0;
        self.shading_rate_image = None;
        self.shading_rate_combiner = ShadingRateCombiner::Passthrough;

        self.command_list.reset().context("failed to reset command list")?;
        self.closed = false;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.assert_recording();
        self.flush_barriers();
        self.command_list.close().context("failed to close command list")?;
        self.closed = true;
        Ok(())
    }

    /// Select the program the following draws, dispatches or ray dispatches use.
    ///
    /// The pipeline kind follows the shaders: any compute shader makes a compute
    /// pipeline, a library shader a ray tracing pipeline, anything else a graphics one.
    /// The pipeline description starts over from defaults, so fixed-function state and
    /// the render pass must be set again afterwards. Bound views and deferred views are dropped.
    pub fn use_program(&mut self, program: &Arc<B::Program>) -> Result<()> {
        self.assert_recording();
        let layout = self.object_cache.borrow_mut().get_binding_set_layout(program.bindings())?;

        self.pipeline_type = if program.has_shader(ShaderType::Compute) {
            PipelineType::Compute
        } else if program.has_shader(ShaderType::Library) {
            PipelineType::RayTracing
        } else {
            PipelineType::Graphics
        };

        self.graphics_state = GraphicsState::default();
        self.ray_tracing_groups.clear();
        self.shader_tables = RayTracingShaderTables::default();
        self.pipeline = None;
        match self.pipeline_type {
            PipelineType::Graphics => {
                if let Some(vertex_shader) = program.shader(ShaderType::Vertex) {
                    self.graphics_state.input = vertex_shader.input_layouts().to_vec();
                }
            }
            PipelineType::RayTracing => self.collect_shader_groups(program),
            PipelineType::Compute => {}
        }

        self.program = Some(program.clone());
        self.layout = Some(layout);
        self.bound_resources.clear();
        self.bound_deferred_views.clear();
        Ok(())
    }

    fn collect_shader_groups(&mut self, program: &Arc<B::Program>) {
        let alignment = u64::from(self.device.shader_table_alignment());
        for shader in program.shaders() {
            for entry_point in shader.entry_points() {
                let Some(table_kind) = entry_point.kind.shader_table_kind() else {
                    continue;
                };
                let Some(group) = RayTracingShaderGroup::for_entry_point(entry_point.kind, shader.group_id(&entry_point.name)) else {
                    continue;
                };
                self.ray_tracing_groups.push((table_kind, group));
                self.shader_tables.get_mut(table_kind).size += alignment;
            }
        }
    }

    /// Bind `resource` at `bind_key` through a view derived from the current program.
    ///
    /// # Panics
    ///
    /// Panics when the current program does not declare `bind_key`.
    pub fn attach_resource(&mut self, bind_key: BindKey, resource: Option<&Arc<B::Resource>>, view_desc: &LazyViewDesc) -> Result<()> {
        self.assert_recording();
        let view = self
            .object_cache
            .borrow_mut()
            .get_view(self.program.as_ref(), &bind_key, resource, view_desc)?;
        self.attach_view(bind_key, view);
        Ok(())
    }

    /// Bind a view resolved only when the next draw or dispatch is recorded.
    pub fn attach_deferred(&mut self, bind_key: BindKey, view: Rc<dyn DeferredView<B>>) {
        self.assert_recording();
        self.bound_resources.remove(&bind_key);
        self.bound_deferred_views.insert(bind_key, view);
    }

    /// Bind an existing view and transition its range for the stage reading it.
    ///
    /// # Panics
    ///
    /// Panics for render target and depth stencil keys, which bind through
    /// [`begin_render_pass`](Self::begin_render_pass).
    pub fn attach_view(&mut self, bind_key: BindKey, view: Arc<B::View>) {
        self.assert_recording();
        if let Some(state) = implied_state(&bind_key) {
            self.view_barrier(&view, state);
        }
        self.bound_deferred_views.remove(&bind_key);
        self.bound_resources.insert(bind_key, view);
    }

    #[inline]
    pub fn set_rasterize_state(&mut self, desc: RasterizerDesc) {
        self.graphics_state.rasterizer = desc;
    }

    #[inline]
    pub fn set_blend_state(&mut self, desc: BlendDesc) {
        self.graphics_state.blend = desc;
    }

    #[inline]
    pub fn set_depth_stencil_state(&mut self, desc: DepthStencilDesc) {
        self.graphics_state.depth_stencil = desc;
    }

    pub fn begin_event(&mut self, name: &str) {
        self.assert_recording();
        self.command_list.begin_event(name);
    }

    pub fn end_event(&mut self) {
        self.assert_recording();
        self.command_list.end_event();
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()> {
        self.apply()?;
        self.command_list.draw(vertex_count, instance_count, first_vertex, first_instance);
        Ok(())
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.apply()?;
        self.command_list.draw_indexed(index_count, instance_count, first_index, vertex_offset, first_instance);
        Ok(())
    }

    pub fn draw_indirect(&mut self, argument_buffer: &Arc<B::Resource>, argument_buffer_offset: u64) -> Result<()> {
        self.apply()?;
        self.indirect_barrier(argument_buffer, None);
        self.command_list.draw_indirect(argument_buffer, argument_buffer_offset);
        Ok(())
    }

    pub fn draw_indexed_indirect(&mut self, argument_buffer: &Arc<B::Resource>, argument_buffer_offset: u64) -> Result<()> {
        self.apply()?;
        self.indirect_barrier(argument_buffer, None);
        self.command_list.draw_indexed_indirect(argument_buffer, argument_buffer_offset);
        Ok(())
    }

    pub fn draw_indirect_count(
        &mut self,
        argument_buffer: &Arc<B::Resource>,
        argument_buffer_offset: u64,
        count_buffer: &Arc<B::Resource>,
        count_buffer_offset: u64,
        max_draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.apply()?;
        self.indirect_barrier(argument_buffer, Some(count_buffer));
        self.command_list.draw_indirect_count(
            argument_buffer,
            argument_buffer_offset,
            count_buffer,
            count_buffer_offset,
            max_draw_count,
            stride,
        );
        Ok(())
    }

    pub fn draw_indexed_indirect_count(
        &mut self,
        argument_buffer: &Arc<B::Resource>,
        argument_buffer_offset: u64,
        count_buffer: &Arc<B::Resource>,
        count_buffer_offset: u64,
        max_draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.apply()?;
        self.indirect_barrier(argument_buffer, Some(count_buffer));
        self.command_list.draw_indexed_indirect_count(
            argument_buffer,
            argument_buffer_offset,
            count_buffer,
            count_buffer_offset,
            max_draw_count,
            stride,
        );
        Ok(())
    }

    pub fn dispatch(&mut self, thread_group_count_x: u32, thread_group_count_y: u32, thread_group_count_z: u32) -> Result<()> {
        self.apply()?;
        self.command_list.dispatch(thread_group_count_x, thread_group_count_y, thread_group_count_z);
        Ok(())
    }

    pub fn dispatch_indirect(&mut self, argument_buffer: &Arc<B::Resource>, argument_buffer_offset: u64) -> Result<()> {
        self.apply()?;
        self.indirect_barrier(argument_buffer, None);
        self.command_list.dispatch_indirect(argument_buffer, argument_buffer_offset);
        Ok(())
    }

    pub fn dispatch_mesh(&mut self, thread_group_count_x: u32) -> Result<()> {
        self.apply()?;
        self.command_list.dispatch_mesh(thread_group_count_x);
        Ok(())
    }

    pub fn dispatch_rays(&mut self, width: u32, height: u32, depth: u32) -> Result<()> {
        self.apply()?;
        self.command_list.dispatch_rays(&self.shader_tables, width, height, depth);
        Ok(())
    }

    /// Begin a render pass over the given attachments.
    ///
    /// The render pass and framebuffer come from the object cache; attachments are
    /// transitioned to `RenderTarget` and `DepthStencilWrite`. The framebuffer takes the
    /// current viewport size, or the first attachment's extent when no viewport is set.
    #[profiling::function]
    pub fn begin_render_pass(&mut self, desc: &RenderPassBeginDesc<B>) -> Result<()> {
        self.assert_recording();
        let program = self.program.clone();

        let mut render_pass_desc = RenderPassDesc::default();
        let mut clear_desc = ClearDesc {
            colors: Vec::with_capacity(desc.colors.len()),
            depth: desc.depth_stencil.clear_depth,
            stencil: desc.depth_stencil.clear_stencil,
        };

        let mut color_views = Vec::with_capacity(desc.colors.len());
        for (slot, color) in desc.colors.iter().enumerate() {
            clear_desc.colors.push(color.clear_color);
            let Some(texture) = color.texture.as_ref() else {
                render_pass_desc.colors.push(RenderPassColorDesc::default());
                color_views.push(None);
                continue;
            };

            render_pass_desc.colors.push(RenderPassColorDesc {
                format: texture.desc().format,
                load_op: color.load_op,
                store_op: color.store_op,
            });
            render_pass_desc.sample_count = texture.desc().sample_count;

            let bind_key = BindKey::new(ShaderType::Pixel, ViewType::RenderTarget, slot as u32, 0);
            let view = self
                .object_cache
                .borrow_mut()
                .get_view(program.as_ref(), &bind_key, Some(texture), &color.view_desc)?;
            self.view_barrier(&view, ResourceState::RenderTarget);
            color_views.push(Some(view));
        }

        let mut depth_stencil_view = None;
        if let Some(texture) = desc.depth_stencil.texture.as_ref() {
            render_pass_desc.depth_stencil = RenderPassDepthStencilDesc {
                format: texture.desc().format,
                depth_load_op: desc.depth_stencil.depth_load_op,
                depth_store_op: desc.depth_stencil.depth_store_op,
                stencil_load_op: desc.depth_stencil.stencil_load_op,
                stencil_store_op: desc.depth_stencil.stencil_store_op,
            };
            render_pass_desc.sample_count = texture.desc().sample_count;

            let bind_key = BindKey::new(ShaderType::Pixel, ViewType::DepthStencil, 0, 0);
            let view = self
                .object_cache
                .borrow_mut()
                .get_view(program.as_ref(), &bind_key, Some(texture), &desc.depth_stencil.view_desc)?;
            self.view_barrier(&view, ResourceState::DepthStencilWrite);
            depth_stencil_view = Some(view);
        }

        let shading_rate_image = self.shading_rate_image.clone();
        render_pass_desc.shading_rate_format = shading_rate_image
            .as_ref()
            .and_then(|view| view.resource())
            .map_or(Format::Undefined, |resource| resource.desc().format);

        let render_pass = self.object_cache.borrow_mut().get_render_pass(&render_pass_desc)?;
        self.graphics_state.render_pass = Some(Handle::from(&render_pass));

        let (width, height) = self.framebuffer_extent(&color_views, depth_stencil_view.as_ref());
        let framebuffer_desc = FramebufferDesc {
            render_pass: Handle::from(&render_pass),
            width,
            height,
            colors: color_views.iter().map(|view| view.as_ref().map(Handle::from)).collect(),
            depth_stencil: depth_stencil_view.as_ref().map(Handle::from),
            shading_rate_image: shading_rate_image.as_ref().map(Handle::from),
        };
        let framebuffer = self.object_cache.borrow_mut().get_framebuffer(&framebuffer_desc)?;

        let combiners = [
            ShadingRateCombiner::Passthrough,
            if shading_rate_image.is_some() { ShadingRateCombiner::Override } else { ShadingRateCombiner::Passthrough },
        ];
        if combiners[1] != self.shading_rate_combiner {
            self.shading_rate_combiner = combiners[1];
            self.flush_barriers();
            self.command_list.rs_set_shading_rate(ShadingRate::Rate1x1, combiners);
        }

        self.flush_barriers();
        self.command_list.begin_render_pass(&render_pass, &framebuffer, &clear_desc);
        self.framebuffers.push(framebuffer);
        Ok(())
    }

    pub fn end_render_pass(&mut self) {
        self.assert_recording();
        self.command_list.end_render_pass();
        self.graphics_state.render_pass = None;
    }

    /// Set the viewport and a scissor rectangle covering it.
    pub fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.assert_recording();
        self.viewport_width = width;
        self.viewport_height = height;
        self.command_list.set_viewport(x, y, width, height);
        self.command_list.set_scissor_rect(x as i32, y as i32, (x + width) as u32, (y + height) as u32);
    }

    pub fn set_scissor_rect(&mut self, left: i32, top: i32, right: u32, bottom: u32) {
        self.assert_recording();
        self.command_list.set_scissor_rect(left, top, right, bottom);
    }

    pub fn ia_set_index_buffer(&mut self, resource: &Arc<B::Resource>, format: Format) {
        self.assert_recording();
        self.lazy_resource_barrier(LazyResourceBarrierDesc::whole(resource, ResourceState::IndexBuffer));
        self.flush_barriers();
        self.command_list.ia_set_index_buffer(resource, format);
    }

    pub fn ia_set_vertex_buffer(&mut self, slot: u32, resource: &Arc<B::Resource>) {
        self.assert_recording();
        self.lazy_resource_barrier(LazyResourceBarrierDesc::whole(resource, ResourceState::VertexAndConstantBuffer));
        self.flush_barriers();
        self.command_list.ia_set_vertex_buffer(slot, resource);
    }

    /// Use `view` as the shading rate image of following render passes, or stop using one.
    pub fn rs_set_shading_rate_image(&mut self, view: Option<Arc<B::View>>) {
        self.assert_recording();
        if let Some(view) = view.as_ref() {
            self.view_barrier(view, ResourceState::ShadingRateSource);
        }
        self.shading_rate_image = view;
    }

    /// Request that a subresource range be in `barrier.state` from here on.
    ///
    /// Ranges already in the target state are skipped. Ranges this list has not seen yet
    /// are recorded as lazy barriers, since only the submission knows what came before.
    /// Everything else is queued and flushed before the next state-dependent command.
    pub fn lazy_resource_barrier(&mut self, barrier: LazyResourceBarrierDesc<B>) {
        let barrier = barrier.resolved();
        let resource = barrier.resource.clone();
        let desc = resource.desc();
        let tracker = self
            .state_trackers
            .entry(Handle::from(&resource))
            .or_insert_with(|| ResourceStateTracker::for_resource(desc));

        let whole_range = barrier.base_mip_level == 0
            && barrier.level_count == desc.level_count()
            && barrier.base_array_layer == 0
            && barrier.layer_count == desc.layer_count();

        if whole_range && tracker.has_resource_state() {
            let state_before = tracker.resource_state();
            if state_before != barrier.state {
                if state_before == ResourceState::Unknown {
                    log::trace!("lazy barrier: `{}` -> {:?}", desc.name, barrier.state);
                    self.lazy_barriers.push(barrier.clone());
                } else {
                    self.pending_barriers.push(ResourceBarrierDesc {
                        resource: resource.clone(),
                        state_before,
                        state_after: barrier.state,
                        base_mip_level: 0,
                        level_count: barrier.level_count,
                        base_array_layer: 0,
                        layer_count: barrier.layer_count,
                    });
                }
            }
            tracker.set_resource_state(barrier.state);
            return;
        }

        for (mip_level, array_layer) in subresources(barrier.base_mip_level, barrier.level_count, barrier.base_array_layer, barrier.layer_count) {
            let state_before = tracker.subresource_state(mip_level, array_layer);
            if state_before != barrier.state {
                if state_before == ResourceState::Unknown {
                    log::trace!("lazy barrier: `{}` ({mip_level}, {array_layer}) -> {:?}", desc.name, barrier.state);
                    self.lazy_barriers.push(LazyResourceBarrierDesc::range(&resource, mip_level, 1, array_layer, 1, barrier.state));
                } else {
                    self.pending_barriers.push(ResourceBarrierDesc {
                        resource: resource.clone(),
                        state_before,
                        state_after: barrier.state,
                        base_mip_level: mip_level,
                        level_count: 1,
                        base_array_layer: array_layer,
                        layer_count: 1,
                    });
                }
            }
            tracker.set_subresource_state(mip_level, array_layer, barrier.state);
        }
    }

    pub(crate) fn view_barrier(&mut self, view: &Arc<B::View>, state: ResourceState) {
        if let Some(barrier) = LazyResourceBarrierDesc::<B>::for_view(view, state) {
            self.lazy_resource_barrier(barrier);
        }
    }

    fn indirect_barrier(&mut self, argument_buffer: &Arc<B::Resource>, count_buffer: Option<&Arc<B::Resource>>) {
        self.lazy_resource_barrier(LazyResourceBarrierDesc::whole(argument_buffer, ResourceState::IndirectArgument));
        if let Some(count_buffer) = count_buffer {
            self.lazy_resource_barrier(LazyResourceBarrierDesc::whole(count_buffer, ResourceState::IndirectArgument));
        }
        self.flush_barriers();
    }

    /// Record every queued transition in one native barrier call.
    pub(crate) fn flush_barriers(&mut self) {
        if self.pending_barriers.is_empty() {
            return;
        }
        log::trace!("flushing {} resource barriers", self.pending_barriers.len());
        self.command_list.resource_barrier(&self.pending_barriers);
        self.pending_barriers.clear();
    }

    #[inline]
    fn assert_recording(&self) {
        #[cfg(feature = "validation")]
        assert!(!self.closed, "command list recorded after close(); reset() it first");
    }

    fn framebuffer_extent(&self, colors: &[Option<Arc<B::View>>], depth_stencil: Option<&Arc<B::View>>) -> (u32, u32) {
        if self.viewport_width > 0.0 && self.viewport_height > 0.0 {
            return (self.viewport_width as u32, self.viewport_height as u32);
        }
        colors
            .iter()
            .flatten()
            .chain(depth_stencil)
            .find_map(|view| {
                let resource = view.resource()?;
                let mip_level = view.base_mip_level();
                Some((resource.desc().mip_width(mip_level), resource.desc().mip_height(mip_level)))
            })
            .unwrap_or((0, 0))
    }

    /// Bind the pipeline for the current program and state, then its binding set.
    #[profiling::function]
    fn apply(&mut self) -> Result<()> {
        self.assert_recording();
        let (Some(program), Some(layout)) = (self.program.clone(), self.layout.clone()) else {
            panic!("draw or dispatch recorded before use_program()");
        };

        let program_handle = Handle::from(&program);
        let layout_handle = Handle::from(&layout);
        let pipeline_desc: PipelineDesc<B> = match self.pipeline_type {
            PipelineType::Graphics => GraphicsPipelineDesc {
                program: program_handle,
                layout: layout_handle,
                input: self.graphics_state.input.clone(),
                render_pass: self.graphics_state.render_pass.clone(),
                depth_stencil_desc: self.graphics_state.depth_stencil,
                blend_desc: self.graphics_state.blend,
                rasterizer_desc: self.graphics_state.rasterizer,
            }
            .into(),
            PipelineType::Compute => ComputePipelineDesc {
                program: program_handle,
                layout: layout_handle,
            }
            .into(),
            PipelineType::RayTracing => RayTracingPipelineDesc {
                program: program_handle,
                layout: layout_handle,
                groups: self.ray_tracing_groups.iter().map(|(_, group)| *group).collect(),
            }
            .into(),
        };

        let pipeline = self.object_cache.borrow_mut().get_pipeline(&pipeline_desc)?;
        self.command_list.bind_pipeline(&pipeline);
        self.pipeline = Some(pipeline.clone());

        if self.pipeline_type == PipelineType::RayTracing {
            self.create_shader_table(&pipeline)?;
        }

        self.apply_binding_set(&program, &layout)
    }

    /// Lay the pipeline's group handles out in raygen, miss, callable, hit order.
    fn create_shader_table(&mut self, pipeline: &Arc<B::Pipeline>) -> Result<()> {
        if self.ray_tracing_groups.is_empty() {
            return Ok(());
        }

        let handles = pipeline.ray_tracing_shader_group_handles(0, self.ray_tracing_groups.len() as u32)?;
        let handle_size = self.device.shader_group_handle_size() as usize;
        let alignment = u64::from(self.device.shader_table_alignment());

        let mut offset = 0;
        for table in self.shader_tables.iter_mut() {
            table.offset = offset;
            table.stride = alignment;
            offset += table.size;
        }

        let shader_table = self
            .device
            .create_buffer(&BufferDesc::new(BindFlag::ShaderTable, offset, MemoryType::Upload).with_name("shader table"))
            .context("failed to create shader table")?;

        let mut cursors = [0u64; 4];
        for (index, (table_kind, _)) in self.ray_tracing_groups.iter().enumerate() {
            let handle = handles
                .get(index * handle_size..(index + 1) * handle_size)
                .ok_or_else(|| anyhow!("pipeline returned {} bytes of handles for {} groups", handles.len(), self.ray_tracing_groups.len()))?;
            let cursor = &mut cursors[*table_kind as usize];
            shader_table.update_upload_buffer(self.shader_tables.get(*table_kind).offset + *cursor, handle)?;
            *cursor += alignment;
        }

        for table in self.shader_tables.iter_mut() {
            table.resource = Some(shader_table.clone());
        }
        self.cmd_resources.push(shader_table);
        Ok(())
    }

    fn apply_binding_set(&mut self, program: &Arc<B::Program>, layout: &Arc<B::BindingSetLayout>) -> Result<()> {
        let deferred_views = mem::take(&mut self.bound_deferred_views);
        let resolved = self.resolve_deferred_views(program, &deferred_views);
        self.bound_deferred_views = deferred_views;
        resolved?;

        self.flush_barriers();

        let bindings: Vec<BindingDesc<B>> = self
            .bound_resources
            .iter()
            .map(|(bind_key, view)| BindingDesc {
                bind_key: *bind_key,
                view: Handle::from(view),
            })
            .collect();
        let binding_set = self.object_cache.borrow_mut().get_binding_set(layout, &bindings)?;
        self.command_list.bind_binding_set(&binding_set);
        self.binding_sets.push(binding_set);
        Ok(())
    }

    fn resolve_deferred_views(&mut self, program: &Arc<B::Program>, deferred_views: &BTreeMap<BindKey, Rc<dyn DeferredView<B>>>) -> Result<()> {
        for (bind_key, deferred_view) in deferred_views {
            let resolved = deferred_view
                .resolve(self)
                .with_context(|| format!("failed to resolve deferred view at {bind_key:?}"))?;
            let view = self
                .object_cache
                .borrow_mut()
                .get_view(Some(program), bind_key, resolved.resource.as_ref(), &resolved.view_desc)?;
            if let Some(state) = implied_state(bind_key) {
                self.view_barrier(&view, state);
            }
            self.bound_resources.insert(*bind_key, view);
            self.resolved_deferred_views.push((deferred_view.clone(), resolved));
        }
        Ok(())
    }
}

/// The state a shader binding of this kind needs its resource in.
fn implied_state(bind_key: &BindKey) -> Option<ResourceState> {
    match bind_key.view_type {
        view_type if view_type.is_shader_resource() => Some(if bind_key.shader_type == ShaderType::Pixel {
            ResourceState::PixelShaderResource
        } else {
            ResourceState::NonPixelShaderResource
        }),
        view_type if view_type.is_unordered_access() => Some(ResourceState::UnorderedAccess),
        ViewType::RenderTarget | ViewType::DepthStencil => {
            panic!("{bind_key:?} is an attachment; bind it through begin_render_pass()")
        }
        _ => None,
    }
}
