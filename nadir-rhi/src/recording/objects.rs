use std::sync::Arc;
use anyhow::{anyhow, bail, Result};
use parking_lot::Mutex;
use crate::backend::{Pipeline, Program, RenderPass, Resource, Shader, View};
use crate::types::*;
use super::Recording;

/// Base of the fake GPU addresses handed out for acceleration structures.
const ACCELERATION_STRUCTURE_ADDRESS_BASE: u64 = 0x1000_0000;

#[derive(Debug)]
pub struct RecordingResource {
    id: u64,
    desc: ResourceDesc,
    memory: Option<Mutex<Vec<u8>>>,
}

impl RecordingResource {
    pub(super) fn new(id: u64, desc: ResourceDesc, host_size: Option<usize>) -> Self {
        Self {
            id,
            desc,
            memory: host_size.map(|size| Mutex::new(vec![0; size])),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Snapshot of host-visible memory; empty for device-local resources.
    pub fn contents(&self) -> Vec<u8> {
        self.memory.as_ref().map(|memory| memory.lock().clone()).unwrap_or_default()
    }
}

impl Resource for RecordingResource {
    fn desc(&self) -> &ResourceDesc {
        &self.desc
    }

    fn update_upload_buffer(&self, offset: u64, data: &[u8]) -> Result<()> {
        let Some(memory) = self.memory.as_ref() else {
            bail!("resource `{}` ({}) is not host visible", self.desc.name, self.id);
        };

        let mut memory = memory.lock();
        let begin = usize::try_from(offset)?;
        let end = begin
            .checked_add(data.len())
            .filter(|end| *end <= memory.len())
            .ok_or_else(|| anyhow!(
                "writing {} bytes at offset {} overflows `{}` ({} bytes)",
                data.len(), offset, self.desc.name, memory.len(),
            ))?;
        memory[begin..end].copy_from_slice(data);
        Ok(())
    }

    fn acceleration_structure_handle(&self) -> u64 {
        ACCELERATION_STRUCTURE_ADDRESS_BASE + self.id * 0x100
    }
}

#[derive(Debug)]
pub struct RecordingView {
    id: u64,
    resource: Option<Arc<RecordingResource>>,
    desc: ViewDesc,
}

impl RecordingView {
    pub(super) fn new(id: u64, resource: Option<Arc<RecordingResource>>, desc: ViewDesc) -> Self {
        Self { id, resource, desc }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl View<Recording> for RecordingView {
    fn resource(&self) -> Option<&Arc<RecordingResource>> {
        self.resource.as_ref()
    }

    fn desc(&self) -> &ViewDesc {
        &self.desc
    }
}

/// Hand-written reflection data standing in for a compiled shader.
#[derive(Clone, Debug, Default)]
pub struct RecordingShader {
    shader_type: ShaderType,
    bindings: Vec<ResourceBindingDesc>,
    input_layouts: Vec<InputLayoutDesc>,
    entry_points: Vec<EntryPoint>,
}

impl RecordingShader {
    pub fn new(shader_type: ShaderType) -> Self {
        Self {
            shader_type,
            ..Default::default()
        }
    }

    pub fn with_binding(mut self, binding: ResourceBindingDesc) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn with_input(mut self, input: InputLayoutDesc) -> Self {
        self.input_layouts.push(input);
        self
    }

    pub fn with_entry_point(mut self, entry_point: EntryPoint) -> Self {
        self.entry_points.push(entry_point);
        self
    }

    pub fn bind_keys(&self) -> impl Iterator<Item = BindKey> + '_ {
        self.bindings.iter().map(|binding| binding.bind_key(self.shader_type))
    }
}

impl Shader for RecordingShader {
    fn shader_type(&self) -> ShaderType {
        self.shader_type
    }

    fn resource_binding(&self, bind_key: &BindKey) -> Option<&ResourceBindingDesc> {
        if bind_key.shader_type != self.shader_type {
            return None;
        }
        self.bindings.iter().find(|binding| {
            binding.view_type == bind_key.view_type && binding.slot == bind_key.slot && binding.space == bind_key.space
        })
    }

    fn input_layouts(&self) -> &[InputLayoutDesc] {
        &self.input_layouts
    }

    fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    fn group_id(&self, name: &str) -> u64 {
        self.entry_points
            .iter()
            .position(|entry_point| entry_point.name == name)
            .map_or(u64::MAX, |index| index as u64)
    }
}

#[derive(Debug)]
pub struct RecordingProgram {
    shaders: Vec<Arc<RecordingShader>>,
    bindings: Vec<BindKey>,
}

impl RecordingProgram {
    pub fn new(shaders: Vec<RecordingShader>) -> Self {
        let mut bindings: Vec<BindKey> = shaders.iter().flat_map(|shader| shader.bind_keys()).collect();
        bindings.sort();
        bindings.dedup();
        Self {
            shaders: shaders.into_iter().map(Arc::new).collect(),
            bindings,
        }
    }
}

impl Program<Recording> for RecordingProgram {
    fn shaders(&self) -> &[Arc<RecordingShader>] {
        &self.shaders
    }

    fn bindings(&self) -> &[BindKey] {
        &self.bindings
    }
}

#[derive(Debug)]
pub struct RecordingPipeline {
    id: u64,
    pipeline_type: PipelineType,
    group_count: u32,
    handle_size: u32,
}

impl RecordingPipeline {
    pub(super) fn new(id: u64, pipeline_type: PipelineType, group_count: u32, handle_size: u32) -> Self {
        Self { id, pipeline_type, group_count, handle_size }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Pipeline for RecordingPipeline {
    fn pipeline_type(&self) -> PipelineType {
        self.pipeline_type
    }

    /// Group `n` is identified by `handle_size` bytes of value `n + 1`.
    fn ray_tracing_shader_group_handles(&self, first_group: u32, group_count: u32) -> Result<Vec<u8>> {
        if self.pipeline_type != PipelineType::RayTracing {
            bail!("pipeline {} is not a ray tracing pipeline", self.id);
        }
        if first_group.saturating_add(group_count) > self.group_count {
            bail!(
                "groups {}..{} requested from pipeline {} with {} groups",
                first_group, first_group.saturating_add(group_count), self.id, self.group_count,
            );
        }

        let mut handles = Vec::with_capacity((group_count * self.handle_size) as usize);
        for group in first_group..first_group + group_count {
            handles.extend(std::iter::repeat_n((group + 1) as u8, self.handle_size as usize));
        }
        Ok(handles)
    }
}

#[derive(Debug)]
pub struct RecordingRenderPass {
    id: u64,
    desc: RenderPassDesc,
}

impl RecordingRenderPass {
    pub(super) fn new(id: u64, desc: RenderPassDesc) -> Self {
        Self { id, desc }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl RenderPass for RecordingRenderPass {
    fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }
}

#[derive(Debug)]
pub struct RecordingFramebuffer {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub attachment_count: usize,
}

#[derive(Debug)]
pub struct RecordingBindingSetLayout {
    pub id: u64,
    pub bind_keys: Vec<BindKey>,
}

#[derive(Debug)]
pub struct RecordingBindingSet {
    pub id: u64,
    pub layout: u64,
    /// Bound view id per slot.
    pub bindings: Vec<(BindKey, u64)>,
}
