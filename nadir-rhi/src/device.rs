use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use anyhow::{Context, Result};
use nadir_core::log;
use crate::backend::{Backend, CommandList, Device};
use crate::command_list::CommandListBox;
use crate::object_cache::ObjectCache;
use crate::submission::GlobalResourceStates;
use crate::types::{BufferDesc, CommandListType, TextureDesc};

/// Rendering context: the native device, the shared object cache and the global state ledger.
pub struct RenderDevice<B: Backend> {
    device: Arc<B::Device>,
    object_cache: Rc<RefCell<ObjectCache<B>>>,
    global_states: GlobalResourceStates<B>,
}

impl<B: Backend> RenderDevice<B> {
    pub fn new(device: Arc<B::Device>) -> Self {
        let object_cache = Rc::new(RefCell::new(ObjectCache::new(device.clone())));
        Self {
            device,
            object_cache,
            global_states: GlobalResourceStates::new(),
        }
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
    pub fn global_resource_states(&self) -> &GlobalResourceStates<B> {
        &self.global_states
    }

    #[inline]
    pub fn global_resource_states_mut(&mut self) -> &mut GlobalResourceStates<B> {
        &mut self.global_states
    }

    pub fn create_command_list(&self, list_type: CommandListType) -> Result<CommandListBox<B>> {
        CommandListBox::new(self.device.clone(), self.object_cache.clone(), list_type)
    }

    pub fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<B::Resource>> {
        self.device
            .create_buffer(desc)
            .with_context(|| format!("failed to create buffer `{}`", desc.name))
    }

    pub fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<B::Resource>> {
        self.device
            .create_texture(desc)
            .with_context(|| format!("failed to create texture `{}`", desc.name))
    }

    /// Submit closed command lists in order.
    ///
    /// Lazy barriers of each list are resolved against the states the previous lists
    /// left behind; a list that needs transitions is preceded by a patch list carrying them.
    ///
    /// # Panics
    ///
    /// Panics if any list is still recording.
    #[profiling::function]
    pub fn execute_command_lists(&mut self, command_lists: &[&CommandListBox<B>]) -> Result<()> {
        let mut patch_lists = Vec::new();
        let mut order = Vec::with_capacity(command_lists.len() * 2);
        for (index, command_list) in command_lists.iter().enumerate() {
            assert!(command_list.is_closed(), "command list {index} submitted while still recording");

            let barriers = self.global_states.patch(command_list);
            if !barriers.is_empty() {
                let mut patch_list = self
                    .device
                    .create_command_list(command_list.list_type())
                    .context("failed to create patch command list")?;
                patch_list.resource_barrier(&barriers);
                patch_list.close().context("failed to close patch command list")?;
                order.push(Submission::Patch(patch_lists.len()));
                patch_lists.push(patch_list);
            }
            order.push(Submission::Recorded(index));
        }

        let native_lists: Vec<&B::CommandList> = order
            .iter()
            .map(|submission| match *submission {
                Submission::Patch(index) => &patch_lists[index],
                Submission::Recorded(index) => command_lists[index].command_list(),
            })
            .collect();
        log::trace!("submitting {} command lists ({} patch lists)", native_lists.len(), patch_lists.len());
        self.device.execute_command_lists(&native_lists).context("failed to execute command lists")
    }
}

enum Submission {
    Patch(usize),
    Recorded(usize),
}
