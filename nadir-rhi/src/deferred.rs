//! Views whose resource is only known when the draw that uses them is recorded.

use std::cell::RefCell;
use std::sync::Arc;
use anyhow::{Context, Result};
use nadir_core::log;
use crate::backend::{Backend, Device};
use crate::command_list::CommandListBox;
use crate::types::{LazyViewDesc, TextureDesc};
use crate::utility::impl_backend_clone;

/// The resource and view parameters a [`DeferredView`] resolved to.
#[derive(Debug)]
pub struct ResolvedView<B: Backend> {
    pub resource: Option<Arc<B::Resource>>,
    pub view_desc: LazyViewDesc,
}

impl_backend_clone!(ResolvedView { resource, view_desc });

impl<B: Backend> ResolvedView<B> {
    pub fn new(resource: Option<Arc<B::Resource>>, view_desc: LazyViewDesc) -> Self {
        Self { resource, view_desc }
    }
}

/// A binding declared now and resolved when the binding set is built.
///
/// `resolve` runs once per draw or dispatch that consumes the binding and may record
/// into the command list (for example to produce the resource). Every resolution is
/// handed back through `release` when the command list is reset.
pub trait DeferredView<B: Backend> {
    fn resolve(&self, command_list: &mut CommandListBox<B>) -> Result<ResolvedView<B>>;

    fn release(&self, _view: &ResolvedView<B>) {}
}

/// Texture borrowed from a small pool for the lifetime of one submission.
///
/// Repeated resolutions within a submission yield the same texture; releasing it returns
/// the texture to the pool so the next submission reuses it instead of allocating.
#[derive(Debug)]
pub struct TransientView<B: Backend> {
    desc: TextureDesc,
    view_desc: LazyViewDesc,
    available: RefCell<Vec<Arc<B::Resource>>>,
    current: RefCell<Option<Arc<B::Resource>>>,
}

impl<B: Backend> TransientView<B> {
    pub fn new(desc: TextureDesc, view_desc: LazyViewDesc) -> Self {
        Self {
            desc,
            view_desc,
            available: RefCell::new(Vec::new()),
            current: RefCell::new(None),
        }
    }

    #[inline]
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn available_count(&self) -> usize {
        self.available.borrow().len()
    }

    /// The texture handed out for the current submission, if any.
    pub fn current(&self) -> Option<Arc<B::Resource>> {
        self.current.borrow().clone()
    }
}

impl<B: Backend> DeferredView<B> for TransientView<B> {
    fn resolve(&self, command_list: &mut CommandListBox<B>) -> Result<ResolvedView<B>> {
        if let Some(texture) = self.current.borrow().as_ref() {
            return Ok(ResolvedView::new(Some(texture.clone()), self.view_desc));
        }

        let texture = match self.available.borrow_mut().pop() {
            Some(texture) => texture,
            None => {
                log::debug!("transient view: allocating texture `{}`", self.desc.name);
                command_list
                    .device()
                    .create_texture(&self.desc)
                    .with_context(|| format!("failed to create transient texture `{}`", self.desc.name))?
            }
        };
        *self.current.borrow_mut() = Some(texture.clone());
        Ok(ResolvedView::new(Some(texture), self.view_desc))
    }

    fn release(&self, view: &ResolvedView<B>) {
        let mut current = self.current.borrow_mut();
        let matches = match (current.as_ref(), view.resource.as_ref()) {
            (Some(current), Some(released)) => Arc::ptr_eq(current, released),
            _ => false,
        };
        if matches {
            if let Some(texture) = current.take() {
                self.available.borrow_mut().push(texture);
            }
        }
    }
}
