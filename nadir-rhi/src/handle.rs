//! Identity-compared shared handles.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use derive_more::{Deref, From};

/// An `Arc` that compares, orders and hashes by allocation address.
///
/// Cache keys hold native objects through this type so that two descriptions match only
/// when they reference the very same pipeline, view or resource.
#[derive(Deref, From)]
pub struct Handle<T: ?Sized>(Arc<T>);

impl<T: ?Sized> Handle<T> {
    #[inline]
    pub fn new(object: Arc<T>) -> Self {
        Self(object)
    }

    #[inline]
    pub fn arc(&self) -> &Arc<T> {
        &self.0
    }

    #[inline]
    pub fn into_arc(self) -> Arc<T> {
        self.0
    }

    #[inline]
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl<T: ?Sized> From<&Arc<T>> for Handle<T> {
    fn from(object: &Arc<T>) -> Self {
        Self(object.clone())
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Eq for Handle<T> {}

impl<T: ?Sized> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.addr().cmp(&other.addr())
    }
}

impl<T: ?Sized> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<T: ?Sized> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:p})", Arc::as_ptr(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nadir_core::collections::hashset::HashSet;

    #[test]
    fn equality_is_identity() {
        let a = Arc::new(5u32);
        let b = Arc::new(5u32);

        assert_eq!(Handle::from(&a), Handle::new(a.clone()));
        assert_ne!(Handle::from(&a), Handle::from(&b));

        let mut set = HashSet::default();
        set.insert(Handle::from(&a));
        set.insert(Handle::from(&a));
        set.insert(Handle::from(&b));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn derefs_to_the_shared_object() {
        let handle = Handle::new(Arc::new(String::from("albedo")));
        assert_eq!(handle.as_str(), "albedo");
        assert_eq!(Arc::strong_count(handle.arc()), 1);
    }
}
