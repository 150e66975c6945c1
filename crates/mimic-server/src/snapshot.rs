//! Copy-on-write sequence shared by the expectation and history stores.
//!
//! Writers swap or clone the inner vector behind a lock; readers take a
//! [`Snapshot`] (an `Arc` clone) and iterate it without holding any lock.

use parking_lot::RwLock;
use std::sync::Arc;

/// Immutable, restartable view of a store's contents at one instant.
#[derive(Debug)]
pub struct Snapshot<T>(Arc<Vec<Arc<T>>>);

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Snapshot<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<T>> {
        self.0.get(index)
    }

    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.0.as_ref().clone()
    }
}

impl<T: PartialEq> PartialEq for Snapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<'a, T> IntoIterator for &'a Snapshot<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ordered sequence with atomic mutation and lock-free iteration.
#[derive(Debug)]
pub(crate) struct CowVec<T> {
    inner: RwLock<Arc<Vec<Arc<T>>>>,
}

impl<T> Default for CowVec<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Arc::new(Vec::new())),
        }
    }
}

impl<T> CowVec<T> {
    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        Snapshot(Arc::clone(&self.inner.read()))
    }

    pub(crate) fn push(&self, item: Arc<T>) {
        let mut guard = self.inner.write();
        Arc::make_mut(&mut guard).push(item);
    }

    pub(crate) fn retain(&self, keep: impl FnMut(&Arc<T>) -> bool) -> usize {
        let mut guard = self.inner.write();
        let before = guard.len();
        Arc::make_mut(&mut guard).retain(keep);
        before - guard.len()
    }

    pub(crate) fn replace(&self, items: Vec<Arc<T>>) {
        *self.inner.write() = Arc::new(items);
    }

    pub(crate) fn clear(&self) {
        self.replace(Vec::new());
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().len()
    }
}
