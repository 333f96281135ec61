//! Copy-on-read shared snapshots.
//!
//! Each shared resource (port state, configuration) sits behind its own
//! lock. Readers take a deep copy and release the lock immediately, so a
//! reader never observes a half-written value and never holds the lock
//! for longer than a clone.

use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, independently locked value handed out by copy.
#[derive(Debug, Default)]
pub struct Snapshot<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Deep copy of the current value.
    pub fn read(&self) -> T {
        self.inner.read().clone()
    }

    /// Projects a field out under the read lock without cloning the rest.
    pub fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.read())
    }

    /// Replaces the value wholesale.
    pub fn replace(&self, value: T) {
        *self.inner.write() = value;
    }

    /// Mutates the value in place under the write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.write())
    }
}
