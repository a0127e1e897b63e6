//! Mutex locking that shrugs off poisoning.
//!
//! The mutexes in this crate guard plain buffers (pending change notifications, in-memory
//! namespace nodes). A panicking holder can't leave them half-updated in a way that matters,
//! so callers take the guard either way.

use std::sync::{Mutex, MutexGuard};

pub trait IgnorePoison<T> {
    /// Locks the mutex, recovering the guard if a previous holder panicked.
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T>;
}

impl<T> IgnorePoison<T> for Mutex<T> {
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|e| e.into_inner())
    }
}
