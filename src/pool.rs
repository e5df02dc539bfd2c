//! Free lists for short-lived engine objects.

use std::sync::{Mutex, MutexGuard};

use crate::stats::Modifier;

/// An object that can be returned to a pool and handed out again.
pub trait Poolable: Default {
    /// Restores every field to its default.
    fn reset(&mut self);
}

impl<T> Poolable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

/// Process-wide pool of modifiers.
pub static MODIFIERS: ObjectPool<Modifier> = ObjectPool::new(256);

/// Scratch lists used while rebuilding modifier lists.
pub static MODIFIER_LISTS: ObjectPool<Vec<Modifier>> = ObjectPool::new(32);

/// A mutex-guarded free list. Released items are reset before they are
/// stored, so [`get`](Self::get) never hands out stale state.
#[derive(Debug)]
pub struct ObjectPool<T> {
    free: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T: Poolable> ObjectPool<T> {
    pub const fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub fn get(&self) -> T {
        self.lock().pop().unwrap_or_default()
    }

    /// Takes ownership of `item`. Items beyond the pool capacity are dropped.
    pub fn release(&self, mut item: T) {
        item.reset();
        let mut free = self.lock();
        if free.len() < self.capacity {
            free.push(item);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.free.lock().unwrap_or_else(|e| e.into_inner())
    }
}
