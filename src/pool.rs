//! Lend/return pool for instances that carry reusable scratch state.
//!
//! Selectors, patchers and filters are not safe to share between callers.
//! Each concurrent worker borrows its own instance; the only shared state
//! is the free list.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

use crate::config::EngineConfig;

/// Clears all per-walk scratch state so an instance can be reused.
pub trait Reset {
    fn reset(&mut self);
}

/// Default number of idle instances kept.
pub const DEFAULT_POOL_CAPACITY: usize = 16;

/// Free list of instances of one type.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    capacity: usize,
    factory: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Default + 'static> Default for Pool<T> {
    fn default() -> Self {
        Pool::new(DEFAULT_POOL_CAPACITY, T::default)
    }
}

impl<T> Pool<T> {
    /// Pool keeping at most `capacity` idle instances, creating new ones
    /// with `factory` when the free list is empty.
    pub fn new(capacity: usize, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Pool {
            free: Mutex::new(Vec::new()),
            capacity,
            factory: Box::new(factory),
        }
    }

    pub fn with_config(
        config: &EngineConfig,
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Pool::new(config.pool_capacity, factory)
    }

    /// Take an instance; it goes back to the pool when the lease drops.
    pub fn lend(&self) -> Lease<'_, T>
    where
        T: Reset,
    {
        let item = self.free.lock().pop().unwrap_or_else(|| (self.factory)());
        Lease {
            pool: self,
            item: Some(item),
        }
    }

    /// Number of idle instances.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn give_back(&self, item: T) {
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(item);
        }
    }
}

/// Exclusive use of a pooled instance.
pub struct Lease<'p, T: Reset> {
    pool: &'p Pool<T>,
    item: Option<T>,
}

impl<T: Reset> Deref for Lease<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // present until drop
        self.item.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Reset> DerefMut for Lease<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Reset> Drop for Lease<'_, T> {
    fn drop(&mut self) {
        if let Some(mut item) = self.item.take() {
            item.reset();
            self.pool.give_back(item);
        }
    }
}
