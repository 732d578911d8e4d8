use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{DropPolicy, ObjectPool, PoolHooks, SharedPool};

/// Number of slots in each slab an [`ObjectPool`] adds when it runs out of vacant slots.
const DEFAULT_SLAB_CAPACITY: NonZero<usize> = NonZero::new(16).expect("16 is not zero");

/// Builder for creating an instance of [`ObjectPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`ObjectPool::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use recycle_pool::{DropPolicy, ObjectPool, PoolHooks};
///
/// struct Zeroed;
///
/// impl PoolHooks for Zeroed {
///     type Item = [u8; 64];
///     type Args = ();
///
///     fn init(&self, (): ()) -> [u8; 64] {
///         [0; 64]
///     }
///
///     fn copy(&self, original: &[u8; 64]) -> [u8; 64] {
///         *original
///     }
/// }
///
/// let pool = ObjectPool::builder()
///     .slab_capacity(NonZero::new(256).unwrap())
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build(Zeroed);
/// ```
///
/// [1]: ObjectPool::new
#[must_use]
pub struct ObjectPoolBuilder<H> {
    slab_capacity: NonZero<usize>,
    drop_policy: DropPolicy,

    _hooks: PhantomData<H>,
}

impl<H> fmt::Debug for ObjectPoolBuilder<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPoolBuilder")
            .field("hooks_type", &format_args!("{}", type_name::<H>()))
            .field("slab_capacity", &self.slab_capacity)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<H: PoolHooks> ObjectPoolBuilder<H> {
    pub(crate) fn new() -> Self {
        Self {
            slab_capacity: DEFAULT_SLAB_CAPACITY,
            drop_policy: DropPolicy::default(),
            _hooks: PhantomData,
        }
    }

    /// Sets the number of slots in each slab the pool adds when it runs out of vacant slots.
    ///
    /// This does not affect [`ObjectPool::preallocate()`], which sizes its slab explicitly.
    pub fn slab_capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.slab_capacity = capacity;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat remaining objects in the pool when the pool is dropped.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    #[must_use]
    pub fn build(self, hooks: H) -> ObjectPool<H> {
        ObjectPool::new_inner(hooks, self.slab_capacity, self.drop_policy)
    }
}

/// Builder for creating an instance of [`SharedPool`].
///
/// The shared pool has no options beyond its hooks today; the builder exists so that the
/// pool is configured the same way as the other allocators in this crate.
///
/// # Examples
///
/// ```
/// use recycle_pool::{PoolHooks, SharedPool};
///
/// struct Counter;
///
/// impl PoolHooks for Counter {
///     type Item = u64;
///     type Args = u64;
///
///     fn init(&self, start: u64) -> u64 {
///         start
///     }
///
///     fn copy(&self, original: &u64) -> u64 {
///         *original
///     }
/// }
///
/// let pool = SharedPool::builder().build(Counter);
/// let counter = pool.allocate(5);
///
/// assert_eq!(*counter.borrow(), 5);
/// ```
#[must_use]
pub struct SharedPoolBuilder<H> {
    _hooks: PhantomData<H>,
}

impl<H> fmt::Debug for SharedPoolBuilder<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPoolBuilder")
            .field("hooks_type", &format_args!("{}", type_name::<H>()))
            .finish()
    }
}

impl<H: PoolHooks> SharedPoolBuilder<H> {
    pub(crate) fn new() -> Self {
        Self {
            _hooks: PhantomData,
        }
    }

    /// Builds the pool with the specified configuration.
    #[must_use]
    pub fn build(self, hooks: H) -> SharedPool<H> {
        SharedPool::new_inner(hooks)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    struct Plain;

    impl PoolHooks for Plain {
        type Item = u8;
        type Args = u8;

        fn init(&self, args: u8) -> u8 {
            args
        }

        fn copy(&self, original: &u8) -> u8 {
            *original
        }
    }

    #[test]
    fn slab_capacity_governs_growth() {
        let mut pool = ObjectPool::builder()
            .slab_capacity(NonZero::new(3).unwrap())
            .build(Plain);

        let keys: Vec<_> = (0..4).map(|value| pool.allocate(value)).collect();

        assert_eq!(pool.capacity(), 6);

        for key in keys {
            pool.release(key);
        }
    }

    #[test]
    fn default_slab_capacity() {
        let mut pool = ObjectPool::new(Plain);
        let key = pool.allocate(1);

        assert_eq!(pool.capacity(), DEFAULT_SLAB_CAPACITY.get());

        pool.release(key);
    }

    #[test]
    fn debug_names_hooks_type() {
        let builder = ObjectPool::<Plain>::builder();

        assert!(format!("{builder:?}").contains("Plain"));
    }
}
