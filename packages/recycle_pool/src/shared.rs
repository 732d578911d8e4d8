use std::any::type_name;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::{PoolHooks, SharedPoolBuilder};

/// A pool of reference-counted objects.
///
/// Objects are handed out as [`Shared`] handles. Cloning a handle (or calling
/// [`retain()`][Shared::retain]) aliases the same object and increments its reference count;
/// dropping a handle (or calling [`release()`][Shared::release]) decrements it. When the last
/// handle goes away the [destroy hook][PoolHooks::destroy] runs and the object's slot is placed
/// on the pool's free list, from which it is reused most recently released first.
///
/// The pool itself is a cheap handle to shared state; handles keep that state alive, so objects
/// may outlive the `SharedPool` value they were allocated from.
///
/// # Examples
///
/// ```
/// use recycle_pool::{PoolHooks, SharedPool};
///
/// struct Tagged;
///
/// impl PoolHooks for Tagged {
///     type Item = u32;
///     type Args = u32;
///
///     fn init(&self, tag: u32) -> u32 {
///         tag
///     }
///
///     fn copy(&self, original: &u32) -> u32 {
///         original + 1
///     }
///
///     fn destroy(&self, item: &mut u32) {
///         *item = 0xdead_beef;
///     }
/// }
///
/// let pool = SharedPool::new(Tagged);
///
/// let first = pool.allocate(0x12345);
/// let alias = first.retain();
/// assert_eq!(first.refcount(), 2);
///
/// alias.release();
/// assert_eq!(first.refcount(), 1);
///
/// first.release();
/// assert_eq!(pool.with_last_released(|item| *item), Some(0xdead_beef));
/// ```
pub struct SharedPool<H: PoolHooks> {
    core: Rc<SharedCore<H>>,
}

struct SharedCore<H: PoolHooks> {
    hooks: H,

    /// Slots of objects whose last handle has been dropped. The last entry is reused first.
    free: RefCell<Vec<Rc<RefCell<H::Item>>>>,
}

impl<H: PoolHooks> SharedCore<H> {
    fn place(&self, item: H::Item) -> Rc<RefCell<H::Item>> {
        let recycled = self.free.borrow_mut().pop();

        match recycled {
            Some(slot) => {
                trace!(
                    address = slot.as_ptr().addr(),
                    "reusing released shared object"
                );

                // Replaces whatever payload the destroy hook left behind.
                *slot.borrow_mut() = item;
                slot
            }
            None => Rc::new(RefCell::new(item)),
        }
    }
}

impl<H: PoolHooks> SharedPool<H> {
    pub(crate) fn new_inner(hooks: H) -> Self {
        Self {
            core: Rc::new(SharedCore {
                hooks,
                free: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Creates a new [`SharedPool`] with the default configuration.
    #[must_use]
    pub fn new(hooks: H) -> Self {
        Self::builder().build(hooks)
    }

    /// Starts building a new [`SharedPool`].
    pub fn builder() -> SharedPoolBuilder<H> {
        SharedPoolBuilder::new()
    }

    /// Allocates an object constructed by the [init hook][PoolHooks::init], with a reference
    /// count of 1.
    #[must_use]
    pub fn allocate(&self, args: H::Args) -> Shared<H> {
        let item = self.core.hooks.init(args);

        Shared {
            slot: self.core.place(item),
            core: Rc::clone(&self.core),
        }
    }

    /// The number of released objects waiting to be reused.
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.core.free.borrow().len()
    }

    /// Calls `f` with the payload of the most recently released object, as left behind by the
    /// [destroy hook][PoolHooks::destroy].
    ///
    /// Returns `None` if there is no released object waiting to be reused.
    pub fn with_last_released<R>(&self, f: impl FnOnce(&H::Item) -> R) -> Option<R> {
        let last = self.core.free.borrow().last().map(Rc::clone);

        last.map(|slot| f(&slot.borrow()))
    }

    /// The hooks the pool was built with.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.core.hooks
    }
}

impl<H: PoolHooks> Clone for SharedPool<H> {
    /// Creates another handle to the same pool.
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<H: PoolHooks> fmt::Debug for SharedPool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPool")
            .field("item_type", &format_args!("{}", type_name::<H::Item>()))
            .field("free_len", &self.free_len())
            .finish()
    }
}

/// A reference-counted handle to an object allocated from a [`SharedPool`].
///
/// The reference count is the number of handles to the object. Handles are single-threaded:
/// they are neither [`Send`] nor [`Sync`].
pub struct Shared<H: PoolHooks> {
    slot: Rc<RefCell<H::Item>>,
    core: Rc<SharedCore<H>>,
}

impl<H: PoolHooks> Shared<H> {
    /// Creates another handle to the same object, incrementing its reference count.
    #[must_use]
    pub fn retain(&self) -> Self {
        self.clone()
    }

    /// Drops this handle, decrementing the reference count of the object.
    ///
    /// If this was the last handle, the object is destroyed and its slot is recycled.
    pub fn release(self) {
        drop(self);
    }

    /// Allocates an independent object constructed by the [copy hook][PoolHooks::copy] from
    /// this one, with a reference count of 1.
    ///
    /// The reference count of this object is not affected.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let item = self.core.hooks.copy(&self.slot.borrow());

        Self {
            slot: self.core.place(item),
            core: Rc::clone(&self.core),
        }
    }

    /// The number of handles to the object.
    #[must_use]
    pub fn refcount(&self) -> usize {
        // The free list only ever holds slots without handles, so every strong
        // reference to a live slot belongs to a handle.
        Rc::strong_count(&self.slot)
    }

    /// Immutably borrows the object.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently mutably borrowed through another handle.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, H::Item> {
        self.slot.borrow()
    }

    /// Mutably borrows the object.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently borrowed through another handle.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, H::Item> {
        self.slot.borrow_mut()
    }

    /// The memory address of the object.
    ///
    /// A recycled slot keeps its address, so an object allocated right after another was
    /// destroyed shares that object's address.
    #[must_use]
    pub fn as_ptr(&self) -> *const H::Item {
        self.slot.as_ptr().cast_const()
    }

    /// Whether two handles refer to the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<H: PoolHooks> Clone for Shared<H> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
            core: Rc::clone(&self.core),
        }
    }
}

impl<H: PoolHooks> Drop for Shared<H> {
    fn drop(&mut self) {
        if Rc::strong_count(&self.slot) != 1 {
            return;
        }

        self.core.hooks.destroy(&mut self.slot.borrow_mut());
        self.core.free.borrow_mut().push(Rc::clone(&self.slot));

        trace!(
            address = self.slot.as_ptr().addr(),
            "last handle released, recycled shared object"
        );
    }
}

impl<H: PoolHooks> fmt::Debug for Shared<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("item_type", &format_args!("{}", type_name::<H::Item>()))
            .field("address", &self.as_ptr())
            .field("refcount", &self.refcount())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;

    use static_assertions::assert_not_impl_any;

    use super::*;

    const DESTROYED: u32 = 0xdead_beef;

    #[derive(Default)]
    struct Counting {
        destroyed: Rc<Cell<usize>>,
    }

    impl PoolHooks for Counting {
        type Item = u32;
        type Args = u32;

        fn init(&self, tag: u32) -> u32 {
            tag
        }

        fn copy(&self, original: &u32) -> u32 {
            original + 1
        }

        fn destroy(&self, item: &mut u32) {
            *item = DESTROYED;
            self.destroyed.set(self.destroyed.get() + 1);
        }
    }

    assert_not_impl_any!(Shared<Counting>: Send, Sync);
    assert_not_impl_any!(SharedPool<Counting>: Send, Sync);

    #[test]
    fn destroyed_exactly_when_count_reaches_zero() {
        let hooks = Counting::default();
        let destroyed = Rc::clone(&hooks.destroyed);
        let pool = SharedPool::new(hooks);

        let obj = pool.allocate(0x12345);
        let handles: Vec<_> = (0..5).map(|_| obj.retain()).collect();
        assert_eq!(obj.refcount(), 6);

        for handle in handles {
            handle.release();
            assert_eq!(destroyed.get(), 0);
            assert_eq!(*obj.borrow(), 0x12345);
        }

        assert_eq!(obj.refcount(), 1);
        obj.release();

        assert_eq!(destroyed.get(), 1);
        assert_eq!(pool.free_len(), 1);
        assert_eq!(pool.with_last_released(|item| *item), Some(DESTROYED));
    }

    #[test]
    fn reuse_is_lifo() {
        let pool = SharedPool::new(Counting::default());

        let a = pool.allocate(1);
        let b = pool.allocate(2);
        let a_address = a.as_ptr();
        let b_address = b.as_ptr();

        a.release();
        b.release();

        let first = pool.allocate(3);
        let second = pool.allocate(4);

        assert_eq!(first.as_ptr(), b_address);
        assert_eq!(second.as_ptr(), a_address);
        assert_eq!(*first.borrow(), 3);
        assert_eq!(*second.borrow(), 4);
    }

    #[test]
    fn duplicate_is_independent() {
        let pool = SharedPool::new(Counting::default());

        let original = pool.allocate(0x12345);
        let copy = original.duplicate();

        assert!(!copy.ptr_eq(&original));
        assert_eq!(copy.refcount(), 1);
        assert_eq!(original.refcount(), 1);
        assert_eq!(*copy.borrow(), 0x12346);

        *original.borrow_mut() = 7;
        assert_eq!(*copy.borrow(), 0x12346);
    }

    #[test]
    fn handles_outlive_pool_value() {
        let hooks = Counting::default();
        let destroyed = Rc::clone(&hooks.destroyed);

        let obj = {
            let pool = SharedPool::new(hooks);
            pool.allocate(1)
        };

        assert_eq!(*obj.borrow(), 1);
        obj.release();
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn no_released_objects() {
        let pool = SharedPool::new(Counting::default());

        assert_eq!(pool.with_last_released(|item| *item), None);
    }
}
