use std::any::type_name;
use std::num::NonZero;
use std::{fmt, ptr, thread};

use tracing::{debug, trace};

use crate::{DropPolicy, ObjectPoolBuilder, PoolHooks};

/// A pool of objects that recycles the slots of released objects, most recently released first.
///
/// Objects live in slabs that are never moved or shrunk, so the address of an object stays the
/// same from allocation until release, and a released slot is handed out again at the same
/// address. The free list is kept outside the objects: releasing an object runs the
/// [destroy hook][PoolHooks::destroy] but leaves the finalized payload in place, where it stays
/// observable through [`released()`][Self::released] until the slot is reused.
///
/// The pool returns a [`Key`] for each allocated object, with objects being accessed by this key.
///
/// # Examples
///
/// ```
/// use recycle_pool::{ObjectPool, PoolHooks};
///
/// struct Names;
///
/// impl PoolHooks for Names {
///     type Item = String;
///     type Args = &'static str;
///
///     fn init(&self, name: &'static str) -> String {
///         name.to_string()
///     }
///
///     fn copy(&self, original: &String) -> String {
///         format!("copy of {original}")
///     }
/// }
///
/// let mut pool = ObjectPool::new(Names);
///
/// let original = pool.allocate("box");
/// let copy = pool.duplicate(original);
///
/// assert_eq!(pool.get(original), "box");
/// assert_eq!(pool.get(copy), "copy of box");
/// assert_eq!(pool.len(), 2);
/// # pool.release(original);
/// # pool.release(copy);
/// ```
pub struct ObjectPool<H: PoolHooks> {
    hooks: H,

    /// Slabs are boxed slices so their slots keep their addresses when the slab list grows.
    slabs: Vec<Box<[Slot<H::Item>]>>,

    /// Keys of vacant slots. The last entry is handed out next.
    free: Vec<Key>,

    len: usize,

    slab_capacity: NonZero<usize>,
    drop_policy: DropPolicy,
}

/// A key that identifies an object in an [`ObjectPool`].
///
/// Keys are opaque handles returned by [`ObjectPool::allocate()`] and
/// [`ObjectPool::duplicate()`]. A key stays meaningful after its object is released: the pool
/// reuses the slot (and the key) for a later allocation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    slab: usize,
    index: usize,
}

struct Slot<T> {
    /// `None` only for slots that have never held an object.
    value: Option<T>,
    occupied: bool,
}

impl<T> Slot<T> {
    const fn vacant() -> Self {
        Self {
            value: None,
            occupied: false,
        }
    }
}

impl<H: PoolHooks> ObjectPool<H> {
    pub(crate) fn new_inner(
        hooks: H,
        slab_capacity: NonZero<usize>,
        drop_policy: DropPolicy,
    ) -> Self {
        Self {
            hooks,
            slabs: Vec::new(),
            free: Vec::new(),
            len: 0,
            slab_capacity,
            drop_policy,
        }
    }

    /// Creates a new [`ObjectPool`] with the default configuration.
    ///
    /// The pool starts empty and adds slabs as objects are allocated.
    #[must_use]
    pub fn new(hooks: H) -> Self {
        Self::builder().build(hooks)
    }

    /// Starts building a new [`ObjectPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    pub fn builder() -> ObjectPoolBuilder<H> {
        ObjectPoolBuilder::new()
    }

    /// The number of live objects in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool has no live objects.
    ///
    /// An empty pool may still be holding released slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of objects the pool can hold without adding a slab.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slabs.iter().map(|slab| slab.len()).sum()
    }

    /// The number of vacant slots waiting to be reused.
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// The hooks the pool was built with.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Allocates an object constructed by the [init hook][PoolHooks::init].
    ///
    /// The most recently released slot is reused if there is one. Otherwise the next slot of
    /// the most recently added slab is used, adding a new slab if all slots are taken.
    #[must_use]
    pub fn allocate(&mut self, args: H::Args) -> Key {
        let item = self.hooks.init(args);
        let key = self.vacant_key();
        self.occupy(key, item);
        key
    }

    /// Allocates an independent object constructed by the [copy hook][PoolHooks::copy] from
    /// the object identified by `original`.
    ///
    /// The new object takes its slot the same way [`allocate()`][Self::allocate] does.
    ///
    /// # Panics
    ///
    /// Panics if `original` is not associated with a live object.
    #[must_use]
    pub fn duplicate(&mut self, original: Key) -> Key {
        let item = self.hooks.copy(self.get(original));
        let key = self.vacant_key();
        self.occupy(key, item);
        key
    }

    /// Releases an object back to the pool.
    ///
    /// The [destroy hook][PoolHooks::destroy] runs on the object, which then stays in its slot
    /// until the slot is reused. The slot is the first to be reused by the next allocation.
    ///
    /// # Panics
    ///
    /// Panics if the key is not associated with a live object.
    pub fn release(&mut self, key: Key) {
        let Some(slot) = self
            .slabs
            .get_mut(key.slab)
            .and_then(|slab| slab.get_mut(key.index))
            .filter(|slot| slot.occupied)
        else {
            panic!("key was not associated with a live object in the pool");
        };

        slot.occupied = false;

        let item = slot
            .value
            .as_mut()
            .expect("an occupied slot always holds an object");
        self.hooks.destroy(item);

        self.free.push(key);
        self.len = self
            .len
            .checked_sub(1)
            .expect("a live object was just released, so the count cannot be zero");

        trace!(slab = key.slab, index = key.index, "released object");
    }

    /// Gets a shared reference to a live object.
    ///
    /// # Panics
    ///
    /// Panics if the key is not associated with a live object.
    #[must_use]
    pub fn get(&self, key: Key) -> &H::Item {
        self.slot(key)
            .filter(|slot| slot.occupied)
            .and_then(|slot| slot.value.as_ref())
            .expect("key was not associated with a live object in the pool")
    }

    /// Gets an exclusive reference to a live object.
    ///
    /// # Panics
    ///
    /// Panics if the key is not associated with a live object.
    #[must_use]
    pub fn get_mut(&mut self, key: Key) -> &mut H::Item {
        self.slabs
            .get_mut(key.slab)
            .and_then(|slab| slab.get_mut(key.index))
            .filter(|slot| slot.occupied)
            .and_then(|slot| slot.value.as_mut())
            .expect("key was not associated with a live object in the pool")
    }

    /// The finalized payload of a released object, as left behind by the
    /// [destroy hook][PoolHooks::destroy].
    ///
    /// Returns `None` if the slot currently holds a live object or has never held one.
    #[must_use]
    pub fn released(&self, key: Key) -> Option<&H::Item> {
        self.slot(key)
            .filter(|slot| !slot.occupied)
            .and_then(|slot| slot.value.as_ref())
    }

    /// The memory address of the slot identified by `key`.
    ///
    /// The address is stable for the lifetime of the pool and is shared by every object that
    /// ever occupies the slot, which makes it suitable for identity comparisons.
    ///
    /// # Panics
    ///
    /// Panics if the key was not issued by this pool.
    #[must_use]
    pub fn address(&self, key: Key) -> usize {
        let slot = self
            .slot(key)
            .expect("key was not issued by this pool");

        ptr::from_ref(slot).addr()
    }

    /// Reserves `count` contiguous slots in a new slab and places them on top of the free list.
    ///
    /// The next `count` allocations that do not find a more recently released slot are served
    /// from this slab at ascending addresses.
    pub fn preallocate(&mut self, count: usize) {
        if count == 0 {
            return;
        }

        let slab_index = self.add_slab(count);

        debug!(slab_index, capacity = count, "preallocated slab");
    }

    fn slot(&self, key: Key) -> Option<&Slot<H::Item>> {
        self.slabs
            .get(key.slab)
            .and_then(|slab| slab.get(key.index))
    }

    fn vacant_key(&mut self) -> Key {
        if let Some(key) = self.free.pop() {
            trace!(slab = key.slab, index = key.index, "reusing released slot");
            return key;
        }

        let slab_index = self.add_slab(self.slab_capacity.get());

        debug!(
            slab_index,
            capacity = self.slab_capacity.get(),
            "all slots taken, added slab"
        );

        self.free
            .pop()
            .expect("we just added a slab with at least one slot")
    }

    fn occupy(&mut self, key: Key, item: H::Item) {
        let slot = self
            .slabs
            .get_mut(key.slab)
            .and_then(|slab| slab.get_mut(key.index))
            .expect("free list only contains keys of existing slots");

        debug_assert!(!slot.occupied, "free list contained an occupied slot");

        // Replaces whatever payload the destroy hook left behind.
        slot.value = Some(item);
        slot.occupied = true;

        self.len = self
            .len
            .checked_add(1)
            .expect("cannot hold more objects than there are addressable slots");
    }

    /// Adds a slab of `count` vacant slots and pushes them onto the free list so that the
    /// lowest index is handed out first. Returns the index of the new slab.
    fn add_slab(&mut self, count: usize) -> usize {
        let slab_index = self.slabs.len();

        self.slabs
            .push((0..count).map(|_| Slot::vacant()).collect());

        self.free.extend((0..count).rev().map(|index| Key {
            slab: slab_index,
            index,
        }));

        slab_index
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let occupied = self
            .slabs
            .iter()
            .flat_map(|slab| slab.iter())
            .filter(|slot| slot.occupied)
            .count();

        assert_eq!(occupied, self.len, "live object count is out of sync");
        assert_eq!(
            self.len.checked_add(self.free.len()),
            Some(self.capacity()),
            "every slot must be either live or on the free list"
        );

        for key in &self.free {
            let slot = self.slot(*key).expect("free list key must point to a slot");
            assert!(!slot.occupied, "free list key {key:?} points to a live object");
        }
    }
}

impl<H: PoolHooks> fmt::Debug for ObjectPool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("item_type", &format_args!("{}", type_name::<H::Item>()))
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("free_len", &self.free.len())
            .field("slab_capacity", &self.slab_capacity)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<H: PoolHooks> Drop for ObjectPool<H> {
    fn drop(&mut self) {
        let was_empty = self.is_empty();

        for slot in self.slabs.iter_mut().flat_map(|slab| slab.iter_mut()) {
            if !slot.occupied {
                continue;
            }

            slot.occupied = false;

            if let Some(item) = slot.value.as_mut() {
                self.hooks.destroy(item);
            }
        }

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a non-empty pool of {} with a policy that says it must be empty when dropped",
                type_name::<H::Item>()
            );
        }
    }
}
