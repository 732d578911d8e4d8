//! Caller-supplied lifecycle hooks.
//!
//! Every allocator and container in this crate is generic over a hooks type that decides how
//! values are constructed, cloned, transformed on growth and finalized. The allocators decide
//! *when* a hook runs; the hooks decide *what* happens to the payload.

/// Lifecycle hooks for objects managed by an [`ObjectPool`][crate::ObjectPool] or a
/// [`SharedPool`][crate::SharedPool].
///
/// # Examples
///
/// ```
/// use recycle_pool::PoolHooks;
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
/// ```
pub trait PoolHooks {
    /// The pooled object type.
    type Item;

    /// The constructor arguments accepted by [`init()`][Self::init].
    type Args;

    /// Constructs a new object from the constructor arguments.
    fn init(&self, args: Self::Args) -> Self::Item;

    /// Constructs an independent object from an existing one.
    fn copy(&self, original: &Self::Item) -> Self::Item;

    /// Finalizes an object that is being returned to the pool.
    ///
    /// The finalized payload stays in place until the slot is reused, so any marker written
    /// here remains observable through the pool's diagnostic accessors.
    fn destroy(&self, item: &mut Self::Item) {
        _ = item;
    }
}

/// Lifecycle hooks for the header and elements of an [`Array`][crate::Array].
///
/// Only the constructors and the copy transforms are mandatory; the growth transforms default
/// to the copy transforms, while the finalizers default to doing nothing.
pub trait ArrayHooks {
    /// The per-array header record.
    type Header;

    /// The element type.
    type Elt;

    /// Constructs the header of a newly created array.
    fn init_header(&self) -> Self::Header;

    /// Constructs the element at `index` when an array is created or grows past `index`.
    fn init_elt(&self, index: usize) -> Self::Elt;

    /// Constructs the header of a duplicate array.
    fn copy_header(&self, original: &Self::Header) -> Self::Header;

    /// Constructs the element at `index` of a duplicate array.
    fn copy_elt(&self, index: usize, original: &Self::Elt) -> Self::Elt;

    /// Constructs the header of an array that is relocated to a larger block.
    fn grow_header(&self, original: &Self::Header) -> Self::Header {
        self.copy_header(original)
    }

    /// Constructs the element at `index` of an array that is relocated to a larger block.
    ///
    /// The old element is finalized by [`destroy_elt()`][Self::destroy_elt] right after this
    /// returns. It is handed over mutably so that hooks can move its payload out instead of
    /// cloning it.
    fn grow_elt(&self, index: usize, original: &mut Self::Elt) -> Self::Elt {
        self.copy_elt(index, original)
    }

    /// Records in the header that the array has been shrunk.
    fn mark_truncated(&self, header: &mut Self::Header) {
        _ = header;
    }

    /// Finalizes the header of an array whose block is returned to the allocator.
    fn destroy_header(&self, header: &mut Self::Header) {
        _ = header;
    }

    /// Finalizes the element at `index` when it stops being part of the array.
    fn destroy_elt(&self, index: usize, elt: &mut Self::Elt) {
        _ = index;
        _ = elt;
    }
}

/// Lifecycle hooks for the slots of the [`Queue`][crate::Queue], [`Stack`][crate::Stack] and
/// [`TagList`][crate::TagList] containers.
///
/// A slot always holds a value: vacant slots hold whatever [`init()`][Self::init] produced for
/// them, and a slot whose value is taken out or cleared is re-initialized.
pub trait SlotHooks {
    /// The value type stored in each slot.
    type Item;

    /// Constructs the vacant value of the slot at `index`.
    fn init(&self, index: usize) -> Self::Item;

    /// Constructs the value of the slot at `index` in a duplicate container.
    fn copy(&self, index: usize, original: &Self::Item) -> Self::Item;

    /// Finalizes the value of the slot at `index` when it is cleared or deleted.
    fn destroy(&self, index: usize, item: &mut Self::Item) {
        _ = index;
        _ = item;
    }
}
