use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::{Array, ArrayHooks};

/// A reference-counted [`Array`].
///
/// Cloning the handle (or calling [`retain()`][Self::retain]) aliases the same array and
/// increments its reference count; the array is dropped, and its block recycled, when the
/// last handle goes away. [`duplicate()`][Self::duplicate] creates an independent array with a
/// reference count of 1.
///
/// Resizing needs exclusive ownership because it may relocate the array: use
/// [`try_unwrap()`][Self::try_unwrap] to take the array back out of the last handle.
///
/// # Examples
///
/// ```
/// use recycle_pool::{ArrayAllocator, ArrayHooks, SharedArray};
///
/// struct Bytes;
///
/// impl ArrayHooks for Bytes {
///     type Header = ();
///     type Elt = u8;
///
///     fn init_header(&self) {}
///
///     fn init_elt(&self, _index: usize) -> u8 {
///         0
///     }
///
///     fn copy_header(&self, _original: &()) {}
///
///     fn copy_elt(&self, _index: usize, original: &u8) -> u8 {
///         *original
///     }
/// }
///
/// let allocator = ArrayAllocator::new(Bytes);
/// let shared = SharedArray::new(allocator.create(4));
///
/// let alias = shared.retain();
/// alias.borrow_mut().as_mut_slice()[0] = 42;
/// assert_eq!(shared.borrow().as_slice(), &[42, 0, 0, 0]);
/// assert_eq!(shared.refcount(), 2);
///
/// alias.release();
/// let array = shared.try_unwrap().unwrap().resize(8);
/// assert_eq!(array.len(), 8);
/// ```
pub struct SharedArray<H: ArrayHooks> {
    array: Rc<RefCell<Array<H>>>,
}

impl<H: ArrayHooks> SharedArray<H> {
    /// Wraps an array in a handle with a reference count of 1.
    #[must_use]
    pub fn new(array: Array<H>) -> Self {
        Self {
            array: Rc::new(RefCell::new(array)),
        }
    }

    /// Creates another handle to the same array, incrementing its reference count.
    #[must_use]
    pub fn retain(&self) -> Self {
        self.clone()
    }

    /// Drops this handle, decrementing the reference count of the array.
    ///
    /// If this was the last handle, the array is dropped and its block recycled.
    pub fn release(self) {
        drop(self);
    }

    /// The number of handles to the array.
    #[must_use]
    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.array)
    }

    /// Creates an independent copy of the array through the copy hooks, with a reference
    /// count of 1.
    ///
    /// # Panics
    ///
    /// Panics if the array is currently mutably borrowed, or if the storage for the copy
    /// cannot be reserved.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self::new(self.array.borrow().duplicate())
    }

    /// Immutably borrows the array.
    ///
    /// # Panics
    ///
    /// Panics if the array is currently mutably borrowed through another handle.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, Array<H>> {
        self.array.borrow()
    }

    /// Mutably borrows the array.
    ///
    /// # Panics
    ///
    /// Panics if the array is currently borrowed through another handle.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, Array<H>> {
        self.array.borrow_mut()
    }

    /// The address of the array's first element slot.
    ///
    /// # Panics
    ///
    /// Panics if the array is currently mutably borrowed.
    #[must_use]
    pub fn as_ptr(&self) -> *const H::Elt {
        self.array.borrow().as_ptr()
    }

    /// Whether two handles refer to the same array.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.array, &other.array)
    }

    /// Takes the array out of the handle if this is the last handle to it, otherwise returns
    /// the handle unchanged.
    pub fn try_unwrap(self) -> Result<Array<H>, Self> {
        Rc::try_unwrap(self.array)
            .map(RefCell::into_inner)
            .map_err(|array| Self { array })
    }
}

impl<H: ArrayHooks> Clone for SharedArray<H> {
    fn clone(&self) -> Self {
        Self {
            array: Rc::clone(&self.array),
        }
    }
}

impl<H: ArrayHooks> From<Array<H>> for SharedArray<H> {
    fn from(array: Array<H>) -> Self {
        Self::new(array)
    }
}

impl<H: ArrayHooks> fmt::Debug for SharedArray<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedArray")
            .field("refcount", &self.refcount())
            .field("array", &self.array)
            .finish()
    }
}
