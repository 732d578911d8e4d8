use std::any::type_name;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::slice;

use tracing::{debug, trace};

use crate::error::Result;
use crate::{ArrayAllocatorBuilder, ArrayHooks, GrowthPolicy, ResizeError};

const BLOCK_PRESENT: &str = "the block is only taken out of an array while it is being dropped";

/// Creates [`Array`]s and recycles the blocks of dropped arrays.
///
/// Every block belongs to the size class its [`GrowthPolicy`] assigns to the element count it
/// was created for, and provides the capacity of that class. Dropped arrays return their block
/// to a free list for its class, from which later arrays of the same class are served, most
/// recently recycled block first. Blocks of size class [`max_classes()`][Self::max_classes] or
/// above are returned to the system instead.
///
/// The allocator is a cheap handle to shared state. Clones share the same free lists, and
/// arrays keep that state alive for as long as they exist.
///
/// # Examples
///
/// ```
/// use recycle_pool::{ArrayAllocator, ArrayHooks, GrowthPolicy};
///
/// struct Squares;
///
/// impl ArrayHooks for Squares {
///     type Header = ();
///     type Elt = usize;
///
///     fn init_header(&self) {}
///
///     fn init_elt(&self, index: usize) -> usize {
///         index * index
///     }
///
///     fn copy_header(&self, _original: &()) {}
///
///     fn copy_elt(&self, _index: usize, original: &usize) -> usize {
///         *original
///     }
/// }
///
/// let allocator = ArrayAllocator::builder()
///     .policy(GrowthPolicy::Log2)
///     .build(Squares);
///
/// let array = allocator.create(3);
/// assert_eq!(array.as_slice(), &[0, 1, 4]);
///
/// // 3 elements fit a block of class 2 with room for 4 elements, so this stays in place.
/// let address = array.as_ptr();
/// let array = array.resize(4);
/// assert_eq!(array.as_ptr(), address);
/// assert_eq!(array.as_slice(), &[0, 1, 4, 9]);
///
/// // Dropping the array recycles its block for the next array of the same class.
/// drop(array);
/// assert_eq!(allocator.free_blocks(2), 1);
///
/// let reused = allocator.create(4);
/// assert_eq!(reused.as_ptr(), address);
/// ```
pub struct ArrayAllocator<H: ArrayHooks> {
    core: Rc<ArrayCore<H>>,
}

struct ArrayCore<H: ArrayHooks> {
    hooks: H,
    policy: GrowthPolicy,
    max_classes: usize,
    min_increment: usize,

    /// One free list per recycled size class. The last block of a list is reused first.
    free_lists: RefCell<Vec<Vec<Block<H>>>>,
}

/// A block of element storage along with the header of the array that owns it.
struct Block<H: ArrayHooks> {
    header: H::Header,

    /// Every slot that has ever been initialized. The first `len` are the elements of the
    /// array, the rest hold whatever the destroy hook left behind.
    elts: Vec<H::Elt>,

    len: usize,

    /// The size class the block was allocated for; determines its free list.
    class: usize,

    /// The number of elements the size class provides. The vector never reallocates as long
    /// as the block holds no more than this many elements.
    capacity: usize,
}

impl<H: ArrayHooks> Block<H> {
    fn put(&mut self, index: usize, elt: H::Elt) {
        if let Some(slot) = self.elts.get_mut(index) {
            *slot = elt;
        } else {
            debug_assert_eq!(index, self.elts.len(), "slots are initialized in index order");
            debug_assert!(index < self.capacity, "slot {index} is beyond block capacity");

            self.elts.push(elt);
        }
    }

    fn valid(&self) -> &[H::Elt] {
        self.elts
            .get(..self.len)
            .expect("every element of the array is an initialized slot")
    }

    fn valid_mut(&mut self) -> &mut [H::Elt] {
        self.elts
            .get_mut(..self.len)
            .expect("every element of the array is an initialized slot")
    }
}

impl<H: ArrayHooks> ArrayCore<H> {
    /// Obtains a block able to hold `len` elements, preferring the most recently recycled
    /// block of the matching size class. The header is only constructed once storage has
    /// been secured; the returned block has no elements.
    fn obtain(&self, len: usize, header: impl FnOnce() -> H::Header) -> Result<Block<H>> {
        let (class, capacity) = self.policy.classify(len)?;

        let recycled = self
            .free_lists
            .borrow_mut()
            .get_mut(class)
            .and_then(Vec::pop);

        if let Some(mut block) = recycled {
            trace!(class, capacity, "reusing recycled block");

            // Replaces whatever header the destroy hook left behind.
            block.header = header();
            block.len = 0;
            return Ok(block);
        }

        let mut elts = Vec::new();

        // A block always has room for at least one element, so every block has its own address.
        elts.try_reserve_exact(capacity.max(1))?;

        trace!(class, capacity, "allocated fresh block");

        Ok(Block {
            header: header(),
            elts,
            len: 0,
            class,
            capacity,
        })
    }

    fn recycle(&self, block: Block<H>) {
        let class = block.class;

        let discarded = match self.free_lists.borrow_mut().get_mut(class) {
            Some(free_list) => {
                free_list.push(block);
                None
            }
            None => Some(block),
        };

        if discarded.is_some() {
            trace!(
                class,
                max_classes = self.max_classes,
                "size class is not recycled, released block"
            );
        } else {
            trace!(class, "recycled block");
        }

        // Element destructors may use other allocators, so they run after the free lists
        // are no longer borrowed.
        drop(discarded);
    }
}

impl<H: ArrayHooks> ArrayAllocator<H> {
    pub(crate) fn new_inner(
        hooks: H,
        policy: GrowthPolicy,
        max_classes: usize,
        min_increment: usize,
    ) -> Self {
        Self {
            core: Rc::new(ArrayCore {
                hooks,
                policy,
                max_classes,
                min_increment,
                free_lists: RefCell::new((0..max_classes).map(|_| Vec::new()).collect()),
            }),
        }
    }

    /// Creates a new [`ArrayAllocator`] with the default configuration.
    #[must_use]
    pub fn new(hooks: H) -> Self {
        Self::builder().build(hooks)
    }

    /// Starts building a new [`ArrayAllocator`].
    ///
    /// Use this when you want to customize the allocator configuration beyond the defaults.
    pub fn builder() -> ArrayAllocatorBuilder<H> {
        ArrayAllocatorBuilder::new()
    }

    /// Creates an array of `len` elements.
    ///
    /// The header is constructed by [`init_header()`][ArrayHooks::init_header] and each element
    /// by [`init_elt()`][ArrayHooks::init_elt].
    ///
    /// # Panics
    ///
    /// Panics if the storage for the array cannot be reserved.
    #[must_use]
    pub fn create(&self, len: usize) -> Array<H> {
        self.try_create(len)
            .unwrap_or_else(|error| panic!("could not create array of {len} elements: {error}"))
    }

    /// Creates an array of `len` elements, returning an error if its storage cannot be
    /// reserved.
    pub fn try_create(&self, len: usize) -> Result<Array<H>> {
        let core = &self.core;

        let mut block = core.obtain(len, || core.hooks.init_header())?;

        for index in 0..len {
            block.put(index, core.hooks.init_elt(index));
        }

        block.len = len;

        Ok(Array {
            block: Some(block),
            core: Rc::clone(core),
        })
    }

    /// The growth policy the allocator assigns size classes with.
    #[must_use]
    pub fn policy(&self) -> GrowthPolicy {
        self.core.policy
    }

    /// The number of size classes whose blocks are recycled.
    #[must_use]
    pub fn max_classes(&self) -> usize {
        self.core.max_classes
    }

    /// The slack containers built on this allocator add when they grow.
    #[must_use]
    pub fn min_increment(&self) -> usize {
        self.core.min_increment
    }

    /// The hooks the allocator was built with.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.core.hooks
    }

    /// The number of recycled blocks of size class `class` waiting to be reused.
    #[must_use]
    pub fn free_blocks(&self, class: usize) -> usize {
        self.core
            .free_lists
            .borrow()
            .get(class)
            .map_or(0, Vec::len)
    }

    /// Calls `f` with the header and the slots of the most recently recycled block of size
    /// class `class`, as left behind by the destroy hooks.
    ///
    /// The slots include every slot the block has ever initialized, not only those of the
    /// array that last used it. Returns `None` if there is no recycled block of that class.
    pub fn inspect_free<R>(
        &self,
        class: usize,
        f: impl FnOnce(&H::Header, &[H::Elt]) -> R,
    ) -> Option<R> {
        let block = self
            .core
            .free_lists
            .borrow_mut()
            .get_mut(class)
            .and_then(Vec::pop)?;

        let result = f(&block.header, &block.elts);

        // Put it back where it was so the inspection leaves no trace.
        self.core.recycle(block);

        Some(result)
    }
}

impl<H: ArrayHooks> Clone for ArrayAllocator<H> {
    /// Creates another handle to the same allocator, sharing its free lists.
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<H: ArrayHooks> fmt::Debug for ArrayAllocator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayAllocator")
            .field("element_type", &format_args!("{}", type_name::<H::Elt>()))
            .field("policy", &self.core.policy)
            .field("max_classes", &self.core.max_classes)
            .field("min_increment", &self.core.min_increment)
            .finish_non_exhaustive()
    }
}

/// A growable array with a caller-defined header, created by an [`ArrayAllocator`].
///
/// The array stores its elements in a block sized for the array's size class. Operations that
/// may move the array to a different block consume the array and return it again, so any
/// relocation is visible at the call site.
///
/// When an array is dropped, [`destroy_elt()`][ArrayHooks::destroy_elt] runs for every element
/// and [`destroy_header()`][ArrayHooks::destroy_header] for the header, after which the block is
/// recycled by the allocator.
pub struct Array<H: ArrayHooks> {
    block: Option<Block<H>>,
    core: Rc<ArrayCore<H>>,
}

impl<H: ArrayHooks> Array<H> {
    fn block(&self) -> &Block<H> {
        self.block.as_ref().expect(BLOCK_PRESENT)
    }

    fn block_mut(&mut self) -> &mut Block<H> {
        self.block.as_mut().expect(BLOCK_PRESENT)
    }

    /// The number of elements in the array.
    #[must_use]
    pub fn len(&self) -> usize {
        self.block().len
    }

    /// Whether the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of elements the array can hold before growing forces it to relocate.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.block().capacity
    }

    /// The size class of the block the array is stored in.
    #[must_use]
    pub fn class(&self) -> usize {
        self.block().class
    }

    /// The header of the array.
    #[must_use]
    pub fn header(&self) -> &H::Header {
        &self.block().header
    }

    /// The header of the array.
    #[must_use]
    pub fn header_mut(&mut self) -> &mut H::Header {
        &mut self.block_mut().header
    }

    /// The elements of the array.
    #[must_use]
    pub fn as_slice(&self) -> &[H::Elt] {
        self.block().valid()
    }

    /// The elements of the array.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [H::Elt] {
        self.block_mut().valid_mut()
    }

    /// The element at `index`, or `None` if the array is not that long.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&H::Elt> {
        self.as_slice().get(index)
    }

    /// The element at `index`, or `None` if the array is not that long.
    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut H::Elt> {
        self.as_mut_slice().get_mut(index)
    }

    /// Iterates over the elements of the array.
    pub fn iter(&self) -> slice::Iter<'_, H::Elt> {
        self.as_slice().iter()
    }

    /// The address of the first element slot of the array's block.
    ///
    /// The address changes exactly when the array is relocated to a different block.
    #[must_use]
    pub fn as_ptr(&self) -> *const H::Elt {
        self.block().elts.as_ptr()
    }

    /// A slot of the array's block beyond the end of the array.
    ///
    /// Slots that were cut off by shrinking the array keep the payload left behind by
    /// [`destroy_elt()`][ArrayHooks::destroy_elt] until the array grows over them again.
    /// Returns `None` for indexes inside the array and for slots that were never initialized.
    #[must_use]
    pub fn spare_slot(&self, index: usize) -> Option<&H::Elt> {
        let block = self.block();

        if index < block.len {
            return None;
        }

        block.elts.get(index)
    }

    /// The hooks of the allocator the array was created by.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.core.hooks
    }

    /// The allocator the array was created by.
    #[must_use]
    pub fn allocator(&self) -> ArrayAllocator<H> {
        ArrayAllocator {
            core: Rc::clone(&self.core),
        }
    }

    pub(crate) fn min_increment(&self) -> usize {
        self.core.min_increment
    }

    /// The hooks, the header and the elements, borrowed together so containers can run hooks
    /// while they rearrange the elements.
    pub(crate) fn parts_mut(&mut self) -> (&H, &mut H::Header, &mut [H::Elt]) {
        let Self { block, core } = self;
        let block = block.as_mut().expect(BLOCK_PRESENT);
        let len = block.len;

        let elts = block
            .elts
            .get_mut(..len)
            .expect("every element of the array is an initialized slot");

        (&core.hooks, &mut block.header, elts)
    }

    /// Creates an independent copy of the array.
    ///
    /// The copy is constructed by [`copy_header()`][ArrayHooks::copy_header] and
    /// [`copy_elt()`][ArrayHooks::copy_elt] in a block of the same size class, which is taken
    /// from the free list if one is available.
    ///
    /// # Panics
    ///
    /// Panics if the storage for the copy cannot be reserved.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let core = &self.core;
        let source = self.block();

        let mut block = core
            .obtain(source.len, || core.hooks.copy_header(&source.header))
            .unwrap_or_else(|error| {
                panic!("could not duplicate array of {} elements: {error}", source.len)
            });

        for (index, elt) in source.valid().iter().enumerate() {
            block.put(index, core.hooks.copy_elt(index, elt));
        }

        block.len = source.len;

        Self {
            block: Some(block),
            core: Rc::clone(core),
        }
    }

    /// Changes the number of elements in the array to `len`.
    ///
    /// * Shrinking always happens in place. [`destroy_elt()`][ArrayHooks::destroy_elt] runs for
    ///   each removed element, after which [`mark_truncated()`][ArrayHooks::mark_truncated]
    ///   runs on the header.
    /// * Growing happens in place if `len` fits the size class of the current block. Otherwise
    ///   the array moves to a block of the new size class: the header is constructed by
    ///   [`grow_header()`][ArrayHooks::grow_header] and existing elements by
    ///   [`grow_elt()`][ArrayHooks::grow_elt]. The old block is then torn down like a dropped
    ///   array: [`destroy_elt()`][ArrayHooks::destroy_elt] runs for each old element and
    ///   [`destroy_header()`][ArrayHooks::destroy_header] for the old header before the block
    ///   is recycled.
    /// * In both growth cases the new elements are constructed by
    ///   [`init_elt()`][ArrayHooks::init_elt].
    ///
    /// # Panics
    ///
    /// Panics if the array needs to relocate and the storage for the new block cannot be
    /// reserved.
    #[must_use]
    pub fn resize(self, len: usize) -> Self {
        self.try_resize(len)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Changes the number of elements in the array to `len`, returning an error if the array
    /// needs to relocate and the storage for the new block cannot be reserved.
    ///
    /// On failure the array is handed back unchanged through the error.
    pub fn try_resize(mut self, len: usize) -> Result<Self, ResizeError<H>> {
        match self.set_len(len) {
            Ok(()) => Ok(self),
            Err(error) => Err(ResizeError::new(self, error)),
        }
    }

    /// Ensures that the indexes `pos..pos + count` are inside the array, growing it to exactly
    /// `pos + count` elements if it is shorter than that.
    ///
    /// # Panics
    ///
    /// Panics if the array needs to relocate and the storage for the new block cannot be
    /// reserved.
    #[must_use]
    pub fn ensure_size(self, pos: usize, count: usize) -> Self {
        self.try_ensure_size(pos, count)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Ensures that the indexes `pos..pos + count` are inside the array, returning an error if
    /// the array needs to relocate and the storage for the new block cannot be reserved.
    ///
    /// On failure the array is handed back unchanged through the error.
    pub fn try_ensure_size(
        mut self,
        pos: usize,
        count: usize,
    ) -> Result<Self, ResizeError<H>> {
        match self.ensure_len(pos, count) {
            Ok(()) => Ok(self),
            Err(error) => Err(ResizeError::new(self, error)),
        }
    }

    pub(crate) fn ensure_len(&mut self, pos: usize, count: usize) -> Result<()> {
        // An overflowing end cannot be satisfied; saturating makes it fail classification or
        // reservation without touching the array.
        let required = pos.saturating_add(count);

        if required <= self.len() {
            return Ok(());
        }

        self.set_len(required)
    }

    /// Resizes the array in place of the handle. Fails only before anything is modified.
    pub(crate) fn set_len(&mut self, len: usize) -> Result<()> {
        let Self { block, core } = self;
        let current = block.as_mut().expect(BLOCK_PRESENT);
        let old_len = current.len;

        match len.cmp(&old_len) {
            Ordering::Equal => {}
            Ordering::Less => {
                let removed = current
                    .elts
                    .get_mut(len..old_len)
                    .expect("every element of the array is an initialized slot");

                for (index, elt) in (len..old_len).zip(removed.iter_mut()) {
                    core.hooks.destroy_elt(index, elt);
                }

                current.len = len;
                core.hooks.mark_truncated(&mut current.header);

                trace!(from = old_len, to = len, "truncated array");
            }
            Ordering::Greater if core.policy.class_of(len) <= current.class => {
                for index in old_len..len {
                    current.put(index, core.hooks.init_elt(index));
                }

                current.len = len;

                trace!(from = old_len, to = len, class = current.class, "grew array in place");
            }
            Ordering::Greater => {
                let mut grown = core.obtain(len, || core.hooks.grow_header(&current.header))?;

                // Nothing below can fail, so the array is never left half-moved.
                let mut old = block.take().expect(BLOCK_PRESENT);

                for (index, elt) in old.valid_mut().iter_mut().enumerate() {
                    let moved = core.hooks.grow_elt(index, elt);
                    core.hooks.destroy_elt(index, elt);
                    grown.put(index, moved);
                }

                for index in old_len..len {
                    grown.put(index, core.hooks.init_elt(index));
                }

                grown.len = len;

                core.hooks.destroy_header(&mut old.header);
                old.len = 0;

                debug!(
                    from_class = old.class,
                    to_class = grown.class,
                    from = old_len,
                    to = len,
                    "relocated array to a larger block"
                );

                *block = Some(grown);
                core.recycle(old);
            }
        }

        Ok(())
    }
}

impl<H: ArrayHooks> Drop for Array<H> {
    fn drop(&mut self) {
        let Some(mut block) = self.block.take() else {
            return;
        };

        for (index, elt) in block.valid_mut().iter_mut().enumerate() {
            self.core.hooks.destroy_elt(index, elt);
        }

        self.core.hooks.destroy_header(&mut block.header);
        block.len = 0;

        self.core.recycle(block);
    }
}

impl<H: ArrayHooks> fmt::Debug for Array<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.block {
            Some(block) => f
                .debug_struct("Array")
                .field("element_type", &format_args!("{}", type_name::<H::Elt>()))
                .field("len", &block.len)
                .field("capacity", &block.capacity)
                .field("class", &block.class)
                .finish_non_exhaustive(),
            None => f.debug_struct("Array").finish_non_exhaustive(),
        }
    }
}

impl<'a, H: ArrayHooks> IntoIterator for &'a Array<H> {
    type Item = &'a H::Elt;
    type IntoIter = slice::Iter<'a, H::Elt>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::num::NonZero;

    use super::*;

    const INITIAL: u32 = 0x12345;
    const TRUNCATED: u32 = 0x8000_0000;
    const DESTROYED: u32 = 0xdead_beef;

    struct Simple;

    impl ArrayHooks for Simple {
        type Header = u32;
        type Elt = u32;

        fn init_header(&self) -> u32 {
            INITIAL
        }

        fn init_elt(&self, index: usize) -> u32 {
            u32::try_from(index).unwrap()
        }

        fn copy_header(&self, original: &u32) -> u32 {
            original + 1
        }

        fn copy_elt(&self, _index: usize, original: &u32) -> u32 {
            original + 1
        }

        fn grow_header(&self, original: &u32) -> u32 {
            original << 4
        }

        fn grow_elt(&self, _index: usize, original: &mut u32) -> u32 {
            *original << 4
        }

        fn mark_truncated(&self, header: &mut u32) {
            *header |= TRUNCATED;
        }

        fn destroy_header(&self, header: &mut u32) {
            *header = DESTROYED;
        }

        fn destroy_elt(&self, _index: usize, elt: &mut u32) {
            *elt = DESTROYED;
        }
    }

    fn linear() -> ArrayAllocator<Simple> {
        ArrayAllocator::new(Simple)
    }

    fn log2() -> ArrayAllocator<Simple> {
        ArrayAllocator::builder()
            .policy(GrowthPolicy::Log2)
            .build(Simple)
    }

    fn linear2() -> ArrayAllocator<Simple> {
        ArrayAllocator::builder()
            .policy(GrowthPolicy::ScaledLinear {
                scale: NonZero::new(2).unwrap(),
            })
            .build(Simple)
    }

    #[test]
    fn create_initializes_every_element() {
        let array = linear().create(4);

        assert_eq!(array.len(), 4);
        assert_eq!(*array.header(), INITIAL);
        assert_eq!(array.as_slice(), &[0, 1, 2, 3]);
        assert_eq!(array.spare_slot(4), None);
    }

    #[test]
    fn empty_array_has_own_address() {
        let allocator = linear();

        let a = allocator.create(0);
        let b = allocator.create(0);

        assert!(a.is_empty());
        assert_ne!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn drop_destroys_and_recycles() {
        let allocator = linear();

        let array = allocator.create(3);
        let address = array.as_ptr();
        drop(array);

        assert_eq!(allocator.free_blocks(3), 1);
        assert_eq!(
            allocator.inspect_free(3, |header, elts| (*header, elts.to_vec())),
            Some((DESTROYED, vec![DESTROYED; 3]))
        );

        // Inspection leaves the block in place.
        assert_eq!(allocator.free_blocks(3), 1);

        let reused = allocator.create(3);
        assert_eq!(reused.as_ptr(), address);
        assert_eq!(reused.as_slice(), &[0, 1, 2]);
        assert_eq!(*reused.header(), INITIAL);
        assert_eq!(allocator.free_blocks(3), 0);
    }

    #[test]
    fn shrink_is_in_place() {
        let array = linear().create(4);
        let address = array.as_ptr();

        let array = array.resize(3);

        assert_eq!(array.as_ptr(), address);
        assert_eq!(array.as_slice(), &[0, 1, 2]);
        assert_eq!(*array.header(), INITIAL | TRUNCATED);
        assert_eq!(array.spare_slot(3), Some(&DESTROYED));
        assert_eq!(array.spare_slot(2), None);
    }

    #[test]
    fn grow_back_after_shrink_is_in_place() {
        let array = linear().create(4).resize(2);
        let address = array.as_ptr();

        let array = array.resize(4);

        assert_eq!(array.as_ptr(), address);
        assert_eq!(array.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn relocating_growth_transforms_old_and_initializes_new() {
        let allocator = linear();
        let array = allocator.create(3);
        let address = array.as_ptr();

        let array = array.resize(4);

        assert_ne!(array.as_ptr(), address);
        assert_eq!(array.as_slice(), &[0, 1 << 4, 2 << 4, 3]);
        assert_eq!(*array.header(), INITIAL << 4);

        // The old block was torn down like a dropped array before it was recycled.
        assert_eq!(allocator.free_blocks(3), 1);
        assert_eq!(
            allocator.inspect_free(3, |header, elts| (*header, elts.to_vec())),
            Some((DESTROYED, vec![DESTROYED; 3]))
        );
    }

    #[test]
    fn relocating_growth_keeps_spare_slots_of_old_block() {
        let allocator = linear();
        let array = allocator.create(3).resize(2);

        let array = array.resize(4);
        assert_eq!(array.as_slice(), &[0, 1 << 4, 2, 3]);

        // The slot cut off by shrinking stays at its index in the recycled block.
        assert_eq!(
            allocator.inspect_free(3, |_, elts| elts.to_vec()),
            Some(vec![DESTROYED; 3])
        );
    }

    #[test]
    fn log2_growth_within_class_is_in_place() {
        let array = log2().create(9);
        let address = array.as_ptr();
        assert_eq!(array.capacity(), 16);

        let array = array.resize(10);

        assert_eq!(array.as_ptr(), address);
        assert_eq!(array.get(9), Some(&9));
    }

    #[test]
    fn linear2_growth_within_class_is_in_place() {
        let array = linear2().create(8);
        let address = array.as_ptr();
        assert_eq!(array.capacity(), 10);

        let array = array.resize(9);

        assert_eq!(array.as_ptr(), address);
    }

    #[test]
    fn blocks_beyond_max_classes_are_not_recycled() {
        let allocator = ArrayAllocator::builder().max_classes(2).build(Simple);

        drop(allocator.create(1));
        drop(allocator.create(2));

        assert_eq!(allocator.free_blocks(1), 1);
        assert_eq!(allocator.free_blocks(2), 0);
        assert_eq!(allocator.inspect_free(2, |header, _| *header), None);
    }

    #[test]
    fn duplicate_uses_copy_hooks() {
        let allocator = linear();
        let original = allocator.create(3);

        let copy = original.duplicate();

        assert_ne!(copy.as_ptr(), original.as_ptr());
        assert_eq!(copy.as_slice(), &[1, 2, 3]);
        assert_eq!(*copy.header(), INITIAL + 1);

        drop(original);
        assert_eq!(copy.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn ensure_size_grows_to_exact_end() {
        let array = linear().create(2);
        let address = array.as_ptr();

        let array = array.ensure_size(1, 1);
        assert_eq!(array.as_ptr(), address);
        assert_eq!(array.len(), 2);

        let array = array.ensure_size(3, 2);
        assert_eq!(array.len(), 5);
    }

    #[test]
    fn failed_resize_leaves_array_intact() {
        let array = log2().create(3);
        let address = array.as_ptr();

        let error = array.try_resize(usize::MAX).unwrap_err();
        assert!(matches!(error.error(), crate::Error::CapacityOverflow { .. }));

        let array = error.into_array();
        assert_eq!(array.as_ptr(), address);
        assert_eq!(array.as_slice(), &[0, 1, 2]);
        assert_eq!(*array.header(), INITIAL);
    }

    #[test]
    fn failed_reservation_leaves_array_intact() {
        let array = linear().create(3);

        let error = array.try_ensure_size(usize::MAX, 1).unwrap_err();
        assert!(matches!(error.error(), crate::Error::Allocation(_)));

        let array = error.into_array();
        assert_eq!(array.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn try_create_reports_overflow() {
        let result = log2().try_create(usize::MAX);

        assert!(matches!(result, Err(crate::Error::CapacityOverflow { .. })));
    }

    #[test]
    fn iteration_covers_elements_only() {
        let array = linear().create(3).resize(2);

        let collected: Vec<_> = (&array).into_iter().copied().collect();
        assert_eq!(collected, vec![0, 1]);
    }
}
