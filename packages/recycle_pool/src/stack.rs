use std::{fmt, mem, slice};

use tracing::debug;

use crate::error::Result;
use crate::{Array, ArrayAllocator, ArrayHooks, PoolHooks, Shared, SharedSlots, SlotHooks};

/// An [`ArrayAllocator`] that creates the storage of [`Stack`]s.
pub type StackAllocator<H> = ArrayAllocator<StackSlots<H>>;

/// Array hooks that store the slots of a [`Stack`], delegating slot lifecycle to `H`.
#[derive(Debug)]
pub struct StackSlots<H> {
    hooks: H,
}

impl<H: SlotHooks> StackSlots<H> {
    /// Creates stack storage hooks that delegate slot lifecycle to `hooks`.
    #[must_use]
    pub fn new(hooks: H) -> Self {
        Self { hooks }
    }

    /// The slot hooks.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

/// The number of occupied slots of a [`Stack`], kept in the header of its storage.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StackTop {
    top: usize,
}

impl StackTop {
    /// One past the index of the topmost occupied slot.
    #[must_use]
    pub fn top(self) -> usize {
        self.top
    }
}

impl<H: SlotHooks> ArrayHooks for StackSlots<H> {
    type Header = StackTop;
    type Elt = H::Item;

    fn init_header(&self) -> StackTop {
        StackTop::default()
    }

    fn init_elt(&self, index: usize) -> H::Item {
        self.hooks.init(index)
    }

    fn copy_header(&self, original: &StackTop) -> StackTop {
        *original
    }

    fn copy_elt(&self, index: usize, original: &H::Item) -> H::Item {
        self.hooks.copy(index, original)
    }

    fn grow_elt(&self, index: usize, original: &mut H::Item) -> H::Item {
        mem::replace(original, self.hooks.init(index))
    }
}

/// A LIFO stack over size-classed array storage.
///
/// Slots `0..top()` hold the items, bottom first. The rest hold vacant values constructed by
/// [`SlotHooks::init()`]. A push onto a full stack grows the storage by `1 + min_increment`
/// slots, where `min_increment` comes from the allocator.
///
/// # Examples
///
/// ```
/// use recycle_pool::{SlotHooks, Stack, StackAllocator, StackSlots};
///
/// struct Numbers;
///
/// impl SlotHooks for Numbers {
///     type Item = i64;
///
///     fn init(&self, _index: usize) -> i64 {
///         0
///     }
///
///     fn copy(&self, _index: usize, original: &i64) -> i64 {
///         *original
///     }
/// }
///
/// let allocator = StackAllocator::new(StackSlots::new(Numbers));
/// let mut stack = Stack::new(&allocator);
///
/// stack.push(1);
/// stack.push(2);
///
/// assert_eq!(stack.peek(), Some(&2));
/// assert_eq!(stack.pop(), 2);
/// assert_eq!(stack.pop(), 1);
/// assert!(stack.is_empty());
/// ```
pub struct Stack<H: SlotHooks> {
    storage: Array<StackSlots<H>>,
}

impl<H: SlotHooks> Stack<H> {
    /// Creates an empty stack without any slots.
    #[must_use]
    pub fn new(allocator: &StackAllocator<H>) -> Self {
        Self::with_capacity(allocator, 0)
    }

    /// Creates an empty stack with `capacity` vacant slots.
    ///
    /// # Panics
    ///
    /// Panics if the storage cannot be reserved.
    #[must_use]
    pub fn with_capacity(allocator: &StackAllocator<H>, capacity: usize) -> Self {
        Self {
            storage: allocator.create(capacity),
        }
    }

    /// Creates an empty stack with `capacity` vacant slots, returning an error if the storage
    /// cannot be reserved.
    pub fn try_with_capacity(allocator: &StackAllocator<H>, capacity: usize) -> Result<Self> {
        Ok(Self {
            storage: allocator.try_create(capacity)?,
        })
    }

    /// The number of items on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.header().top
    }

    /// One past the index of the topmost occupied slot. Equal to [`len()`][Self::len].
    #[must_use]
    pub fn top(&self) -> usize {
        self.len()
    }

    /// Whether the stack holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of slots in the stack's storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// The address of the first slot of the stack's storage.
    ///
    /// The address changes exactly when growing relocates the storage.
    #[must_use]
    pub fn as_ptr(&self) -> *const H::Item {
        self.storage.as_ptr()
    }

    /// The value of the slot at `index`, whether or not it holds an item.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&H::Item> {
        self.storage.get(index)
    }

    /// The topmost item, or `None` if the stack is empty.
    #[must_use]
    pub fn peek(&self) -> Option<&H::Item> {
        self.iter().next_back()
    }

    /// Iterates over the items from the bottom of the stack to the top.
    pub fn iter(&self) -> slice::Iter<'_, H::Item> {
        self.storage
            .as_slice()
            .get(..self.len())
            .expect("top is always inside the storage")
            .iter()
    }

    /// The slot hooks of the stack.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.storage.hooks().hooks
    }

    /// Pushes an item onto the stack.
    ///
    /// # Panics
    ///
    /// Panics if the stack needs to grow and the storage cannot be reserved.
    pub fn push(&mut self, item: H::Item) {
        if self.len() == self.capacity() {
            self.grow();
        }

        let (_, top, slots) = self.storage.parts_mut();

        let slot = slots
            .get_mut(top.top)
            .expect("a stack that is not full has a vacant slot at top");
        *slot = item;

        top.top = top
            .top
            .checked_add(1)
            .expect("top is below the slot count, so it can be incremented");
    }

    /// Removes and returns the topmost item.
    ///
    /// The slot it occupied is re-initialized as vacant.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty.
    pub fn pop(&mut self) -> H::Item {
        assert!(!self.is_empty(), "cannot pop from an empty stack");

        let (slot_hooks, top, slots) = self.storage.parts_mut();
        let index = top
            .top
            .checked_sub(1)
            .expect("top of a non-empty stack is above zero");

        let slot = slots
            .get_mut(index)
            .expect("the slot below top of a non-empty stack is occupied");
        let item = mem::replace(slot, slot_hooks.hooks.init(index));

        top.top = index;

        item
    }

    /// Removes all items, keeping the storage.
    ///
    /// Each item is finalized by [`SlotHooks::destroy()`] and its slot re-initialized as vacant.
    pub fn clear(&mut self) {
        let (slot_hooks, top, slots) = self.storage.parts_mut();

        let occupied = slots
            .get_mut(..top.top)
            .expect("top is always inside the storage");

        for (index, slot) in occupied.iter_mut().enumerate() {
            slot_hooks.hooks.destroy(index, slot);
            *slot = slot_hooks.hooks.init(index);
        }

        top.top = 0;
    }

    /// Creates an independent copy of the stack, with every slot constructed by
    /// [`SlotHooks::copy()`].
    ///
    /// # Panics
    ///
    /// Panics if the storage for the copy cannot be reserved.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            storage: self.storage.duplicate(),
        }
    }

    /// Grows the storage so that at least `additional` more items fit without growing again.
    ///
    /// On failure the stack is left unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let len = self.len();
        self.storage.ensure_len(len, additional)
    }

    fn grow(&mut self) {
        let capacity = self.capacity();

        let grown = capacity
            .checked_add(1)
            .and_then(|capacity| capacity.checked_add(self.storage.min_increment()))
            .expect("a stack with that many slots cannot exist in memory");

        self.storage
            .set_len(grown)
            .unwrap_or_else(|error| panic!("could not grow stack to {grown} slots: {error}"));

        debug!(from = capacity, to = grown, "grew stack");
    }
}

impl<P: PoolHooks> Stack<SharedSlots<P>> {
    /// Pushes a new reference to a shared object onto the stack.
    ///
    /// # Panics
    ///
    /// Panics if the stack needs to grow and the storage cannot be reserved.
    pub fn push_shared(&mut self, item: &Shared<P>) {
        self.push(Some(item.retain()));
    }

    /// Pops the topmost item and hands its reference over to the caller.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty or if the topmost item is a vacant `None`.
    pub fn pop_shared(&mut self) -> Shared<P> {
        self.pop()
            .expect("shared stack items are pushed as objects, not as vacant slots")
    }
}

impl<H: SlotHooks> Drop for Stack<H> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<H: SlotHooks> fmt::Debug for Stack<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("top", &self.len())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
