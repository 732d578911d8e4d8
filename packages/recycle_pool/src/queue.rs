use std::{fmt, mem, slice};

use tracing::{debug, trace};

use crate::error::Result;
use crate::{Array, ArrayAllocator, ArrayHooks, PoolHooks, Shared, SharedSlots, SlotHooks};

/// An [`ArrayAllocator`] that creates the storage of [`Queue`]s.
pub type QueueAllocator<H> = ArrayAllocator<QueueSlots<H>>;

/// Array hooks that store the slots of a [`Queue`], delegating slot lifecycle to `H`.
///
/// # Examples
///
/// ```
/// use recycle_pool::{Queue, QueueAllocator, QueueSlots, SlotHooks};
///
/// struct Numbers;
///
/// impl SlotHooks for Numbers {
///     type Item = u32;
///
///     fn init(&self, _index: usize) -> u32 {
///         0
///     }
///
///     fn copy(&self, _index: usize, original: &u32) -> u32 {
///         *original
///     }
/// }
///
/// let allocator = QueueAllocator::new(QueueSlots::new(Numbers));
/// let mut queue = Queue::with_capacity(&allocator, 8);
///
/// queue.enqueue(1);
/// queue.enqueue(2);
/// queue.enqueue_front(3);
///
/// assert_eq!(queue.dequeue(), 3);
/// assert_eq!(queue.dequeue_back(), 2);
/// assert_eq!(queue.len(), 1);
/// ```
#[derive(Debug)]
pub struct QueueSlots<H> {
    hooks: H,
}

impl<H: SlotHooks> QueueSlots<H> {
    /// Creates queue storage hooks that delegate slot lifecycle to `hooks`.
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

/// The span of occupied slots of a [`Queue`], kept in the header of its storage.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct QueueBounds {
    bottom: usize,
    top: usize,
}

impl QueueBounds {
    /// The index of the first occupied slot.
    #[must_use]
    pub fn bottom(&self) -> usize {
        self.bottom
    }

    /// One past the index of the last occupied slot.
    #[must_use]
    pub fn top(&self) -> usize {
        self.top
    }

    fn len(self) -> usize {
        self.top
            .checked_sub(self.bottom)
            .expect("bottom of a queue never passes its top")
    }
}

impl<H: SlotHooks> ArrayHooks for QueueSlots<H> {
    type Header = QueueBounds;
    type Elt = H::Item;

    fn init_header(&self) -> QueueBounds {
        QueueBounds::default()
    }

    fn init_elt(&self, index: usize) -> H::Item {
        self.hooks.init(index)
    }

    fn copy_header(&self, original: &QueueBounds) -> QueueBounds {
        *original
    }

    fn copy_elt(&self, index: usize, original: &H::Item) -> H::Item {
        self.hooks.copy(index, original)
    }

    fn grow_elt(&self, index: usize, original: &mut H::Item) -> H::Item {
        mem::replace(original, self.hooks.init(index))
    }
}

/// A double-ended queue over size-classed array storage.
///
/// The items occupy one contiguous span of slots, from [`bottom()`][Self::bottom] up to but
/// not including [`top()`][Self::top]. Slots outside the span hold vacant values constructed
/// by [`SlotHooks::init()`].
///
/// * Inserting at the back of a span that touches the end of the storage first moves the span
///   to the start of the storage (left-justifying), or grows the storage if the span already
///   starts there.
/// * Inserting at the front of a span that touches the start of the storage first moves the
///   span to the end of the storage (right-justifying), growing the storage first if it is
///   full.
///
/// Growing adds `1 + min_increment` slots, where `min_increment` comes from the allocator.
///
/// Dropping the queue runs [`SlotHooks::destroy()`] on every item.
pub struct Queue<H: SlotHooks> {
    storage: Array<QueueSlots<H>>,
}

impl<H: SlotHooks> Queue<H> {
    /// Creates an empty queue without any slots.
    #[must_use]
    pub fn new(allocator: &QueueAllocator<H>) -> Self {
        Self::with_capacity(allocator, 0)
    }

    /// Creates an empty queue with `capacity` vacant slots.
    ///
    /// # Panics
    ///
    /// Panics if the storage cannot be reserved.
    #[must_use]
    pub fn with_capacity(allocator: &QueueAllocator<H>, capacity: usize) -> Self {
        Self {
            storage: allocator.create(capacity),
        }
    }

    /// Creates an empty queue with `capacity` vacant slots, returning an error if the storage
    /// cannot be reserved.
    pub fn try_with_capacity(allocator: &QueueAllocator<H>, capacity: usize) -> Result<Self> {
        Ok(Self {
            storage: allocator.try_create(capacity)?,
        })
    }

    fn bounds(&self) -> QueueBounds {
        *self.storage.header()
    }

    /// The number of items in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bounds().len()
    }

    /// Whether the queue holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The index of the slot holding the front item.
    #[must_use]
    pub fn bottom(&self) -> usize {
        self.bounds().bottom
    }

    /// One past the index of the slot holding the back item.
    #[must_use]
    pub fn top(&self) -> usize {
        self.bounds().top
    }

    /// The number of slots in the queue's storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// The address of the first slot of the queue's storage.
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

    /// The front item, or `None` if the queue is empty.
    #[must_use]
    pub fn front(&self) -> Option<&H::Item> {
        self.iter().next()
    }

    /// The back item, or `None` if the queue is empty.
    #[must_use]
    pub fn back(&self) -> Option<&H::Item> {
        self.iter().next_back()
    }

    /// Iterates over the items from front to back.
    pub fn iter(&self) -> slice::Iter<'_, H::Item> {
        let bounds = self.bounds();

        self.storage
            .as_slice()
            .get(bounds.bottom..bounds.top)
            .expect("the occupied span is always inside the storage")
            .iter()
    }

    /// The slot hooks of the queue.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.storage.hooks().hooks
    }

    /// Appends an item at the back of the queue.
    ///
    /// # Panics
    ///
    /// Panics if the queue needs to grow and the storage cannot be reserved.
    pub fn enqueue(&mut self, item: H::Item) {
        self.make_room_at_back();

        let (_, bounds, slots) = self.storage.parts_mut();

        let slot = slots
            .get_mut(bounds.top)
            .expect("we just made room at the back");
        *slot = item;

        bounds.top = bounds
            .top
            .checked_add(1)
            .expect("top is below the slot count, so it can be incremented");
    }

    /// Inserts an item at the front of the queue.
    ///
    /// # Panics
    ///
    /// Panics if the queue needs to grow and the storage cannot be reserved.
    pub fn enqueue_front(&mut self, item: H::Item) {
        if self.is_empty() {
            if self.capacity() == 0 {
                self.grow();
            }

            // An empty queue restarts at the first slot.
            let (_, bounds, slots) = self.storage.parts_mut();
            *slots.first_mut().expect("we just made sure there is a slot") = item;
            bounds.bottom = 0;
            bounds.top = 1;
            return;
        }

        if self.bottom() == 0 {
            if self.top() == self.capacity() {
                self.grow();
            }

            self.right_justify();
        }

        let (_, bounds, slots) = self.storage.parts_mut();

        bounds.bottom = bounds
            .bottom
            .checked_sub(1)
            .expect("we just made room at the front");

        let slot = slots
            .get_mut(bounds.bottom)
            .expect("bottom is always inside the storage");
        *slot = item;
    }

    /// Removes and returns the front item.
    ///
    /// The slot it occupied is re-initialized as vacant.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn dequeue(&mut self) -> H::Item {
        assert!(!self.is_empty(), "cannot dequeue from an empty queue");

        let (slot_hooks, bounds, slots) = self.storage.parts_mut();
        let index = bounds.bottom;

        let slot = slots
            .get_mut(index)
            .expect("bottom of a non-empty queue is an occupied slot");
        let item = mem::replace(slot, slot_hooks.hooks.init(index));

        bounds.bottom = index
            .checked_add(1)
            .expect("bottom is below top, so it can be incremented");

        item
    }

    /// Removes and returns the back item.
    ///
    /// The slot it occupied is re-initialized as vacant.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn dequeue_back(&mut self) -> H::Item {
        assert!(!self.is_empty(), "cannot dequeue from an empty queue");

        let (slot_hooks, bounds, slots) = self.storage.parts_mut();
        let index = bounds
            .top
            .checked_sub(1)
            .expect("top of a non-empty queue is above bottom");

        let slot = slots
            .get_mut(index)
            .expect("the slot below top of a non-empty queue is occupied");
        let item = mem::replace(slot, slot_hooks.hooks.init(index));

        bounds.top = index;

        item
    }

    /// Removes all items, keeping the storage.
    ///
    /// Each item is finalized by [`SlotHooks::destroy()`] and its slot re-initialized as vacant.
    pub fn clear(&mut self) {
        let (slot_hooks, bounds, slots) = self.storage.parts_mut();

        let occupied = slots
            .get_mut(bounds.bottom..bounds.top)
            .expect("the occupied span is always inside the storage");

        for (index, slot) in (bounds.bottom..bounds.top).zip(occupied.iter_mut()) {
            slot_hooks.hooks.destroy(index, slot);
            *slot = slot_hooks.hooks.init(index);
        }

        *bounds = QueueBounds::default();
    }

    /// Creates an independent copy of the queue, with every slot constructed by
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
    /// On failure the queue is left unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let required = self.len().saturating_add(additional);

        if required <= self.capacity() {
            return Ok(());
        }

        self.storage.set_len(required)?;

        debug!(capacity = required, "reserved queue storage");
        Ok(())
    }

    fn make_room_at_back(&mut self) {
        let capacity = self.capacity();
        let (_, bounds, slots) = self.storage.parts_mut();

        if bounds.top < capacity {
            return;
        }

        if bounds.bottom > 0 {
            let shift = bounds.bottom;

            slots
                .get_mut(..bounds.top)
                .expect("the occupied span is always inside the storage")
                .rotate_left(shift);

            bounds.top = bounds.len();
            bounds.bottom = 0;

            trace!(shift, "left-justified queue");
            return;
        }

        self.grow();
    }

    /// Moves the occupied span of a queue whose span starts at the first slot to the end of
    /// the storage.
    fn right_justify(&mut self) {
        let (_, bounds, slots) = self.storage.parts_mut();
        debug_assert_eq!(bounds.bottom, 0);

        let capacity = slots.len();
        let shift = capacity
            .checked_sub(bounds.top)
            .expect("top is always inside the storage");

        slots.rotate_right(shift);

        bounds.bottom = shift;
        bounds.top = capacity;

        trace!(shift, "right-justified queue");
    }

    fn grow(&mut self) {
        let capacity = self.capacity();

        let grown = capacity
            .checked_add(1)
            .and_then(|capacity| capacity.checked_add(self.storage.min_increment()))
            .expect("a queue with that many slots cannot exist in memory");

        self.storage
            .set_len(grown)
            .unwrap_or_else(|error| panic!("could not grow queue to {grown} slots: {error}"));

        debug!(from = capacity, to = grown, "grew queue");
    }
}

impl<P: PoolHooks> Queue<SharedSlots<P>> {
    /// Appends a new reference to a shared object at the back of the queue.
    ///
    /// # Panics
    ///
    /// Panics if the queue needs to grow and the storage cannot be reserved.
    pub fn enqueue_shared(&mut self, item: &Shared<P>) {
        self.enqueue(Some(item.retain()));
    }

    /// Inserts a new reference to a shared object at the front of the queue.
    ///
    /// # Panics
    ///
    /// Panics if the queue needs to grow and the storage cannot be reserved.
    pub fn enqueue_front_shared(&mut self, item: &Shared<P>) {
        self.enqueue_front(Some(item.retain()));
    }

    /// Removes the front item and hands its reference over to the caller.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty or if the front item is a vacant `None`.
    pub fn dequeue_shared(&mut self) -> Shared<P> {
        self.dequeue()
            .expect("shared queue items are enqueued as objects, not as vacant slots")
    }

    /// Removes the back item and hands its reference over to the caller.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty or if the back item is a vacant `None`.
    pub fn dequeue_back_shared(&mut self) -> Shared<P> {
        self.dequeue_back()
            .expect("shared queue items are enqueued as objects, not as vacant slots")
    }
}

impl<H: SlotHooks> Drop for Queue<H> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<H: SlotHooks> fmt::Debug for Queue<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("bottom", &self.bottom())
            .field("top", &self.top())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const DESTROYED: u32 = 0xdead_beef;

    struct Simple;

    impl SlotHooks for Simple {
        type Item = u32;

        fn init(&self, _index: usize) -> u32 {
            0
        }

        fn copy(&self, _index: usize, original: &u32) -> u32 {
            original + 1
        }

        fn destroy(&self, _index: usize, item: &mut u32) {
            *item = DESTROYED;
        }
    }

    fn allocator() -> QueueAllocator<Simple> {
        QueueAllocator::new(QueueSlots::new(Simple))
    }

    #[test]
    fn back_insertion_left_justifies_before_growing() {
        let allocator = allocator();
        let mut queue = Queue::with_capacity(&allocator, 3);

        queue.enqueue(1);
        queue.enqueue(2);
        queue.enqueue(3);
        assert_eq!(queue.dequeue(), 1);

        let address = queue.as_ptr();
        queue.enqueue(4);

        assert_eq!(queue.as_ptr(), address);
        assert_eq!((queue.bottom(), queue.top()), (0, 3));
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn back_insertion_after_draining_restarts_at_zero() {
        let allocator = allocator();
        let mut queue = Queue::with_capacity(&allocator, 2);

        queue.enqueue(1);
        queue.enqueue(2);
        _ = queue.dequeue();
        _ = queue.dequeue();
        assert_eq!((queue.bottom(), queue.top()), (2, 2));

        queue.enqueue(3);

        assert_eq!((queue.bottom(), queue.top()), (0, 1));
        assert_eq!(queue.capacity(), 2);
    }

    #[test]
    fn front_insertion_into_empty_slotless_queue_grows() {
        let allocator = allocator();
        let mut queue = Queue::new(&allocator);

        queue.enqueue_front(7);

        assert_eq!(queue.capacity(), 5);
        assert_eq!((queue.bottom(), queue.top()), (0, 1));
        assert_eq!(queue.front(), Some(&7));
    }

    #[test]
    fn front_insertion_right_justifies() {
        let allocator = allocator();
        let mut queue = Queue::with_capacity(&allocator, 8);

        queue.enqueue_front(1);
        assert_eq!((queue.bottom(), queue.top()), (0, 1));

        queue.enqueue_front(2);
        assert_eq!((queue.bottom(), queue.top()), (6, 8));
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(queue.slot(0), Some(&0));
    }

    #[test]
    fn dequeued_slots_are_reinitialized() {
        let allocator = allocator();
        let mut queue = Queue::with_capacity(&allocator, 4);

        queue.enqueue(5);
        queue.enqueue(6);

        assert_eq!(queue.dequeue(), 5);
        assert_eq!(queue.dequeue_back(), 6);
        assert_eq!(queue.slot(0), Some(&0));
        assert_eq!(queue.slot(1), Some(&0));
        assert!(queue.is_empty());
    }

    #[test]
    #[should_panic]
    fn dequeue_empty_panics() {
        let allocator = allocator();
        let mut queue = Queue::with_capacity(&allocator, 4);

        _ = queue.dequeue();
    }

    #[test]
    #[should_panic]
    fn dequeue_back_empty_panics() {
        let allocator = allocator();
        let mut queue = Queue::new(&allocator);

        _ = queue.dequeue_back();
    }

    #[test]
    fn reserve_grows_without_moving_items() {
        let allocator = allocator();
        let mut queue = Queue::with_capacity(&allocator, 2);

        queue.enqueue(1);
        queue.enqueue(2);
        queue.try_reserve(3).unwrap();

        assert_eq!(queue.capacity(), 5);
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![1, 2]);

        // Already enough room.
        queue.try_reserve(1).unwrap();
        assert_eq!(queue.capacity(), 5);
    }

    #[test]
    fn failed_reserve_leaves_queue_unchanged() {
        let allocator = allocator();
        let mut queue = Queue::with_capacity(&allocator, 2);
        queue.enqueue(1);

        queue.try_reserve(usize::MAX).unwrap_err();

        assert_eq!(queue.capacity(), 2);
        assert_eq!(queue.front(), Some(&1));
    }
}
