use std::iter::{Enumerate, FusedIterator};
use std::{fmt, mem, slice};

use tracing::{debug, trace};

use crate::error::Result;
use crate::{Array, ArrayAllocator, ArrayHooks, PoolHooks, Shared, SharedSlots, SlotHooks};

/// The tag of an empty [`TagList`] slot. Never a valid key.
pub const NULL_TAG: u32 = 0;

/// An [`ArrayAllocator`] that creates the storage of [`TagList`]s.
pub type TagListAllocator<H> = ArrayAllocator<TagSlots<H>>;

/// Array hooks that store the entries of a [`TagList`], delegating value lifecycle to `H`.
///
/// The destroy hook of `H` runs on the value of every slot when the list is dropped, whether
/// or not the slot holds an entry.
#[derive(Debug)]
pub struct TagSlots<H> {
    hooks: H,
}

impl<H: SlotHooks> TagSlots<H> {
    /// Creates tag list storage hooks that delegate value lifecycle to `hooks`.
    #[must_use]
    pub fn new(hooks: H) -> Self {
        Self { hooks }
    }

    /// The value hooks.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

/// Bookkeeping of a [`TagList`], kept in the header of its storage.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TagSequence {
    next: u64,
}

impl TagSequence {
    fn advance(&mut self) -> u64 {
        let current = self.next;

        self.next = current
            .checked_add(1)
            .expect("a tag list cannot see 2^64 insertions");

        current
    }
}

/// One slot of a [`TagList`].
#[derive(Clone, Debug)]
pub struct TagEntry<T> {
    tag: u32,
    seq: u64,
    value: T,
}

impl<T> TagEntry<T> {
    /// The tag of the entry, or [`NULL_TAG`] if the slot is empty.
    #[must_use]
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Whether the slot holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tag == NULL_TAG
    }

    /// The value held in the slot.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<H: SlotHooks> ArrayHooks for TagSlots<H> {
    type Header = TagSequence;
    type Elt = TagEntry<H::Item>;

    fn init_header(&self) -> TagSequence {
        TagSequence::default()
    }

    fn init_elt(&self, index: usize) -> Self::Elt {
        TagEntry {
            tag: NULL_TAG,
            seq: 0,
            value: self.hooks.init(index),
        }
    }

    fn copy_header(&self, original: &TagSequence) -> TagSequence {
        *original
    }

    fn copy_elt(&self, index: usize, original: &Self::Elt) -> Self::Elt {
        TagEntry {
            tag: original.tag,
            seq: original.seq,
            value: self.hooks.copy(index, &original.value),
        }
    }

    fn grow_elt(&self, index: usize, original: &mut Self::Elt) -> Self::Elt {
        mem::replace(original, self.init_elt(index))
    }

    fn destroy_elt(&self, index: usize, elt: &mut Self::Elt) {
        self.hooks.destroy(index, &mut elt.value);
    }
}

/// A sparse list of values keyed by `u32` tags, allowing several entries per tag.
///
/// Among the entries that share a tag, the most recently added one is visible to
/// [`find()`][Self::find] and [`lookup()`][Self::lookup]. The others stay hidden until the
/// visible one is deleted. Slots freed by [`delete()`][Self::delete] are reused by later
/// insertions without affecting which entry is visible.
///
/// # Examples
///
/// ```
/// use recycle_pool::{SlotHooks, TagList, TagListAllocator, TagSlots};
///
/// struct Names;
///
/// impl SlotHooks for Names {
///     type Item = &'static str;
///
///     fn init(&self, _index: usize) -> &'static str {
///         ""
///     }
///
///     fn copy(&self, _index: usize, original: &&'static str) -> &'static str {
///         original
///     }
/// }
///
/// let allocator = TagListAllocator::new(TagSlots::new(Names));
/// let mut list = TagList::with_capacity(&allocator, 4);
///
/// *list.add(7) = "first";
/// *list.add(7) = "second";
/// assert_eq!(list.find(7), Some(&"second"));
///
/// list.delete(7, false);
/// assert_eq!(list.find(7), Some(&"first"));
/// ```
pub struct TagList<H: SlotHooks> {
    storage: Array<TagSlots<H>>,
}

impl<H: SlotHooks> TagList<H> {
    /// Creates an empty list without any slots.
    #[must_use]
    pub fn new(allocator: &TagListAllocator<H>) -> Self {
        Self::with_capacity(allocator, 0)
    }

    /// Creates an empty list with `capacity` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if the storage cannot be reserved.
    #[must_use]
    pub fn with_capacity(allocator: &TagListAllocator<H>, capacity: usize) -> Self {
        Self {
            storage: allocator.create(capacity),
        }
    }

    /// Creates an empty list with `capacity` empty slots, returning an error if the storage
    /// cannot be reserved.
    pub fn try_with_capacity(allocator: &TagListAllocator<H>, capacity: usize) -> Result<Self> {
        Ok(Self {
            storage: allocator.try_create(capacity)?,
        })
    }

    /// The number of entries in the list, visible or hidden.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().filter(|entry| !entry.is_empty()).count()
    }

    /// Whether the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().all(TagEntry::is_empty)
    }

    /// The number of slots in the list's storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// The address of the first slot of the list's storage.
    #[must_use]
    pub fn as_ptr(&self) -> *const TagEntry<H::Item> {
        self.storage.as_ptr()
    }

    /// The slot at `index`.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&TagEntry<H::Item>> {
        self.storage.get(index)
    }

    /// Iterates over every slot of the list in slot order, including empty ones.
    pub fn entries(&self) -> slice::Iter<'_, TagEntry<H::Item>> {
        self.storage.iter()
    }

    /// The value hooks of the list.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.storage.hooks().hooks
    }

    /// The value of the visible entry for `tag`, if there is one.
    #[must_use]
    pub fn find(&self, tag: u32) -> Option<&H::Item> {
        let index = self.visible(tag)?;

        self.entry(index).map(TagEntry::value)
    }

    /// The value of the visible entry for `tag`.
    ///
    /// If there is none and `create` is set, a new entry holding a freshly initialized value
    /// is added for `tag`. Otherwise returns `None`.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is [`NULL_TAG`], or if the list needs to grow and the storage cannot be
    /// reserved.
    pub fn lookup(&mut self, tag: u32, create: bool) -> Option<&mut H::Item> {
        assert_ne!(tag, NULL_TAG, "the null tag cannot be looked up");

        match self.visible(tag) {
            Some(index) => Some(self.value_mut(index)),
            None if create => Some(self.add(tag)),
            None => None,
        }
    }

    /// Adds a new entry for `tag` in the lowest-index empty slot, growing the list if there is
    /// none, and returns its value.
    ///
    /// The new entry hides any existing entries for `tag`.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is [`NULL_TAG`], or if the list needs to grow and the storage cannot be
    /// reserved.
    pub fn add(&mut self, tag: u32) -> &mut H::Item {
        assert_ne!(tag, NULL_TAG, "the null tag cannot be added");

        let index = match self.entries().position(TagEntry::is_empty) {
            Some(index) => index,
            None => {
                let index = self.capacity();
                self.grow();
                index
            }
        };

        let (_, sequence, entries) = self.storage.parts_mut();
        let entry = entries
            .get_mut(index)
            .expect("the chosen slot is inside the storage");

        entry.tag = tag;
        entry.seq = sequence.advance();

        trace!(tag, index, "added tagged entry");

        &mut entry.value
    }

    /// Deletes the visible entry for `tag`, unhiding the next most recent one, or every entry
    /// for `tag` if `all` is set. Returns the number of entries deleted.
    ///
    /// Each deleted value is finalized by [`SlotHooks::destroy()`] and its slot re-initialized
    /// as empty.
    pub fn delete(&mut self, tag: u32, all: bool) -> usize {
        if tag == NULL_TAG {
            return 0;
        }

        if !all {
            return match self.visible(tag) {
                Some(index) => {
                    self.clear_slot(index);
                    1
                }
                None => 0,
            };
        }

        let indexes: Vec<usize> = self.tagged(tag).collect();

        for &index in &indexes {
            self.clear_slot(index);
        }

        indexes.len()
    }

    /// Iterates over the indexes of every slot holding an entry for `tag`, visible or hidden,
    /// in slot order.
    pub fn tagged(&self, tag: u32) -> Tagged<'_, H::Item> {
        Tagged {
            entries: self.entries().enumerate(),
            tag,
        }
    }

    /// Creates an independent copy of the list, with every value constructed by
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

    /// Grows the storage so that at least `additional` more entries fit without growing
    /// again.
    ///
    /// On failure the list is left unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let len = self.len();
        self.storage.ensure_len(len, additional)
    }

    fn visible(&self, tag: u32) -> Option<usize> {
        self.entries()
            .enumerate()
            .filter(|(_, entry)| entry.tag == tag)
            .max_by_key(|(_, entry)| entry.seq)
            .map(|(index, _)| index)
    }

    fn value_mut(&mut self, index: usize) -> &mut H::Item {
        let (_, _, entries) = self.storage.parts_mut();

        &mut entries
            .get_mut(index)
            .expect("visible entries are inside the storage")
            .value
    }

    fn clear_slot(&mut self, index: usize) {
        let (slots, _, entries) = self.storage.parts_mut();
        let entry = entries
            .get_mut(index)
            .expect("deleted entries are inside the storage");

        slots.hooks.destroy(index, &mut entry.value);
        *entry = slots.init_elt(index);

        trace!(index, "deleted tagged entry");
    }

    fn grow(&mut self) {
        let capacity = self.capacity();

        let grown = capacity
            .checked_add(1)
            .and_then(|capacity| capacity.checked_add(self.storage.min_increment()))
            .expect("a tag list with that many slots cannot exist in memory");

        self.storage
            .set_len(grown)
            .unwrap_or_else(|error| panic!("could not grow tag list to {grown} slots: {error}"));

        debug!(from = capacity, to = grown, "grew tag list");
    }
}

impl<P: PoolHooks> TagList<SharedSlots<P>> {
    /// A new reference to the object under the visible entry for `tag`, if there is one.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<Shared<P>> {
        self.find(tag)?.as_ref().map(Shared::retain)
    }

    /// Stores a new reference to `object` in the visible entry for `tag`, adding an entry if
    /// there is none. The reference previously held by the entry, if any, is handed over to
    /// the caller.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is [`NULL_TAG`], or if the list needs to grow and the storage cannot be
    /// reserved.
    pub fn put(&mut self, tag: u32, object: &Shared<P>) -> Option<Shared<P>> {
        let slot = self
            .lookup(tag, true)
            .expect("lookup with creation always yields a slot");

        mem::replace(slot, Some(object.retain()))
    }

    /// Stores a new reference to `object` in the visible entry for `tag`, releasing the
    /// reference previously held by the entry.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is [`NULL_TAG`], or if the list needs to grow and the storage cannot be
    /// reserved.
    pub fn replace(&mut self, tag: u32, object: &Shared<P>) {
        if let Some(previous) = self.put(tag, object) {
            previous.release();
        }
    }
}

impl<H: SlotHooks> fmt::Debug for TagList<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagList")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// Iterator over the slot indexes holding entries for one tag, returned by
/// [`TagList::tagged()`].
pub struct Tagged<'a, T> {
    entries: Enumerate<slice::Iter<'a, TagEntry<T>>>,
    tag: u32,
}

impl<T> Iterator for Tagged<'_, T> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let tag = self.tag;

        self.entries
            .find(|(_, entry)| entry.tag == tag)
            .map(|(index, _)| index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.entries.size_hint().1)
    }
}

impl<T> FusedIterator for Tagged<'_, T> {}

impl<T> Clone for Tagged<'_, T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            tag: self.tag,
        }
    }
}

impl<T> fmt::Debug for Tagged<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tagged")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const INITIAL: u32 = 0x12345;

    struct Simple;

    impl SlotHooks for Simple {
        type Item = u32;

        fn init(&self, _index: usize) -> u32 {
            INITIAL
        }

        fn copy(&self, _index: usize, original: &u32) -> u32 {
            original + 1
        }

        fn destroy(&self, _index: usize, item: &mut u32) {
            *item = 0xdead_beef;
        }
    }

    fn allocator() -> TagListAllocator<Simple> {
        TagListAllocator::new(TagSlots::new(Simple))
    }

    #[test]
    fn slot_reuse_keeps_recency_order() {
        let allocator = allocator();
        let mut list = TagList::with_capacity(&allocator, 3);

        *list.add(1) = 10;
        *list.add(2) = 20;
        *list.add(1) = 30;

        // Deleting the first slot and re-adding the tag there must make the new entry visible
        // even though an older entry sits at a higher index.
        list.delete(2, false);
        *list.add(1) = 40;

        assert_eq!(list.tagged(1).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(list.find(1), Some(&40));

        list.delete(1, false);
        assert_eq!(list.find(1), Some(&30));
        assert_eq!(list.entry(1).map(TagEntry::value), Some(&INITIAL));
    }

    #[test]
    fn delete_missing_tag_is_noop() {
        let allocator = allocator();
        let mut list = TagList::with_capacity(&allocator, 2);
        *list.add(1) = 5;

        assert_eq!(list.delete(3, false), 0);
        assert_eq!(list.delete(3, true), 0);
        assert_eq!(list.delete(NULL_TAG, true), 0);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn delete_all_reports_count() {
        let allocator = allocator();
        let mut list = TagList::with_capacity(&allocator, 4);

        list.add(1);
        list.add(1);
        list.add(2);

        assert_eq!(list.delete(1, true), 2);
        assert_eq!(list.len(), 1);
    }

    #[test]
    #[should_panic]
    fn null_tag_cannot_be_added() {
        let allocator = allocator();
        let mut list = TagList::new(&allocator);

        list.add(NULL_TAG);
    }

    #[test]
    fn tagged_is_restartable() {
        let allocator = allocator();
        let mut list = TagList::with_capacity(&allocator, 3);

        list.add(4);
        list.add(5);
        list.add(4);

        let tagged = list.tagged(4);
        let restarted = tagged.clone();

        assert_eq!(tagged.count(), 2);
        assert_eq!(restarted.collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn duplicate_copies_tags_and_values() {
        let allocator = allocator();
        let mut list = TagList::with_capacity(&allocator, 2);
        *list.add(9) = 100;

        let copy = list.duplicate();
        drop(list);

        assert_eq!(copy.find(9), Some(&101));
        assert_eq!(copy.entry(1).map(TagEntry::tag), Some(NULL_TAG));
    }

    #[test]
    fn reserve_grows_capacity() {
        let allocator = allocator();
        let mut list = TagList::with_capacity(&allocator, 1);
        list.add(1);

        list.try_reserve(3).unwrap();

        assert_eq!(list.capacity(), 4);
        assert_eq!(list.find(1), Some(&INITIAL));
    }
}
