//! Behavior of the tag list as observed through its public API.

use recycle_pool::{
    NULL_TAG, PoolHooks, SharedPool, SharedSlots, SlotHooks, TagEntry, TagList, TagListAllocator,
    TagSlots,
};

const INITIAL: u32 = 0x12345;
const DESTROYED: u32 = 0xdead_beef;

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
        *item = DESTROYED;
    }
}

struct Counter;

impl PoolHooks for Counter {
    type Item = u32;
    type Args = u32;

    fn init(&self, value: u32) -> u32 {
        value
    }

    fn copy(&self, original: &u32) -> u32 {
        original + 1
    }

    fn destroy(&self, item: &mut u32) {
        *item = DESTROYED;
    }
}

fn simple() -> TagListAllocator<Simple> {
    TagListAllocator::new(TagSlots::new(Simple))
}

fn shared() -> TagListAllocator<SharedSlots<Counter>> {
    TagListAllocator::builder()
        .min_increment(1)
        .build(TagSlots::new(SharedSlots::new()))
}

#[test]
fn new_list_has_empty_slots() {
    let allocator = simple();
    let list = TagList::with_capacity(&allocator, 8);

    assert_eq!(list.capacity(), 8);
    assert_eq!(list.entry(0).map(TagEntry::tag), Some(NULL_TAG));
    assert_eq!(list.entry(0).map(TagEntry::value), Some(&INITIAL));
    assert!(list.is_empty());
}

#[test]
fn dropping_list_destroys_every_slot() {
    let allocator = simple();
    let list = TagList::with_capacity(&allocator, 8);
    drop(list);

    assert_eq!(
        allocator.inspect_free(8, |_, entries| {
            entries
                .iter()
                .map(|entry| *entry.value())
                .collect::<Vec<_>>()
        }),
        Some(vec![DESTROYED; 8])
    );
}

#[test]
fn added_value_is_found() {
    let allocator = simple();
    let mut list = TagList::with_capacity(&allocator, 1);
    let address = list.as_ptr();

    *list.add(1) = 123;

    assert_eq!(list.as_ptr(), address);
    assert_eq!(list.lookup(1, false).copied(), Some(123));
}

#[test]
fn add_grows_full_list() {
    let allocator = simple();
    let mut list = TagList::with_capacity(&allocator, 1);
    let address = list.as_ptr();

    *list.add(1) = 123;
    *list.add(2) = 456;
    assert_ne!(list.as_ptr(), address);
    assert_eq!(list.capacity(), 6);

    let address = list.as_ptr();
    *list.add(3) = 789;
    assert_eq!(list.as_ptr(), address);
}

#[test]
fn lookup_can_create_entry() {
    let allocator = simple();
    let mut list = TagList::with_capacity(&allocator, 1);

    assert_eq!(list.lookup(1, true).copied(), Some(INITIAL));
    assert_eq!(list.len(), 1);
}

#[test]
fn lookup_distinguishes_tags() {
    let allocator = simple();
    let mut list = TagList::with_capacity(&allocator, 4);

    *list.add(1) = 123;
    *list.add(2) = 456;
    *list.add(3) = 789;

    assert_eq!(list.find(1), Some(&123));
    assert_eq!(list.find(2), Some(&456));
    assert_eq!(list.find(3), Some(&789));
    assert_eq!(list.lookup(4, false), None);
}

#[test]
fn newest_entry_hides_older_ones() {
    let allocator = simple();
    let mut list = TagList::with_capacity(&allocator, 2);

    *list.lookup(1, true).unwrap() = 123;
    *list.add(1) = 234;
    assert_eq!(list.find(1), Some(&234));

    list.delete(1, false);
    assert_eq!(list.find(1), Some(&123));
}

#[test]
fn deleted_entry_is_gone() {
    let allocator = simple();
    let mut list = TagList::with_capacity(&allocator, 1);

    _ = list.lookup(1, true);
    list.delete(1, false);

    assert_eq!(list.lookup(1, false), None);
}

#[test]
fn deleted_slot_is_reused() {
    let allocator = simple();
    let mut list = TagList::with_capacity(&allocator, 1);
    let address = list.as_ptr();

    *list.lookup(1, true).unwrap() = 123;
    list.delete(1, false);

    let added = list.add(2);
    assert_eq!(*added, INITIAL);
    assert_eq!(list.as_ptr(), address);
    assert_eq!(list.tagged(2).collect::<Vec<_>>(), vec![0]);
}

#[test]
fn delete_all_removes_every_entry_for_tag() {
    let allocator = simple();
    let mut list = TagList::with_capacity(&allocator, 3);

    *list.lookup(1, true).unwrap() = 123;
    *list.add(2) = 456;
    *list.add(1) = 234;

    assert_eq!(list.delete(1, true), 2);
    assert_eq!(list.lookup(1, false), None);
    assert_eq!(list.find(2), Some(&456));
}

#[test]
fn tagged_visits_hidden_entries() {
    let allocator = simple();
    let mut list = TagList::with_capacity(&allocator, 3);

    *list.lookup(1, true).unwrap() = 123;
    *list.add(2) = 456;
    *list.add(1) = 234;

    let indexes: Vec<_> = list.tagged(1).collect();
    let sum: u32 = indexes
        .iter()
        .filter_map(|&index| list.entry(index))
        .map(|entry| *entry.value())
        .sum();

    assert_eq!(indexes.len(), 2);
    assert_eq!(sum, 357);
}

#[test]
fn get_from_empty_list_is_none() {
    let allocator = shared();
    let list = TagList::with_capacity(&allocator, 4);

    assert!(list.get(1).is_none());
}

#[test]
fn put_retains_and_get_hands_out_reference() {
    let pool = SharedPool::new(Counter);
    let allocator = shared();
    let mut list = TagList::with_capacity(&allocator, 4);

    let object = pool.allocate(INITIAL);

    assert!(list.put(1, &object).is_none());
    assert_eq!(object.refcount(), 2);

    let got = list.get(1).unwrap();
    assert!(got.ptr_eq(&object));
    assert_eq!(object.refcount(), 3);
    got.release();

    drop(list);
    assert_eq!(object.refcount(), 1);
}

#[test]
fn replace_releases_previous_value() {
    let pool = SharedPool::new(Counter);
    let allocator = shared();
    let mut list = TagList::with_capacity(&allocator, 4);

    let first = pool.allocate(INITIAL);
    let second = pool.allocate(INITIAL + 1);

    list.replace(1, &first);
    list.replace(1, &second);

    assert_eq!(first.refcount(), 1);
    assert!(list.get(1).unwrap().ptr_eq(&second));
}

#[test]
fn duplicate_retains_shared_values() {
    let pool = SharedPool::new(Counter);
    let allocator = shared();
    let mut list = TagList::with_capacity(&allocator, 4);

    let object = pool.allocate(INITIAL);
    list.replace(1, &object);

    let copy = list.duplicate();

    assert_eq!(copy.capacity(), list.capacity());
    assert!(
        copy.entry(0)
            .and_then(|entry| entry.value().as_ref())
            .unwrap()
            .ptr_eq(&object)
    );
    assert_eq!(object.refcount(), 3);

    drop(list);
    drop(copy);
    assert_eq!(object.refcount(), 1);
}
