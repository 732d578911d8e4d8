//! Basic usage of the `recycle_pool` crate:
//!
//! * Reusing released objects from a pool.
//! * Sharing reference-counted objects between containers.
//! * Growing arrays across size classes.
//! * Queue, stack and tag list containers.

use recycle_pool::{
    ArrayAllocator, ArrayHooks, GrowthPolicy, ObjectPool, PoolHooks, Queue, QueueAllocator,
    QueueSlots, SharedPool, SharedSlots, SlotHooks, Stack, StackAllocator, StackSlots, TagList,
    TagListAllocator, TagSlots,
};

/// Connection records, recycled through a pool.
struct Connections;

impl PoolHooks for Connections {
    type Item = String;
    type Args = &'static str;

    fn init(&self, peer: &'static str) -> String {
        peer.to_string()
    }

    fn copy(&self, original: &String) -> String {
        format!("{original} (copy)")
    }

    fn destroy(&self, item: &mut String) {
        // Keeps the allocation of the string for the next object that reuses the slot.
        item.clear();
    }
}

/// Byte buffers whose header counts how often they had to move.
struct Buffers;

impl ArrayHooks for Buffers {
    type Header = u32;
    type Elt = u8;

    fn init_header(&self) -> u32 {
        0
    }

    fn init_elt(&self, _index: usize) -> u8 {
        0
    }

    fn copy_header(&self, original: &u32) -> u32 {
        *original
    }

    fn copy_elt(&self, _index: usize, original: &u8) -> u8 {
        *original
    }

    fn grow_header(&self, original: &u32) -> u32 {
        original + 1
    }
}

/// Plain numbers in container slots.
struct Numbers;

impl SlotHooks for Numbers {
    type Item = u64;

    fn init(&self, _index: usize) -> u64 {
        0
    }

    fn copy(&self, _index: usize, original: &u64) -> u64 {
        *original
    }
}

fn main() {
    object_pool();
    arrays();
    containers();
    shared_values();
}

fn object_pool() {
    let mut pool = ObjectPool::new(Connections);

    let alice = pool.allocate("alice");
    let address = pool.address(alice);
    println!("Allocated {} at {address:#x}", pool.get(alice));

    pool.release(alice);

    // The most recently released slot is the first to be reused.
    let bob = pool.allocate("bob");
    println!(
        "Allocated {} at {:#x}, reused: {}",
        pool.get(bob),
        pool.address(bob),
        pool.address(bob) == address
    );

    pool.release(bob);
}

fn arrays() {
    let allocator = ArrayAllocator::builder()
        .policy(GrowthPolicy::Log2)
        .build(Buffers);

    let mut buffer = allocator.create(3);
    buffer.as_mut_slice().copy_from_slice(b"abc");

    // 4 elements still fit the block of class 2; 5 need a block of class 3.
    for len in [4, 5, 9] {
        buffer = buffer.resize(len);
        println!(
            "Buffer of {} bytes in class {} with room for {}, moved {} times",
            buffer.len(),
            buffer.class(),
            buffer.capacity(),
            buffer.header()
        );
    }

    drop(buffer);
    println!(
        "Recycled blocks of class 4: {}",
        allocator.free_blocks(4)
    );
}

fn containers() {
    let queues = QueueAllocator::new(QueueSlots::new(Numbers));
    let mut queue = Queue::new(&queues);

    queue.enqueue(2);
    queue.enqueue(3);
    queue.enqueue_front(1);
    println!(
        "Queue spans slots {}..{} of {}: {:?}",
        queue.bottom(),
        queue.top(),
        queue.capacity(),
        queue.iter().collect::<Vec<_>>()
    );

    let stacks = StackAllocator::new(StackSlots::new(Numbers));
    let mut stack = Stack::new(&stacks);

    while !queue.is_empty() {
        stack.push(queue.dequeue());
    }

    println!("Stack pops {} first", stack.pop());

    let lists = TagListAllocator::new(TagSlots::new(Numbers));
    let mut list = TagList::new(&lists);

    *list.add(10) = 100;
    *list.add(10) = 200;
    println!("Tag 10 resolves to {:?}", list.find(10));

    list.delete(10, false);
    println!("After deleting, tag 10 resolves to {:?}", list.find(10));
}

fn shared_values() {
    let pool = SharedPool::new(Connections);
    let lists = TagListAllocator::new(TagSlots::new(SharedSlots::new()));
    let mut list = TagList::new(&lists);

    let carol = pool.allocate("carol");
    list.replace(1, &carol);
    list.replace(2, &carol);

    println!(
        "{} is referenced {} times",
        carol.borrow(),
        carol.refcount()
    );

    drop(list);
    println!(
        "{} is referenced {} times after dropping the list",
        carol.borrow(),
        carol.refcount()
    );
}
