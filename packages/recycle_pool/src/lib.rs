#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Free-list memory management primitives: object pools, size-classed growable arrays and
//! the queue, stack and tag list containers built on top of them.
//!
//! Every primitive is generic over a caller-supplied *hooks* type that decides how payloads are
//! constructed, cloned, transformed and finalized. The primitives themselves only decide where
//! the payload lives and when each hook runs.
//!
//! # Components
//!
//! - [`ObjectPool`] hands out objects from slabs and reuses the most recently released slot
//!   first. Released objects keep their finalized payload until the slot is reused.
//! - [`SharedPool`] hands out reference-counted [`Shared`] handles. The object is finalized and
//!   recycled when the last handle is released.
//! - [`ArrayAllocator`] creates [`Array`]s whose blocks are bucketed into size classes by a
//!   [`GrowthPolicy`]. Blocks of released arrays are recycled for later arrays of the same
//!   class. [`SharedArray`] is the reference-counted flavor.
//! - [`Queue`] is a double-ended queue over array storage with left- and right-justifying
//!   compaction.
//! - [`Stack`] is a LIFO container over array storage.
//! - [`TagList`] maps integer tags to value slots, where newer entries for a tag hide older
//!   ones until they are deleted.
//!
//! # Thread safety
//!
//! None of the types in this crate are thread-safe. Allocators and their handles are neither
//! [`Send`] nor [`Sync`]; free lists belong to an allocator instance, not to the process.
//!
//! # Example
//!
//! ```rust
//! use recycle_pool::{ObjectPool, PoolHooks};
//!
//! struct Tagged;
//!
//! impl PoolHooks for Tagged {
//!     type Item = u32;
//!     type Args = u32;
//!
//!     fn init(&self, tag: u32) -> u32 {
//!         tag
//!     }
//!
//!     fn copy(&self, original: &u32) -> u32 {
//!         original + 1
//!     }
//!
//!     fn destroy(&self, item: &mut u32) {
//!         *item = 0xdead_beef;
//!     }
//! }
//!
//! let mut pool = ObjectPool::new(Tagged);
//!
//! let first = pool.allocate(7);
//! let address = pool.address(first);
//! pool.release(first);
//!
//! // The finalized payload stays observable until the slot is reused.
//! assert_eq!(pool.released(first), Some(&0xdead_beef));
//!
//! // The most recently released slot is reused first.
//! let second = pool.allocate(8);
//! assert_eq!(pool.address(second), address);
//! assert_eq!(*pool.get(second), 8);
//! # pool.release(second);
//! ```

mod array;
mod array_builder;
mod bits;
mod drop_policy;
mod error;
mod growth;
mod hooks;
mod object_pool;
mod pool_builder;
mod queue;
mod shared;
mod shared_array;
mod shared_slots;
mod stack;
mod tag_list;

pub use array::*;
pub use array_builder::*;
pub use bits::*;
pub use drop_policy::*;
pub use error::{Error, ResizeError};
pub use growth::*;
pub use hooks::*;
pub use object_pool::*;
pub use pool_builder::*;
pub use queue::*;
pub use shared::*;
pub use shared_array::*;
pub use shared_slots::*;
pub use stack::*;
pub use tag_list::*;
