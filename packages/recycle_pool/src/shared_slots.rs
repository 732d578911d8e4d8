use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{PoolHooks, Shared, SlotHooks};

/// Slot hooks for containers of reference-counted [`Shared`] objects.
///
/// Vacant slots hold `None`. Copying a container retains every object it holds, and clearing
/// or deleting a slot releases the reference the slot held. Objects are only destroyed when
/// their last reference, wherever it lives, is released.
///
/// Containers built with these hooks gain retaining convenience operations such as
/// [`Queue::enqueue_shared()`][crate::Queue::enqueue_shared],
/// [`Stack::push_shared()`][crate::Stack::push_shared] and
/// [`TagList::put()`][crate::TagList::put].
pub struct SharedSlots<P> {
    _pool: PhantomData<P>,
}

impl<P: PoolHooks> SharedSlots<P> {
    /// Creates the slot hooks.
    #[must_use]
    pub fn new() -> Self {
        Self { _pool: PhantomData }
    }
}

impl<P: PoolHooks> Default for SharedSlots<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for SharedSlots<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSlots")
            .field("pool_hooks_type", &format_args!("{}", type_name::<P>()))
            .finish()
    }
}

impl<P: PoolHooks> SlotHooks for SharedSlots<P> {
    type Item = Option<Shared<P>>;

    fn init(&self, _index: usize) -> Self::Item {
        None
    }

    fn copy(&self, _index: usize, original: &Self::Item) -> Self::Item {
        original.as_ref().map(Shared::retain)
    }

    fn destroy(&self, _index: usize, item: &mut Self::Item) {
        if let Some(shared) = item.take() {
            shared.release();
        }
    }
}
