use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{ArrayAllocator, ArrayHooks, GrowthPolicy};

/// Number of size classes whose released blocks are kept for reuse, unless configured otherwise.
const DEFAULT_MAX_CLASSES: usize = 16;

/// Slack added on top of the required length when containers grow, unless configured otherwise.
const DEFAULT_MIN_INCREMENT: usize = 4;

/// Builder for creating an instance of [`ArrayAllocator`].
///
/// # Examples
///
/// ```
/// use recycle_pool::{ArrayAllocator, ArrayHooks, GrowthPolicy};
///
/// struct Numbers;
///
/// impl ArrayHooks for Numbers {
///     type Header = ();
///     type Elt = u64;
///
///     fn init_header(&self) {}
///
///     fn init_elt(&self, index: usize) -> u64 {
///         index as u64
///     }
///
///     fn copy_header(&self, _original: &()) {}
///
///     fn copy_elt(&self, _index: usize, original: &u64) -> u64 {
///         *original
///     }
/// }
///
/// let allocator = ArrayAllocator::builder()
///     .policy(GrowthPolicy::Log2)
///     .max_classes(20)
///     .min_increment(8)
///     .build(Numbers);
///
/// let array = allocator.create(5);
/// assert_eq!(array.capacity(), 8);
/// ```
#[must_use]
pub struct ArrayAllocatorBuilder<H> {
    policy: GrowthPolicy,
    max_classes: usize,
    min_increment: usize,

    _hooks: PhantomData<H>,
}

impl<H> fmt::Debug for ArrayAllocatorBuilder<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayAllocatorBuilder")
            .field("hooks_type", &format_args!("{}", type_name::<H>()))
            .field("policy", &self.policy)
            .field("max_classes", &self.max_classes)
            .field("min_increment", &self.min_increment)
            .finish()
    }
}

impl<H: ArrayHooks> ArrayAllocatorBuilder<H> {
    pub(crate) fn new() -> Self {
        Self {
            policy: GrowthPolicy::default(),
            max_classes: DEFAULT_MAX_CLASSES,
            min_increment: DEFAULT_MIN_INCREMENT,
            _hooks: PhantomData,
        }
    }

    /// Sets the [growth policy][GrowthPolicy] that maps element counts to size classes.
    pub fn policy(mut self, policy: GrowthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the number of size classes whose released blocks are kept for reuse.
    ///
    /// Blocks of size class `max_classes` or above are returned to the system when their array
    /// is dropped. Zero disables block reuse entirely.
    pub fn max_classes(mut self, max_classes: usize) -> Self {
        self.max_classes = max_classes;
        self
    }

    /// Sets the slack that containers built on the allocator add on top of the required length
    /// whenever they have to grow.
    pub fn min_increment(mut self, min_increment: usize) -> Self {
        self.min_increment = min_increment;
        self
    }

    /// Builds the allocator with the specified configuration.
    #[must_use]
    pub fn build(self, hooks: H) -> ArrayAllocator<H> {
        ArrayAllocator::new_inner(hooks, self.policy, self.max_classes, self.min_increment)
    }
}
