/// Determines what happens to live objects when an [`ObjectPool`][crate::ObjectPool] is dropped.
///
/// By default, the pool runs the destroy hook of any live objects and drops them with the pool.
///
/// # Examples
///
/// ```
/// use recycle_pool::{DropPolicy, ObjectPool, PoolHooks};
///
/// struct Counters;
///
/// impl PoolHooks for Counters {
///     type Item = u64;
///     type Args = u64;
///
///     fn init(&self, args: u64) -> u64 {
///         args
///     }
///
///     fn copy(&self, original: &u64) -> u64 {
///         *original
///     }
/// }
///
/// // The drop policy is set at pool creation time.
/// let pool = ObjectPool::builder()
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build(Counters);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Live objects are destroyed when the pool is dropped. This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if it still contains live objects when it is dropped.
    ///
    /// Use this to detect leaks: every allocated object is expected to be released before the
    /// pool goes away.
    MustNotDropItems,
}
