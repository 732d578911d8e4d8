use std::fmt;
use std::num::NonZero;

use crate::{Error, count_leading_zeroes};

/// Maps a requested element count to a size class and a size class to the number of
/// element slots a block of that class provides.
///
/// Blocks are only recycled between requests that map to the same size class, so the policy
/// decides both how much slack a block carries and how freely blocks are reused.
///
/// The class function is monotonic non-decreasing in the element count and the capacity of
/// a class is always at least as large as any count that maps to it.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use recycle_pool::GrowthPolicy;
///
/// assert_eq!(GrowthPolicy::Linear.class_of(5), 5);
/// assert_eq!(GrowthPolicy::Log2.class_of(5), 3);
///
/// let halves = GrowthPolicy::ScaledLinear {
///     scale: NonZero::new(2).unwrap(),
/// };
/// assert_eq!(halves.class_of(5), 2);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum GrowthPolicy {
    /// Every element count is its own size class and blocks hold exactly that many elements.
    ///
    /// Blocks are only reused for requests of exactly the same size.
    #[default]
    Linear,

    /// Size classes are powers of two; a block of class `c` holds `2^c` elements.
    Log2,

    /// Element counts are bucketed into runs of `scale` consecutive counts; a block of
    /// class `c` holds `(c + 1) * scale` elements.
    ScaledLinear {
        /// The number of consecutive element counts that share one size class.
        scale: NonZero<usize>,
    },
}

impl GrowthPolicy {
    /// The size class for a request of `count` elements.
    #[must_use]
    pub fn class_of(self, count: usize) -> usize {
        match self {
            Self::Linear => count,
            Self::Log2 => match count.checked_sub(1) {
                None => 0,
                Some(below) => usize::BITS
                    .checked_sub(count_leading_zeroes(below))
                    .expect("leading zero count never exceeds the word width")
                    as usize,
            },
            Self::ScaledLinear { scale } => count / scale,
        }
    }

    /// The number of element slots a block of size class `class` provides, or `None` if that
    /// number is not representable.
    #[must_use]
    pub fn capacity_of(self, class: usize) -> Option<usize> {
        match self {
            Self::Linear => Some(class),
            Self::Log2 => u32::try_from(class)
                .ok()
                .and_then(|shift| 1_usize.checked_shl(shift)),
            Self::ScaledLinear { scale } => class
                .checked_add(1)
                .and_then(|buckets| buckets.checked_mul(scale.get())),
        }
    }

    /// The size class and block capacity for a request of `count` elements.
    pub(crate) fn classify(self, count: usize) -> crate::error::Result<(usize, usize)> {
        let class = self.class_of(count);

        let capacity = self
            .capacity_of(class)
            .ok_or(Error::CapacityOverflow {
                requested: count,
                policy: self,
            })?;

        debug_assert!(
            capacity >= count,
            "size class {class} of {self} policy has capacity {capacity} below requested {count}"
        );

        Ok((class, capacity))
    }
}

impl fmt::Display for GrowthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Log2 => write!(f, "log2"),
            Self::ScaledLinear { scale } => write!(f, "linear{scale}"),
        }
    }
}
