/// Counts the leading zero bits in the machine word representation of `value`.
///
/// The word width is that of `usize`, so `count_leading_zeroes(0)` returns the full bit width
/// of the platform word.
///
/// # Examples
///
/// ```
/// use recycle_pool::count_leading_zeroes;
///
/// assert_eq!(count_leading_zeroes(0), usize::BITS);
/// assert_eq!(count_leading_zeroes(usize::MAX), 0);
/// assert_eq!(count_leading_zeroes(1), usize::BITS - 1);
/// ```
#[must_use]
#[inline]
pub fn count_leading_zeroes(value: usize) -> u32 {
    value.leading_zeros()
}
