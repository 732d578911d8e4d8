use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

use crate::{Array, ArrayHooks, GrowthPolicy};

/// Errors that can occur when reserving storage for a size-classed container.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The size class for the requested element count has a capacity that cannot be
    /// represented in `usize`.
    #[error("capacity overflow: {requested} elements do not fit in any {policy} size class")]
    CapacityOverflow {
        /// The element count that was requested.
        requested: usize,

        /// The growth policy that was asked to classify the count.
        policy: GrowthPolicy,
    },

    /// The backing storage for a block could not be reserved.
    #[error("could not reserve block storage: {0}")]
    Allocation(#[from] TryReserveError),
}

/// A specialized `Result` type for storage reservation, returning the crate's
/// [`Error`] type as the error value unless told otherwise.
pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// The error returned by [`Array::try_resize()`] and [`Array::try_ensure_size()`].
///
/// A failed resize leaves the array exactly as it was before the call. The untouched array
/// is handed back through [`into_array()`][Self::into_array].
#[derive(Error)]
#[error("could not resize array: {source}")]
pub struct ResizeError<H: ArrayHooks> {
    array: Array<H>,

    #[source]
    source: Error,
}

impl<H: ArrayHooks> ResizeError<H> {
    pub(crate) fn new(array: Array<H>, source: Error) -> Self {
        Self { array, source }
    }

    /// The array that could not be resized, unchanged.
    #[must_use]
    pub fn into_array(self) -> Array<H> {
        self.array
    }

    /// The reason the resize failed.
    #[must_use]
    pub fn error(&self) -> &Error {
        &self.source
    }
}

impl<H: ArrayHooks> fmt::Debug for ResizeError<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeError")
            .field("len", &self.array.len())
            .field("source", &self.source)
            .finish()
    }
}
