use thiserror::Error;

/// Errors that can occur when constructing or operating a [`BlockPool`][crate::BlockPool].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller supplied a buffer too small to hold even a single block header.
    #[error(
        "buffer of {capacity} bytes cannot hold a block pool; at least {minimum} bytes are required"
    )]
    CapacityTooSmall {
        /// The capacity of the buffer the caller supplied.
        capacity: usize,

        /// The smallest buffer the pool can be constructed over.
        minimum: usize,
    },

    /// No free block could satisfy the requested size, even after coalescing
    /// adjacent free blocks.
    ///
    /// The pool remains valid and can still satisfy smaller requests.
    #[error("no free block can satisfy an allocation of {requested} bytes")]
    OutOfMemory {
        /// The payload size the caller requested, before alignment rounding.
        requested: usize,
    },

    /// The handle passed to [`deallocate()`][crate::BlockPool::deallocate] does
    /// not refer to a live allocation.
    ///
    /// This is reported for handles the pool never issued, as well as for
    /// handles released a second time without an intervening allocation.
    /// Detection is best-effort; see [`AllocHandle`][crate::AllocHandle] for
    /// the limits of what can be caught.
    #[error("handle does not refer to a live allocation (double free or foreign handle)")]
    InvalidRelease,
}

/// A specialized `Result` type for block pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn out_of_memory_is_error() {
        let error = Error::OutOfMemory { requested: 1234 };

        // Verify it is a valid Error that can be used in Result context.
        let result: Result<()> = Err(error);
        assert!(result.is_err());
    }

    #[test]
    fn messages_name_the_sizes() {
        let error = Error::CapacityTooSmall {
            capacity: 8,
            minimum: 40,
        };
        assert!(error.to_string().contains('8'));
        assert!(error.to_string().contains("40"));

        let error = Error::OutOfMemory { requested: 999 };
        assert!(error.to_string().contains("999"));
    }
}
