//! Failures of allocation requests.
//!
//! Every allocation entry point returns either the full requested block, or exactly one `AllocError`: there are no
//! partial allocations, and the size of a request is never silently truncated.
//!
//! Alignment policy:
//!
//! -   An alignment which is not a power of 2 is a programming error, caught at construction of the `Layout` or
//!     `AllocOptions` by a panic; the `try_` constructors report it as `InvalidAlignment` instead.
//! -   An alignment greater than a backend is able to honour is reported by the backend as `InvalidAlignment`.

use thiserror::Error;

/// Result of an allocation request.
pub type AllocResult<T> = Result<T, AllocError>;

/// AllocError
///
/// The closed set of reasons for which an allocation request may fail.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Error)]
pub enum AllocError {
    /// The backend could not satisfy the requested size and alignment.
    ///
    /// This is an ordinary outcome: the caller may retry with different constraints, degrade, or propagate.
    #[error("memory allocation failed: out of memory")]
    OutOfMemory,
    /// The requested alignment is not a power of 2, or exceeds the maximum alignment of the backend.
    #[error("memory allocation failed: invalid alignment")]
    InvalidAlignment,
    /// The total size of the request does not fit in the addressable range.
    ///
    /// Always detected before the backend is called.
    #[error("memory allocation failed: size overflow")]
    Overflow,
}

#[cfg(test)]
mod tests {

use super::*;

extern crate std;

use std::string::ToString;

#[test]
fn alloc_error_display() {
    assert_eq!("memory allocation failed: out of memory", AllocError::OutOfMemory.to_string());
    assert_eq!("memory allocation failed: invalid alignment", AllocError::InvalidAlignment.to_string());
    assert_eq!("memory allocation failed: size overflow", AllocError::Overflow.to_string());
}

#[test]
fn alloc_error_is_error() {
    fn source(error: &dyn core::error::Error) -> bool { error.source().is_some() }

    assert!(!source(&AllocError::Overflow));
}

}
