#![no_std]

#![deny(missing_docs)]

//! Building blocks for memory management in P-systems.
//!
//! pmem-core defines how memory is requested, leaving it up to pluggable backends to decide how it is acquired. It
//! contains:
//! -   A `Layout` and an `AllocOptions`, describing the shape of a request: size, alignment, element type, exactness,
//!     and sentinel termination.
//! -   The `Allocator` trait, implemented by backends, and the `TypedAllocator` operations layered on top of it.
//! -   The `AllocError` taxonomy, returned by every fallible operation.
//! -   A `Volatile` wrapper, for memory accessed outside of the program's control.
//!
//! Memory is managed manually: each block handed out is owned by the caller until explicitly released, possibly through
//! a `Scoped` guard.

mod api;
mod utils;
mod volatile;

pub use api::*;
pub use volatile::{ReadOnly, ReadWrite, Readable, Volatile, Writable, WriteOnly};
