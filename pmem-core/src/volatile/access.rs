//! Access rights of a `Volatile`.
//!
//! The rights are encoded as marker types, so that reading a write-only resource, or writing a read-only one, is
//! rejected at compile time.

/// Marks access rights allowing reads.
pub trait Readable: private::Sealed {}

/// Marks access rights allowing writes.
pub trait Writable: private::Sealed {}

/// Read-only access.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadOnly;

/// Write-only access.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WriteOnly;

/// Read and write access.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadWrite;

impl Readable for ReadOnly {}
impl Readable for ReadWrite {}

impl Writable for WriteOnly {}
impl Writable for ReadWrite {}

mod private {
    pub trait Sealed {}

    impl Sealed for super::ReadOnly {}
    impl Sealed for super::WriteOnly {}
    impl Sealed for super::ReadWrite {}
}
