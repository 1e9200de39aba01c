//! Options of a typed allocation request.
//!
//! On top of the raw bytes, a typed request may override the alignment of its elements and ask for a
//! sentinel-terminated buffer, as C strings are. A sentinel changes both the size requested from the backend (one more
//! element) and the shape of the result (a trailing element outside of the logical length), hence requests with and
//! without a sentinel follow two distinct paths; see `TypedAllocator`.

use core::fmt;

use super::{AllocError, AllocResult, ElementType, Exactness, Layout, PowerOf2};

/// AllocOptions
///
/// The shape of a typed request: the element type `T`, an optional alignment override, and an optional sentinel.
///
/// Built by the caller for each request, consumed by the allocation.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct AllocOptions<T> {
    alignment: Option<PowerOf2>,
    sentinel: Option<T>,
    exactness: Exactness,
}

impl<T> AllocOptions<T> {
    /// Creates options for a plain array of `T`, naturally aligned, of exactly the requested length.
    pub const fn new() -> Self { Self { alignment: None, sentinel: None, exactness: Exactness::Exact } }

    /// Overrides the alignment of the block.
    ///
    /// #   Panics
    ///
    /// If `alignment` is lower than the natural alignment of `T`: the elements would be misaligned.
    pub fn aligned(self, alignment: PowerOf2) -> Self {
        assert!(alignment >= PowerOf2::align_of::<T>(),
            "Alignment {} is lower than the alignment of {}", alignment.value(), self.elem().name());

        Self { alignment: Some(alignment), ..self }
    }

    /// Overrides the alignment of the block.
    ///
    /// Returns `InvalidAlignment` if `alignment` is not a power of 2, or is lower than the natural alignment of `T`.
    pub fn try_aligned(self, alignment: usize) -> AllocResult<Self> {
        match PowerOf2::new(alignment) {
            Some(alignment) if alignment >= PowerOf2::align_of::<T>() => {
                Ok(Self { alignment: Some(alignment), ..self })
            },
            _ => Err(AllocError::InvalidAlignment),
        }
    }

    /// Requests a buffer terminated by `sentinel`, stored right past the last logical element.
    ///
    /// A terminated buffer is always of exactly the requested length, regardless of `at_least`.
    pub fn terminated(self, sentinel: T) -> Self { Self { sentinel: Some(sentinel), ..self } }

    /// Accepts a block holding more elements than requested, if the backend has them to spare.
    pub fn at_least(self) -> Self { Self { exactness: Exactness::AtLeast, ..self } }

    /// Returns the element type of the request.
    pub fn elem(&self) -> ElementType { ElementType::of::<T>() }

    /// Returns the effective alignment: the override if any, or else the natural alignment of `T`.
    pub fn alignment(&self) -> PowerOf2 { self.alignment.unwrap_or(PowerOf2::align_of::<T>()) }

    /// Returns the sentinel, if any.
    pub fn sentinel(&self) -> Option<&T> { self.sentinel.as_ref() }

    /// Returns whether the request is for a sentinel-terminated buffer.
    pub fn is_terminated(&self) -> bool { self.sentinel.is_some() }

    /// Returns the exactness preference for a plain request.
    pub fn exactness(&self) -> Exactness { self.exactness }

    /// Returns the Layout to request from the backend for `count` logical elements.
    ///
    /// A terminated request accounts for the sentinel slot, hence `count + 1` elements.
    ///
    /// Returns `Overflow` if the total size does not fit in the addressable range.
    pub fn layout(&self, count: usize) -> AllocResult<Layout> {
        let count = if self.is_terminated() { count.checked_add(1).ok_or(AllocError::Overflow)? } else { count };

        Layout::array_aligned::<T>(count, self.alignment())
    }

    /// Consumes the options, returning the sentinel if any.
    pub(crate) fn into_sentinel(self) -> Option<T> { self.sentinel }
}

impl<T> Default for AllocOptions<T> {
    fn default() -> Self { Self::new() }
}

impl<T: fmt::Debug> fmt::Debug for AllocOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocOptions")
            .field("elem", &self.elem().name())
            .field("alignment", &self.alignment().value())
            .field("sentinel", &self.sentinel)
            .field("exactness", &self.exactness)
            .finish()
    }
}
