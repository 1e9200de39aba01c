//! Layout of a memory request.
//!
//! A `Layout` describes _what shape_ of memory is requested, independently of _how_ it is obtained, so that every
//! allocation operation boils down to a single primitive: allocate(Layout) -> bytes.

use core::{alloc, mem, ptr::NonNull};

use crate::utils;

use super::{AllocError, AllocResult, PowerOf2};

/// Layout
///
/// The size and alignment of a block of memory.
///
/// Invariants:
/// -   The alignment is a power of 2.
/// -   The size, rounded up to a multiple of the alignment, does not exceed `isize::MAX`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Layout {
    size: usize,
    align: PowerOf2,
}

impl Layout {
    /// Creates a Layout suitable for holding a value of type `T`.
    pub const fn new<T>() -> Self {
        //  Safety:
        //  -   The alignment of a type is a power of 2, and its size fits in `isize`.
        unsafe { Self::from_size_align_unchecked(mem::size_of::<T>(), mem::align_of::<T>()) }
    }

    /// Creates a Layout from an explicit `size` and `align`.
    ///
    /// #   Panics
    ///
    /// If `align` is not a power of 2, or if `size` rounded up to `align` exceeds `isize::MAX`: either is a
    /// programming error. See `try_from_size_align` for a fallible version.
    pub const fn from_size_align(size: usize, align: usize) -> Self {
        match Self::try_from_size_align(size, align) {
            Ok(layout) => layout,
            Err(AllocError::InvalidAlignment) => panic!("Layout alignment must be a power of 2"),
            Err(_) => panic!("Layout size overflows the addressable range"),
        }
    }

    /// Creates a Layout from an explicit `size` and `align`.
    ///
    /// Returns `InvalidAlignment` if `align` is not a power of 2, and `Overflow` if `size` rounded up to `align`
    /// exceeds `isize::MAX`.
    pub const fn try_from_size_align(size: usize, align: usize) -> AllocResult<Self> {
        let align = match PowerOf2::new(align) {
            Some(align) => align,
            None => return Err(AllocError::InvalidAlignment),
        };

        Self::from_size_alignment(size, align)
    }

    /// Creates a Layout from an explicit `size` and an `align` known to be a power of 2.
    ///
    /// Returns `Overflow` if `size` rounded up to `align` exceeds `isize::MAX`.
    pub const fn from_size_alignment(size: usize, align: PowerOf2) -> AllocResult<Self> {
        match align.checked_round_up(size) {
            Some(rounded) if rounded <= isize::MAX as usize => Ok(Self { size, align }),
            _ => Err(AllocError::Overflow),
        }
    }

    /// Creates a Layout, bypassing all checks.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `align` is a power of 2.
    /// -   Assumes that `size` rounded up to `align` does not exceed `isize::MAX`.
    pub const unsafe fn from_size_align_unchecked(size: usize, align: usize) -> Self {
        debug_assert!(align.is_power_of_two());

        Self { size, align: PowerOf2::new_unchecked(align) }
    }

    /// Creates a Layout suitable for `count` contiguous values of type `T`.
    ///
    /// Returns `Overflow` if `count * size_of::<T>()` does not fit.
    pub fn array<T>(count: usize) -> AllocResult<Self> { Self::array_aligned::<T>(count, PowerOf2::align_of::<T>()) }

    /// Creates a Layout suitable for `count` contiguous values of type `T`, aligned on `align`.
    ///
    /// Returns `Overflow` if `count * size_of::<T>()` does not fit.
    ///
    /// #   Panics
    ///
    /// If `align` is lower than the natural alignment of `T`.
    pub fn array_aligned<T>(count: usize, align: PowerOf2) -> AllocResult<Self> {
        assert!(align >= PowerOf2::align_of::<T>(), "Alignment {} is lower than the alignment of the element",
            align.value());

        let size = mem::size_of::<T>().checked_mul(count).ok_or(AllocError::Overflow)?;

        Self::from_size_alignment(size, align)
    }

    /// The size of the block, in bytes.
    pub const fn size(&self) -> usize { self.size }

    /// The alignment of the block, in bytes.
    pub const fn align(&self) -> usize { self.align.value() }

    /// The alignment of the block, as a PowerOf2.
    pub const fn alignment(&self) -> PowerOf2 { self.align }

    /// Returns whether the block is zero-sized.
    pub const fn is_empty(&self) -> bool { self.size == 0 }

    /// Returns a well-aligned, dangling, pointer suitable for a zero-sized block of this Layout.
    ///
    /// The pointer may alias a valid address, hence must never be used as an "uninitialized" marker.
    pub fn dangling(&self) -> NonNull<u8> { utils::dangling(self.align) }

    /// Returns a copy of `self` with its size replaced.
    ///
    /// Returns `Overflow` if `size` rounded up to the alignment exceeds `isize::MAX`.
    pub const fn with_size(&self, size: usize) -> AllocResult<Self> { Self::from_size_alignment(size, self.align) }

    /// Returns whether `pointer` satisfies the alignment of this Layout.
    pub fn fits(&self, pointer: NonNull<u8>) -> bool { self.align.is_aligned(pointer) }
}

impl From<Layout> for alloc::Layout {
    fn from(layout: Layout) -> alloc::Layout {
        //  Safety:
        //  -   `layout.align()` is a power of 2.
        //  -   `layout.size()` rounded up to `layout.align()` does not exceed `isize::MAX`.
        unsafe { alloc::Layout::from_size_align_unchecked(layout.size(), layout.align()) }
    }
}

impl From<alloc::Layout> for Layout {
    fn from(layout: alloc::Layout) -> Layout {
        //  Safety:
        //  -   `alloc::Layout` upholds the very same invariants.
        unsafe { Layout::from_size_align_unchecked(layout.size(), layout.align()) }
    }
}
