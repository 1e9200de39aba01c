//! Blocks handed out by typed allocations.
//!
//! A plain block is a `NonNull<[T]>`; a terminated block is a `Terminated<T>`, whose sentinel lives right past its
//! logical end. Neither owns its memory in the Rust sense: releasing it is up to the caller, see `TypedAllocator`.

use core::{fmt, ptr::{self, NonNull}};

use super::{Layout, PowerOf2};

/// Terminated
///
/// A block of `len` logical elements of `T`, followed by a sentinel in the slot at index `len`.
///
/// The sentinel is not part of the logical length: `as_non_null_slice` excludes it, `with_sentinel` includes it.
pub struct Terminated<T> {
    pointer: NonNull<T>,
    len: usize,
    alignment: PowerOf2,
}

impl<T> Terminated<T> {
    /// Creates an instance.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` is aligned on `alignment`, and valid for `len + 1` elements.
    /// -   Assumes the element at index `len` is initialized.
    pub(crate) unsafe fn new(pointer: NonNull<T>, len: usize, alignment: PowerOf2) -> Self {
        debug_assert!(alignment.is_aligned(pointer));

        Self { pointer, len, alignment }
    }

    /// Returns the number of logical elements, excluding the sentinel.
    pub fn len(&self) -> usize { self.len }

    /// Returns whether the block has no logical element; it still has a sentinel.
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Returns the alignment of the block.
    pub fn alignment(&self) -> PowerOf2 { self.alignment }

    /// Returns a pointer to the first element.
    pub fn as_non_null_ptr(&self) -> NonNull<T> { self.pointer }

    /// Returns a pointer to the first element.
    pub fn as_ptr(&self) -> *mut T { self.pointer.as_ptr() }

    /// Returns the logical elements, excluding the sentinel.
    pub fn as_non_null_slice(&self) -> NonNull<[T]> { NonNull::slice_from_raw_parts(self.pointer, self.len) }

    /// Returns the logical elements, followed by the sentinel.
    pub fn with_sentinel(&self) -> NonNull<[T]> { NonNull::slice_from_raw_parts(self.pointer, self.len + 1) }

    /// Returns a pointer to the sentinel slot.
    pub fn sentinel_ptr(&self) -> NonNull<T> {
        //  Safety:
        //  -   The block is valid for `len + 1` elements, hence `len` is in bounds.
        unsafe { NonNull::new_unchecked(self.pointer.as_ptr().add(self.len)) }
    }

    /// Reads the value stored in the sentinel slot.
    ///
    /// #   Safety
    ///
    /// -   Assumes the block has not been released.
    pub unsafe fn sentinel(&self) -> T
        where
            T: Copy
    {
        ptr::read(self.sentinel_ptr().as_ptr())
    }

    /// Returns the logical elements, excluding the sentinel.
    ///
    /// #   Safety
    ///
    /// -   Assumes the block has not been released.
    /// -   Assumes all logical elements are initialized.
    /// -   Assumes no mutable access to the block occurs for the lifetime `'a`.
    pub unsafe fn as_slice<'a>(&self) -> &'a [T] { &*self.as_non_null_slice().as_ptr() }

    /// Returns the Layout the block was allocated with, sentinel slot included.
    pub fn layout(&self) -> Layout {
        let size = core::mem::size_of::<T>() * (self.len + 1);

        //  Safety:
        //  -   The block was allocated with this very size and alignment, which were validated then.
        unsafe { Layout::from_size_align_unchecked(size, self.alignment.value()) }
    }
}

impl<T> Clone for Terminated<T> {
    fn clone(&self) -> Self { *self }
}

impl<T> Copy for Terminated<T> {}

impl<T> PartialEq for Terminated<T> {
    fn eq(&self, other: &Self) -> bool {
        self.pointer == other.pointer && self.len == other.len && self.alignment == other.alignment
    }
}

impl<T> Eq for Terminated<T> {}

impl<T> fmt::Debug for Terminated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminated")
            .field("pointer", &self.pointer)
            .field("len", &self.len)
            .field("alignment", &self.alignment.value())
            .finish()
    }
}

/// Allocated
///
/// The result of a request made through `AllocOptions`, whose shape depends on whether a sentinel was requested.
pub enum Allocated<T> {
    /// A plain block, with the alignment it was requested with.
    Plain {
        /// The elements of the block.
        block: NonNull<[T]>,
        /// The alignment of the block.
        alignment: PowerOf2,
    },
    /// A sentinel-terminated block.
    Terminated(Terminated<T>),
}

impl<T> Allocated<T> {
    /// Returns the number of logical elements, excluding the sentinel if any.
    pub fn len(&self) -> usize {
        match self {
            Allocated::Plain { block, .. } => block.len(),
            Allocated::Terminated(terminated) => terminated.len(),
        }
    }

    /// Returns whether the block has no logical element.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Returns whether the block is sentinel-terminated.
    pub fn is_terminated(&self) -> bool { matches!(self, Allocated::Terminated(_)) }

    /// Returns a pointer to the first element.
    pub fn as_non_null_ptr(&self) -> NonNull<T> {
        match self {
            Allocated::Plain { block, .. } => block.cast(),
            Allocated::Terminated(terminated) => terminated.as_non_null_ptr(),
        }
    }

    /// Returns the logical elements, excluding the sentinel if any.
    pub fn as_non_null_slice(&self) -> NonNull<[T]> {
        match self {
            Allocated::Plain { block, .. } => *block,
            Allocated::Terminated(terminated) => terminated.as_non_null_slice(),
        }
    }

    /// Returns the plain block, if plain.
    pub fn into_plain(self) -> Option<NonNull<[T]>> {
        match self {
            Allocated::Plain { block, .. } => Some(block),
            Allocated::Terminated(_) => None,
        }
    }

    /// Returns the terminated block, if terminated.
    pub fn into_terminated(self) -> Option<Terminated<T>> {
        match self {
            Allocated::Plain { .. } => None,
            Allocated::Terminated(terminated) => Some(terminated),
        }
    }

    /// Returns the Layout the block was allocated with, sentinel slot included.
    pub fn layout(&self) -> Layout {
        match self {
            Allocated::Plain { block, alignment } => {
                let size = core::mem::size_of::<T>() * block.len();

                //  Safety:
                //  -   The block was allocated with this very size and alignment, which were validated then.
                unsafe { Layout::from_size_align_unchecked(size, alignment.value()) }
            },
            Allocated::Terminated(terminated) => terminated.layout(),
        }
    }
}

impl<T> Clone for Allocated<T> {
    fn clone(&self) -> Self { *self }
}

impl<T> Copy for Allocated<T> {}

impl<T> fmt::Debug for Allocated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allocated::Plain { block, alignment } => f.debug_struct("Plain")
                .field("pointer", &block.cast::<u8>())
                .field("len", &block.len())
                .field("alignment", &alignment.value())
                .finish(),
            Allocated::Terminated(terminated) => f.debug_tuple("Terminated").field(terminated).finish(),
        }
    }
}
