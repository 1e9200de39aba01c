//! LocalAllocator

use core::ptr::NonNull;

use pmem_core::{AllocResult, Layout};

/// Abstraction of a backend requiring exclusive access.
///
/// A `LocalAllocator` is the single-threaded counterpart of `Allocator`: it mutates its own state on every request,
/// and is shared by wrapping it in `Locked`.
///
/// #   Safety
///
/// Implementations must uphold the guarantees documented on `Allocator`.
pub unsafe trait LocalAllocator {
    /// Allocates a fresh block of memory as per the specified layout.
    ///
    /// #   Errors
    ///
    /// -   `OutOfMemory` if the backend cannot satisfy the request.
    /// -   `InvalidAlignment` if the alignment exceeds what the backend supports.
    fn allocate(&mut self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Deallocates the supplied block of memory.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` denotes a block currently allocated by this very instance.
    /// -   Assumes `layout` fits that block.
    unsafe fn deallocate(&mut self, pointer: NonNull<u8>, layout: Layout);
}
