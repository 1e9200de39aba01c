//! API of OS required services.

use pmem_core::Layout;

/// Abstraction over the OS memory services.
///
/// All functions follow the C conventions of the underlying services: failure is signalled by a null pointer.
pub(crate) trait Platform : Send + Sync {
    /// Allocates a block of memory of `layout.size()` bytes, aligned on `layout.align()`.
    ///
    /// Returns a null pointer on failure.
    ///
    /// #   Safety
    ///
    /// -   Assumes `layout.size()` is not 0.
    /// -   Assumes `layout.align()` does not exceed the `MAX_ALIGNMENT` of the platform configuration.
    unsafe fn allocate(&self, layout: Layout) -> *mut u8;

    /// Deallocates a block of memory.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` was returned by `allocate` or `reallocate`, with `layout`, and not deallocated since.
    unsafe fn deallocate(&self, pointer: *mut u8, layout: Layout);

    /// Resizes a block of memory to `new_size` bytes, preserving its alignment and the common prefix of its content.
    ///
    /// Returns a null pointer on failure, in which case `pointer` is left untouched.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` was returned by `allocate` or `reallocate`, with `layout`, and not deallocated since.
    /// -   Assumes `new_size` is not 0, and does not overflow when rounded up to `layout.align()`.
    unsafe fn reallocate(&self, pointer: *mut u8, layout: Layout, new_size: usize) -> *mut u8;
}
