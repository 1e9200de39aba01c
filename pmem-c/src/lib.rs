#![no_std]
#![deny(missing_docs)]

//! Exposition of the Global allocator via a C ABI.
//!
//! All functions signal failure, including invalid arguments, by returning a null pointer.

use core::ptr::{self, NonNull};

use pmem::{AllocResult, Allocator, Global, Layout};

/// Allocates `size` bytes of memory, aligned on `alignment`.
///
/// Returns a null pointer if the allocation fails, or if `alignment` is not a power of 2.
///
/// A `size` of 0 returns a non-null pointer which must not be dereferenced.
#[no_mangle]
pub extern "C" fn pmem_allocate(size: usize, alignment: usize) -> *mut u8 {
    into_raw(Layout::try_from_size_align(size, alignment).and_then(|layout| ALLOCATOR.allocate(layout)))
}

/// Allocates `size` bytes of zeroed memory, aligned on `alignment`.
///
/// Returns a null pointer if the allocation fails, or if `alignment` is not a power of 2.
#[no_mangle]
pub extern "C" fn pmem_allocate_zeroed(size: usize, alignment: usize) -> *mut u8 {
    into_raw(Layout::try_from_size_align(size, alignment).and_then(|layout| ALLOCATOR.allocate_zeroed(layout)))
}

/// Deallocates the memory located at `pointer`.
///
/// A null `pointer` is ignored.
///
/// #   Safety
///
/// -   Assumes `pointer` has been returned by a prior call to `pmem_allocate` or its siblings, with `size` and
///     `alignment`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
/// -   Assumes the memory pointed by `pointer` is no longer in use.
#[no_mangle]
pub unsafe extern "C" fn pmem_deallocate(pointer: *mut u8, size: usize, alignment: usize) {
    let Some(pointer) = NonNull::new(pointer) else { return };

    //  Safety:
    //  -   `size` and `alignment` were validated on allocation.
    let layout = Layout::from_size_align_unchecked(size, alignment);

    ALLOCATOR.deallocate(pointer, layout);
}

/// Reallocates the memory located at `pointer` to `new_size` bytes, preserving its alignment and content.
///
/// Returns a null pointer on failure, in which case the memory located at `pointer` is left untouched.
///
/// #   Safety
///
/// -   Assumes `pointer` has been returned by a prior call to `pmem_allocate` or its siblings, with `size` and
///     `alignment`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
#[no_mangle]
pub unsafe extern "C" fn pmem_reallocate(pointer: *mut u8, size: usize, alignment: usize, new_size: usize) -> *mut u8 {
    let Some(pointer) = NonNull::new(pointer) else { return ptr::null_mut() };

    //  Safety:
    //  -   `size` and `alignment` were validated on allocation.
    let old_layout = Layout::from_size_align_unchecked(size, alignment);

    let Ok(new_layout) = old_layout.with_size(new_size) else { return ptr::null_mut() };

    let result = if new_size >= size {
        ALLOCATOR.grow(pointer, old_layout, new_layout)
    } else {
        ALLOCATOR.shrink(pointer, old_layout, new_layout)
    };

    into_raw(result)
}

//
//  Implementation
//

static ALLOCATOR: Global = Global::new();

fn into_raw(result: AllocResult<NonNull<[u8]>>) -> *mut u8 {
    result.map(|block| block.cast::<u8>().as_ptr()).unwrap_or(ptr::null_mut())
}
