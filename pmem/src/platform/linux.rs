//! Implementation of Linux specific calls.

use core::{mem, ptr};

use pmem_core::{Configuration, Layout, PowerOf2};

use super::Platform;

/// Implementation of the Configuration trait, for Linux.
#[derive(Default)]
pub(crate) struct SystemConfiguration;

impl Configuration for SystemConfiguration {
    //  1 GB
    const MAX_ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(1024 * 1024 * 1024) };

    //  `posix_memalign` only accepts alignments which are multiples of the size of a pointer.
    const MIN_BLOCK_SIZE: PowerOf2 = unsafe { PowerOf2::new_unchecked(mem::size_of::<*mut u8>()) };
}

/// Implementation of the Platform trait, for Linux.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SystemPlatform;

impl SystemPlatform {
    /// Creates an instance.
    pub(crate) const fn new() -> Self { Self }
}

impl Platform for SystemPlatform {
    unsafe fn allocate(&self, layout: Layout) -> *mut u8 {
        debug_assert!(layout.size() > 0, "Zero-sized requests should be served by the caller");

        if is_malloc_aligned(layout.align(), layout.size()) {
            return libc::malloc(layout.size()) as *mut u8;
        }

        posix_memalign_allocate(layout)
    }

    unsafe fn deallocate(&self, pointer: *mut u8, _: Layout) {
        libc::free(pointer as *mut libc::c_void);
    }

    unsafe fn reallocate(&self, pointer: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        debug_assert!(new_size > 0, "Zero-sized requests should be served by the caller");

        if is_malloc_aligned(layout.align(), new_size) {
            return libc::realloc(pointer as *mut libc::c_void, new_size) as *mut u8;
        }

        //  `realloc` may not preserve over-alignment, hence the block is moved by hand.

        //  Safety:
        //  -   `layout.align()` is a power of 2.
        //  -   `new_size` does not overflow when rounded up to `layout.align()`, as per pre-conditions.
        let new_layout = Layout::from_size_align_unchecked(new_size, layout.align());

        let new_pointer = posix_memalign_allocate(new_layout);

        if !new_pointer.is_null() {
            //  Safety:
            //  -   Both blocks are valid for the smallest of the two sizes.
            //  -   `new_pointer` was just allocated, hence does not overlap `pointer`.
            ptr::copy_nonoverlapping(pointer, new_pointer, layout.size().min(new_size));

            self.deallocate(pointer, layout);
        }

        new_pointer
    }
}

//  Alignment guaranteed by `malloc` and `realloc` on all supported architectures.
const MALLOC_ALIGNMENT: usize = 2 * mem::size_of::<usize>();

//  Returns whether a block of `size` bytes obtained from `malloc` is suitably aligned on `align`.
//
//  `malloc` may return less aligned pointers for blocks smaller than its alignment.
fn is_malloc_aligned(align: usize, size: usize) -> bool { align <= MALLOC_ALIGNMENT && align <= size }

//  Wrapper around `posix_memalign`.
//
//  Returns a null pointer on failure.
//
//  #   Safety
//
//  -   Assumes `layout.size()` is not 0.
unsafe fn posix_memalign_allocate(layout: Layout) -> *mut u8 {
    let alignment = layout.alignment().max(SystemConfiguration::MIN_BLOCK_SIZE);

    let mut pointer: *mut libc::c_void = ptr::null_mut();

    //  Safety:
    //  -   `alignment` is a power of 2, and a multiple of the size of a pointer.
    let result = libc::posix_memalign(&mut pointer as *mut _, alignment.value(), layout.size());

    if result != 0 {
        return ptr::null_mut();
    }

    pointer as *mut u8
}
