//! Global

use core::{
    alloc::GlobalAlloc,
    ptr::{self, NonNull},
};

use pmem_core::{AllocError, AllocResult, Allocator, Layout, Properties};

use crate::{Platform, SystemConfiguration, SystemPlatform};

/// The process-wide, OS-backed, allocator.
///
/// Zero-sized requests are served with `Layout::dangling` and never reach the OS; all other requests are forwarded
/// to the OS allocator (`posix_memalign`, `realloc` and `free` on Linux).
///
/// Instances are interchangeable: a block allocated by one instance may be deallocated by another.
///
/// #   Global allocator
///
/// On Linux, `Global` may be installed as the `#[global_allocator]`: it neither allocates through Rust, nor logs, as
/// a logger may itself allocate. Wrap it in `Tracking` to log its failures.
#[derive(Clone, Copy, Debug, Default)]
pub struct Global(SystemPlatform);

impl Global {
    /// Creates an instance.
    pub const fn new() -> Self { Self(SystemPlatform::new()) }

    //  Moves a block to a new location, as `realloc` cannot change the alignment.
    unsafe fn relocate(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        let block = self.allocate(new_layout)?;

        //  Safety:
        //  -   Both blocks are valid for the smallest of the two sizes.
        //  -   `block` was just allocated, hence does not overlap `pointer`.
        let size = old_layout.size().min(new_layout.size());
        ptr::copy_nonoverlapping(pointer.as_ptr(), block.cast::<u8>().as_ptr(), size);

        self.deallocate(pointer, old_layout);

        Ok(block)
    }

    //  Resizes a block in place if possible, through `realloc`.
    unsafe fn resize(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        if old_layout.is_empty() {
            return self.allocate(new_layout);
        }

        if new_layout.is_empty() {
            self.deallocate(pointer, old_layout);
            return Ok(NonNull::slice_from_raw_parts(new_layout.dangling(), 0));
        }

        if old_layout.align() != new_layout.align() {
            return self.relocate(pointer, old_layout, new_layout);
        }

        let new_pointer = self.0.reallocate(pointer.as_ptr(), old_layout, new_layout.size());

        NonNull::new(new_pointer)
            .map(|new_pointer| NonNull::slice_from_raw_parts(new_pointer, new_layout.size()))
            .ok_or(AllocError::OutOfMemory)
    }
}

unsafe impl Allocator for Global {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        Properties::<SystemConfiguration>::check_alignment(layout)?;

        if layout.is_empty() {
            return Ok(NonNull::slice_from_raw_parts(layout.dangling(), 0));
        }

        //  Safety:
        //  -   `layout.size()` is not 0.
        //  -   `layout.align()` does not exceed `MAX_ALIGNMENT`.
        let pointer = unsafe { self.0.allocate(layout) };

        NonNull::new(pointer)
            .map(|pointer| NonNull::slice_from_raw_parts(pointer, layout.size()))
            .ok_or(AllocError::OutOfMemory)
    }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout) {
        if layout.is_empty() {
            return;
        }

        self.0.deallocate(pointer.as_ptr(), layout);
    }

    unsafe fn grow(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        debug_assert!(new_layout.size() >= old_layout.size(),
            "Cannot grow from {} to {} bytes", old_layout.size(), new_layout.size());

        Properties::<SystemConfiguration>::check_alignment(new_layout)?;

        self.resize(pointer, old_layout, new_layout)
    }

    unsafe fn shrink(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        debug_assert!(new_layout.size() <= old_layout.size(),
            "Cannot shrink from {} to {} bytes", old_layout.size(), new_layout.size());

        Properties::<SystemConfiguration>::check_alignment(new_layout)?;

        self.resize(pointer, old_layout, new_layout)
    }
}

unsafe impl GlobalAlloc for Global {
    unsafe fn alloc(&self, layout: core::alloc::Layout) -> *mut u8 {
        self.allocate(layout.into()).map(|block| block.cast::<u8>().as_ptr()).unwrap_or(ptr::null_mut())
    }

    unsafe fn alloc_zeroed(&self, layout: core::alloc::Layout) -> *mut u8 {
        self.allocate_zeroed(layout.into()).map(|block| block.cast::<u8>().as_ptr()).unwrap_or(ptr::null_mut())
    }

    unsafe fn dealloc(&self, pointer: *mut u8, layout: core::alloc::Layout) {
        if let Some(pointer) = NonNull::new(pointer) {
            self.deallocate(pointer, layout.into());
        }
    }

    unsafe fn realloc(&self, pointer: *mut u8, layout: core::alloc::Layout, new_size: usize) -> *mut u8 {
        let (Some(pointer), Ok(new_layout)) = (NonNull::new(pointer), Layout::from(layout).with_size(new_size)) else {
            return ptr::null_mut();
        };

        let old_layout = Layout::from(layout);

        let result = if new_size >= old_layout.size() {
            self.grow(pointer, old_layout, new_layout)
        } else {
            self.shrink(pointer, old_layout, new_layout)
        };

        result.map(|block| block.cast::<u8>().as_ptr()).unwrap_or(ptr::null_mut())
    }
}

#[cfg(test)]
mod tests {

use core::sync::atomic::{AtomicUsize, Ordering};

use pmem_core::{PowerOf2, TypedAllocator};

use super::*;

//  Counts the records emitted by `Global`.
struct ModuleLogger(AtomicUsize);

impl log::Log for ModuleLogger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool { true }

    fn log(&self, record: &log::Record<'_>) {
        if record.target() == "pmem::global" {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn flush(&self) {}
}

static LOGGER: ModuleLogger = ModuleLogger(AtomicUsize::new(0));

fn fill(block: NonNull<[u8]>, value: u8) {
    unsafe { ptr::write_bytes(block.cast::<u8>().as_ptr(), value, block.len()) }
}

fn all(pointer: NonNull<u8>, size: usize, value: u8) -> bool {
    (0..size).all(|i| unsafe { *pointer.as_ptr().add(i) } == value)
}

#[test]
fn global_allocate_deallocate() {
    let global = Global::new();
    let layout = Layout::from_size_align(16, 8);

    let block = global.allocate(layout).unwrap();

    assert_eq!(16, block.len());
    assert!(layout.fits(block.cast()));

    fill(block, 0x5A);

    unsafe { global.deallocate(block.cast(), layout) };
}

#[test]
fn global_allocate_over_aligned() {
    let global = Global::new();

    for shift in [4, 6, 12, 16, 21] {
        let layout = Layout::from_size_align(24, 1 << shift);

        let block = global.allocate(layout).unwrap();

        assert_eq!(0, block.cast::<u8>().as_ptr() as usize % (1 << shift), "{:?}", layout);

        unsafe { global.deallocate(block.cast(), layout) };
    }
}

#[test]
fn global_allocate_zero_sized() {
    let global = Global::new();
    let layout = Layout::from_size_align(0, 64);

    let block = global.allocate(layout).unwrap();

    assert_eq!(0, block.len());
    assert_eq!(layout.dangling(), block.cast());

    unsafe { global.deallocate(block.cast(), layout) };
}

#[test]
fn global_allocate_invalid_alignment() {
    let global = Global::new();
    let layout = Layout::from_size_align(8, 1 << 31);

    assert_eq!(Err(AllocError::InvalidAlignment), global.allocate(layout));
}

#[test]
fn global_allocate_out_of_memory() {
    let global = Global::new();
    let layout = Layout::from_size_align(isize::MAX as usize - 4095, 4096);

    assert_eq!(Err(AllocError::OutOfMemory), global.allocate(layout));
}

#[test]
fn global_failures_are_silent() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Trace);

    let global = Global::new();
    let huge = core::alloc::Layout::from_size_align(isize::MAX as usize - 4095, 4096).unwrap();

    assert!(unsafe { global.alloc(huge) }.is_null());

    let layout = core::alloc::Layout::from_size_align(16, 8).unwrap();
    let pointer = unsafe { global.alloc(layout) };

    assert!(!pointer.is_null());
    assert!(unsafe { global.realloc(pointer, layout, isize::MAX as usize - 7) }.is_null());

    unsafe { global.dealloc(pointer, layout) };

    assert_eq!(0, LOGGER.0.load(Ordering::Relaxed));
}

#[test]
fn global_grow_preserves() {
    let global = Global::new();
    let (small, large) = (Layout::from_size_align(16, 8), Layout::from_size_align(4096, 8));

    let block = global.allocate(small).unwrap();
    fill(block, 0x33);

    let block = unsafe { global.grow_zeroed(block.cast(), small, large) }.unwrap();

    assert_eq!(4096, block.len());
    assert!(all(block.cast(), 16, 0x33));
    assert!(all(unsafe { NonNull::new_unchecked(block.cast::<u8>().as_ptr().add(16)) }, 4096 - 16, 0));

    unsafe { global.deallocate(block.cast(), large) };
}

#[test]
fn global_grow_realigns() {
    let global = Global::new();
    let (small, large) = (Layout::from_size_align(8, 8), Layout::from_size_align(64, 4096));

    let block = global.allocate(small).unwrap();
    fill(block, 0x77);

    let block = unsafe { global.grow(block.cast(), small, large) }.unwrap();

    assert!(large.fits(block.cast()));
    assert!(all(block.cast(), 8, 0x77));

    unsafe { global.deallocate(block.cast(), large) };
}

#[test]
fn global_shrink_preserves() {
    let global = Global::new();
    let (large, small) = (Layout::from_size_align(256, 64), Layout::from_size_align(32, 64));

    let block = global.allocate(large).unwrap();
    fill(block, 0x11);

    let block = unsafe { global.shrink(block.cast(), large, small) }.unwrap();

    assert_eq!(32, block.len());
    assert!(small.fits(block.cast()));
    assert!(all(block.cast(), 32, 0x11));

    let empty = Layout::from_size_align(0, 64);

    let block = unsafe { global.shrink(block.cast(), small, empty) }.unwrap();

    assert_eq!(0, block.len());
}

#[test]
fn global_alloc_realloc() {
    let global = Global::new();
    let layout = core::alloc::Layout::from_size_align(8, 8).unwrap();

    unsafe {
        let pointer = GlobalAlloc::alloc_zeroed(&global, layout);

        assert!(!pointer.is_null());
        assert!(all(NonNull::new(pointer).unwrap(), 8, 0));

        *pointer = 42;

        let pointer = GlobalAlloc::realloc(&global, pointer, layout, 1024);

        assert!(!pointer.is_null());
        assert_eq!(42, *pointer);

        GlobalAlloc::dealloc(&global, pointer, core::alloc::Layout::from_size_align(1024, 8).unwrap());
    }
}

#[test]
fn global_typed() {
    let global = Global::new();

    let block = global.allocate_sentinel(5, 0u32).unwrap();

    assert!(PowerOf2::align_of::<u32>().is_aligned(block.as_non_null_ptr()));
    assert_eq!(0, unsafe { block.sentinel() });

    unsafe { global.free_terminated(block) };
}

}
