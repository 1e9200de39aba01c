//! Implementation for platforms without dedicated support, through the allocator of the `alloc` crate.
//!
//! `Global` cannot be used as the `#[global_allocator]` on those platforms.

use core::mem;

use pmem_core::{Configuration, Layout, PowerOf2};

use super::Platform;

/// Implementation of the Configuration trait, for other platforms.
#[derive(Default)]
pub(crate) struct SystemConfiguration;

impl Configuration for SystemConfiguration {
    //  1 GB
    const MAX_ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(1024 * 1024 * 1024) };

    const MIN_BLOCK_SIZE: PowerOf2 = unsafe { PowerOf2::new_unchecked(mem::size_of::<*mut u8>()) };
}

/// Implementation of the Platform trait, for other platforms.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SystemPlatform;

impl SystemPlatform {
    /// Creates an instance.
    pub(crate) const fn new() -> Self { Self }
}

impl Platform for SystemPlatform {
    unsafe fn allocate(&self, layout: Layout) -> *mut u8 { alloc::alloc::alloc(layout.into()) }

    unsafe fn deallocate(&self, pointer: *mut u8, layout: Layout) { alloc::alloc::dealloc(pointer, layout.into()) }

    unsafe fn reallocate(&self, pointer: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        alloc::alloc::realloc(pointer, layout.into(), new_size)
    }
}
