//! Tracking
//!
//! A diagnostic wrapper around any backend, counting the blocks it hands out and logging each request, along with the
//! `ReturnAddress` of its call site, at the `trace` level.
//!
//! Leaks are detected by checking `live_blocks` once all blocks should have been released.

use core::{
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

use log::{debug, trace};

use pmem_core::{AllocResult, Allocator, Layout, ReturnAddress};

/// Tracking
///
/// Counts the blocks currently allocated through it, and logs every request.
///
/// Blocks are handed out trimmed to the requested size, even if the wrapped backend returned more, so that the only
/// layout fitting a block is the one it was allocated with, and the byte count balances out.
#[derive(Debug, Default)]
pub struct Tracking<A> {
    inner: A,
    allocations: AtomicUsize,
    live_blocks: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl<A> Tracking<A> {
    /// Creates an instance.
    pub const fn new(inner: A) -> Self {
        let (allocations, live_blocks, live_bytes) = (AtomicUsize::new(0), AtomicUsize::new(0), AtomicUsize::new(0));

        Self { inner, allocations, live_blocks, live_bytes }
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &A { &self.inner }

    /// Returns the number of successful allocations, since creation.
    pub fn allocations(&self) -> usize { self.allocations.load(Ordering::Relaxed) }

    /// Returns the number of blocks currently allocated.
    pub fn live_blocks(&self) -> usize { self.live_blocks.load(Ordering::Relaxed) }

    /// Returns the number of bytes currently allocated.
    pub fn live_bytes(&self) -> usize { self.live_bytes.load(Ordering::Relaxed) }

    /// Returns the wrapped backend.
    pub fn into_inner(self) -> A { self.inner }
}

unsafe impl<A> Allocator for Tracking<A>
    where
        A: Allocator
{
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        self.allocate_at(layout, ReturnAddress::UNKNOWN)
    }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout) {
        self.deallocate_at(pointer, layout, ReturnAddress::UNKNOWN)
    }

    fn allocate_at(&self, layout: Layout, ret: ReturnAddress) -> AllocResult<NonNull<[u8]>> {
        let block = match self.inner.allocate_at(layout, ret) {
            Ok(block) => block,
            Err(error) => {
                debug!("Tracking - {} for {:?} at {}", error, layout, ret);
                return Err(error);
            },
        };

        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.live_blocks.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(layout.size(), Ordering::Relaxed);

        trace!("Tracking - allocated {:p} ({} bytes for {:?}) at {}", block.cast::<u8>(), block.len(), layout, ret);

        Ok(NonNull::slice_from_raw_parts(block.cast(), layout.size()))
    }

    unsafe fn deallocate_at(&self, pointer: NonNull<u8>, layout: Layout, ret: ReturnAddress) {
        trace!("Tracking - deallocating {:p} ({:?}) at {}", pointer, layout, ret);

        self.live_blocks.fetch_sub(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);

        self.inner.deallocate_at(pointer, layout, ret);
    }
}
