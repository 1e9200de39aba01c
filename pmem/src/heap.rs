//! Heap
//!
//! A binary buddy allocator over a caller supplied region.
//!
//! The region is recursively split in halves, down to `MIN_BLOCK_SIZE`; each block is thus a power of 2, and aligned
//! on its size relative to the start of the region. A block of order `n` is `MIN_BLOCK_SIZE << n` bytes, and free
//! blocks of a given order are threaded in an intrusive list, whose links live in the free blocks themselves.
//!
//! On deallocation, a block is merged with its buddy (the other half of the block it was split from) for as long as
//! the buddy is free, so that no fragmentation remains once all blocks are deallocated.

use core::{
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
};

use log::debug;

use pmem_core::{AllocError, AllocResult, Configuration, Layout, PowerOf2, Properties};

use crate::LocalAllocator;

/// Default Configuration of a Heap.
#[derive(Default)]
pub struct HeapConfiguration;

impl Configuration for HeapConfiguration {
    //  4 KB
    const MAX_ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(4 * 1024) };

    const MIN_BLOCK_SIZE: PowerOf2 = unsafe { PowerOf2::new_unchecked(16) };
}

/// Heap
///
/// A buddy allocator carving blocks out of a region of memory borrowed for `'a`.
///
/// A Heap requires exclusive access to allocate and deallocate, see `LocalAllocator`; wrap it in `Locked` to share it
/// across threads.
pub struct Heap<'a, C = HeapConfiguration> {
    base: NonNull<u8>,
    size: PowerOf2,
    free_lists: [Option<NonNull<FreeBlock>>; MAX_ORDERS],
    _marker: PhantomData<(&'a mut [u8], fn() -> C)>,
}

impl<'a, C> Heap<'a, C>
    where
        C: Configuration
{
    /// Creates an instance, managing the largest power-of-2 prefix of `region`.
    ///
    /// #   Errors
    ///
    /// -   `InvalidAlignment` if `region` is not aligned on `C::MAX_ALIGNMENT`.
    /// -   `OutOfMemory` if `region` cannot hold a single block of `C::MIN_BLOCK_SIZE` bytes.
    ///
    /// #   Panics
    ///
    /// If `C::MIN_BLOCK_SIZE` is too small to hold the link of a free block.
    pub fn new(region: &'a mut [u8]) -> AllocResult<Self> {
        assert!(C::MIN_BLOCK_SIZE.value() >= mem::size_of::<FreeBlock>(),
            "MIN_BLOCK_SIZE {} is too small, {} required", C::MIN_BLOCK_SIZE.value(), mem::size_of::<FreeBlock>());
        assert!(C::MAX_ALIGNMENT.value() >= mem::align_of::<FreeBlock>(),
            "MAX_ALIGNMENT {} is too small, {} required", C::MAX_ALIGNMENT.value(), mem::align_of::<FreeBlock>());

        let base = NonNull::from(&mut *region).cast::<u8>();

        if !C::MAX_ALIGNMENT.is_aligned(base) {
            return Err(AllocError::InvalidAlignment);
        }

        let size = region.len().checked_ilog2()
            .and_then(|shift| PowerOf2::new(1 << shift))
            .filter(|size| *size >= C::MIN_BLOCK_SIZE)
            .ok_or(AllocError::OutOfMemory)?;

        let mut heap = Self { base, size, free_lists: [None; MAX_ORDERS], _marker: PhantomData };

        //  Safety:
        //  -   `base` is aligned on `MAX_ALIGNMENT`, suitable for a `FreeBlock`.
        //  -   `base` is valid for `size` bytes, which are now owned by `heap`.
        unsafe { heap.push(heap.number_orders() - 1, base) };

        Ok(heap)
    }

    /// Returns the number of bytes managed.
    pub fn size(&self) -> usize { self.size.value() }

    /// Returns the number of bytes currently free.
    pub fn available(&self) -> usize {
        let mut available = 0;

        for (order, head) in self.free_lists.iter().enumerate().take(self.number_orders()) {
            let mut current = *head;

            while let Some(block) = current {
                available += self.order_size(order);

                //  Safety:
                //  -   Free lists only contain free blocks, whose link is initialized.
                current = unsafe { block.as_ref().next };
            }
        }

        available
    }

    //  Returns the number of distinct orders, hence free lists, in use.
    fn number_orders(&self) -> usize { (self.size.log2() - C::MIN_BLOCK_SIZE.log2()) as usize + 1 }

    //  Returns the size of the blocks of `order`.
    fn order_size(&self, order: usize) -> usize { C::MIN_BLOCK_SIZE.value() << order }

    //  Returns the order of the blocks serving `layout`.
    //
    //  Any layout fitting a block computes the same order as the layout the block was requested with.
    fn order(&self, layout: Layout) -> AllocResult<usize> {
        let block_size = Properties::<C>::block_size(layout)?;

        if block_size > self.size {
            return Err(AllocError::OutOfMemory);
        }

        Ok((block_size.log2() - C::MIN_BLOCK_SIZE.log2()) as usize)
    }

    //  Returns the buddy of `block`, or None if `block` spans the entire region.
    fn buddy(&self, order: usize, block: NonNull<u8>) -> Option<NonNull<u8>> {
        let size = self.order_size(order);

        if size >= self.size.value() {
            return None;
        }

        let offset = block.as_ptr() as usize - self.base.as_ptr() as usize;

        //  Safety:
        //  -   `offset` is a multiple of `size`, and `size` is less than `self.size`, hence `offset ^ size` is within
        //      the region.
        Some(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset ^ size)) })
    }

    //  Pops a free block of `order`, if any.
    //
    //  #   Safety
    //
    //  -   Assumes `order` is less than `self.number_orders()`.
    unsafe fn pop(&mut self, order: usize) -> Option<NonNull<u8>> {
        let block = self.free_lists[order]?;

        self.free_lists[order] = block.as_ref().next;

        Some(block.cast())
    }

    //  Pushes `block` onto the free list of `order`.
    //
    //  #   Safety
    //
    //  -   Assumes `block` is a block of `order` of this heap, which is no longer in use.
    unsafe fn push(&mut self, order: usize, block: NonNull<u8>) {
        let block = block.cast::<FreeBlock>();

        ptr::write(block.as_ptr(), FreeBlock { next: self.free_lists[order] });

        self.free_lists[order] = Some(block);
    }

    //  Removes `block` from the free list of `order`, returning whether it was found.
    //
    //  #   Safety
    //
    //  -   Assumes `order` is less than `self.number_orders()`.
    unsafe fn remove(&mut self, order: usize, block: NonNull<u8>) -> bool {
        let target = block.cast::<FreeBlock>();

        let mut link: *mut Option<NonNull<FreeBlock>> = &mut self.free_lists[order];

        while let Some(current) = *link {
            if current == target {
                *link = current.as_ref().next;
                return true;
            }

            link = &mut (*current.as_ptr()).next;
        }

        false
    }

    //  Splits `block` of `order` down to `order_needed`, pushing each upper half onto its free list.
    //
    //  #   Safety
    //
    //  -   Assumes `block` is a block of `order` of this heap, which is no longer in use.
    unsafe fn split(&mut self, block: NonNull<u8>, mut order: usize, order_needed: usize) {
        while order > order_needed {
            order -= 1;

            let upper = NonNull::new_unchecked(block.as_ptr().add(self.order_size(order)));

            self.push(order, upper);
        }
    }
}

unsafe impl<'a, C> LocalAllocator for Heap<'a, C>
    where
        C: Configuration
{
    fn allocate(&mut self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.is_empty() {
            Properties::<C>::check_alignment(layout)?;

            return Ok(NonNull::slice_from_raw_parts(layout.dangling(), 0));
        }

        let order_needed = self.order(layout)?;

        for order in order_needed..self.number_orders() {
            //  Safety:
            //  -   `order` is less than `self.number_orders()`.
            let Some(block) = (unsafe { self.pop(order) }) else { continue };

            //  Safety:
            //  -   `block` was just popped from the free list of `order`.
            unsafe { self.split(block, order, order_needed) };

            return Ok(NonNull::slice_from_raw_parts(block, self.order_size(order_needed)));
        }

        debug!("Heap - out of memory for {:?}, {} bytes available", layout, self.available());

        Err(AllocError::OutOfMemory)
    }

    unsafe fn deallocate(&mut self, pointer: NonNull<u8>, layout: Layout) {
        if layout.is_empty() {
            return;
        }

        let Ok(mut order) = self.order(layout) else {
            debug_assert!(false, "Heap - {:?} cannot have been allocated by this heap", layout);
            return;
        };

        let mut block = pointer;

        while let Some(buddy) = self.buddy(order, block) {
            if !self.remove(order, buddy) {
                break;
            }

            block = block.min(buddy);
            order += 1;
        }

        self.push(order, block);
    }
}

//  Safety:
//  -   The Heap has exclusive access to its region.
unsafe impl<'a, C> Send for Heap<'a, C> {}

//
//  Implementation
//

//  One free list per possible order.
const MAX_ORDERS: usize = usize::BITS as usize;

//  The link of a free block, stored at its very start.
struct FreeBlock {
    next: Option<NonNull<FreeBlock>>,
}

#[cfg(test)]
mod tests {

use super::*;

#[repr(align(4096))]
struct Region([u8; 4096]);

impl Region {
    fn new() -> Self { Self([0; 4096]) }
}

type TestHeap<'a> = Heap<'a, HeapConfiguration>;

fn layout(size: usize, align: usize) -> Layout { Layout::from_size_align(size, align) }

#[test]
fn heap_new() {
    let mut region = Region::new();
    let heap = TestHeap::new(&mut region.0).unwrap();

    assert_eq!(4096, heap.size());
    assert_eq!(4096, heap.available());
}

#[test]
fn heap_new_truncates() {
    let mut region = Region::new();
    let heap = TestHeap::new(&mut region.0[..3000]).unwrap();

    assert_eq!(2048, heap.size());
    assert_eq!(2048, heap.available());
}

#[test]
fn heap_new_failures() {
    let mut region = Region::new();

    assert_eq!(Some(AllocError::InvalidAlignment), TestHeap::new(&mut region.0[16..]).err());
    assert_eq!(Some(AllocError::OutOfMemory), TestHeap::new(&mut region.0[..15]).err());
    assert_eq!(Some(AllocError::OutOfMemory), TestHeap::new(&mut region.0[..0]).err());
}

#[test]
fn heap_allocate_minimum() {
    let mut region = Region::new();
    let mut heap = TestHeap::new(&mut region.0).unwrap();

    let block = heap.allocate(layout(1, 1)).unwrap();

    assert_eq!(16, block.len());
    assert_eq!(4096 - 16, heap.available());

    unsafe { heap.deallocate(block.cast(), layout(1, 1)) };

    assert_eq!(4096, heap.available());
}

#[test]
fn heap_allocate_aligned() {
    let mut region = Region::new();
    let mut heap = TestHeap::new(&mut region.0).unwrap();

    let first = heap.allocate(layout(8, 8)).unwrap();
    let second = heap.allocate(layout(8, 256)).unwrap();

    assert_eq!(256, second.len());
    assert_eq!(0, second.cast::<u8>().as_ptr() as usize % 256);

    unsafe {
        heap.deallocate(first.cast(), layout(8, 8));
        heap.deallocate(second.cast(), layout(8, 256));
    }

    assert_eq!(4096, heap.available());
}

#[test]
fn heap_allocate_failures() {
    let mut region = Region::new();
    let mut heap = TestHeap::new(&mut region.0).unwrap();

    assert_eq!(Err(AllocError::InvalidAlignment), heap.allocate(layout(8, 8192)));
    assert_eq!(Err(AllocError::OutOfMemory), heap.allocate(layout(8192, 1)));

    let whole = heap.allocate(layout(4096, 1)).unwrap();

    assert_eq!(Err(AllocError::OutOfMemory), heap.allocate(layout(1, 1)));

    unsafe { heap.deallocate(whole.cast(), layout(4096, 1)) };
}

#[test]
fn heap_allocate_zero_sized() {
    let mut region = Region::new();
    let mut heap = TestHeap::new(&mut region.0).unwrap();

    let block = heap.allocate(layout(0, 64)).unwrap();

    assert_eq!(0, block.len());
    assert_eq!(4096, heap.available());

    unsafe { heap.deallocate(block.cast(), layout(0, 64)) };

    assert_eq!(4096, heap.available());
}

#[test]
fn heap_buddy_reuse() {
    let mut region = Region::new();
    let mut heap = TestHeap::new(&mut region.0).unwrap();

    let first = heap.allocate(layout(16, 8)).unwrap();
    let second = heap.allocate(layout(16, 8)).unwrap();

    assert_ne!(first.cast::<u8>(), second.cast::<u8>());

    unsafe { heap.deallocate(first.cast(), layout(16, 8)) };

    let third = heap.allocate(layout(16, 8)).unwrap();

    assert_eq!(first.cast::<u8>(), third.cast::<u8>());

    unsafe {
        heap.deallocate(second.cast(), layout(16, 8));
        heap.deallocate(third.cast(), layout(16, 8));
    }

    assert_eq!(4096, heap.available());
}

#[test]
fn heap_coalesce() {
    let mut region = Region::new();
    let mut heap = TestHeap::new(&mut region.0).unwrap();

    let mut blocks = [None; 256];

    for slot in blocks.iter_mut() {
        let block = heap.allocate(layout(16, 16)).unwrap();

        *slot = Some(block.cast::<u8>());
    }

    assert_eq!(0, heap.available());
    assert_eq!(Err(AllocError::OutOfMemory), heap.allocate(layout(1, 1)));

    //  Release even blocks first, so that no buddy is free until odd blocks are released.
    for parity in [0, 1] {
        for block in blocks.iter().skip(parity).step_by(2) {
            unsafe { heap.deallocate(block.unwrap(), layout(16, 16)) };
        }
    }

    assert_eq!(4096, heap.available());

    let whole = heap.allocate(layout(4096, 4096)).unwrap();

    assert_eq!(region_start(&heap), whole.cast());
}

#[test]
fn heap_at_least_release() {
    let mut region = Region::new();
    let mut heap = TestHeap::new(&mut region.0).unwrap();

    //  100 bytes are served with a block of 128 bytes, which may be released with any size in between.
    let block = heap.allocate(layout(100, 4)).unwrap();

    assert_eq!(128, block.len());

    unsafe { heap.deallocate(block.cast(), layout(128, 4)) };

    assert_eq!(4096, heap.available());
}

fn region_start(heap: &TestHeap<'_>) -> NonNull<u8> { heap.base }

}
