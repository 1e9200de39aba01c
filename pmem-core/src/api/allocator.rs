//! Allocator
//!
//! The Allocator trait is the sole seam between the users of memory and the strategies used to acquire it. By
//! abstracting the backend, the same code may allocate from the OS, from a fixed region, from a pool, or through a
//! debugging wrapper.
//!
//! A backend only has to provide `allocate` and `deallocate`; everything else, including the typed operations of
//! `TypedAllocator`, is layered on top of those two.

use core::ptr::{self, NonNull};

use super::{AllocResult, Layout, ReturnAddress};

/// Abstraction of a memory backend.
///
/// #   Currently allocated memory
///
/// A block of memory is _currently allocated_ from the moment it is returned by `allocate` (or any of its variants)
/// until it is handed back through `deallocate` (or `grow` and `shrink`). Ownership of the block belongs to the caller
/// in the meantime; the backend disclaims any claim to it.
///
/// #   Memory fitting
///
/// A `layout` _fits_ a currently allocated block if:
/// -   Its alignment is the alignment the block was requested with.
/// -   Its size lies between the size requested and the length of the slice returned.
///
/// #   Safety
///
/// Implementations must guarantee that a block returned by a successful `allocate`:
/// -   Is valid for reads and writes for `layout.size()` bytes, or the length of the returned slice if larger.
/// -   Is aligned on `layout.align()`.
/// -   Does not alias any other currently allocated block of the same instance.
/// -   Remains valid until deallocated, even if the instance itself is moved.
///
/// Zero-sized layouts must be accepted, and may be served with `Layout::dangling`.
///
/// Implementations must never let the `ReturnAddress` of a request influence its outcome.
pub unsafe trait Allocator {
    /// Allocates a fresh block of memory as per the specified layout.
    ///
    /// The content of the block is unspecified.
    ///
    /// #   Errors
    ///
    /// -   `OutOfMemory` if the backend cannot satisfy the request.
    /// -   `InvalidAlignment` if the alignment exceeds what the backend supports.
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Deallocates the supplied block of memory.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` denotes a block currently allocated by this very instance.
    /// -   Assumes `layout` fits that block.
    ///
    /// Backends are not required to detect violations.
    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout);

    /// Allocates, on behalf of the call site identified by `ret`.
    ///
    /// Backends with diagnostics record `ret`, others ignore it.
    fn allocate_at(&self, layout: Layout, ret: ReturnAddress) -> AllocResult<NonNull<[u8]>> {
        let _ = ret;

        self.allocate(layout)
    }

    /// Deallocates, on behalf of the call site identified by `ret`.
    ///
    /// #   Safety
    ///
    /// See `deallocate`.
    unsafe fn deallocate_at(&self, pointer: NonNull<u8>, layout: Layout, ret: ReturnAddress) {
        let _ = ret;

        self.deallocate(pointer, layout)
    }

    /// Allocates a fresh block of memory, filled with zeroes.
    fn allocate_zeroed(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        let block = self.allocate(layout)?;

        //  Safety:
        //  -   `block` is valid for writes of `block.len()` bytes.
        unsafe { ptr::write_bytes(block.cast::<u8>().as_ptr(), 0, block.len()) };

        Ok(block)
    }

    /// Grows a block of memory, preserving its content.
    ///
    /// On success, ownership of `pointer` is transferred to the backend and the returned block replaces it; on failure,
    /// `pointer` is left untouched and still owned by the caller.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` denotes a block currently allocated by this very instance.
    /// -   Assumes `old_layout` fits that block.
    /// -   Assumes `new_layout.size()` is greater than or equal to `old_layout.size()`.
    unsafe fn grow(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        debug_assert!(new_layout.size() >= old_layout.size(),
            "Cannot grow from {} to {} bytes", old_layout.size(), new_layout.size());

        let block = self.allocate(new_layout)?;

        //  Safety:
        //  -   Both blocks are valid for `old_layout.size()` bytes.
        //  -   `block` was just allocated, hence cannot overlap `pointer`.
        ptr::copy_nonoverlapping(pointer.as_ptr(), block.cast::<u8>().as_ptr(), old_layout.size());

        self.deallocate(pointer, old_layout);

        Ok(block)
    }

    /// Grows a block of memory, preserving its content and zeroing the extension.
    ///
    /// #   Safety
    ///
    /// See `grow`.
    unsafe fn grow_zeroed(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        let block = self.grow(pointer, old_layout, new_layout)?;

        let old_size = old_layout.size();

        //  Safety:
        //  -   `block` is valid for writes of `block.len()` bytes, and `block.len() >= old_size`.
        ptr::write_bytes(block.cast::<u8>().as_ptr().add(old_size), 0, block.len() - old_size);

        Ok(block)
    }

    /// Shrinks a block of memory, preserving the first `new_layout.size()` bytes of its content.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` denotes a block currently allocated by this very instance.
    /// -   Assumes `old_layout` fits that block.
    /// -   Assumes `new_layout.size()` is less than or equal to `old_layout.size()`.
    unsafe fn shrink(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        debug_assert!(new_layout.size() <= old_layout.size(),
            "Cannot shrink from {} to {} bytes", old_layout.size(), new_layout.size());

        let block = self.allocate(new_layout)?;

        //  Safety:
        //  -   Both blocks are valid for `new_layout.size()` bytes.
        //  -   `block` was just allocated, hence cannot overlap `pointer`.
        ptr::copy_nonoverlapping(pointer.as_ptr(), block.cast::<u8>().as_ptr(), new_layout.size());

        self.deallocate(pointer, old_layout);

        Ok(block)
    }

    /// Creates a "by reference" adapter, itself an Allocator, borrowing `self`.
    fn by_ref(&self) -> &Self
        where
            Self: Sized
    {
        self
    }
}

unsafe impl<A> Allocator for &A
    where
        A: Allocator + ?Sized,
{
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> { (**self).allocate(layout) }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout) { (**self).deallocate(pointer, layout) }

    fn allocate_at(&self, layout: Layout, ret: ReturnAddress) -> AllocResult<NonNull<[u8]>> {
        (**self).allocate_at(layout, ret)
    }

    unsafe fn deallocate_at(&self, pointer: NonNull<u8>, layout: Layout, ret: ReturnAddress) {
        (**self).deallocate_at(pointer, layout, ret)
    }

    fn allocate_zeroed(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> { (**self).allocate_zeroed(layout) }

    unsafe fn grow(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        (**self).grow(pointer, old_layout, new_layout)
    }

    unsafe fn grow_zeroed(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        (**self).grow_zeroed(pointer, old_layout, new_layout)
    }

    unsafe fn shrink(&self, pointer: NonNull<u8>, old_layout: Layout, new_layout: Layout)
        -> AllocResult<NonNull<[u8]>>
    {
        (**self).shrink(pointer, old_layout, new_layout)
    }
}

#[cfg(test)]
mod tests {

use core::cell::Cell;

use crate::{AllocError, PowerOf2};

use super::*;

#[repr(align(64))]
struct Pool([u8; 256]);

//  A single 256-bytes slot, handed out whole.
struct TestAllocator {
    pool: core::cell::UnsafeCell<Pool>,
    occupied: Cell<bool>,
    deallocations: Cell<usize>,
}

impl TestAllocator {
    fn new() -> Self {
        let pool = core::cell::UnsafeCell::new(Pool([0xAB; 256]));

        Self { pool, occupied: Cell::new(false), deallocations: Cell::new(0) }
    }

    fn base(&self) -> NonNull<u8> { NonNull::new(self.pool.get() as *mut u8).unwrap() }
}

unsafe impl Allocator for TestAllocator {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.align() > 64 {
            return Err(AllocError::InvalidAlignment);
        }

        if layout.size() > 256 || self.occupied.replace(true) {
            return Err(AllocError::OutOfMemory);
        }

        Ok(NonNull::slice_from_raw_parts(self.base(), 256))
    }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, _: Layout) {
        assert_eq!(self.base(), pointer);
        assert!(self.occupied.replace(false));

        self.deallocations.set(self.deallocations.get() + 1);
    }
}

#[test]
fn allocate_zeroed() {
    let allocator = TestAllocator::new();

    let block = allocator.allocate_zeroed(Layout::from_size_align(16, 8)).unwrap();
    let bytes = unsafe { block.as_ref() };

    assert_eq!(256, bytes.len());
    assert!(bytes.iter().all(|b| *b == 0));
}

#[test]
fn allocate_at_ignores_return_address() {
    let allocator = TestAllocator::new();
    let layout = Layout::from_size_align(16, 8);

    let block = allocator.allocate_at(layout, ReturnAddress::caller()).unwrap();

    assert_eq!(Err(AllocError::OutOfMemory), allocator.allocate_at(layout, ReturnAddress::UNKNOWN));

    unsafe { allocator.deallocate_at(block.cast(), layout, ReturnAddress::caller()) };

    assert_eq!(1, allocator.deallocations.get());
}

#[test]
fn allocate_invalid_alignment() {
    let allocator = TestAllocator::new();
    let layout = Layout::from_size_align(16, 128);

    assert_eq!(Err(AllocError::InvalidAlignment), allocator.allocate(layout));
    assert_eq!(PowerOf2::new(128), Some(layout.alignment()));
}

#[test]
fn grow_failure_keeps_block() {
    let allocator = TestAllocator::new();
    let (small, large) = (Layout::from_size_align(16, 8), Layout::from_size_align(32, 8));

    let block = allocator.allocate(small).unwrap();

    //  The single slot is taken, so growing cannot succeed.
    let result = unsafe { allocator.grow(block.cast(), small, large) };

    assert_eq!(Err(AllocError::OutOfMemory), result);
    assert_eq!(0, allocator.deallocations.get());

    unsafe { allocator.deallocate(block.cast(), small) };
}

#[test]
fn by_ref_forwards() {
    let allocator = TestAllocator::new();
    let by_ref = allocator.by_ref();
    let layout = Layout::from_size_align(8, 8);

    let block = (&by_ref).allocate(layout).unwrap();

    assert_eq!(Err(AllocError::OutOfMemory), allocator.allocate(layout));

    unsafe { (&by_ref).deallocate(block.cast(), layout) };

    assert_eq!(1, allocator.deallocations.get());
}

}
