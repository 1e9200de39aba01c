//! Scoped acquisition of memory.
//!
//! A `Scoped` guard releases its block when dropped, on every exit path, including early returns through `?` and
//! panics.

use core::{fmt, mem, ptr::{self, NonNull}};

use super::{Allocated, Allocator, TypedAllocator};

/// Scoped
///
/// A block of memory, released to the allocator it was obtained from when the guard is dropped.
///
/// The elements themselves are never dropped: the guard only deals with memory, not with values.
pub struct Scoped<'a, T, A>
    where
        A: Allocator + ?Sized,
{
    allocator: &'a A,
    block: Allocated<T>,
}

impl<'a, T, A> Scoped<'a, T, A>
    where
        A: Allocator + ?Sized,
{
    /// Creates an instance.
    ///
    /// #   Safety
    ///
    /// -   Assumes `block` is currently allocated by `allocator`, and owned by the caller.
    pub unsafe fn new(allocator: &'a A, block: Allocated<T>) -> Self { Self { allocator, block } }

    /// Returns the block.
    pub fn block(&self) -> &Allocated<T> { &self.block }

    /// Returns the number of logical elements.
    pub fn len(&self) -> usize { self.block.len() }

    /// Returns whether the block has no logical element.
    pub fn is_empty(&self) -> bool { self.block.is_empty() }

    /// Returns a pointer to the first element.
    pub fn as_mut_ptr(&mut self) -> *mut T { self.block.as_non_null_ptr().as_ptr() }

    /// Returns the logical elements.
    pub fn as_non_null_slice(&self) -> NonNull<[T]> { self.block.as_non_null_slice() }

    /// Writes `value` in every logical element.
    ///
    /// Previous values are overwritten without being dropped.
    pub fn fill(&mut self, value: T)
        where
            T: Copy
    {
        let pointer = self.as_mut_ptr();

        for index in 0..self.len() {
            //  Safety:
            //  -   `index` is within the logical elements of the block.
            unsafe { ptr::write(pointer.add(index), value) };
        }
    }

    /// Returns the logical elements.
    ///
    /// #   Safety
    ///
    /// -   Assumes all logical elements are initialized.
    pub unsafe fn as_slice(&self) -> &[T] { &*self.as_non_null_slice().as_ptr() }

    /// Returns the logical elements.
    ///
    /// #   Safety
    ///
    /// -   Assumes all logical elements are initialized.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [T] { &mut *self.as_non_null_slice().as_ptr() }

    /// Disarms the guard, handing the responsibility of releasing the block back to the caller.
    pub fn into_inner(self) -> Allocated<T> {
        let block = self.block;
        mem::forget(self);
        block
    }
}

impl<'a, T, A> Drop for Scoped<'a, T, A>
    where
        A: Allocator + ?Sized,
{
    fn drop(&mut self) {
        //  Safety:
        //  -   `self.block` is currently allocated by `self.allocator`, as per `new`.
        unsafe { self.allocator.free(self.block) };
    }
}

impl<'a, T, A> fmt::Debug for Scoped<'a, T, A>
    where
        A: Allocator + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_tuple("Scoped").field(&self.block).finish() }
}
