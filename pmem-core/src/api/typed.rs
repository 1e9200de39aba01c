//! Typed allocations.
//!
//! Every typed operation is a thin wrapper around a single raw request, `Allocator::allocate_at`:
//!
//! 1.  The Layout of the request is computed, with overflow detection, before the backend is involved.
//! 2.  Zero-sized requests are served with a dangling, well-aligned, pointer and never reach the backend; releasing
//!     them is a no-op.
//! 3.  The raw bytes are reinterpreted as the requested shape.
//!
//! Requests with and without a sentinel follow two distinct paths, `allocate_terminated` and `advanced_with_ret_addr`
//! respectively, which `with_options_ret_addr` dispatches to.

use core::ptr::{self, NonNull};

use crate::utils;

use super::{AllocError, AllocOptions, AllocResult, Allocated, Allocator, Exactness, Layout, PowerOf2};
use super::{ReturnAddress, Scoped, Terminated};

/// Typed operations, available on every Allocator.
///
/// #   Ownership
///
/// A block returned by a successful call is owned by the caller, who must eventually release it through the matching
/// `free_*` call, on the very same Allocator instance. Releasing a block through another instance is undefined
/// behaviour, which is not checked. See `Scoped` for automatic release.
///
/// The elements of a fresh block are uninitialized, save for the sentinel of a terminated block.
pub trait TypedAllocator: Allocator {
    /// Allocates an array of exactly `count` elements of `T`, naturally aligned.
    ///
    /// #   Errors
    ///
    /// -   `Overflow` if `count * size_of::<T>()` does not fit, without calling the backend.
    /// -   Any error of the backend.
    #[track_caller]
    fn allocate_array<T>(&self, count: usize) -> AllocResult<NonNull<[T]>> {
        self.advanced_with_ret_addr(Exactness::Exact, ReturnAddress::caller(), PowerOf2::align_of::<T>(), count)
    }

    /// Allocates an array of `count` elements of `T`, aligned on `alignment`.
    ///
    /// With `Exact`, the returned slice holds exactly `count` elements; with `AtLeast`, it holds as many elements as
    /// fit in the block returned by the backend, which is never less than `count`.
    ///
    /// `ret` identifies the call site for diagnostics and has no influence on the outcome.
    ///
    /// #   Panics
    ///
    /// If `alignment` is lower than the natural alignment of `T`.
    ///
    /// #   Errors
    ///
    /// -   `Overflow` if `count * size_of::<T>()` does not fit, without calling the backend.
    /// -   Any error of the backend.
    fn advanced_with_ret_addr<T>(&self, exactness: Exactness, ret: ReturnAddress, alignment: PowerOf2, count: usize)
        -> AllocResult<NonNull<[T]>>
    {
        let layout = Layout::array_aligned::<T>(count, alignment)?;

        let bytes = allocate_bytes(self, layout, ret)?;

        let count = match exactness {
            Exactness::Exact => count,
            Exactness::AtLeast => utils::number_elements::<T>(bytes.len(), count),
        };

        Ok(NonNull::slice_from_raw_parts(bytes.cast(), count))
    }

    /// Allocates a buffer of `count` logical elements of `T` aligned on `alignment`, followed by `sentinel`.
    ///
    /// The backend is always asked for exactly `count + 1` elements.
    ///
    /// #   Panics
    ///
    /// If `alignment` is lower than the natural alignment of `T`.
    ///
    /// #   Errors
    ///
    /// -   `Overflow` if `(count + 1) * size_of::<T>()` does not fit, without calling the backend.
    /// -   Any error of the backend.
    fn allocate_terminated<T>(&self, count: usize, ret: ReturnAddress, alignment: PowerOf2, sentinel: T)
        -> AllocResult<Terminated<T>>
    {
        let length = count.checked_add(1).ok_or(AllocError::Overflow)?;
        let layout = Layout::array_aligned::<T>(length, alignment)?;

        let bytes = allocate_bytes(self, layout, ret)?;

        let pointer = bytes.cast::<T>();

        //  Safety:
        //  -   The block is valid for `count + 1` elements, hence the slot at `count` is in bounds.
        unsafe { ptr::write(pointer.as_ptr().add(count), sentinel) };

        //  Safety:
        //  -   `pointer` is aligned on `alignment`, and valid for `count + 1` elements.
        //  -   The sentinel slot was just initialized.
        Ok(unsafe { Terminated::new(pointer, count, alignment) })
    }

    /// Allocates a sentinel-terminated buffer of `count` logical elements of `T`, naturally aligned.
    #[track_caller]
    fn allocate_sentinel<T>(&self, count: usize, sentinel: T) -> AllocResult<Terminated<T>> {
        self.allocate_terminated(count, ReturnAddress::caller(), PowerOf2::align_of::<T>(), sentinel)
    }

    /// Allocates `count` logical elements as described by `options`.
    ///
    /// Dispatches to `allocate_terminated` if `options` has a sentinel, and to `advanced_with_ret_addr` otherwise,
    /// resolving the alignment of `options` once.
    fn with_options_ret_addr<T>(&self, count: usize, ret: ReturnAddress, options: AllocOptions<T>)
        -> AllocResult<Allocated<T>>
    {
        let alignment = options.alignment();
        let exactness = options.exactness();

        match options.into_sentinel() {
            Some(sentinel) => self.allocate_terminated(count, ret, alignment, sentinel).map(Allocated::Terminated),
            None => self.advanced_with_ret_addr(exactness, ret, alignment, count)
                .map(|block| Allocated::Plain { block, alignment }),
        }
    }

    /// Allocates `count` logical elements as described by `options`, on behalf of the caller.
    #[track_caller]
    fn allocate_with_options<T>(&self, count: usize, options: AllocOptions<T>) -> AllocResult<Allocated<T>> {
        self.with_options_ret_addr(count, ReturnAddress::caller(), options)
    }

    /// Allocates a single `T`, and moves `value` into it.
    #[track_caller]
    fn create<T>(&self, value: T) -> AllocResult<NonNull<T>> {
        let bytes = allocate_bytes(self, Layout::new::<T>(), ReturnAddress::caller())?;

        let pointer = bytes.cast::<T>();

        //  Safety:
        //  -   `pointer` is valid for writes, and suitably aligned.
        unsafe { ptr::write(pointer.as_ptr(), value) };

        Ok(pointer)
    }

    /// Drops the value pointed to, and releases its memory.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` was returned by `create` on this very instance, and not released since.
    #[track_caller]
    unsafe fn destroy<T>(&self, pointer: NonNull<T>) {
        ptr::drop_in_place(pointer.as_ptr());

        deallocate_bytes(self, pointer.cast(), Layout::new::<T>(), ReturnAddress::caller());
    }

    /// Releases an array returned by `allocate_array`.
    ///
    /// The elements are not dropped.
    ///
    /// #   Safety
    ///
    /// -   Assumes `block` was returned by `allocate_array` on this very instance, and not released since.
    #[track_caller]
    unsafe fn free_array<T>(&self, block: NonNull<[T]>) { self.free_aligned(block, PowerOf2::align_of::<T>()) }

    /// Releases an array returned by `advanced_with_ret_addr`.
    ///
    /// The elements are not dropped.
    ///
    /// #   Safety
    ///
    /// -   Assumes `block` was returned by `advanced_with_ret_addr` on this very instance, with `alignment`, and not
    ///     released since.
    #[track_caller]
    unsafe fn free_aligned<T>(&self, block: NonNull<[T]>, alignment: PowerOf2) {
        self.free(Allocated::Plain { block, alignment })
    }

    /// Releases a buffer returned by `allocate_terminated`.
    ///
    /// #   Safety
    ///
    /// -   Assumes `block` was returned by `allocate_terminated` on this very instance, and not released since.
    #[track_caller]
    unsafe fn free_terminated<T>(&self, block: Terminated<T>) { self.free(Allocated::Terminated(block)) }

    /// Releases a block returned by `with_options_ret_addr`.
    ///
    /// #   Safety
    ///
    /// -   Assumes `block` was returned by this very instance, and not released since.
    #[track_caller]
    unsafe fn free<T>(&self, block: Allocated<T>) {
        deallocate_bytes(self, block.as_non_null_ptr().cast(), block.layout(), ReturnAddress::caller());
    }

    /// Allocates an array of exactly `count` elements of `T`, released when the guard is dropped.
    #[track_caller]
    fn scoped_array<T>(&self, count: usize) -> AllocResult<Scoped<'_, T, Self>> {
        let alignment = PowerOf2::align_of::<T>();
        let block = self.advanced_with_ret_addr(Exactness::Exact, ReturnAddress::caller(), alignment, count)?;

        //  Safety:
        //  -   `block` was just allocated by `self`.
        Ok(unsafe { Scoped::new(self, Allocated::Plain { block, alignment }) })
    }

    /// Allocates a block as described by `options`, released when the guard is dropped.
    #[track_caller]
    fn scoped_with_options<T>(&self, count: usize, options: AllocOptions<T>) -> AllocResult<Scoped<'_, T, Self>> {
        let block = self.with_options_ret_addr(count, ReturnAddress::caller(), options)?;

        //  Safety:
        //  -   `block` was just allocated by `self`.
        Ok(unsafe { Scoped::new(self, block) })
    }
}

impl<A> TypedAllocator for A
    where
        A: Allocator + ?Sized,
{
}

//
//  Implementation
//

//  Allocates `layout`, serving zero-sized requests without involving the backend.
fn allocate_bytes<A>(allocator: &A, layout: Layout, ret: ReturnAddress) -> AllocResult<NonNull<[u8]>>
    where
        A: Allocator + ?Sized,
{
    if layout.is_empty() {
        return Ok(NonNull::slice_from_raw_parts(layout.dangling(), 0));
    }

    let bytes = allocator.allocate_at(layout, ret)?;

    debug_assert!(bytes.len() >= layout.size(), "Backend returned {} bytes, for {}", bytes.len(), layout.size());
    debug_assert!(layout.fits(bytes.cast()), "Backend returned a block misaligned for {}", layout.align());

    Ok(bytes)
}

//  Deallocates `layout`, ignoring zero-sized requests which never reached the backend.
//
//  #   Safety
//
//  -   Assumes `pointer` and `layout` match a prior call to `allocate_bytes` on `allocator`.
unsafe fn deallocate_bytes<A>(allocator: &A, pointer: NonNull<u8>, layout: Layout, ret: ReturnAddress)
    where
        A: Allocator + ?Sized,
{
    if layout.is_empty() {
        return;
    }

    allocator.deallocate_at(pointer, layout, ret);
}
