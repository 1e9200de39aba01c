//! A collection of utilities.

use core::{mem, ptr::NonNull};

mod power_of_2;

pub use power_of_2::PowerOf2;

/// Returns a non-null pointer to `T`, dangling yet aligned on `alignment`.
///
/// The pointer is suitable for zero-sized blocks, and must never be dereferenced nor deallocated.
pub(crate) fn dangling<T>(alignment: PowerOf2) -> NonNull<T> {
    debug_assert!(alignment.value() >= mem::align_of::<T>());

    //  Safety:
    //  -   `alignment` is not 0.
    unsafe { NonNull::new_unchecked(alignment.value() as *mut T) }
}

/// Returns the number of whole `T` fitting in `bytes`.
///
/// Zero-sized types fit `fallback` times, as any number of them fit.
pub(crate) fn number_elements<T>(bytes: usize, fallback: usize) -> usize {
    match mem::size_of::<T>() {
        0 => fallback,
        size => bytes / size,
    }
}
