//! Locked

use core::ptr::NonNull;

use spin::{Mutex, MutexGuard};

use pmem_core::{AllocResult, Allocator, Layout};

use crate::LocalAllocator;

/// Locked
///
/// Wraps a `LocalAllocator` in a spin lock, turning it into a thread-safe `Allocator`.
///
/// Each request holds the lock for its whole duration; the lock is never held across requests.
pub struct Locked<A>(Mutex<A>);

impl<A> Locked<A> {
    /// Creates an instance.
    pub const fn new(inner: A) -> Self { Self(Mutex::new(inner)) }

    /// Locks the inner allocator, spinning until it is available.
    pub fn lock(&self) -> MutexGuard<'_, A> { self.0.lock() }

    /// Returns the inner allocator.
    pub fn into_inner(self) -> A { self.0.into_inner() }
}

unsafe impl<A> Allocator for Locked<A>
    where
        A: LocalAllocator
{
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> { self.lock().allocate(layout) }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout) { self.lock().deallocate(pointer, layout) }
}
