//! Volatile access to memory.
//!
//! Memory observed or modified outside of the program, such as memory mapped device registers, must be accessed with
//! volatile reads and writes, which the compiler may neither elide nor merge.
//!
//! `Volatile` wraps a reference and routes every access to the referenced value through `core::ptr::read_volatile` and
//! `core::ptr::write_volatile`. Its second parameter restricts the accesses allowed, as not all such resources are both
//! readable and writable.

use core::{
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    ptr,
};

mod access;

pub use access::{ReadOnly, ReadWrite, Readable, Writable, WriteOnly};

/// Volatile
///
/// A reference whose every access is volatile.
///
/// Reads and writes operate on copies of the referenced value, hence require it to be `Copy`. Volatile accesses are
/// not atomic, and imply no ordering with regard to other threads.
///
/// ```
/// use pmem_core::Volatile;
///
/// let mut value = 0u32;
///
/// let mut volatile = Volatile::new(&mut value);
/// volatile.write(1);
/// volatile.update(|v| *v += 1);
///
/// assert_eq!(2, volatile.read());
/// ```
///
/// Writes to a read-only reference do not compile:
///
/// ```compile_fail
/// use pmem_core::Volatile;
///
/// let mut value = 0u32;
///
/// let mut volatile = Volatile::new_read_only(&mut value);
/// volatile.write(1);
/// ```
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct Volatile<R, A = ReadWrite> {
    reference: R,
    _access: PhantomData<A>,
}

impl<R> Volatile<R> {
    /// Creates an instance allowing both reads and writes.
    pub const fn new(reference: R) -> Volatile<R, ReadWrite> { Volatile { reference, _access: PhantomData } }

    /// Creates an instance only allowing reads.
    pub const fn new_read_only(reference: R) -> Volatile<R, ReadOnly> { Volatile { reference, _access: PhantomData } }

    /// Creates an instance only allowing writes.
    pub const fn new_write_only(reference: R) -> Volatile<R, WriteOnly> { Volatile { reference, _access: PhantomData } }
}

impl<R, A> Volatile<R, A> {
    /// Returns the wrapped reference.
    pub fn into_inner(self) -> R { self.reference }

    /// Restricts the instance to reads.
    pub fn read_only(self) -> Volatile<R, ReadOnly>
        where
            A: Readable
    {
        Volatile { reference: self.reference, _access: PhantomData }
    }

    /// Restricts the instance to writes.
    pub fn write_only(self) -> Volatile<R, WriteOnly>
        where
            A: Writable
    {
        Volatile { reference: self.reference, _access: PhantomData }
    }
}

impl<R, T, A> Volatile<R, A>
    where
        R: Deref<Target = T>,
        T: Copy,
{
    /// Reads the referenced value.
    pub fn read(&self) -> T
        where
            A: Readable
    {
        //  Safety:
        //  -   The reference is valid, and aligned, for reads.
        unsafe { ptr::read_volatile(&*self.reference) }
    }

    /// Overwrites the referenced value with `value`.
    pub fn write(&mut self, value: T)
        where
            A: Writable,
            R: DerefMut,
    {
        //  Safety:
        //  -   The reference is valid, and aligned, for writes.
        unsafe { ptr::write_volatile(&mut *self.reference, value) }
    }

    /// Reads the referenced value, lets `f` modify the copy, then writes it back.
    ///
    /// The read and the write are two distinct accesses: the sequence is not atomic.
    pub fn update<F>(&mut self, f: F)
        where
            A: Readable + Writable,
            R: DerefMut,
            F: FnOnce(&mut T),
    {
        let mut value = self.read();
        f(&mut value);
        self.write(value);
    }
}

impl<R, T, A> Volatile<R, A>
    where
        R: Deref<Target = [T]>,
        T: Copy,
{
    /// Returns the number of elements of the referenced slice.
    pub fn len(&self) -> usize { self.reference.len() }

    /// Returns whether the referenced slice is empty.
    pub fn is_empty(&self) -> bool { self.reference.is_empty() }

    /// Returns a volatile reference to the element at `index`, with the same access rights.
    ///
    /// #   Panics
    ///
    /// If `index` is out of bounds.
    pub fn at(&self, index: usize) -> Volatile<&T, A> {
        Volatile { reference: &self.reference[index], _access: PhantomData }
    }

    /// Returns a mutable volatile reference to the element at `index`, with the same access rights.
    ///
    /// #   Panics
    ///
    /// If `index` is out of bounds.
    pub fn at_mut(&mut self, index: usize) -> Volatile<&mut T, A>
        where
            R: DerefMut
    {
        Volatile { reference: &mut self.reference[index], _access: PhantomData }
    }

    /// Reads every element of the referenced slice, in order, into `destination`.
    ///
    /// #   Panics
    ///
    /// If `destination` and the referenced slice differ in length.
    pub fn copy_into_slice(&self, destination: &mut [T])
        where
            A: Readable
    {
        assert_eq!(self.len(), destination.len(), "Mismatched lengths");

        for (target, source) in destination.iter_mut().zip(self.reference.iter()) {
            //  Safety:
            //  -   `source` is a valid reference.
            *target = unsafe { ptr::read_volatile(source) };
        }
    }

    /// Writes every element of `source`, in order, into the referenced slice.
    ///
    /// #   Panics
    ///
    /// If `source` and the referenced slice differ in length.
    pub fn copy_from_slice(&mut self, source: &[T])
        where
            A: Writable,
            R: DerefMut,
    {
        assert_eq!(self.len(), source.len(), "Mismatched lengths");

        for (target, source) in self.reference.iter_mut().zip(source.iter()) {
            //  Safety:
            //  -   `target` is a valid, exclusive, reference.
            unsafe { ptr::write_volatile(target, *source) };
        }
    }
}

impl<R, T, A> fmt::Debug for Volatile<R, A>
    where
        R: Deref<Target = T>,
        T: Copy + fmt::Debug,
        A: Readable,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_tuple("Volatile").field(&self.read()).finish() }
}
