//! Description of various properties of the allocation requests.

use core::{any, fmt, mem, panic::Location};

use super::PowerOf2;

/// Exactness
///
/// Whether the usable size of the returned block must equal the request, or may exceed it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Exactness {
    /// The returned block holds exactly the requested number of elements.
    Exact,
    /// The returned block holds _at least_ the requested number of elements.
    ///
    /// The usable size advertised by the backend is trusted verbatim.
    AtLeast,
}

/// ReturnAddress
///
/// An opaque token identifying the site of an allocation request, threaded through to the backend for the benefit of
/// profiling and leak-tracking tools.
///
/// The token is purely advisory: a backend must never let it influence the outcome of a request.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct ReturnAddress(Option<&'static Location<'static>>);

impl ReturnAddress {
    /// The token of an unknown call site.
    pub const UNKNOWN: ReturnAddress = ReturnAddress(None);

    /// Returns the token identifying the caller of the function it is invoked from.
    ///
    /// Functions propagate their own caller by being annotated with `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self { Self(Some(Location::caller())) }

    /// Returns the location of the call site, if known.
    pub fn location(&self) -> Option<&'static Location<'static>> { self.0 }
}

impl Default for ReturnAddress {
    fn default() -> Self { Self::UNKNOWN }
}

impl fmt::Debug for ReturnAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

impl fmt::Display for ReturnAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(location) => write!(f, "{}:{}:{}", location.file(), location.line(), location.column()),
            None => f.write_str("<unknown>"),
        }
    }
}

/// ElementType
///
/// A run-time description of the element type of a typed request.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ElementType {
    size: usize,
    alignment: PowerOf2,
    name: &'static str,
}

impl ElementType {
    /// Describes `T`.
    pub fn of<T>() -> Self {
        Self { size: mem::size_of::<T>(), alignment: PowerOf2::align_of::<T>(), name: any::type_name::<T>() }
    }

    /// The size of an element, in bytes.
    pub const fn size(&self) -> usize { self.size }

    /// The natural alignment of an element.
    pub const fn alignment(&self) -> PowerOf2 { self.alignment }

    /// The name of the element type, for diagnostics only.
    pub const fn name(&self) -> &'static str { self.name }
}

#[cfg(test)]
mod tests {

extern crate std;

use std::{format, string::ToString};

use super::*;

#[test]
fn return_address_caller() {
    let here = ReturnAddress::caller();
    let location = here.location().expect("Known location");

    assert_eq!(file!(), location.file());
    assert_eq!(line!() - 4, location.line());
}

#[test]
fn return_address_track_caller() {
    #[track_caller]
    fn wrapper() -> ReturnAddress { ReturnAddress::caller() }

    let (first, second) = (wrapper(), wrapper());

    assert_ne!(first, second);
    assert_eq!(first.location().unwrap().line(), second.location().unwrap().line());
}

#[test]
fn return_address_display() {
    assert_eq!("<unknown>", ReturnAddress::UNKNOWN.to_string());
    assert_eq!(ReturnAddress::UNKNOWN, ReturnAddress::default());

    let here = ReturnAddress::caller();
    let expected = format!("{}:{}:", file!(), line!() - 1);

    assert!(here.to_string().starts_with(&expected), "{} vs {}", here, expected);
}

#[test]
fn element_type_of() {
    let element = ElementType::of::<u32>();

    assert_eq!(4, element.size());
    assert_eq!(4, element.alignment().value());
    assert_eq!("u32", element.name());

    let element = ElementType::of::<()>();

    assert_eq!(0, element.size());
    assert_eq!(1, element.alignment().value());
}

}
