//! The API of pmem-core.

mod allocator;
mod block;
mod configuration;
mod description;
mod error;
mod layout;
mod options;
mod scoped;
mod typed;

pub use allocator::Allocator;
pub use block::{Allocated, Terminated};
pub use configuration::{Configuration, Properties};
pub use description::{ElementType, Exactness, ReturnAddress};
pub use error::{AllocError, AllocResult};
pub use layout::Layout;
pub use options::AllocOptions;
pub use scoped::Scoped;
pub use typed::TypedAllocator;

pub use crate::utils::PowerOf2;
