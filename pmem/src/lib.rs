#![no_std]
#![deny(missing_docs)]

//! Concrete backends for the `pmem-core` allocation interface.
//!
//! -   `Global` forwards to the process-wide, OS-backed, allocator.
//! -   `Heap` carves power-of-2 blocks out of a caller supplied region; wrap it in `Locked` to share it.
//! -   `Tracking` wraps any backend, counting live blocks and logging each request along with its call site.
//!
//! None of the backends is installed implicitly: each must be constructed, and handed to the code requiring it.

#[cfg(not(target_os = "linux"))]
extern crate alloc;

mod global;
mod heap;
mod local;
mod locked;
mod platform;
mod tracking;

pub use pmem_core::*;

pub use global::Global;
pub use heap::{Heap, HeapConfiguration};
pub use local::LocalAllocator;
pub use locked::Locked;
pub use tracking::Tracking;

use platform::{Platform, SystemConfiguration, SystemPlatform};
