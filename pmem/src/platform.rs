//! Abstraction over OS differences.

mod api;

pub(crate) use api::Platform;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub(crate) use linux::{SystemConfiguration, SystemPlatform};

#[cfg(not(target_os = "linux"))]
mod fallback;

#[cfg(not(target_os = "linux"))]
pub(crate) use fallback::{SystemConfiguration, SystemPlatform};
