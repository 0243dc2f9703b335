//! Platform-specific implementations.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::*;

// Grabbing and uinput are Linux interfaces
#[cfg(not(target_os = "linux"))]
compile_error!("optmap only supports Linux");
