//! Linux backend: evdev for reading and grabbing, uinput for output.
//!
//! ## Permissions
//!
//! Both `/dev/input/event*` and `/dev/uinput` must be accessible:
//! ```bash
//! sudo usermod -aG input $USER
//! # Then log out and back in
//! ```

mod device;
mod listen;
mod uinput;

pub use device::{DeviceManager, LETTER_KEY_RANGE, PhysicalDevice, is_keyboard, is_own_device};
pub use uinput::VirtualKeyboard;
