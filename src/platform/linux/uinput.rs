//! The synthetic keyboard, backed by `/dev/uinput`.

use crate::error::{Error, Result};
use crate::output::KeySink;
use evdev::{
    AttributeSet, EventType, InputEvent, Key,
    uinput::{VirtualDevice, VirtualDeviceBuilder},
};

/// A uinput keyboard able to emit every code from 1 to 255.
///
/// Its name carries the configured sentinel so that device enumeration never
/// grabs it back.
pub struct VirtualKeyboard {
    device: Option<VirtualDevice>,
    name: String,
}

impl VirtualKeyboard {
    /// Create the device under `name`.
    pub fn create(name: &str) -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 1..256 {
            keys.insert(Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e| {
                Error::InjectFailed(format!("Failed to create virtual device builder: {}", e))
            })?
            .name(name)
            .with_keys(&keys)
            .map_err(|e| Error::InjectFailed(format!("Failed to add keys: {}", e)))?
            .build()
            .map_err(|e| {
                Error::PermissionDenied(format!(
                    "Failed to create virtual device: {}. Make sure /dev/uinput is accessible \
                     (you may need to be in the 'input' group or have appropriate udev rules).",
                    e
                ))
            })?;

        log::info!("created virtual keyboard {}", name);
        Ok(Self {
            device: Some(device),
            name: name.to_string(),
        })
    }

    /// Name the device was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether [`VirtualKeyboard::close`] has not run yet.
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Destroy the device. Later calls do nothing.
    pub fn close(&mut self) {
        if self.device.take().is_some() {
            log::info!("closed virtual keyboard {}", self.name);
        }
    }
}

impl KeySink for VirtualKeyboard {
    fn emit(&mut self, code: u16, value: i32) -> Result<()> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| Error::InjectFailed("virtual keyboard is closed".into()))?;

        // emit() terminates the batch with SYN_REPORT.
        device
            .emit(&[InputEvent::new(EventType::KEY, code, value)])
            .map_err(|e| Error::InjectFailed(format!("Failed to emit key event: {}", e)))
    }
}

impl Drop for VirtualKeyboard {
    fn drop(&mut self) {
        self.close();
    }
}
