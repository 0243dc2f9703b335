//! Normalized key events as read from a grabbed device.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// The value of an `EV_KEY` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyValue {
    /// Key went up (0).
    Release,
    /// Key went down (1).
    Press,
    /// Kernel auto-repeat while held (2).
    Repeat,
}

impl KeyValue {
    /// Parse a raw evdev value. Returns `None` for anything outside 0..=2.
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyValue::Release),
            1 => Some(KeyValue::Press),
            2 => Some(KeyValue::Repeat),
            _ => None,
        }
    }

    /// The raw evdev value.
    pub fn raw(self) -> i32 {
        match self {
            KeyValue::Release => 0,
            KeyValue::Press => 1,
            KeyValue::Repeat => 2,
        }
    }
}

/// A key event from one physical device.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    /// Linux key code (`KEY_*`).
    pub code: u16,
    /// Press, release or repeat.
    pub value: KeyValue,
    /// Device node the event came from.
    pub device: Arc<PathBuf>,
    /// Kernel timestamp.
    pub time: SystemTime,
}

impl KeyEvent {
    /// Create an event stamped with the current time and no particular source.
    pub fn new(code: u16, value: KeyValue) -> Self {
        Self {
            code,
            value,
            device: Arc::new(PathBuf::new()),
            time: SystemTime::now(),
        }
    }

    /// Create a key press event.
    pub fn press(code: u16) -> Self {
        Self::new(code, KeyValue::Press)
    }

    /// Create a key release event.
    pub fn release(code: u16) -> Self {
        Self::new(code, KeyValue::Release)
    }

    /// Create a key repeat event.
    pub fn repeat(code: u16) -> Self {
        Self::new(code, KeyValue::Repeat)
    }

    pub fn is_press(&self) -> bool {
        self.value == KeyValue::Press
    }

    pub fn is_release(&self) -> bool {
        self.value == KeyValue::Release
    }

    pub fn is_repeat(&self) -> bool {
        self.value == KeyValue::Repeat
    }
}
