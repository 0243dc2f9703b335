//! Runtime configuration.

use crate::compose::RearmPolicy;
use crate::error::{Error, Result};
use crate::output::HexLayout;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which input devices to grab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceSelection {
    /// Every device that looks like a keyboard.
    #[default]
    Auto,
    /// Only these device nodes, if they look like keyboards.
    Paths(Vec<PathBuf>),
}

impl DeviceSelection {
    /// Whether a discovered device node is selected.
    pub fn includes(&self, path: &std::path::Path) -> bool {
        match self {
            DeviceSelection::Auto => true,
            DeviceSelection::Paths(paths) => paths.iter().any(|p| p == path),
        }
    }
}

/// Remapper settings. Everything has a working default.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Devices to grab.
    pub devices: DeviceSelection,
    /// Marker in the synthetic keyboard's name. Devices whose name contains
    /// it (case-insensitive) are never grabbed.
    pub sentinel: String,
    /// Capacity of the queue between device readers and the consumer.
    pub queue_capacity: usize,
    /// How long a reader waits for input before checking for shutdown.
    pub poll_interval_ms: u64,
    /// Whether remapping starts enabled.
    pub start_enabled: bool,
    /// Dead key pressed while another is armed.
    pub rearm_policy: RearmPolicy,
    /// Physical layout used to type hex digits.
    pub hex_layout: HexLayout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            devices: DeviceSelection::Auto,
            sentinel: "optmap".into(),
            queue_capacity: 100,
            poll_interval_ms: 100,
            start_enabled: true,
            rearm_policy: RearmPolicy::Replace,
            hex_layout: HexLayout::Azerty,
        }
    }
}

impl Config {
    /// Name given to the synthetic keyboard.
    pub fn virtual_device_name(&self) -> String {
        format!("{} virtual keyboard", self.sentinel)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.sentinel.trim().is_empty() {
            return Err(Error::Config("sentinel must not be empty".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be at least 1".into()));
        }
        if let DeviceSelection::Paths(paths) = &self.devices {
            if paths.is_empty() {
                return Err(Error::Config("device list is empty".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert!(config.virtual_device_name().contains(&config.sentinel));
    }

    #[test]
    fn test_validate_rejects() {
        let bad = [
            Config {
                sentinel: " ".into(),
                ..Config::default()
            },
            Config {
                queue_capacity: 0,
                ..Config::default()
            },
            Config {
                poll_interval_ms: 0,
                ..Config::default()
            },
            Config {
                devices: DeviceSelection::Paths(vec![]),
                ..Config::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::Config(_))), "{config:?}");
        }
    }

    #[test]
    fn test_device_selection() {
        let path = Path::new("/dev/input/event3");
        assert!(DeviceSelection::Auto.includes(path));

        let only = DeviceSelection::Paths(vec!["/dev/input/event3".into()]);
        assert!(only.includes(path));
        assert!(!only.includes(Path::new("/dev/input/event4")));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial() {
        let config: Config = serde_json::from_str(
            r#"{ "devices": { "paths": ["/dev/input/event2"] }, "hex_layout": "qwerty" }"#,
        )
        .unwrap();
        assert_eq!(
            config.devices,
            DeviceSelection::Paths(vec!["/dev/input/event2".into()])
        );
        assert_eq!(config.hex_layout, HexLayout::Qwerty);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.rearm_policy, RearmPolicy::Replace);
    }
}
