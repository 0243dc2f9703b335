//! Keyboard discovery and exclusive grabs.
//!
//! A grabbed device delivers its events only to us; nothing else on the
//! system sees them, the display server included. Every grab taken here is
//! released by [`DeviceManager::close_all`], which also runs on drop.

use super::listen::{self, Reader};
use crate::config::{Config, DeviceSelection};
use crate::error::{Error, Result};
use crate::event::KeyEvent;
use crate::keycode::{KEY_A, KEY_DOT};
use evdev::{Device, EventType};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Key codes from `KEY_A` to `KEY_DOT`. A device exposing none of them is
/// not a typing keyboard (power buttons, lid switches, media remotes).
pub const LETTER_KEY_RANGE: RangeInclusive<u16> = KEY_A..=KEY_DOT;

/// Keyboard classification: the device reports `EV_KEY` events and can
/// produce at least one code in [`LETTER_KEY_RANGE`].
pub fn is_keyboard(has_key_events: bool, key_codes: impl IntoIterator<Item = u16>) -> bool {
    has_key_events
        && key_codes
            .into_iter()
            .any(|code| LETTER_KEY_RANGE.contains(&code))
}

/// Whether a device name marks our own synthetic keyboard.
pub fn is_own_device(name: &str, sentinel: &str) -> bool {
    name.to_lowercase().contains(&sentinel.to_lowercase())
}

/// `ENODEV` means the node is gone, and the grab with it.
fn ignore_gone(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
            log::debug!("device already gone, nothing to ungrab");
            Ok(())
        }
        other => other,
    }
}

enum Slot {
    /// Open, no reader attached.
    Idle(Device),
    /// A reader thread owns the device until it is joined.
    Reading(Reader),
    /// The device was dropped with its reader; the fd is closed.
    Gone,
}

/// An input device found at startup.
pub struct PhysicalDevice {
    path: PathBuf,
    name: String,
    key_codes: Vec<u16>,
    grabbed: bool,
    slot: Slot,
}

impl PhysicalDevice {
    /// Device node, e.g. `/dev/input/event3`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name reported by the kernel.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key codes the device can produce.
    pub fn key_codes(&self) -> &[u16] {
        &self.key_codes
    }

    /// Whether we hold the exclusive grab.
    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    /// Whether a reader is attached and still running. A reader stops on
    /// its own only when the device disconnects or the queue closes.
    pub fn is_reading(&self) -> bool {
        matches!(&self.slot, Slot::Reading(reader) if !reader.is_finished())
    }

    /// Grabbed and, once reading, still delivering events.
    pub fn is_active(&self) -> bool {
        self.grabbed && !matches!(&self.slot, Slot::Reading(reader) if reader.is_finished())
    }

    fn signal_reader(&self) {
        if let Slot::Reading(reader) = &self.slot {
            reader.signal();
        }
    }

    /// Stop the reader, if any, and get the device back.
    fn stop_reader(&mut self) -> Result<()> {
        if let Slot::Reading(reader) = std::mem::replace(&mut self.slot, Slot::Gone) {
            match reader.join() {
                Ok(device) => self.slot = Slot::Idle(device),
                Err(e) => {
                    self.grabbed = false;
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

/// Owns every keyboard the remapper discovered.
pub struct DeviceManager {
    devices: Vec<PhysicalDevice>,
    selection: DeviceSelection,
    sentinel: String,
    poll_interval: Duration,
}

impl DeviceManager {
    /// An empty manager using the selection and sentinel from `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            devices: Vec::new(),
            selection: config.devices.clone(),
            sentinel: config.sentinel.clone(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Devices currently managed.
    pub fn devices(&self) -> impl Iterator<Item = &PhysicalDevice> {
        self.devices.iter()
    }

    /// Number of grabbed devices whose reader, if started, is still running.
    pub fn grabbed_count(&self) -> usize {
        self.devices.iter().filter(|d| d.is_active()).count()
    }

    fn find_mut(&mut self, path: &Path) -> Result<&mut PhysicalDevice> {
        self.devices
            .iter_mut()
            .find(|d| d.path == path)
            .ok_or_else(|| {
                Error::device(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "not a managed device"),
                )
            })
    }

    /// Scan `/dev/input` for keyboards. Returns how many were added.
    pub fn enumerate(&mut self) -> Result<usize> {
        let dir = fs::read_dir("/dev/input").map_err(|e| {
            Error::PermissionDenied(format!(
                "Cannot access /dev/input: {}. Make sure you're in the 'input' group.",
                e
            ))
        })?;

        let mut paths: Vec<PathBuf> = dir
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with("event"))
            })
            .collect();
        paths.sort();

        let mut added = 0;
        for path in paths {
            if !self.selection.includes(&path) || self.devices.iter().any(|d| d.path == path) {
                continue;
            }

            let device = match Device::open(&path) {
                Ok(device) => device,
                Err(e) => {
                    log::debug!("Failed to open {}: {}", path.display(), e);
                    continue;
                }
            };

            let name = device.name().unwrap_or("unknown").to_string();
            if is_own_device(&name, &self.sentinel) {
                log::debug!("skipping own device {} ({})", name, path.display());
                continue;
            }

            let key_codes: Vec<u16> = device
                .supported_keys()
                .map(|keys| keys.iter().map(|key| key.code()).collect())
                .unwrap_or_default();
            let has_key_events = device.supported_events().contains(EventType::KEY);
            if !is_keyboard(has_key_events, key_codes.iter().copied()) {
                continue;
            }

            log::info!("found keyboard {} at {}", name, path.display());
            self.devices.push(PhysicalDevice {
                path,
                name,
                key_codes,
                grabbed: false,
                slot: Slot::Idle(device),
            });
            added += 1;
        }

        Ok(added)
    }

    /// Take exclusive control of one device.
    pub fn grab(&mut self, path: &Path) -> Result<()> {
        let dev = self.find_mut(path)?;
        if dev.grabbed {
            return Ok(());
        }
        let Slot::Idle(device) = &mut dev.slot else {
            return Err(Error::device(path, std::io::Error::other("device is not idle")));
        };
        device.grab().map_err(|e| Error::device(path, e))?;
        dev.grabbed = true;
        log::info!("grabbed device {}", dev.name);
        Ok(())
    }

    /// Grab every discovered device. Devices that refuse are logged and
    /// dropped. Returns the number grabbed.
    pub fn grab_all(&mut self) -> usize {
        let paths: Vec<PathBuf> = self.devices.iter().map(|d| d.path.clone()).collect();
        for path in paths {
            if let Err(e) = self.grab(&path) {
                log::warn!("Failed to grab device: {}", e);
                self.devices.retain(|d| d.path != path);
            }
        }
        self.grabbed_count()
    }

    /// Stop a device's reader and give up its grab.
    pub fn release(&mut self, path: &Path) -> Result<()> {
        let dev = self.find_mut(path)?;
        dev.stop_reader()?;
        if dev.grabbed {
            if let Slot::Idle(device) = &mut dev.slot {
                ignore_gone(device.ungrab()).map_err(|e| Error::device(path, e))?;
            }
            dev.grabbed = false;
            log::info!("released device {}", dev.name);
        }
        Ok(())
    }

    /// Start one reader thread per grabbed device, all feeding `queue`.
    pub fn start_readers(&mut self, queue: &mpsc::Sender<KeyEvent>) -> Result<usize> {
        let mut started = 0;
        for dev in self.devices.iter_mut().filter(|d| d.grabbed) {
            let device = match std::mem::replace(&mut dev.slot, Slot::Gone) {
                Slot::Idle(device) => device,
                other => {
                    dev.slot = other;
                    continue;
                }
            };
            let reader = listen::spawn_reader(
                device,
                dev.path.clone(),
                dev.name.clone(),
                queue.clone(),
                self.poll_interval,
            )?;
            dev.slot = Slot::Reading(reader);
            started += 1;
        }
        Ok(started)
    }

    /// Stop all readers, release all grabs and close every device.
    /// Safe to call any number of times.
    pub fn close_all(&mut self) {
        // All readers wind down together; each join then returns promptly.
        for dev in &self.devices {
            dev.signal_reader();
        }

        let paths: Vec<PathBuf> = self.devices.iter().map(|d| d.path.clone()).collect();
        for path in paths {
            if let Err(e) = self.release(&path) {
                log::error!("Failed to release device: {}", e);
            }
        }
        self.devices.clear();
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.close_all();
    }
}
