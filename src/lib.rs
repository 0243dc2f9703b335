//! # optmap
//!
//! macOS-style Option key behavior for Linux keyboards, at the evdev level.
//!
//! Physical keyboards are grabbed exclusively. Their events flow through a
//! remapping engine and come back out of one synthetic uinput keyboard.
//! Holding left Alt (the trigger) turns keys into:
//!
//! - **passthrough**: the key re-sent with right Alt (AltGr) held, so the
//!   system layout's third level does the work;
//! - **unicode**: a character typed through the Ctrl+Shift+U convention;
//! - **dead keys**: an accent that combines with the next key (`Option+e`
//!   then `e` gives `é`).
//!
//! Left Alt itself never reaches the system. Every other key and modifier
//! passes through unchanged.
//!
//! ## Quick Start
//!
//! ```no_run
//! use optmap::{Config, DeadKeyDefinition, Mapping, MappingTable, Remapper};
//!
//! #[tokio::main]
//! async fn main() -> optmap::Result<()> {
//!     let table = MappingTable::new("azerty-mac")
//!         .with_alt("5", Mapping::passthrough("5"))
//!         .with_alt("c", Mapping::unicode('©'))
//!         .with_alt("e", Mapping::dead_key("acute", "´"))
//!         .with_dead_key(DeadKeyDefinition::new("acute", "´").combine("e", "é"));
//!
//!     let remapper = Remapper::new(table, Config::default())?;
//!     let handle = remapper.handle();
//!     ctrlc::set_handler(move || handle.shutdown()).ok();
//!
//!     remapper.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! One reader thread per grabbed device feeds a bounded queue. A single
//! consumer owns the [`Engine`] with its modifier state, dead-key composer
//! and intercepted-key set. Only the enable flag and the active table are
//! shared, through [`RemapperHandle`].
//!
//! ## Permissions
//!
//! Read access to `/dev/input/event*` and write access to `/dev/uinput` are
//! required, usually through the `input` group.

pub mod compose;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod event;
pub mod keycode;
pub mod mapping;
pub mod output;
pub mod remapper;
pub mod state;

mod platform;

// Re-exports
pub use compose::{Composition, DeadKeyComposer, RearmPolicy};
pub use config::{Config, DeviceSelection};
pub use control::Controls;
pub use engine::{Disposition, Engine, InterceptedKeys};
pub use error::{Error, Result};
pub use event::{KeyEvent, KeyValue};
pub use mapping::{DeadKeyDefinition, Mapping, MappingTable, TableProblem};
pub use output::{HexLayout, Injector, KeySink, ShiftMode};
pub use platform::{
    DeviceManager, LETTER_KEY_RANGE, PhysicalDevice, VirtualKeyboard, is_keyboard, is_own_device,
};
pub use remapper::{Remapper, RemapperHandle};
pub use state::ModifierState;
