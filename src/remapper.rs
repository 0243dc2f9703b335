//! The runtime coordinator.
//!
//! [`Remapper::new`] creates the synthetic keyboard, then discovers and grabs
//! the physical keyboards. [`Remapper::run`] starts one reader per device
//! and processes the shared queue on the calling task until shutdown.
//!
//! # Example
//!
//! ```no_run
//! use optmap::{Config, Mapping, MappingTable, Remapper};
//!
//! # async fn demo() -> optmap::Result<()> {
//! let table = MappingTable::new("minimal").with_alt("c", Mapping::unicode('©'));
//! let remapper = Remapper::new(table, Config::default())?;
//! let handle = remapper.handle();
//!
//! ctrlc::set_handler(move || handle.shutdown()).ok();
//!
//! remapper.run().await
//! # }
//! ```

use crate::config::Config;
use crate::control::Controls;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::event::KeyEvent;
use crate::mapping::MappingTable;
use crate::output::{Injector, KeySink};
use crate::platform::{DeviceManager, VirtualKeyboard};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Grabs the keyboards and runs the remapping loop.
pub struct Remapper {
    config: Config,
    controls: Controls,
    devices: DeviceManager,
    keyboard: VirtualKeyboard,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Remapper {
    /// Set everything up without reading any input yet.
    ///
    /// The synthetic keyboard is created before any grab, so a failure here
    /// never leaves the user without a working keyboard.
    pub fn new(table: MappingTable, config: Config) -> Result<Self> {
        config.validate()?;

        let keyboard = VirtualKeyboard::create(&config.virtual_device_name())?;

        let mut devices = DeviceManager::new(&config);
        let found = devices.enumerate()?;
        log::info!("found {} keyboard(s)", found);

        if devices.grab_all() == 0 {
            return Err(Error::NoKeyboards);
        }

        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            controls: Controls::new(table, config.start_enabled),
            config,
            devices,
            keyboard,
            shutdown: Arc::new(shutdown),
        })
    }

    /// A control handle usable from any thread, before or during `run`.
    pub fn handle(&self) -> RemapperHandle {
        RemapperHandle {
            controls: self.controls.clone(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// The validated configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process events until [`RemapperHandle::shutdown`] is called or every
    /// device reader has stopped.
    ///
    /// Grabs are released and the synthetic keyboard is closed on every
    /// exit path.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            controls,
            mut devices,
            keyboard,
            shutdown,
        } = self;

        let (tx, mut rx) = mpsc::channel(config.queue_capacity);
        let started = match devices.start_readers(&tx) {
            Ok(started) => started,
            Err(e) => {
                drop(rx);
                devices.close_all();
                return Err(e);
            }
        };
        drop(tx);
        log::info!("remapping {} device(s)", started);

        let mut engine = Engine::new(
            Injector::new(keyboard, config.hex_layout),
            controls,
            config.rearm_policy,
        );
        let mut shutdown_rx = shutdown.subscribe();

        process_events(&mut engine, &mut rx, &mut shutdown_rx).await;

        // Readers blocked on a full queue return once it is closed.
        drop(rx);

        let (injector, released) = engine.finish();
        if let Err(e) = released {
            log::error!("failed to release synthetic keys: {}", e);
        }
        let mut keyboard = injector.into_sink();

        // Joining readers blocks for up to one poll interval.
        let teardown = tokio::task::spawn_blocking(move || {
            devices.close_all();
            keyboard.close();
        });
        if let Err(e) = teardown.await {
            log::error!("device teardown failed: {}", e);
        }

        log::info!("remapper stopped");
        Ok(())
    }
}

/// Drive `engine` from the queue until shutdown or until the queue closes.
async fn process_events<S: KeySink>(
    engine: &mut Engine<S>,
    queue: &mut mpsc::Receiver<KeyEvent>,
    shutdown: &mut watch::Receiver<bool>,
) {
    if *shutdown.borrow_and_update() {
        return;
    }

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    log::info!("shutdown requested");
                    break;
                }
            }

            event = queue.recv() => match event {
                Some(event) => {
                    if let Err(e) = engine.handle_event(&event) {
                        log::error!("failed to handle code {}: {}", event.code, e);
                    }
                }
                None => {
                    log::warn!("all device readers have stopped");
                    break;
                }
            },
        }
    }
}

/// Control surface of a [`Remapper`].
#[derive(Debug, Clone)]
pub struct RemapperHandle {
    controls: Controls,
    shutdown: Arc<watch::Sender<bool>>,
}

impl RemapperHandle {
    /// Replace the active mapping table.
    pub fn set_layout(&self, table: MappingTable) {
        self.controls.set_layout(table);
    }

    /// The active mapping table.
    pub fn layout(&self) -> Arc<MappingTable> {
        self.controls.layout()
    }

    /// Turn remapping on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.controls.set_enabled(enabled);
    }

    /// Whether remapping is on.
    pub fn is_enabled(&self) -> bool {
        self.controls.is_enabled()
    }

    /// Ask the running loop to stop. Calling it again has no effect.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}
