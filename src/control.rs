//! The control surface shared with the outside world.
//!
//! Only the enable flag and the active table are mutated from outside the
//! event consumer, both behind one narrow lock.

use crate::mapping::MappingTable;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct ControlState {
    enabled: bool,
    table: Arc<MappingTable>,
}

/// Enable flag and active mapping table, cheap to clone and share.
#[derive(Debug, Clone)]
pub struct Controls {
    inner: Arc<Mutex<ControlState>>,
}

impl Controls {
    /// Shared controls starting with `table`. Table problems are logged.
    pub fn new(table: MappingTable, enabled: bool) -> Self {
        log_problems(&table);
        Self {
            inner: Arc::new(Mutex::new(ControlState {
                enabled,
                table: Arc::new(table),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Turn remapping on or off. Trigger and modifier handling is unaffected.
    pub fn set_enabled(&self, enabled: bool) {
        self.lock().enabled = enabled;
        log::info!("remapping {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Whether remapping is on.
    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Replace the active table wholesale.
    pub fn set_layout(&self, table: MappingTable) {
        log_problems(&table);
        let name = table.name.clone();
        self.lock().table = Arc::new(table);
        log::info!("layout changed to {}", name);
    }

    /// The active table.
    pub fn layout(&self) -> Arc<MappingTable> {
        Arc::clone(&self.lock().table)
    }

    /// Enable flag and table, read under one lock.
    pub fn snapshot(&self) -> (bool, Arc<MappingTable>) {
        let state = self.lock();
        (state.enabled, Arc::clone(&state.table))
    }
}

fn log_problems(table: &MappingTable) {
    for problem in table.problems() {
        log::warn!("layout {}: {}", table.name, problem);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Mapping;

    #[test]
    fn test_toggle() {
        let controls = Controls::new(MappingTable::default(), true);
        assert!(controls.is_enabled());
        controls.set_enabled(false);
        assert!(!controls.is_enabled());
    }

    #[test]
    fn test_layout_swap_is_wholesale() {
        let first = MappingTable::new("first").with_alt("c", Mapping::unicode('©'));
        let controls = Controls::new(first, true);
        let before = controls.layout();

        let clone = controls.clone();
        std::thread::spawn(move || {
            clone.set_layout(MappingTable::new("second").with_alt("g", Mapping::unicode('ß')));
        })
        .join()
        .unwrap();

        let (enabled, after) = controls.snapshot();
        assert!(enabled);
        assert_eq!(after.name, "second");
        assert!(after.lookup("c", false).is_none());
        // Earlier snapshots keep the table they were taken with.
        assert_eq!(before.name, "first");
        assert!(before.lookup("c", false).is_some());
    }
}
