//! Mapping resolution: decides, per event, whether to forward, swallow or
//! remap, and drives the injector accordingly.
//!
//! The engine is owned by a single consumer. Modifier state, the dead-key
//! composer and the intercepted-key set are plain fields; only the enable
//! flag and the table come from [`Controls`].

use crate::compose::{Composition, DeadKeyComposer, RearmPolicy};
use crate::control::Controls;
use crate::error::Result;
use crate::event::KeyEvent;
use crate::keycode::{self, KEY_LEFTALT};
use crate::mapping::{Mapping, MappingTable};
use crate::output::{Injector, KeySink, ShiftMode};
use crate::state::ModifierState;
use std::collections::HashSet;

/// What happened to one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Re-sent unchanged.
    Forwarded,
    /// Dropped: the trigger key, or the release of an intercepted press.
    Swallowed,
    /// Replaced by a mapping's output.
    Remapped,
    /// Consumed by the dead-key composer.
    Composed,
}

/// Codes whose press was remapped and whose release must be swallowed.
#[derive(Debug, Default)]
pub struct InterceptedKeys {
    codes: HashSet<u16>,
}

impl InterceptedKeys {
    /// Remember an intercepted press. Marking twice keeps one entry.
    pub fn mark(&mut self, code: u16) {
        self.codes.insert(code);
    }

    /// Forget `code`, returning whether it was intercepted.
    pub fn take(&mut self, code: u16) -> bool {
        self.codes.remove(&code)
    }

    /// Whether the release of `code` is pending.
    pub fn contains(&self, code: u16) -> bool {
        self.codes.contains(&code)
    }

    /// Number of pending releases.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether no release is pending.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// The remapping state machine.
pub struct Engine<S: KeySink> {
    injector: Injector<S>,
    controls: Controls,
    modifiers: ModifierState,
    composer: DeadKeyComposer,
    intercepted: InterceptedKeys,
}

impl<S: KeySink> Engine<S> {
    /// An engine with no modifiers held and nothing armed.
    pub fn new(injector: Injector<S>, controls: Controls, rearm: RearmPolicy) -> Self {
        Self {
            injector,
            controls,
            modifiers: ModifierState::new(),
            composer: DeadKeyComposer::new(rearm),
            intercepted: InterceptedKeys::default(),
        }
    }

    /// Modifiers held on the physical keyboards.
    pub fn modifiers(&self) -> &ModifierState {
        &self.modifiers
    }

    /// The dead-key composer.
    pub fn composer(&self) -> &DeadKeyComposer {
        &self.composer
    }

    /// Codes whose release will be swallowed.
    pub fn intercepted(&self) -> &InterceptedKeys {
        &self.intercepted
    }

    /// The output injector.
    pub fn injector(&self) -> &Injector<S> {
        &self.injector
    }

    /// Release everything still down on the synthetic keyboard and hand
    /// back the injector.
    pub fn finish(mut self) -> (Injector<S>, Result<()>) {
        let result = self.injector.release_all();
        (self.injector, result)
    }

    /// Process one event from a physical keyboard.
    pub fn handle_event(&mut self, event: &KeyEvent) -> Result<Disposition> {
        self.modifiers.update(event);

        log::debug!(
            "key event code={} key={} value={:?} option={} shift={}",
            event.code,
            keycode::key_name(event.code).unwrap_or("unknown"),
            event.value,
            self.modifiers.option_held(),
            self.modifiers.shift_held(),
        );

        // Left Alt never reaches the system, so desktops cannot open menus on it.
        if event.code == KEY_LEFTALT {
            return Ok(Disposition::Swallowed);
        }

        if keycode::is_modifier(event.code) {
            return self.forward(event);
        }

        let (enabled, table) = self.controls.snapshot();

        if !enabled {
            if event.is_release() && self.intercepted.take(event.code) {
                log::debug!("forwarding release of code {} intercepted before disable", event.code);
            }
            self.composer.disarm();
            return self.forward(event);
        }

        if event.is_release() {
            if self.intercepted.take(event.code) {
                return Ok(Disposition::Swallowed);
            }
            return self.forward(event);
        }

        if !event.is_press() {
            return self.forward(event);
        }

        if !self.modifiers.option_held() {
            if self.composer.is_armed() {
                return self.compose(event);
            }
            return self.forward(event);
        }

        let Some(name) = keycode::key_name(event.code) else {
            return self.forward(event);
        };

        let shift = self.modifiers.shift_held();
        let Some(mapping) = table.lookup(name, shift) else {
            return self.forward(event);
        };

        self.intercepted.mark(event.code);
        self.execute(mapping, shift, &table)?;
        Ok(Disposition::Remapped)
    }

    fn forward(&mut self, event: &KeyEvent) -> Result<Disposition> {
        self.injector.forward(event.code, event.value)?;
        Ok(Disposition::Forwarded)
    }

    fn execute(&mut self, mapping: &Mapping, from_shift_table: bool, table: &MappingTable) -> Result<()> {
        match mapping {
            Mapping::Passthrough { target } => {
                let Some(code) = keycode::key_code(target) else {
                    log::warn!("unknown passthrough key {}", target);
                    return Ok(());
                };
                let shift = if !from_shift_table {
                    ShiftMode::Off
                } else if self.modifiers.shift_held() {
                    ShiftMode::Held
                } else {
                    ShiftMode::Tap
                };
                self.injector.passthrough(code, shift)
            }
            Mapping::Unicode { scalar } => self.injector.type_unicode(*scalar),
            Mapping::DeadKey { id, base } => {
                match table.dead_key(id) {
                    Some(dead_key) => {
                        if self.composer.arm(dead_key.clone()) {
                            log::debug!("dead key {} armed", id);
                        }
                    }
                    None => log::warn!("unknown dead key {}", id),
                }
                self.injector.type_string(base)
            }
        }
    }

    fn compose(&mut self, event: &KeyEvent) -> Result<Disposition> {
        let Some(name) = keycode::key_name(event.code) else {
            self.composer.disarm();
            return self.forward(event);
        };

        let composition = self.composer.compose(name, self.modifiers.shift_held());
        match composition {
            Some(Composition::Combined(text)) => {
                self.intercepted.mark(event.code);
                self.injector.type_string(&text)?;
            }
            Some(Composition::Unmatched {
                mut base,
                literal: Some(c),
            }) => {
                self.intercepted.mark(event.code);
                base.push(c);
                self.injector.type_string(&base)?;
            }
            Some(Composition::Unmatched {
                base,
                literal: None,
            }) => {
                // No character of its own: type the accent, then let the key through.
                self.injector.type_string(&base)?;
                return self.forward(event);
            }
            None => return self.forward(event),
        }
        Ok(Disposition::Composed)
    }
}
