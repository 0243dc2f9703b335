//! Output protocols on top of a synthetic keyboard.
//!
//! [`Injector`] turns the engine's decisions into key events on a
//! [`KeySink`]: plain forwarding, AltGr passthrough and Unicode entry via
//! the Ctrl+Shift+U convention. It remembers which codes are down on the
//! synthetic device so that sequences never press or release a modifier
//! they do not own, and so that [`Injector::release_all`] can leave nothing
//! stuck at shutdown.
//!
//! Unicode entry only works in applications that honor Ctrl+Shift+U
//! (GTK, Qt and IBus-backed input). Elsewhere the hex digits are typed as is.

use crate::error::{Error, Result};
use crate::event::KeyValue;
use crate::keycode::*;
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Something that can emit raw key events, typically a uinput device.
pub trait KeySink {
    /// Emit one `EV_KEY` event followed by a sync report.
    fn emit(&mut self, code: u16, value: i32) -> Result<()>;
}

impl<S: KeySink + ?Sized> KeySink for Box<S> {
    fn emit(&mut self, code: u16, value: i32) -> Result<()> {
        (**self).emit(code, value)
    }
}

/// Physical layout assumed when typing the hex digits of a code point.
///
/// The synthetic key codes are interpreted by the system layout, so `a`
/// must be sent from whichever physical key produces `a`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HexLayout {
    /// French AZERTY: digits need Shift, `a` sits on the `Q` position.
    #[default]
    Azerty,
    /// US QWERTY.
    Qwerty,
}

impl HexLayout {
    /// Physical key for a lowercase hex digit and whether it needs Shift.
    pub fn key_for(self, digit: char) -> Option<(u16, bool)> {
        let number = match digit {
            '0' => Some(KEY_0),
            '1' => Some(KEY_1),
            '2' => Some(KEY_2),
            '3' => Some(KEY_3),
            '4' => Some(KEY_4),
            '5' => Some(KEY_5),
            '6' => Some(KEY_6),
            '7' => Some(KEY_7),
            '8' => Some(KEY_8),
            '9' => Some(KEY_9),
            _ => None,
        };
        if let Some(code) = number {
            return Some((code, self == HexLayout::Azerty));
        }

        let code = match digit {
            'a' => match self {
                HexLayout::Azerty => KEY_Q,
                HexLayout::Qwerty => KEY_A,
            },
            'b' => KEY_B,
            'c' => KEY_C,
            'd' => KEY_D,
            'e' => KEY_E,
            'f' => KEY_F,
            _ => return None,
        };
        Some((code, false))
    }
}

/// How a passthrough treats Shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftMode {
    /// No Shift involved.
    Off,
    /// Hold Shift only around the tap.
    Tap,
    /// The user already holds Shift; leave it alone.
    Held,
}

/// Output protocols over one synthetic keyboard.
#[derive(Debug)]
pub struct Injector<S: KeySink> {
    sink: S,
    hex_layout: HexLayout,
    held: BTreeSet<u16>,
}

impl<S: KeySink> Injector<S> {
    /// Wrap `sink`, typing hex digits for `hex_layout`.
    pub fn new(sink: S, hex_layout: HexLayout) -> Self {
        Self {
            sink,
            hex_layout,
            held: BTreeSet::new(),
        }
    }

    /// The underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The underlying sink, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Give back the sink. Call [`Injector::release_all`] first.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Whether `code` is down on the synthetic device.
    pub fn is_held(&self, code: u16) -> bool {
        self.held.contains(&code)
    }

    /// Codes currently down on the synthetic device.
    pub fn held(&self) -> impl Iterator<Item = u16> + '_ {
        self.held.iter().copied()
    }

    fn emit(&mut self, code: u16, value: KeyValue) -> Result<()> {
        self.sink.emit(code, value.raw())?;
        match value {
            KeyValue::Press | KeyValue::Repeat => {
                self.held.insert(code);
            }
            KeyValue::Release => {
                self.held.remove(&code);
            }
        }
        Ok(())
    }

    fn tap(&mut self, code: u16) -> Result<()> {
        self.emit(code, KeyValue::Press)?;
        self.emit(code, KeyValue::Release)
    }

    /// Re-send an event 1:1.
    pub fn forward(&mut self, code: u16, value: KeyValue) -> Result<()> {
        self.emit(code, value)
    }

    /// Tap `code` under right Alt instead of the consumed left Alt.
    pub fn passthrough(&mut self, code: u16, shift: ShiftMode) -> Result<()> {
        log::debug!("passthrough code={} shift={:?}", code, shift);
        match shift {
            ShiftMode::Tap => {
                self.with_modifiers(&[KEY_LEFTSHIFT, KEY_RIGHTALT], |inj| inj.tap(code))
            }
            ShiftMode::Off | ShiftMode::Held => {
                self.with_modifiers(&[KEY_RIGHTALT], |inj| inj.tap(code))
            }
        }
    }

    /// Type one character with Ctrl+Shift+U, hex digits, Space.
    pub fn type_unicode(&mut self, c: char) -> Result<()> {
        let hex = format!("{:x}", c as u32);
        log::debug!("typing unicode char={:?} hex={}", c, hex);

        self.with_modifiers(&[KEY_LEFTCTRL, KEY_LEFTSHIFT], |inj| inj.tap(KEY_U))?;
        for digit in hex.chars() {
            self.type_hex_digit(digit)?;
        }
        self.tap(KEY_SPACE)
    }

    /// Type each character in order. Stops at the first failure; earlier
    /// characters stay typed.
    pub fn type_string(&mut self, text: &str) -> Result<()> {
        for c in text.chars() {
            self.type_unicode(c)?;
        }
        Ok(())
    }

    fn type_hex_digit(&mut self, digit: char) -> Result<()> {
        let (code, shifted) = self
            .hex_layout
            .key_for(digit)
            .ok_or_else(|| Error::InjectFailed(format!("no key for hex digit {digit:?}")))?;
        if shifted {
            self.with_modifiers(&[KEY_LEFTSHIFT], |inj| inj.tap(code))
        } else {
            // A Shift held by the user would turn QWERTY digits into symbols.
            self.without_modifiers(&[KEY_LEFTSHIFT, KEY_RIGHTSHIFT], |inj| inj.tap(code))
        }
    }

    /// Lift whichever of `modifiers` are down, run `body`, press them again.
    ///
    /// Lifted modifiers are restored even when a step fails; the first
    /// error wins.
    fn without_modifiers<F>(&mut self, modifiers: &[u16], body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let mut lifted = Vec::with_capacity(modifiers.len());
        let mut result = Ok(());

        for &modifier in modifiers {
            if !self.is_held(modifier) {
                continue;
            }
            if let Err(e) = self.emit(modifier, KeyValue::Release) {
                result = Err(e);
                break;
            }
            lifted.push(modifier);
        }

        if result.is_ok() {
            result = body(self);
        }

        for &modifier in lifted.iter().rev() {
            if let Err(e) = self.emit(modifier, KeyValue::Press) {
                log::warn!("failed to restore modifier {}: {}", modifier, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        result
    }

    /// Press `modifiers` in order, run `body`, release them in reverse.
    ///
    /// Modifiers already down are neither pressed nor released. Whatever
    /// this call pressed is released even when a step fails; the first
    /// error wins.
    fn with_modifiers<F>(&mut self, modifiers: &[u16], body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let mut pressed = Vec::with_capacity(modifiers.len());
        let mut result = Ok(());

        for &modifier in modifiers {
            if self.is_held(modifier) {
                continue;
            }
            if let Err(e) = self.emit(modifier, KeyValue::Press) {
                result = Err(e);
                break;
            }
            pressed.push(modifier);
        }

        if result.is_ok() {
            result = body(self);
        }

        for &modifier in pressed.iter().rev() {
            if let Err(e) = self.emit(modifier, KeyValue::Release) {
                log::warn!("failed to release modifier {}: {}", modifier, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        result
    }

    /// Release every code still down on the synthetic device.
    pub fn release_all(&mut self) -> Result<()> {
        let held: Vec<u16> = self.held.iter().rev().copied().collect();
        let mut result = Ok(());
        for code in held {
            if let Err(e) = self.emit(code, KeyValue::Release) {
                log::warn!("failed to release key {}: {}", code, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Recorder, typed_text};
    use super::*;

    const P: i32 = 1;
    const R: i32 = 0;

    fn injector() -> Injector<Recorder> {
        Injector::new(Recorder::default(), HexLayout::Azerty)
    }

    #[test]
    fn test_forward_is_one_to_one() {
        let mut inj = injector();
        inj.forward(KEY_A, KeyValue::Press).unwrap();
        inj.forward(KEY_A, KeyValue::Repeat).unwrap();
        inj.forward(KEY_A, KeyValue::Release).unwrap();
        assert_eq!(inj.sink().events, vec![(KEY_A, 1), (KEY_A, 2), (KEY_A, 0)]);
        assert_eq!(inj.held().count(), 0);
    }

    #[test]
    fn test_passthrough_order() {
        let mut inj = injector();
        inj.passthrough(KEY_5, ShiftMode::Off).unwrap();
        assert_eq!(
            inj.sink().events,
            vec![(KEY_RIGHTALT, P), (KEY_5, P), (KEY_5, R), (KEY_RIGHTALT, R)]
        );
    }

    #[test]
    fn test_passthrough_shift_tap_wraps_only_the_tap() {
        let mut inj = injector();
        inj.passthrough(KEY_5, ShiftMode::Tap).unwrap();
        assert_eq!(
            inj.sink().events,
            vec![
                (KEY_LEFTSHIFT, P),
                (KEY_RIGHTALT, P),
                (KEY_5, P),
                (KEY_5, R),
                (KEY_RIGHTALT, R),
                (KEY_LEFTSHIFT, R),
            ]
        );
        assert!(!inj.is_held(KEY_LEFTSHIFT));
    }

    #[test]
    fn test_passthrough_leaves_user_shift_alone() {
        let mut inj = injector();
        inj.forward(KEY_LEFTSHIFT, KeyValue::Press).unwrap();
        inj.sink.take();

        inj.passthrough(KEY_5, ShiftMode::Held).unwrap();
        assert_eq!(
            inj.sink().events,
            vec![(KEY_RIGHTALT, P), (KEY_5, P), (KEY_5, R), (KEY_RIGHTALT, R)]
        );
        assert!(inj.is_held(KEY_LEFTSHIFT));
    }

    #[test]
    fn test_qwerty_digits_lift_user_shift() {
        let mut inj = Injector::new(Recorder::default(), HexLayout::Qwerty);
        inj.forward(KEY_LEFTSHIFT, KeyValue::Press).unwrap();
        inj.sink.take();

        // '¢' is U+00A2
        inj.type_unicode('¢').unwrap();
        assert_eq!(
            inj.sink().events,
            vec![
                (KEY_LEFTCTRL, P),
                (KEY_U, P),
                (KEY_U, R),
                (KEY_LEFTCTRL, R),
                (KEY_LEFTSHIFT, R),
                (KEY_A, P),
                (KEY_A, R),
                (KEY_LEFTSHIFT, P),
                (KEY_LEFTSHIFT, R),
                (KEY_2, P),
                (KEY_2, R),
                (KEY_LEFTSHIFT, P),
                (KEY_SPACE, P),
                (KEY_SPACE, R),
            ]
        );
        assert!(inj.is_held(KEY_LEFTSHIFT));
    }

    #[test]
    fn test_lifted_shift_restored_on_failure() {
        let mut inj = Injector::new(Recorder::default(), HexLayout::Qwerty);
        inj.forward(KEY_RIGHTSHIFT, KeyValue::Press).unwrap();
        inj.sink.take();
        inj.sink.fail_press = Some(KEY_A);

        assert!(inj.type_unicode('¢').is_err());
        assert!(
            inj.sink()
                .events
                .ends_with(&[(KEY_RIGHTSHIFT, R), (KEY_RIGHTSHIFT, P)])
        );
        assert!(inj.is_held(KEY_RIGHTSHIFT));
    }

    #[test]
    fn test_passthrough_keeps_user_altgr() {
        let mut inj = injector();
        inj.forward(KEY_RIGHTALT, KeyValue::Press).unwrap();
        inj.sink.take();

        inj.passthrough(KEY_5, ShiftMode::Off).unwrap();
        assert_eq!(inj.sink().events, vec![(KEY_5, P), (KEY_5, R)]);
        assert!(inj.is_held(KEY_RIGHTALT));
    }

    #[test]
    fn test_type_unicode_sequence() {
        let mut inj = injector();
        // 'é' is U+00E9
        inj.type_unicode('é').unwrap();
        assert_eq!(
            inj.sink().events,
            vec![
                (KEY_LEFTCTRL, P),
                (KEY_LEFTSHIFT, P),
                (KEY_U, P),
                (KEY_U, R),
                (KEY_LEFTSHIFT, R),
                (KEY_LEFTCTRL, R),
                (KEY_E, P),
                (KEY_E, R),
                (KEY_LEFTSHIFT, P),
                (KEY_9, P),
                (KEY_9, R),
                (KEY_LEFTSHIFT, R),
                (KEY_SPACE, P),
                (KEY_SPACE, R),
            ]
        );
        assert_eq!(inj.held().count(), 0);
    }

    #[test]
    fn test_type_unicode_qwerty_letters() {
        let mut inj = Injector::new(Recorder::default(), HexLayout::Qwerty);
        // U+00AA
        inj.type_unicode('ª').unwrap();
        let taps: Vec<u16> = inj
            .sink()
            .events
            .iter()
            .filter(|&&(_, v)| v == P)
            .map(|&(c, _)| c)
            .collect();
        assert_eq!(
            taps,
            vec![KEY_LEFTCTRL, KEY_LEFTSHIFT, KEY_U, KEY_A, KEY_A, KEY_SPACE]
        );
    }

    #[test]
    fn test_type_string_decodes() {
        let mut inj = injector();
        inj.type_string("´é©").unwrap();
        assert_eq!(typed_text(&inj.sink().events), "´é©");
    }

    #[test]
    fn test_failed_tap_releases_own_modifiers() {
        // Ctrl and Shift go out, the U press fails.
        let mut inj = Injector::new(Recorder::failing_after(2), HexLayout::Azerty);
        let err = inj.type_unicode('é');
        assert!(matches!(err, Err(Error::InjectFailed(_))));

        // The sink refuses the releases too, but they were attempted and the
        // first error is the one surfaced.
        assert_eq!(
            inj.sink().events,
            vec![(KEY_LEFTCTRL, P), (KEY_LEFTSHIFT, P)]
        );
        assert!(inj.is_held(KEY_LEFTCTRL));
    }

    #[test]
    fn test_failure_midway_releases_modifiers() {
        // Shift, RAlt and the 5 press succeed; the 5 release fails.
        let mut recorder = Recorder::default();
        recorder.fail_after = Some(3);
        let mut inj = Injector::new(recorder, HexLayout::Azerty);
        assert!(inj.passthrough(KEY_5, ShiftMode::Tap).is_err());

        // Lift the failure and clean up what is still down.
        inj.sink.fail_after = None;
        inj.release_all().unwrap();
        let events = inj.sink().events.clone();
        assert_eq!(
            &events[3..],
            &[(KEY_RIGHTALT, R), (KEY_LEFTSHIFT, R), (KEY_5, R)]
        );
        assert_eq!(inj.held().count(), 0);
    }

    #[test]
    fn test_type_string_aborts_on_failure() {
        // One full 'a' (U+61, 16 events) gets through.
        let mut inj = Injector::new(Recorder::failing_after(16), HexLayout::Azerty);
        assert!(inj.type_string("ab").is_err());
        assert_eq!(typed_text(&inj.sink().events), "a");
    }

    #[test]
    fn test_release_all() {
        let mut inj = injector();
        inj.forward(KEY_LEFTSHIFT, KeyValue::Press).unwrap();
        inj.forward(KEY_A, KeyValue::Press).unwrap();
        inj.sink.take();

        inj.release_all().unwrap();
        assert_eq!(inj.sink().events, vec![(KEY_LEFTSHIFT, R), (KEY_A, R)]);
        assert_eq!(inj.held().count(), 0);

        inj.release_all().unwrap();
        assert_eq!(inj.sink().events.len(), 2);
    }

    #[test]
    fn test_hex_layout_table() {
        assert_eq!(HexLayout::Azerty.key_for('a'), Some((KEY_Q, false)));
        assert_eq!(HexLayout::Azerty.key_for('7'), Some((KEY_7, true)));
        assert_eq!(HexLayout::Qwerty.key_for('7'), Some((KEY_7, false)));
        assert_eq!(HexLayout::Qwerty.key_for('f'), Some((KEY_F, false)));
        assert_eq!(HexLayout::Azerty.key_for('g'), None);
    }
}
