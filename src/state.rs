//! Live modifier state.
//!
//! Each side of each modifier has its own bit so that left Alt (the Option
//! trigger) can be told apart from right Alt (AltGr), which stays an ordinary
//! system modifier.

use crate::event::{KeyEvent, KeyValue};
use crate::keycode::{
    KEY_LEFTALT, KEY_LEFTCTRL, KEY_LEFTMETA, KEY_LEFTSHIFT, KEY_RIGHTALT, KEY_RIGHTCTRL,
    KEY_RIGHTMETA, KEY_RIGHTSHIFT,
};

/// Left Shift mask.
pub const MASK_SHIFT_L: u8 = 1 << 0;
/// Right Shift mask.
pub const MASK_SHIFT_R: u8 = 1 << 1;
/// Left Control mask.
pub const MASK_CTRL_L: u8 = 1 << 2;
/// Right Control mask.
pub const MASK_CTRL_R: u8 = 1 << 3;
/// Left Alt (Option) mask.
pub const MASK_ALT_L: u8 = 1 << 4;
/// Right Alt (AltGr) mask.
pub const MASK_ALT_R: u8 = 1 << 5;
/// Left Meta mask.
pub const MASK_META_L: u8 = 1 << 6;
/// Right Meta mask.
pub const MASK_META_R: u8 = 1 << 7;

/// Either Shift.
pub const MASK_SHIFT: u8 = MASK_SHIFT_L | MASK_SHIFT_R;
/// Either Control.
pub const MASK_CTRL: u8 = MASK_CTRL_L | MASK_CTRL_R;
/// Either Meta.
pub const MASK_META: u8 = MASK_META_L | MASK_META_R;

/// Mask bit for a modifier key code, or 0 for any other key.
pub fn code_to_mask(code: u16) -> u8 {
    match code {
        KEY_LEFTSHIFT => MASK_SHIFT_L,
        KEY_RIGHTSHIFT => MASK_SHIFT_R,
        KEY_LEFTCTRL => MASK_CTRL_L,
        KEY_RIGHTCTRL => MASK_CTRL_R,
        KEY_LEFTALT => MASK_ALT_L,
        KEY_RIGHTALT => MASK_ALT_R,
        KEY_LEFTMETA => MASK_META_L,
        KEY_RIGHTMETA => MASK_META_R,
        _ => 0,
    }
}

/// Modifier keys currently held on the physical keyboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    mask: u8,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Repeats and non-modifier keys leave the state alone.
    pub fn update(&mut self, event: &KeyEvent) {
        let bit = code_to_mask(event.code);
        match event.value {
            KeyValue::Press => self.mask |= bit,
            KeyValue::Release => self.mask &= !bit,
            KeyValue::Repeat => {}
        }
    }

    /// Raw mask value.
    #[inline]
    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Forget every held modifier.
    #[inline]
    pub fn reset(&mut self) {
        self.mask = 0;
    }

    /// Check if any bit of `mask` is held.
    #[inline]
    pub fn is_held(&self, mask: u8) -> bool {
        (self.mask & mask) != 0
    }

    /// Shift held on either side.
    #[inline]
    pub fn shift_held(&self) -> bool {
        self.is_held(MASK_SHIFT)
    }

    /// Control held on either side.
    #[inline]
    pub fn ctrl_held(&self) -> bool {
        self.is_held(MASK_CTRL)
    }

    /// Meta held on either side.
    #[inline]
    pub fn meta_held(&self) -> bool {
        self.is_held(MASK_META)
    }

    /// The Option trigger (left Alt) is held.
    #[inline]
    pub fn option_held(&self) -> bool {
        self.is_held(MASK_ALT_L)
    }

    /// Right Alt (AltGr) is held.
    #[inline]
    pub fn altgr_held(&self) -> bool {
        self.is_held(MASK_ALT_R)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keycode::KEY_A;

    #[test]
    fn test_shift_either_side() {
        let mut state = ModifierState::new();
        assert!(!state.shift_held());

        state.update(&KeyEvent::press(KEY_RIGHTSHIFT));
        assert!(state.shift_held());

        state.update(&KeyEvent::press(KEY_LEFTSHIFT));
        state.update(&KeyEvent::release(KEY_RIGHTSHIFT));
        assert!(state.shift_held());

        state.update(&KeyEvent::release(KEY_LEFTSHIFT));
        assert!(!state.shift_held());
    }

    #[test]
    fn test_left_and_right_alt_are_distinct() {
        let mut state = ModifierState::new();

        state.update(&KeyEvent::press(KEY_RIGHTALT));
        assert!(state.altgr_held());
        assert!(!state.option_held());

        state.update(&KeyEvent::press(KEY_LEFTALT));
        state.update(&KeyEvent::release(KEY_RIGHTALT));
        assert!(state.option_held());
        assert!(!state.altgr_held());
    }

    #[test]
    fn test_repeat_and_plain_keys_ignored() {
        let mut state = ModifierState::new();
        state.update(&KeyEvent::press(KEY_LEFTCTRL));
        state.update(&KeyEvent::repeat(KEY_LEFTCTRL));
        state.update(&KeyEvent::press(KEY_A));
        assert_eq!(state.mask(), MASK_CTRL_L);
        assert!(state.ctrl_held());
        assert!(!state.meta_held());

        state.reset();
        assert_eq!(state.mask(), 0);
    }

    #[test]
    fn test_code_to_mask() {
        assert_eq!(code_to_mask(KEY_LEFTMETA), MASK_META_L);
        assert_eq!(code_to_mask(KEY_RIGHTCTRL), MASK_CTRL_R);
        assert_eq!(code_to_mask(KEY_A), 0);
    }
}
