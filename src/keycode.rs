//! Linux key codes and their symbolic names.
//!
//! Mapping tables are keyed by symbolic name (`"e"`, `"leftbrace"`, `"102nd"`)
//! rather than raw codes, so a table never depends on device numbering.
//! Keys without a name always forward unchanged.

// Codes from linux/input-event-codes.h
pub const KEY_ESC: u16 = 1;
pub const KEY_1: u16 = 2;
pub const KEY_2: u16 = 3;
pub const KEY_3: u16 = 4;
pub const KEY_4: u16 = 5;
pub const KEY_5: u16 = 6;
pub const KEY_6: u16 = 7;
pub const KEY_7: u16 = 8;
pub const KEY_8: u16 = 9;
pub const KEY_9: u16 = 10;
pub const KEY_0: u16 = 11;
pub const KEY_MINUS: u16 = 12;
pub const KEY_EQUAL: u16 = 13;
pub const KEY_BACKSPACE: u16 = 14;
pub const KEY_TAB: u16 = 15;
pub const KEY_Q: u16 = 16;
pub const KEY_W: u16 = 17;
pub const KEY_E: u16 = 18;
pub const KEY_R: u16 = 19;
pub const KEY_T: u16 = 20;
pub const KEY_Y: u16 = 21;
pub const KEY_U: u16 = 22;
pub const KEY_I: u16 = 23;
pub const KEY_O: u16 = 24;
pub const KEY_P: u16 = 25;
pub const KEY_LEFTBRACE: u16 = 26;
pub const KEY_RIGHTBRACE: u16 = 27;
pub const KEY_ENTER: u16 = 28;
pub const KEY_LEFTCTRL: u16 = 29;
pub const KEY_A: u16 = 30;
pub const KEY_S: u16 = 31;
pub const KEY_D: u16 = 32;
pub const KEY_F: u16 = 33;
pub const KEY_G: u16 = 34;
pub const KEY_H: u16 = 35;
pub const KEY_J: u16 = 36;
pub const KEY_K: u16 = 37;
pub const KEY_L: u16 = 38;
pub const KEY_SEMICOLON: u16 = 39;
pub const KEY_APOSTROPHE: u16 = 40;
pub const KEY_GRAVE: u16 = 41;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_BACKSLASH: u16 = 43;
pub const KEY_Z: u16 = 44;
pub const KEY_X: u16 = 45;
pub const KEY_C: u16 = 46;
pub const KEY_V: u16 = 47;
pub const KEY_B: u16 = 48;
pub const KEY_N: u16 = 49;
pub const KEY_M: u16 = 50;
pub const KEY_COMMA: u16 = 51;
pub const KEY_DOT: u16 = 52;
pub const KEY_SLASH: u16 = 53;
pub const KEY_RIGHTSHIFT: u16 = 54;
pub const KEY_LEFTALT: u16 = 56;
pub const KEY_SPACE: u16 = 57;
pub const KEY_CAPSLOCK: u16 = 58;
pub const KEY_102ND: u16 = 86;
pub const KEY_RIGHTCTRL: u16 = 97;
pub const KEY_RIGHTALT: u16 = 100;
pub const KEY_LEFTMETA: u16 = 125;
pub const KEY_RIGHTMETA: u16 = 126;

/// Key codes that carry a symbolic name, paired with that name.
static KEY_NAMES: &[(u16, &str)] = &[
    // Number row
    (KEY_1, "1"),
    (KEY_2, "2"),
    (KEY_3, "3"),
    (KEY_4, "4"),
    (KEY_5, "5"),
    (KEY_6, "6"),
    (KEY_7, "7"),
    (KEY_8, "8"),
    (KEY_9, "9"),
    (KEY_0, "0"),
    (KEY_MINUS, "minus"),
    (KEY_EQUAL, "equal"),
    // Top row
    (KEY_Q, "q"),
    (KEY_W, "w"),
    (KEY_E, "e"),
    (KEY_R, "r"),
    (KEY_T, "t"),
    (KEY_Y, "y"),
    (KEY_U, "u"),
    (KEY_I, "i"),
    (KEY_O, "o"),
    (KEY_P, "p"),
    (KEY_LEFTBRACE, "leftbrace"),
    (KEY_RIGHTBRACE, "rightbrace"),
    // Home row
    (KEY_A, "a"),
    (KEY_S, "s"),
    (KEY_D, "d"),
    (KEY_F, "f"),
    (KEY_G, "g"),
    (KEY_H, "h"),
    (KEY_J, "j"),
    (KEY_K, "k"),
    (KEY_L, "l"),
    (KEY_SEMICOLON, "semicolon"),
    (KEY_APOSTROPHE, "apostrophe"),
    (KEY_GRAVE, "grave"),
    (KEY_BACKSLASH, "backslash"),
    // Bottom row
    (KEY_Z, "z"),
    (KEY_X, "x"),
    (KEY_C, "c"),
    (KEY_V, "v"),
    (KEY_B, "b"),
    (KEY_N, "n"),
    (KEY_M, "m"),
    (KEY_COMMA, "comma"),
    (KEY_DOT, "dot"),
    (KEY_SLASH, "slash"),
    (KEY_SPACE, "space"),
    (KEY_102ND, "102nd"),
];

/// Symbolic name of a key code, if it has one.
pub fn key_name(code: u16) -> Option<&'static str> {
    KEY_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Key code for a symbolic name.
pub fn key_code(name: &str) -> Option<u16> {
    KEY_NAMES
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(code, _)| *code)
}

/// All known symbolic names.
pub fn key_names() -> impl Iterator<Item = &'static str> {
    KEY_NAMES.iter().map(|(_, name)| *name)
}

/// The character a named key stands for when typed literally.
///
/// Single-character names map to themselves (letters upper-cased when
/// `shift` is set) and `"space"` maps to `' '`. Other names such as
/// `"leftbrace"` have no layout-independent character.
pub fn key_char(name: &str, shift: bool) -> Option<char> {
    if name == "space" {
        return Some(' ');
    }

    let mut chars = name.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }

    if shift && c.is_ascii_alphabetic() {
        Some(c.to_ascii_uppercase())
    } else {
        Some(c)
    }
}

/// Whether `code` is one of the eight modifier keys.
pub fn is_modifier(code: u16) -> bool {
    matches!(
        code,
        KEY_LEFTSHIFT
            | KEY_RIGHTSHIFT
            | KEY_LEFTCTRL
            | KEY_RIGHTCTRL
            | KEY_LEFTALT
            | KEY_RIGHTALT
            | KEY_LEFTMETA
            | KEY_RIGHTMETA
    )
}
