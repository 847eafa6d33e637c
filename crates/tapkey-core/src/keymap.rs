//! Static table mapping textual key names to Linux key codes.
//!
//! Rule strings refer to keys by the lowercase tail of the kernel constant:
//! `KEY_LEFTCTRL` is written `leftctrl`, `KEY_ESC` is written `esc`.
//! Lookup is case-insensitive, so `ESC` and `Esc` work too.
//!
//! The table is constructed explicitly rather than resolved dynamically
//! against whatever constants an input library happens to export.  An
//! unknown name is a typed lookup failure, reported by the rule parser
//! with the offending token echoed.
//!
//! The numeric values are the `KEY_*` constants from the kernel's
//! `input-event-codes.h`; they are stable ABI and identical on every Linux
//! machine.

use crate::event::KeyCode;

/// Resolves a textual key name to its Linux key code.
///
/// Returns `None` if the name is not in the table.
///
/// # Examples
///
/// ```rust
/// use tapkey_core::keymap;
///
/// assert_eq!(keymap::lookup("leftctrl").map(|k| k.code()), Some(29));
/// assert_eq!(keymap::lookup("ESC").map(|k| k.code()), Some(1));
/// assert_eq!(keymap::lookup("knob11"), None);
/// ```
pub fn lookup(name: &str) -> Option<KeyCode> {
    let lowered = name.to_ascii_lowercase();
    code_for_name(&lowered).map(KeyCode::new)
}

/// The raw name-to-code table.  Names must be lowercase.
fn code_for_name(name: &str) -> Option<u16> {
    let code = match name {
        // Top row
        "esc" => 1,
        "1" => 2,
        "2" => 3,
        "3" => 4,
        "4" => 5,
        "5" => 6,
        "6" => 7,
        "7" => 8,
        "8" => 9,
        "9" => 10,
        "0" => 11,
        "minus" => 12,
        "equal" => 13,
        "backspace" => 14,

        // Letter rows
        "tab" => 15,
        "q" => 16,
        "w" => 17,
        "e" => 18,
        "r" => 19,
        "t" => 20,
        "y" => 21,
        "u" => 22,
        "i" => 23,
        "o" => 24,
        "p" => 25,
        "leftbrace" => 26,
        "rightbrace" => 27,
        "enter" => 28,
        "leftctrl" => 29,
        "a" => 30,
        "s" => 31,
        "d" => 32,
        "f" => 33,
        "g" => 34,
        "h" => 35,
        "j" => 36,
        "k" => 37,
        "l" => 38,
        "semicolon" => 39,
        "apostrophe" => 40,
        "grave" => 41,
        "leftshift" => 42,
        "backslash" => 43,
        "z" => 44,
        "x" => 45,
        "c" => 46,
        "v" => 47,
        "b" => 48,
        "n" => 49,
        "m" => 50,
        "comma" => 51,
        "dot" => 52,
        "slash" => 53,
        "rightshift" => 54,
        "kpasterisk" => 55,
        "leftalt" => 56,
        "space" => 57,
        "capslock" => 58,

        // Function keys
        "f1" => 59,
        "f2" => 60,
        "f3" => 61,
        "f4" => 62,
        "f5" => 63,
        "f6" => 64,
        "f7" => 65,
        "f8" => 66,
        "f9" => 67,
        "f10" => 68,
        "f11" => 87,
        "f12" => 88,

        // Keypad
        "numlock" => 69,
        "scrolllock" => 70,
        "kp7" => 71,
        "kp8" => 72,
        "kp9" => 73,
        "kpminus" => 74,
        "kp4" => 75,
        "kp5" => 76,
        "kp6" => 77,
        "kpplus" => 78,
        "kp1" => 79,
        "kp2" => 80,
        "kp3" => 81,
        "kp0" => 82,
        "kpdot" => 83,
        "kpenter" => 96,
        "kpslash" => 98,

        // Right-hand modifiers and system keys
        "rightctrl" => 97,
        "sysrq" => 99,
        "rightalt" => 100,
        "linefeed" => 101,
        "pause" => 119,
        "leftmeta" => 125,
        "rightmeta" => 126,
        "compose" => 127,

        // Navigation block
        "home" => 102,
        "up" => 103,
        "pageup" => 104,
        "left" => 105,
        "right" => 106,
        "end" => 107,
        "down" => 108,
        "pagedown" => 109,
        "insert" => 110,
        "delete" => 111,

        // Media basics
        "mute" => 113,
        "volumedown" => 114,
        "volumeup" => 115,
        "power" => 116,

        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_well_known_codes() {
        // Spot checks against input-event-codes.h.
        assert_eq!(lookup("esc"), Some(KeyCode::new(1)));
        assert_eq!(lookup("leftctrl"), Some(KeyCode::new(29)));
        assert_eq!(lookup("capslock"), Some(KeyCode::new(58)));
        assert_eq!(lookup("space"), Some(KeyCode::new(57)));
        assert_eq!(lookup("f11"), Some(KeyCode::new(87)));
        assert_eq!(lookup("rightmeta"), Some(KeyCode::new(126)));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("LEFTCTRL"), lookup("leftctrl"));
        assert_eq!(lookup("Esc"), lookup("esc"));
    }

    #[test]
    fn test_lookup_unknown_name_fails() {
        assert_eq!(lookup(""), None);
        assert_eq!(lookup("hyperdrive"), None);
        assert_eq!(lookup("left ctrl"), None);
    }
}
