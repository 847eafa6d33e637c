//! The key event model: actions, key codes, and timestamped events.
//!
//! # Where these values come from
//!
//! The Linux input subsystem reports a key event as `(type, code, value)`.
//! For `EV_KEY` events the `value` field is:
//!
//! | value | meaning     |
//! |-------|-------------|
//! | 0     | release     |
//! | 1     | press       |
//! | 2     | auto-repeat |
//!
//! Auto-repeat is deliberately *not* representable as a [`KeyAction`]:
//! a held key generates an unbounded stream of repeats, and feeding them
//! into the matcher would flush the sliding window with noise.  Repeats are
//! filtered out at ingestion by [`KeyAction::from_value`] returning `None`.

use std::time::Duration;

/// Numeric identifier of a physical key, as assigned by the Linux input
/// subsystem (the `KEY_*` constants from `input-event-codes.h`).
///
/// The mapping from key to code is stable across machines; `KEY_LEFTCTRL`
/// is 29 everywhere.  Textual names resolve to codes via
/// [`keymap::lookup`](crate::keymap::lookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    /// Creates a key code from its raw numeric value.
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the raw numeric value.
    pub const fn code(self) -> u16 {
        self.0
    }
}

/// Whether a key went down or came up.
///
/// The discriminant values match the Linux `EV_KEY` event `value` field, so
/// `action as i32` round-trips through the wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum KeyAction {
    Release = 0,
    Press = 1,
}

impl KeyAction {
    /// Classifies a raw `EV_KEY` value.
    ///
    /// Returns `None` for auto-repeat (2) and any other unrecognised value;
    /// such events never enter the sliding window.
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Release),
            1 => Some(Self::Press),
            _ => None,
        }
    }

    /// The raw `EV_KEY` value for this action.
    pub fn value(self) -> i32 {
        self as i32
    }
}

/// An (action, key) pair — the unit stored in rule patterns, rule actions,
/// and the matcher's sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyStroke {
    pub action: KeyAction,
    pub code: KeyCode,
}

impl KeyStroke {
    pub const fn new(action: KeyAction, code: KeyCode) -> Self {
        Self { action, code }
    }
}

/// A keystroke observed on a physical device, with the kernel timestamp.
///
/// The timestamp is a duration from an arbitrary fixed origin (the daemon
/// uses the evdev timeval).  The matcher only ever looks at *differences*
/// between consecutive timestamps, so the origin does not matter as long as
/// all devices share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub code: KeyCode,
    pub timestamp: Duration,
}

impl KeyEvent {
    pub fn new(action: KeyAction, code: KeyCode, timestamp: Duration) -> Self {
        Self {
            action,
            code,
            timestamp,
        }
    }

    /// The (action, code) pair of this event, without the timestamp.
    pub fn stroke(&self) -> KeyStroke {
        KeyStroke::new(self.action, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_value_classifies_press_and_release() {
        assert_eq!(KeyAction::from_value(0), Some(KeyAction::Release));
        assert_eq!(KeyAction::from_value(1), Some(KeyAction::Press));
    }

    #[test]
    fn test_from_value_rejects_auto_repeat() {
        assert_eq!(KeyAction::from_value(2), None);
    }

    #[test]
    fn test_from_value_rejects_garbage() {
        assert_eq!(KeyAction::from_value(-1), None);
        assert_eq!(KeyAction::from_value(3), None);
        assert_eq!(KeyAction::from_value(i32::MAX), None);
    }

    #[test]
    fn test_action_value_round_trips() {
        assert_eq!(KeyAction::Release.value(), 0);
        assert_eq!(KeyAction::Press.value(), 1);
    }
}
