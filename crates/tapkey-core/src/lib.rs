//! # tapkey-core
//!
//! Shared library for tapkey containing the key event model, the rule
//! parser, the key-name table, and the gesture matcher.
//!
//! This crate is pure domain logic: it has zero dependencies on OS APIs,
//! device nodes, or event-loop machinery.  It can be compiled and unit
//! tested on any platform.  The daemon crate (`tapkey-daemon`) supplies the
//! Linux plumbing (evdev reads, uinput writes, udev hotplug) and feeds
//! decoded events into this crate.
//!
//! # What does tapkey do? (for beginners)
//!
//! tapkey watches every keyboard attached to the machine and recognises
//! short, rapid keystroke *gestures* — for example "left Ctrl pressed and
//! released on its own".  When a configured gesture completes, tapkey
//! injects a replacement keystroke (say, Escape) through a virtual keyboard
//! device, so the remap works in every application system-wide.
//!
//! The pieces defined here:
//!
//! - **`event`** – The key event model: press/release actions, key codes,
//!   and timestamped events as decoded from a device.
//!
//! - **`keymap`** – A static table mapping textual key names (`"esc"`,
//!   `"leftctrl"`, …) to the numeric key codes used by the Linux input
//!   subsystem.
//!
//! - **`rule`** – The rule model and its textual parser.  A rule pairs a
//!   pattern sequence (what the user types) with an action sequence (what
//!   tapkey emits), e.g.
//!   `press:capslock,release:capslock=press:esc,release:esc`.
//!
//! - **`matcher`** – The gesture matcher: a sliding window over the most
//!   recent keystrokes plus a last-element index over the rule set,
//!   evaluated once per incoming event with a debounce timeout.

pub mod event;
pub mod keymap;
pub mod matcher;
pub mod rule;

// Re-export the most-used types at the crate root so callers can write
// `tapkey_core::Rule` instead of `tapkey_core::rule::Rule`.
pub use event::{KeyAction, KeyCode, KeyEvent, KeyStroke};
pub use matcher::GestureMatcher;
pub use rule::{Rule, RuleParseError};
