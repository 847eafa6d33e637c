//! Integration tests for the tapkey-core gesture pipeline.
//!
//! These tests exercise the public API end to end: rule strings are parsed
//! with [`Rule::parse`], fed into a [`GestureMatcher`], and the matcher is
//! driven with realistic event timings.

use std::time::Duration;

use tapkey_core::{GestureMatcher, KeyAction, KeyCode, KeyEvent, KeyStroke, Rule};

const DEFAULT_RULES: &[&str] = &[
    "press:leftctrl,release:leftctrl=press:esc,release:esc",
    "press:capslock,release:capslock=press:esc,release:esc",
];

const ESC: KeyCode = KeyCode::new(1);
const LEFTCTRL: KeyCode = KeyCode::new(29);
const CAPSLOCK: KeyCode = KeyCode::new(58);
const KEY_A: KeyCode = KeyCode::new(30);

fn default_matcher() -> GestureMatcher {
    let rules: Vec<Rule> = DEFAULT_RULES
        .iter()
        .map(|s| Rule::parse(s).expect("default rule must parse"))
        .collect();
    GestureMatcher::new(rules, Duration::from_millis(1000))
}

fn at(action: KeyAction, code: KeyCode, millis: u64) -> KeyEvent {
    KeyEvent::new(action, code, Duration::from_millis(millis))
}

#[test]
fn test_ctrl_tap_emits_escape_sequence() {
    let mut matcher = default_matcher();

    assert!(matcher.observe(at(KeyAction::Press, LEFTCTRL, 0)).is_empty());
    let matched = matcher.observe(at(KeyAction::Release, LEFTCTRL, 50));

    assert_eq!(matched.len(), 1);
    assert_eq!(
        matched[0].actions(),
        &[
            KeyStroke::new(KeyAction::Press, ESC),
            KeyStroke::new(KeyAction::Release, ESC),
        ]
    );
}

#[test]
fn test_capslock_tap_uses_second_default_rule() {
    let mut matcher = default_matcher();

    assert!(matcher.observe(at(KeyAction::Press, CAPSLOCK, 0)).is_empty());
    let matched = matcher.observe(at(KeyAction::Release, CAPSLOCK, 80));

    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].actions()[0].code, ESC);
}

#[test]
fn test_held_ctrl_chord_does_not_trigger_remap() {
    // Ctrl held while typing: the interleaved keystrokes keep the trailing
    // window from ever equalling [press ctrl, release ctrl].
    let mut matcher = default_matcher();

    assert!(matcher.observe(at(KeyAction::Press, LEFTCTRL, 0)).is_empty());
    assert!(matcher.observe(at(KeyAction::Press, KEY_A, 120)).is_empty());
    assert!(matcher.observe(at(KeyAction::Release, KEY_A, 200)).is_empty());
    assert!(matcher.observe(at(KeyAction::Release, LEFTCTRL, 300)).is_empty());
}

#[test]
fn test_consecutive_taps_fire_repeatedly() {
    let mut matcher = default_matcher();

    assert!(matcher.observe(at(KeyAction::Press, LEFTCTRL, 0)).is_empty());
    assert_eq!(matcher.observe(at(KeyAction::Release, LEFTCTRL, 60)).len(), 1);
    assert!(matcher.observe(at(KeyAction::Press, LEFTCTRL, 400)).is_empty());
    assert_eq!(matcher.observe(at(KeyAction::Release, LEFTCTRL, 480)).len(), 1);
}

#[test]
fn test_parse_failure_reports_offending_rule_text() {
    let err = Rule::parse("press:leftctrl,release:leftctrl").unwrap_err();
    assert!(err.to_string().contains("press:leftctrl,release:leftctrl"));
}
