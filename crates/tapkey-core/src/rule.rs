//! The rule model and its textual parser.
//!
//! A rule pairs a *pattern* sequence (the gesture the user types) with an
//! *action* sequence (the keystrokes tapkey emits when the gesture
//! completes).  The textual form is
//!
//! ```text
//! press:leftctrl,release:leftctrl=press:esc,release:esc
//! └────────── patterns ─────────┘ └─────── actions ────┘
//! ```
//!
//! Grammar:
//!
//! ```text
//! rule    := patterns "=" actions
//! patterns, actions := token ("," token)*
//! token   := action ":" keyname
//! action  := "press" | "release"
//! ```
//!
//! Key names resolve through the static [`keymap`](crate::keymap) table.
//! Parsing is total and deterministic: the same string always yields the
//! same `Rule` or the same error, and every error names the token that
//! caused it.

use thiserror::Error;

use crate::event::{KeyAction, KeyStroke};
use crate::keymap;

/// Error type for rule string parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleParseError {
    /// The rule has no `=` separating patterns from actions.
    #[error("rule {0:?} is missing the '=' between patterns and actions")]
    MissingSeparator(String),

    /// A side of the `=` contains no tokens.
    #[error("rule {0:?} has an empty pattern or action sequence")]
    EmptySequence(String),

    /// A token has no `:` between action and key name.
    #[error("token {0:?} is missing the ':' between action and key name")]
    MalformedToken(String),

    /// The action part of a token is not `press` or `release`.
    #[error("unknown action {0:?} (expected \"press\" or \"release\")")]
    UnknownAction(String),

    /// The key name does not resolve to a known key code.
    #[error("unknown key name {0:?}")]
    UnknownKeyName(String),
}

/// A single remap rule: when `patterns` is typed as a rapid gesture, emit
/// `actions`.
///
/// Immutable once constructed; `patterns` is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    patterns: Vec<KeyStroke>,
    actions: Vec<KeyStroke>,
}

impl Rule {
    /// Parses a rule from its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`RuleParseError`] naming the offending token if the string
    /// does not conform to the grammar or a key name is unknown.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tapkey_core::Rule;
    ///
    /// let rule = Rule::parse("press:capslock,release:capslock=press:esc,release:esc")
    ///     .expect("valid rule");
    /// assert_eq!(rule.patterns().len(), 2);
    /// assert_eq!(rule.actions().len(), 2);
    /// ```
    pub fn parse(s: &str) -> Result<Self, RuleParseError> {
        let (patterns, actions) = s
            .split_once('=')
            .ok_or_else(|| RuleParseError::MissingSeparator(s.to_string()))?;
        let patterns = parse_sequence(s, patterns)?;
        let actions = parse_sequence(s, actions)?;
        Ok(Self { patterns, actions })
    }

    /// The gesture to recognise, in the order it must be typed.
    pub fn patterns(&self) -> &[KeyStroke] {
        &self.patterns
    }

    /// The keystrokes to emit when the gesture completes, in emission order.
    pub fn actions(&self) -> &[KeyStroke] {
        &self.actions
    }

    /// The final element of the pattern — the index key used by the matcher.
    pub fn last_pattern(&self) -> KeyStroke {
        // Non-emptiness is enforced by parse_sequence.
        self.patterns[self.patterns.len() - 1]
    }
}

/// Parses one comma-separated side of a rule.  `rule` is the full rule
/// string, carried along for error reporting only.
fn parse_sequence(rule: &str, side: &str) -> Result<Vec<KeyStroke>, RuleParseError> {
    if side.is_empty() {
        return Err(RuleParseError::EmptySequence(rule.to_string()));
    }
    side.split(',').map(parse_token).collect()
}

fn parse_token(token: &str) -> Result<KeyStroke, RuleParseError> {
    let (action, key) = token
        .split_once(':')
        .ok_or_else(|| RuleParseError::MalformedToken(token.to_string()))?;
    let action = match action {
        "press" => KeyAction::Press,
        "release" => KeyAction::Release,
        other => return Err(RuleParseError::UnknownAction(other.to_string())),
    };
    let code = keymap::lookup(key).ok_or_else(|| RuleParseError::UnknownKeyName(key.to_string()))?;
    Ok(KeyStroke::new(action, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeyCode;

    const CTRL_TAP: &str = "press:leftctrl,release:leftctrl=press:esc,release:esc";

    #[test]
    fn test_parse_ctrl_tap_rule() {
        let rule = Rule::parse(CTRL_TAP).expect("rule should parse");

        let ctrl = KeyCode::new(29);
        let esc = KeyCode::new(1);
        assert_eq!(
            rule.patterns(),
            &[
                KeyStroke::new(KeyAction::Press, ctrl),
                KeyStroke::new(KeyAction::Release, ctrl),
            ]
        );
        assert_eq!(
            rule.actions(),
            &[
                KeyStroke::new(KeyAction::Press, esc),
                KeyStroke::new(KeyAction::Release, esc),
            ]
        );
        assert_eq!(rule.last_pattern(), KeyStroke::new(KeyAction::Release, ctrl));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = Rule::parse(CTRL_TAP).expect("rule should parse");
        let b = Rule::parse(CTRL_TAP).expect("rule should parse");
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        let err = Rule::parse("press:leftctrl,release:leftctrl").unwrap_err();
        assert!(matches!(err, RuleParseError::MissingSeparator(_)));
    }

    #[test]
    fn test_parse_rejects_empty_side() {
        let err = Rule::parse("=press:esc").unwrap_err();
        assert!(matches!(err, RuleParseError::EmptySequence(_)));
        let err = Rule::parse("press:esc=").unwrap_err();
        assert!(matches!(err, RuleParseError::EmptySequence(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let err = Rule::parse("tap:leftctrl=press:esc").unwrap_err();
        assert_eq!(err, RuleParseError::UnknownAction("tap".to_string()));
    }

    #[test]
    fn test_parse_rejects_unknown_key_name() {
        let err = Rule::parse("press:bogokey=press:esc").unwrap_err();
        assert_eq!(err, RuleParseError::UnknownKeyName("bogokey".to_string()));
    }

    #[test]
    fn test_parse_rejects_token_without_colon() {
        let err = Rule::parse("leftctrl=press:esc").unwrap_err();
        assert_eq!(err, RuleParseError::MalformedToken("leftctrl".to_string()));
    }

    #[test]
    fn test_error_messages_echo_offending_input() {
        let err = Rule::parse("press:bogokey=press:esc").unwrap_err();
        assert!(err.to_string().contains("bogokey"));
        let err = Rule::parse("nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
