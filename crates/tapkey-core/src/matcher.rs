//! The gesture matcher: sliding window, rule index, and debounce timeout.
//!
//! # How matching works
//!
//! ```text
//! incoming event        sliding window (capacity = longest pattern)
//! ──────────────        ──────────────────────────────────────────
//! release:leftctrl  ──> [ …, press:leftctrl, release:leftctrl ]
//!                                            │
//!                       index lookup by the *last* element ──┐
//!                                                            ▼
//!                       rules ending in release:leftctrl: compare each
//!                       rule's full pattern against the trailing slice
//!                       of the window; every exact match fires.
//! ```
//!
//! Per incoming event the matcher:
//!
//! 1. Appends the (action, key) pair to the window, evicting the oldest
//!    entry when full.  The window is *always* updated, even when step 2
//!    suppresses evaluation, so a later rapid sequence can still match
//!    against the recorded history.
//! 2. Compares the gap to the previous event against the debounce timeout.
//!    A gap at or above the timeout means this event is not part of a
//!    rapid gesture: no rule evaluation happens for it.
//! 3. Looks up candidate rules by the event's (action, key) pair — only
//!    rules whose pattern *ends* with this element can possibly complete
//!    now.
//! 4. Compares each candidate's pattern against the trailing slice of the
//!    window.  All matches are returned in rule-declaration order; rules
//!    are not mutually exclusive.
//!
//! # Timing is consecutive-pair, not whole-gesture
//!
//! Only the gap between *consecutive* events is checked, never the span
//! from the first to the last pattern element.  A long-held key followed
//! by a fast release can therefore complete a pattern whose earlier
//! elements are stale window history.  This is the intended semantics;
//! `test_stale_window_entry_can_complete_pattern` pins it down.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::event::{KeyEvent, KeyStroke};
use crate::rule::Rule;

/// Timing-aware sliding-window matcher over a fixed rule set.
///
/// Owned and mutated by a single thread; one instance per process.
pub struct GestureMatcher {
    rules: Vec<Rule>,
    /// Rules indexed by the final element of their pattern.  Each vector
    /// holds rule indices in declaration order.
    index: HashMap<KeyStroke, Vec<usize>>,
    /// The most recent (action, key) pairs, oldest first.
    window: VecDeque<KeyStroke>,
    /// Maximum pattern length over all rules.
    capacity: usize,
    timeout: Duration,
    /// Timestamp of the previously observed event.  `None` until the first
    /// event arrives, which guarantees the first event is never treated as
    /// part of a rapid gesture.
    previous_timestamp: Option<Duration>,
}

impl GestureMatcher {
    /// Builds a matcher over a fixed rule set.
    ///
    /// The rule set is expected to be non-empty (the daemon's configuration
    /// layer rejects an empty set before construction); an empty set yields
    /// a matcher that never matches.
    pub fn new(rules: Vec<Rule>, timeout: Duration) -> Self {
        let mut index: HashMap<KeyStroke, Vec<usize>> = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            index.entry(rule.last_pattern()).or_default().push(i);
        }
        let capacity = rules.iter().map(|r| r.patterns().len()).max().unwrap_or(0);
        Self {
            rules,
            index,
            window: VecDeque::with_capacity(capacity),
            capacity,
            timeout,
            previous_timestamp: None,
        }
    }

    /// The configured debounce timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Feeds one keyboard event through the matcher.
    ///
    /// Returns the rules whose gesture completed on this event, in
    /// rule-declaration order.  The returned vector is empty in the common
    /// case: the window was updated but nothing matched.
    pub fn observe(&mut self, event: KeyEvent) -> Vec<&Rule> {
        let stroke = event.stroke();
        if self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(stroke);

        // A clock that runs backwards (device timestamp skew) saturates to
        // a zero gap, which counts as "fast" — same outcome as a signed
        // comparison against a small negative delta.
        let gap = self
            .previous_timestamp
            .map(|prev| event.timestamp.saturating_sub(prev));
        self.previous_timestamp = Some(event.timestamp);

        let too_slow = match gap {
            Some(gap) => gap >= self.timeout,
            None => true,
        };
        if too_slow {
            return Vec::new();
        }

        let Some(candidates) = self.index.get(&stroke) else {
            return Vec::new();
        };
        candidates
            .iter()
            .map(|&i| &self.rules[i])
            .filter(|rule| self.window_ends_with(rule.patterns()))
            .collect()
    }

    /// Whether the trailing slice of the window equals `pattern`.
    ///
    /// A window holding fewer elements than the pattern never matches.
    fn window_ends_with(&self, pattern: &[KeyStroke]) -> bool {
        if self.window.len() < pattern.len() {
            return false;
        }
        let skip = self.window.len() - pattern.len();
        self.window.iter().skip(skip).eq(pattern.iter())
    }
}
