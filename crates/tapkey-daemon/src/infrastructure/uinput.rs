//! The output emitter: a uinput virtual keyboard.
//!
//! At startup the daemon creates one virtual input device through
//! `/dev/uinput` and keeps it for the process lifetime.  All synthesized
//! keystrokes are written to it; the kernel then delivers them to the
//! session exactly like events from a physical keyboard.
//!
//! # Why advertise only the rule-action keys?
//!
//! The device advertises exactly the set of key codes that appear in rule
//! actions, not the full keyboard key space.  Advertising every key makes
//! some desktop session layers silently drop the synthesized events; see
//! <https://gitlab.gnome.org/GNOME/mutter/-/issues/1869>.
//!
//! # Feedback exclusion
//!
//! The virtual device is itself an input device, so without care the daemon
//! would observe its own output.  [`UinputKeySink::path`] exposes the
//! device's node path; the multiplexer refuses to monitor that path.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use evdev::uinput::VirtualDevice;
use evdev::{AttributeSet, EventType, InputEvent};
use thiserror::Error;
use tracing::trace;

use tapkey_core::{KeyCode, KeyStroke};

use crate::application::remap_keys::{EmitError, KeySink};

/// Device name registered with the kernel, visible in `/proc/bus/input/devices`.
const DEVICE_NAME: &str = "tapkey virtual keyboard";

/// Error type for virtual output device creation.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The host denied virtual-device creation (missing `uinput` module,
    /// no write access to `/dev/uinput`).
    #[error("cannot create uinput virtual device: {0}")]
    Unavailable(#[source] std::io::Error),

    /// The device was created but its node never appeared under
    /// `/dev/input`.
    #[error("uinput device created but no dev node found")]
    MissingNode,
}

/// The uinput-backed [`KeySink`] implementation.
pub struct UinputKeySink {
    device: VirtualDevice,
    path: PathBuf,
}

impl UinputKeySink {
    /// Creates the virtual keyboard, advertising exactly `advertised`.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Unavailable`] if the kernel refuses the
    /// device, [`OutputError::MissingNode`] if the dev node cannot be
    /// resolved afterwards.
    pub fn create(advertised: &BTreeSet<KeyCode>) -> Result<Self, OutputError> {
        let mut keys = AttributeSet::<evdev::KeyCode>::new();
        for key in advertised {
            keys.insert(evdev::KeyCode::new(key.code()));
        }

        let mut device = VirtualDevice::builder()
            .map_err(OutputError::Unavailable)?
            .name(DEVICE_NAME)
            .with_keys(&keys)
            .map_err(OutputError::Unavailable)?
            .build()
            .map_err(OutputError::Unavailable)?;

        let path = first_dev_node(&mut device)?;
        Ok(Self { device, path })
    }

    /// The OS identity of the virtual device, used by the multiplexer to
    /// exclude it from input monitoring.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn first_dev_node(device: &mut VirtualDevice) -> Result<PathBuf, OutputError> {
    let nodes = device
        .enumerate_dev_nodes_blocking()
        .map_err(OutputError::Unavailable)?;
    for node in nodes {
        return node.map_err(OutputError::Unavailable);
    }
    Err(OutputError::MissingNode)
}

impl KeySink for UinputKeySink {
    fn emit(&mut self, strokes: &[KeyStroke]) -> Result<(), EmitError> {
        let events: Vec<InputEvent> = strokes
            .iter()
            .map(|s| InputEvent::new(EventType::KEY.0, s.code.code(), s.action.value()))
            .collect();
        trace!(batch = events.len(), "injecting key events");
        // emit() appends the SYN_REPORT barrier after the batch.
        self.device.emit(&events)?;
        Ok(())
    }
}

/// Collects the set of key codes a rule set needs the output device to
/// advertise: every code appearing in any rule's actions.
pub fn advertised_keys(rules: &[tapkey_core::Rule]) -> BTreeSet<KeyCode> {
    rules
        .iter()
        .flat_map(|rule| rule.actions().iter().map(|stroke| stroke.code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapkey_core::Rule;

    #[test]
    fn test_advertised_keys_deduplicates_action_codes() {
        let rules = vec![
            Rule::parse("press:leftctrl,release:leftctrl=press:esc,release:esc")
                .expect("valid rule"),
            Rule::parse("press:capslock,release:capslock=press:esc,release:esc")
                .expect("valid rule"),
        ];

        let keys = advertised_keys(&rules);

        // Both rules emit only KEY_ESC.
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&KeyCode::new(1)));
    }

    #[test]
    fn test_advertised_keys_covers_all_action_codes() {
        let rules = vec![
            Rule::parse("press:leftctrl,release:leftctrl=press:esc,release:f1")
                .expect("valid rule"),
        ];

        let keys = advertised_keys(&rules);

        assert!(keys.contains(&KeyCode::new(1))); // KEY_ESC
        assert!(keys.contains(&KeyCode::new(59))); // KEY_F1
        // Pattern keys are not advertised.
        assert!(!keys.contains(&KeyCode::new(29)));
    }
}
