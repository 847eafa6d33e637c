//! The device watcher: udev-based keyboard discovery and hotplug tracking.
//!
//! Two jobs:
//!
//! 1. **Initial scan** — enumerate the input devices already present when
//!    the daemon starts and pick out the keyboards.
//! 2. **Hotplug** — listen on a udev netlink socket for `input` subsystem
//!    events and classify each one as a keyboard add, a keyboard remove,
//!    or noise.
//!
//! # What makes a notification a keyboard?
//!
//! udev tags keyboard-capable devices with the `ID_INPUT_KEYBOARD=1`
//! property and gives real event sources a `/dev/input/event*` dev node.
//! A notification missing either is silently ignored — the input subsystem
//! produces plenty of transient pseudo-devices (the parent `input*` sysfs
//! nodes, accelerometers, lid switches) and none of them are errors.
//!
//! Notifications are classified strictly in the order udev delivered them;
//! there is no reordering or coalescing.

use std::ffi::OsStr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

/// The udev property marking keyboard-capable devices.
const KEYBOARD_PROPERTY: &str = "ID_INPUT_KEYBOARD";

/// Error type for udev watcher operations.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("cannot open udev monitor socket: {0}")]
    Monitor(#[source] std::io::Error),
    #[error("udev enumeration failed: {0}")]
    Enumerate(#[source] std::io::Error),
}

/// A classified hotplug notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotplugEvent {
    pub action: HotplugAction,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugAction {
    Added,
    Removed,
}

/// Watches the `input` subsystem for keyboard device add/remove.
pub struct DeviceWatcher {
    socket: udev::MonitorSocket,
}

impl DeviceWatcher {
    /// Opens the udev netlink monitor, filtered to the `input` subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Monitor`] if the socket cannot be opened.
    pub fn new() -> Result<Self, WatcherError> {
        let socket = udev::MonitorBuilder::new()
            .and_then(|b| b.match_subsystem("input"))
            .and_then(|b| b.listen())
            .map_err(WatcherError::Monitor)?;
        Ok(Self { socket })
    }

    /// Enumerates the keyboard dev nodes already present.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Enumerate`] if the udev query fails.
    pub fn enumerate_existing(&self) -> Result<Vec<PathBuf>, WatcherError> {
        let mut enumerator = udev::Enumerator::new().map_err(WatcherError::Enumerate)?;
        enumerator
            .match_subsystem("input")
            .map_err(WatcherError::Enumerate)?;
        enumerator
            .match_property(KEYBOARD_PROPERTY, "1")
            .map_err(WatcherError::Enumerate)?;
        let devices = enumerator.scan_devices().map_err(WatcherError::Enumerate)?;
        Ok(devices
            .filter_map(|device| device.devnode().map(Path::to_path_buf))
            .collect())
    }

    /// Drains one pending notification from the socket, if any.
    ///
    /// Non-blocking: the multiplexer calls this in a loop after the socket
    /// polls ready, until it returns `None`.  Notifications that do not
    /// describe a keyboard with a dev node classify to `None` internally
    /// and are skipped.
    pub fn next_notification(&mut self) -> Option<HotplugEvent> {
        loop {
            let event = self.socket.iter().next()?;
            let classified = classify(
                event.event_type(),
                event.property_value(KEYBOARD_PROPERTY),
                event.devnode(),
            );
            match classified {
                Some(hotplug) => return Some(hotplug),
                None => {
                    trace!(syspath = ?event.syspath(), "ignoring non-keyboard notification");
                    continue;
                }
            }
        }
    }
}

impl AsFd for DeviceWatcher {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: the netlink fd is owned by `self.socket` and stays open
        // for the lifetime of the returned borrow.
        unsafe { BorrowedFd::borrow_raw(self.socket.as_raw_fd()) }
    }
}

/// Classifies the relevant parts of a udev notification.
///
/// Returns `None` for anything that is not a keyboard add/remove with a dev
/// node; such notifications are expected and not an error.
fn classify(
    event_type: udev::EventType,
    keyboard_flag: Option<&OsStr>,
    devnode: Option<&Path>,
) -> Option<HotplugEvent> {
    let action = match event_type {
        udev::EventType::Add => HotplugAction::Added,
        udev::EventType::Remove => HotplugAction::Removed,
        _ => return None,
    };
    if keyboard_flag != Some(OsStr::new("1")) {
        return None;
    }
    let path = devnode?.to_path_buf();
    Some(HotplugEvent { action, path })
}
