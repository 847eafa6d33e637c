//! The event multiplexer: one blocking wait over every input source.
//!
//! A single epoll set holds, at any moment:
//!
//! | source                | on ready                                      |
//! |-----------------------|-----------------------------------------------|
//! | keyboard fd (0..N)    | drain events, decode `EV_KEY` press/release   |
//! | udev monitor socket   | drain notifications, add/remove keyboards     |
//! | signalfd (INT, TERM)  | clean shutdown (`next_event` returns `None`)  |
//!
//! The design is single-threaded and purely readiness-driven: the only
//! suspension point in the whole daemon is `epoll_wait` with no timeout.
//! Each ready source is drained completely before waiting again, so
//! backpressure is bounded by kernel buffer sizes.
//!
//! # Transient vs. fatal read errors
//!
//! A read failing with `ENODEV` means the keyboard was unplugged between
//! readiness and the read; the device is dropped with a warning and the
//! loop continues (the matching udev remove notification usually arrives a
//! moment later and is then a no-op).  Any other read error is propagated
//! as fatal.
//!
//! # Feedback exclusion
//!
//! The daemon's own uinput device is a keyboard as far as udev is
//! concerned.  [`EventMultiplexer::add_device`] refuses the output
//! device's path no matter how it arrives (initial scan or hotplug churn),
//! which is what prevents the daemon from reacting to its own output.

use std::collections::{HashMap, VecDeque};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use thiserror::Error;
use tracing::{debug, info, warn};

use tapkey_core::{KeyAction, KeyCode, KeyEvent};

use super::hotplug::{DeviceWatcher, HotplugAction, WatcherError};

/// Epoll user-data tokens for the two fixed sources; keyboards get
/// monotonically increasing tokens starting above these.
const TOKEN_HOTPLUG: u64 = 0;
const TOKEN_SIGNAL: u64 = 1;
const FIRST_DEVICE_TOKEN: u64 = 2;

/// Upper bound on ready sources handled per wait.  More than this simply
/// takes another (non-blocking) trip through `epoll_wait`.
const MAX_READY: usize = 16;

/// Error type for the multiplexer.  Everything here is fatal; transient
/// conditions are handled internally.
#[derive(Debug, Error)]
pub enum MultiplexError {
    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error("epoll operation failed: {0}")]
    Epoll(#[source] nix::errno::Errno),

    #[error("signalfd setup failed: {0}")]
    Signal(#[source] nix::errno::Errno),

    /// A read failure not attributable to device disappearance.
    #[error("fatal read error on {path}: {source}")]
    FatalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An open keyboard device under epoll monitoring.
struct MonitoredDevice {
    path: PathBuf,
    device: evdev::Device,
}

/// Result of draining one ready keyboard fd, computed while the registry
/// entry is borrowed and applied afterwards.
enum ReadOutcome {
    Events(Vec<KeyEvent>),
    DeviceGone,
    Fatal(PathBuf, std::io::Error),
}

/// Merges N keyboard devices, the hotplug watcher, and the shutdown
/// signals into one ordered stream of [`KeyEvent`]s.
pub struct EventMultiplexer {
    epoll: Epoll,
    watcher: DeviceWatcher,
    signal_fd: SignalFd,
    /// Live keyboards by epoll token.
    devices: HashMap<u64, MonitoredDevice>,
    next_token: u64,
    /// Decoded events not yet handed to the caller.
    pending: VecDeque<KeyEvent>,
    /// The uinput device's own node path, never monitored.
    output_path: PathBuf,
}

impl EventMultiplexer {
    /// Builds the epoll set with the watcher socket and a signalfd for
    /// SIGINT/SIGTERM registered.  No keyboards are monitored yet; call
    /// [`add_existing_devices`](Self::add_existing_devices) to seed them.
    ///
    /// # Errors
    ///
    /// Fails if the epoll instance, the signal mask, or the registrations
    /// cannot be set up.
    pub fn new(watcher: DeviceWatcher, output_path: PathBuf) -> Result<Self, MultiplexError> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC).map_err(MultiplexError::Epoll)?;

        // Route shutdown signals through the same epoll set instead of
        // async handlers; the signals must be blocked so they are only
        // delivered via the fd.
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGINT);
        mask.add(Signal::SIGTERM);
        mask.thread_block().map_err(MultiplexError::Signal)?;
        let signal_fd = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
            .map_err(MultiplexError::Signal)?;

        epoll
            .add(&watcher, EpollEvent::new(EpollFlags::EPOLLIN, TOKEN_HOTPLUG))
            .map_err(MultiplexError::Epoll)?;
        epoll
            .add(
                &signal_fd,
                EpollEvent::new(EpollFlags::EPOLLIN, TOKEN_SIGNAL),
            )
            .map_err(MultiplexError::Epoll)?;

        Ok(Self {
            epoll,
            watcher,
            signal_fd,
            devices: HashMap::new(),
            next_token: FIRST_DEVICE_TOKEN,
            pending: VecDeque::new(),
            output_path,
        })
    }

    /// Seeds the monitored set from the keyboards present at startup.
    ///
    /// # Errors
    ///
    /// Fails only on udev enumeration or epoll registration errors;
    /// individual devices that cannot be opened are skipped with a
    /// warning.
    pub fn add_existing_devices(&mut self) -> Result<(), MultiplexError> {
        for path in self.watcher.enumerate_existing()? {
            self.add_device(&path)?;
        }
        Ok(())
    }

    /// Blocks until the next keyboard event or shutdown.
    ///
    /// Returns `Ok(Some(event))` per decoded press/release, `Ok(None)` once
    /// a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns [`MultiplexError`] on fatal I/O failures; transient device
    /// errors are recovered internally.
    pub fn next_event(&mut self) -> Result<Option<KeyEvent>, MultiplexError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            let mut ready = [EpollEvent::empty(); MAX_READY];
            let count = match self.epoll.wait(&mut ready, EpollTimeout::NONE) {
                Ok(count) => count,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(errno) => return Err(MultiplexError::Epoll(errno)),
            };

            for slot in &ready[..count] {
                match slot.data() {
                    TOKEN_SIGNAL => {
                        self.drain_signal();
                        return Ok(None);
                    }
                    TOKEN_HOTPLUG => self.apply_hotplug()?,
                    token => self.drain_device(token)?,
                }
            }
        }
    }

    /// The node paths currently monitored (test and diagnostics hook).
    pub fn monitored_paths(&self) -> Vec<&Path> {
        self.devices.values().map(|d| d.path.as_path()).collect()
    }

    /// Opens and registers one keyboard.  The output device's own path and
    /// already-monitored paths are skipped; an open failure is a warning,
    /// not an error (permissions, or a race with disconnection).
    pub fn add_device(&mut self, path: &Path) -> Result<(), MultiplexError> {
        if path == self.output_path {
            debug!(path = %path.display(), "refusing to monitor own output device");
            return Ok(());
        }
        if self.devices.values().any(|d| d.path == path) {
            return Ok(());
        }

        let device = match evdev::Device::open(path) {
            Ok(device) => device,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not open input device");
                return Ok(());
            }
        };

        let token = self.next_token;
        self.next_token += 1;
        // SAFETY: the fd is owned by `device`, which outlives this borrow.
        let fd = unsafe { BorrowedFd::borrow_raw(device.as_raw_fd()) };
        self.epoll
            .add(fd, EpollEvent::new(EpollFlags::EPOLLIN, token))
            .map_err(MultiplexError::Epoll)?;
        info!(
            path = %path.display(),
            name = device.name().unwrap_or("?"),
            "monitoring keyboard"
        );
        self.devices.insert(
            token,
            MonitoredDevice {
                path: path.to_path_buf(),
                device,
            },
        );
        Ok(())
    }

    /// Unregisters the keyboard at `path`, if monitored.
    pub fn remove_device(&mut self, path: &Path) {
        let token = self
            .devices
            .iter()
            .find(|(_, d)| d.path == path)
            .map(|(token, _)| *token);
        if let Some(token) = token {
            self.drop_device(token);
        }
    }

    /// Drains all queued hotplug notifications, in delivery order.
    fn apply_hotplug(&mut self) -> Result<(), MultiplexError> {
        while let Some(notification) = self.watcher.next_notification() {
            match notification.action {
                HotplugAction::Added => self.add_device(&notification.path)?,
                HotplugAction::Removed => self.remove_device(&notification.path),
            }
        }
        Ok(())
    }

    /// Drains all readable events from one keyboard fd into `pending`.
    fn drain_device(&mut self, token: u64) -> Result<(), MultiplexError> {
        let outcome = {
            // A stale readiness slot can refer to a device removed earlier
            // in the same wait batch.
            let Some(entry) = self.devices.get_mut(&token) else {
                return Ok(());
            };
            match entry.device.fetch_events() {
                Ok(events) => ReadOutcome::Events(events.filter_map(decode_event).collect()),
                Err(err) => classify_read_error(&entry.path, err),
            }
        };

        match outcome {
            ReadOutcome::Events(events) => {
                self.pending.extend(events);
                Ok(())
            }
            ReadOutcome::DeviceGone => {
                // Unplugged between readiness and read; the udev remove
                // notification will find nothing left to do.
                self.drop_device(token);
                Ok(())
            }
            ReadOutcome::Fatal(path, source) => Err(MultiplexError::FatalRead { path, source }),
        }
    }

    /// Removes a device from the epoll set and the registry.
    fn drop_device(&mut self, token: u64) {
        if let Some(entry) = self.devices.remove(&token) {
            // Closing the fd would drop it from the set anyway; explicit
            // delete keeps the set and the registry in lockstep.
            // SAFETY: the fd stays open until `entry` drops below.
            let fd = unsafe { BorrowedFd::borrow_raw(entry.device.as_raw_fd()) };
            if let Err(errno) = self.epoll.delete(fd) {
                warn!(path = %entry.path.display(), error = %errno, "epoll delete failed");
            }
            info!(path = %entry.path.display(), "no longer monitoring keyboard");
        }
    }

    fn drain_signal(&mut self) {
        while let Ok(Some(siginfo)) = self.signal_fd.read_signal() {
            info!(signal = siginfo.ssi_signo, "shutdown signal received");
        }
    }
}

/// Classifies a failed device read.
///
/// `ENODEV` means the device vanished between readiness and the read,
/// which is recoverable by dropping it from the live set.  Anything else
/// is fatal.
fn classify_read_error(path: &Path, err: std::io::Error) -> ReadOutcome {
    if err.raw_os_error() == Some(nix::libc::ENODEV) {
        ReadOutcome::DeviceGone
    } else {
        ReadOutcome::Fatal(path.to_path_buf(), err)
    }
}

/// Decodes one raw evdev event into the domain model.
///
/// Non-key events (synchronization, LEDs, misc) and unrecognised values
/// (auto-repeat) are discarded here, before anything reaches the matcher.
fn decode_event(raw: evdev::InputEvent) -> Option<KeyEvent> {
    if raw.event_type() != evdev::EventType::KEY {
        return None;
    }
    let action = KeyAction::from_value(raw.value())?;
    let timestamp = raw
        .timestamp()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    Some(KeyEvent::new(action, KeyCode::new(raw.code()), timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_event_accepts_key_press_and_release() {
        let press = evdev::InputEvent::new(evdev::EventType::KEY.0, 29, 1);
        let decoded = decode_event(press).expect("press should decode");
        assert_eq!(decoded.action, KeyAction::Press);
        assert_eq!(decoded.code, KeyCode::new(29));

        let release = evdev::InputEvent::new(evdev::EventType::KEY.0, 29, 0);
        assert_eq!(
            decode_event(release).map(|e| e.action),
            Some(KeyAction::Release)
        );
    }

    #[test]
    fn test_decode_event_discards_auto_repeat() {
        let repeat = evdev::InputEvent::new(evdev::EventType::KEY.0, 29, 2);
        assert!(decode_event(repeat).is_none());
    }

    #[test]
    fn test_decode_event_discards_non_key_events() {
        let syn = evdev::InputEvent::new(evdev::EventType::SYNCHRONIZATION.0, 0, 0);
        assert!(decode_event(syn).is_none());
        let rel = evdev::InputEvent::new(evdev::EventType::RELATIVE.0, 0, 1);
        assert!(decode_event(rel).is_none());
    }

    #[test]
    fn test_device_gone_read_error_drops_the_device() {
        let err = std::io::Error::from_raw_os_error(nix::libc::ENODEV);
        let outcome = classify_read_error(Path::new("/dev/input/event3"), err);
        assert!(matches!(outcome, ReadOutcome::DeviceGone));
    }

    #[test]
    fn test_other_read_errors_are_fatal() {
        let err = std::io::Error::from_raw_os_error(nix::libc::EIO);
        let outcome = classify_read_error(Path::new("/dev/input/event3"), err);
        match outcome {
            ReadOutcome::Fatal(path, source) => {
                assert_eq!(path, PathBuf::from("/dev/input/event3"));
                assert_eq!(source.raw_os_error(), Some(nix::libc::EIO));
            }
            _ => panic!("non-ENODEV read error must be fatal"),
        }
    }

    #[test]
    fn test_output_device_path_is_never_monitored() {
        // Needs a udev netlink socket and an epoll fd, both of which are
        // available to unprivileged processes on any Linux box.
        let watcher = match DeviceWatcher::new() {
            Ok(watcher) => watcher,
            // No netlink in this sandbox; nothing to assert.
            Err(_) => return,
        };
        let output = PathBuf::from("/dev/input/event99");
        let mut mux =
            EventMultiplexer::new(watcher, output.clone()).expect("epoll setup should succeed");

        // Simulated add/remove churn for the output device's own identity.
        mux.add_device(&output).expect("add must not fail");
        assert!(mux.monitored_paths().is_empty());
        mux.remove_device(&output);
        mux.add_device(&output).expect("add must not fail");
        assert!(mux.monitored_paths().is_empty());
    }
}
