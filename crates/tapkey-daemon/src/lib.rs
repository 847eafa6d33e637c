//! tapkey-daemon library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # How the daemon is put together
//!
//! ```text
//! /dev/input/event* ──┐
//! /dev/input/event* ──┤   epoll    ┌─ keyboard fd ready ─> decode EV_KEY
//! udev netlink ───────┼──────────> ┤  udev ready ────────> add/remove device
//! signalfd ───────────┘  (blocks)  └─ signal ready ──────> clean shutdown
//!                                        │
//!                              KeyEvent  ▼
//!                        GestureMatcher (tapkey-core)
//!                                        │ matched rule actions
//!                                        ▼
//!                          uinput virtual keyboard + SYN
//! ```
//!
//! The whole daemon is a single thread.  The only suspension point is the
//! multiplexer's `epoll_wait`; matching and emission run to completion
//! between waits.  There is no shared mutable state because there is
//! nothing to share it with.

/// Configuration: CLI arguments, optional TOML settings file, defaults.
pub mod config;

/// Application layer: the remap use case over an abstract key sink.
pub mod application;

/// Infrastructure layer: uinput output, udev hotplug, epoll multiplexing.
pub mod infrastructure;
