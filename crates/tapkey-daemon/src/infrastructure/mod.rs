//! Infrastructure layer for the daemon.
//!
//! Contains the OS-facing adapters: the uinput virtual keyboard, the udev
//! hotplug watcher, and the epoll event multiplexer.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `tapkey_core`, but MUST NOT be imported by the `application` layer or by
//! the core crate.
//!
//! # Sub-modules
//!
//! - **`uinput`** – The output emitter.  Creates the uinput virtual
//!   keyboard at startup (advertising exactly the keys used by rule
//!   actions) and implements the application layer's `KeySink` trait.
//!
//! - **`hotplug`** – The device watcher.  Listens on a udev netlink socket
//!   for `input` subsystem events and classifies them into keyboard
//!   add/remove notifications; also enumerates the keyboards already
//!   present at startup.
//!
//! - **`multiplexer`** – The event multiplexer.  A single epoll set over
//!   all live keyboard fds, the udev socket, and a signalfd; decodes
//!   `EV_KEY` events and applies hotplug changes as they arrive.

pub mod hotplug;
pub mod multiplexer;
pub mod uinput;
