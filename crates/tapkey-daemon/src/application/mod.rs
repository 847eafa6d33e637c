//! Application layer use cases for the daemon.
//!
//! - **`remap_keys`** – Feeds decoded keyboard events through the gesture
//!   matcher and plays the matched rule actions into a [`KeySink`]
//!   implementation injected at construction time.  The production sink is
//!   the uinput virtual keyboard in the infrastructure layer; tests inject
//!   a mock.
//!
//! **Dependency rule**: this layer depends on `tapkey_core` only.  It must
//! not import anything from `infrastructure`.
//!
//! [`KeySink`]: remap_keys::KeySink

pub mod remap_keys;
