//! tapkeyd entry point.
//!
//! Wires configuration, the uinput output device, the udev watcher, the
//! epoll multiplexer, and the remap use case together, then runs the
//! single-threaded event loop.
//!
//! # Startup order
//!
//! ```text
//! main()
//!  └─ Cli::parse() / Settings::resolve()   -- fatal on any config error
//!  └─ UinputKeySink::create()              -- fatal if uinput is denied
//!  └─ DeviceWatcher::new()                 -- udev netlink monitor
//!  └─ EventMultiplexer::new()              -- epoll + signalfd
//!       └─ add_existing_devices()          -- seed current keyboards
//!  └─ loop: next_event() -> handle_key_event()
//! ```
//!
//! The settings must be resolved *before* the output device is created:
//! the virtual keyboard advertises exactly the keys the rule actions use.
//! The output device must exist before the watcher seeds the monitored
//! set, so its own node path can be excluded from monitoring.
//!
//! # Exit status
//!
//! 0 after a signal-driven clean shutdown; non-zero (via `anyhow`) on
//! configuration errors or unrecoverable device failures.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tapkey_core::GestureMatcher;
use tapkey_daemon::application::remap_keys::RemapKeysUseCase;
use tapkey_daemon::config::{Cli, Settings};
use tapkey_daemon::infrastructure::hotplug::DeviceWatcher;
use tapkey_daemon::infrastructure::multiplexer::EventMultiplexer;
use tapkey_daemon::infrastructure::uinput::{advertised_keys, UinputKeySink};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::resolve(&cli).context("configuration error")?;
    info!(timeout_ms = settings.timeout.as_millis() as u64, "using gesture timeout");
    for rule in &settings.rules {
        info!(?rule, "adding rule");
    }

    let sink = UinputKeySink::create(&advertised_keys(&settings.rules))
        .context("cannot create virtual output device")?;
    let output_path = sink.path().to_path_buf();
    info!(path = %output_path.display(), "created uinput device");

    let watcher = DeviceWatcher::new().context("cannot start udev monitor")?;
    let mut multiplexer = EventMultiplexer::new(watcher, output_path)
        .context("cannot set up event multiplexer")?;
    multiplexer
        .add_existing_devices()
        .context("cannot enumerate existing keyboards")?;

    let matcher = GestureMatcher::new(settings.rules, settings.timeout);
    let mut remap = RemapKeysUseCase::new(matcher, sink);

    info!("tapkeyd ready");
    while let Some(event) = multiplexer.next_event()? {
        remap.handle_key_event(event)?;
    }

    // Devices, epoll set, and the uinput node are all released by drop.
    info!("tapkeyd stopped");
    Ok(())
}
