//! Entry point (spec.md §6 "CLI"). Grounded on `main.c`'s `main()`: parse
//! flags, zero the umask so the device-node layer's mode bits land exactly
//! as given, scan for already-attached devices, then hand off to the frame
//! loop until a signal asks it to stop.

use ckbd::config::Config;
use ckbd::daemon::Daemon;
use ckbd::hotplug::UdevHotplugSource;
use ckbd::usb::transport::HidrawTransport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_args()?;

    // The original runs with `umask(0)` so `mkdir`/`mkfifo` mode bits land
    // exactly as requested rather than being masked by the caller's shell
    // (spec.md §4.1).
    nix::sys::stat::umask(nix::sys::stat::Mode::empty());

    let transport = Box::new(HidrawTransport);
    let hotplug = Box::new(
        UdevHotplugSource::new()
            .map_err(|e| anyhow::anyhow!("failed to open udev hidraw monitor: {e}"))?,
    );

    let mut daemon = Daemon::new(config.root, config.fps, transport, hotplug)?;
    daemon.seed_existing_devices();
    daemon.run().await?;

    Ok(())
}
