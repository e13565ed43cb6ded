//! CLI argument parsing (spec.md §6 "CLI"). `clap` is used here the same
//! way `ratbagctl-rs/src/main.rs` uses it for its own flags; `ckbd` has a
//! single numeric flag but the capping/validation semantics are easiest to
//! express as a validator on the derive, matching the rest of this
//! workspace's argument-parsing idiom rather than hand-scanning `argv`.

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

const DEFAULT_ROOT_LINUX: &str = "/dev/input/ckb";
const DEFAULT_ROOT_OTHER: &str = "/tmp/ckb";

#[derive(Parser, Debug)]
#[command(name = "ckbd", version, about = "Corsair RGB keyboard driver daemon")]
struct RawArgs {
    /// Frame rate in Hz (1-60). Values above 60 are capped; the LED
    /// controller in these keyboards is locked to 60Hz.
    #[arg(long, default_value_t = 60)]
    fps: i32,

    /// Root directory for the device-node filesystem surface. Defaults to
    /// the platform path from spec.md §4.1; overridable for tests.
    #[arg(long)]
    root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub fps: u32,
    pub root: PathBuf,
}

impl Config {
    pub fn from_args() -> anyhow::Result<Self> {
        let raw = RawArgs::parse();
        Self::from_raw(raw.fps, raw.root)
    }

    fn from_raw(fps: i32, root: Option<PathBuf>) -> anyhow::Result<Self> {
        if fps <= 0 {
            anyhow::bail!("--fps must be a positive integer, got {fps}");
        }
        let fps = if fps > 60 {
            warn!("Requested {fps} FPS but capping at 60");
            60
        } else {
            fps as u32
        };

        let root = root.unwrap_or_else(default_root);
        Ok(Config { fps, root })
    }
}

#[cfg(target_os = "linux")]
fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT_LINUX)
}

#[cfg(not(target_os = "linux"))]
fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT_OTHER)
}
