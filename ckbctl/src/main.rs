//! Thin filesystem client for `ckbd`'s control surface (spec.md §6,
//! SPEC_FULL.md §6). Grounded on `ratbagctl-rs`'s role as a companion CLI to
//! its daemon, but with no DBus involved: every subcommand here is a plain
//! read or write against the device-node tree `ckbd` maintains.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

const DEFAULT_ROOT_LINUX: &str = "/dev/input/ckb";
const DEFAULT_ROOT_OTHER: &str = "/tmp/ckb";

#[cfg(target_os = "linux")]
fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT_LINUX)
}

#[cfg(not(target_os = "linux"))]
fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT_OTHER)
}

#[derive(Parser, Debug)]
#[command(name = "ckbctl", version, about = "Command-line client for ckbd's control-language FIFOs")]
struct Cli {
    /// Root directory of the ckbd device-node tree. Defaults to the same
    /// platform path ckbd itself defaults to.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List currently attached devices (reads `<root>/connected`).
    List,
    /// Send one control-language command line to a device (resolves
    /// `<index-or-serial>` to its `cmd` FIFO and writes the joined words).
    Send {
        /// Either a decimal slot index (e.g. `1`) or a device serial.
        target: String,
        /// Command words, joined with a single space before being written.
        command: Vec<String>,
    },
    /// Print `model`/`serial` for one device slot, by index.
    Info {
        /// Decimal slot index (e.g. `1`).
        index: usize,
    },
}

/// A `<path> <serial> <name>` line from `<root>/connected` (spec.md §6,
/// `devnode.c`'s `updateconnected` format), split defensively: a serial or
/// name containing no spaces is the common case, but this never panics on a
/// line with unexpected spacing.
struct ConnectedLine {
    path: String,
    serial: String,
    name: String,
}

fn parse_connected_line(line: &str) -> Option<ConnectedLine> {
    let mut words = line.split_whitespace();
    let path = words.next()?.to_string();
    let serial = words.next().unwrap_or("").to_string();
    let name = words.collect::<Vec<_>>().join(" ");
    Some(ConnectedLine { path, serial, name })
}

fn read_connected(root: &Path) -> anyhow::Result<Vec<ConnectedLine>> {
    let contents = fs::read_to_string(root.join("connected"))
        .with_context(|| format!("reading {}", root.join("connected").display()))?;
    Ok(contents.lines().filter_map(parse_connected_line).collect())
}

fn list(root: &Path) -> anyhow::Result<()> {
    let lines = read_connected(root)?;
    if lines.is_empty() {
        println!("no devices attached");
        return Ok(());
    }
    for entry in lines {
        println!("{}\t{}\t{}", entry.path, entry.serial, entry.name);
    }
    Ok(())
}

/// Resolve `target` (a decimal slot index or a serial) to the slot
/// directory it lives under beneath `root`.
fn resolve_target(root: &Path, target: &str) -> anyhow::Result<PathBuf> {
    if let Ok(index) = target.parse::<usize>() {
        return Ok(root.join(format!("ckb{index}")));
    }
    let lines = read_connected(root)?;
    let found = lines
        .into_iter()
        .find(|entry| entry.serial == target)
        .with_context(|| format!("no attached device matches serial {target}"))?;
    Ok(PathBuf::from(found.path))
}

fn send(root: &Path, target: &str, words: &[String]) -> anyhow::Result<()> {
    if words.is_empty() {
        bail!("no command given");
    }
    let dir = resolve_target(root, target)?;
    let fifo = dir.join("cmd");
    let mut file = OpenOptions::new()
        .write(true)
        .open(&fifo)
        .with_context(|| format!("opening {}", fifo.display()))?;
    let line = words.join(" ");
    writeln!(file, "{line}").with_context(|| format!("writing to {}", fifo.display()))?;
    Ok(())
}

fn read_attr(dir: &Path, name: &str) -> anyhow::Result<String> {
    fs::read_to_string(dir.join(name))
        .map(|s| s.trim_end().to_string())
        .with_context(|| format!("reading {}", dir.join(name).display()))
}

fn info(root: &Path, index: usize) -> anyhow::Result<()> {
    let dir = root.join(format!("ckb{index}"));
    let model = read_attr(&dir, "model")?;
    let serial = read_attr(&dir, "serial")?;
    println!("model:  {model}");
    println!("serial: {serial}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let root = cli.root.unwrap_or_else(default_root);

    match cli.command {
        Commands::List => list(&root),
        Commands::Send { target, command } => send(&root, &target, &command),
        Commands::Info { index } => info(&root, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_connected_line() {
        let line = parse_connected_line("/dev/input/ckb/ckb1 ABC123 My Keyboard").unwrap();
        assert_eq!(line.path, "/dev/input/ckb/ckb1");
        assert_eq!(line.serial, "ABC123");
        assert_eq!(line.name, "My Keyboard");
    }

    #[test]
    fn parses_a_line_with_an_empty_name() {
        let line = parse_connected_line("/dev/input/ckb/ckb1 ABC123").unwrap();
        assert_eq!(line.serial, "ABC123");
        assert_eq!(line.name, "");
    }

    #[test]
    fn blank_line_is_skipped() {
        assert!(parse_connected_line("").is_none());
    }

    #[test]
    fn resolve_target_by_index_is_pure() {
        let root = PathBuf::from("/tmp/ckb");
        let dir = root.join("ckb3");
        assert_eq!(dir.file_name().unwrap(), "ckb3");
    }
}
