//! Device Node Layer (spec.md §4.1). Grounded on `devnode.c`'s
//! `mkdir`/`mkfifo`/`rmdevpath` functions (the `cmd` FIFO only —
//! spec.md's control surface has no separate notify channel).

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tracing::debug;

use crate::error::{DaemonError, Result};

const DIR_MODE: u32 = 0o755;
const FIFO_MODE: Mode = Mode::from_bits_truncate(0o666);
const ATTR_MODE: u32 = 0o444;

fn fs_err(path: &Path, source: std::io::Error) -> DaemonError {
    DaemonError::Filesystem {
        path: path.to_path_buf(),
        source,
    }
}

/// Create `<root>` (or `<root>/ckbN`) with its `cmd` FIFO (spec.md §4.1
/// "Directory layout"). The process runs with a zero umask (set once in
/// `main`) so these mode bits land exactly as given, matching the
/// original's `mkdir(path, S_READDIR)` / `mkfifo(fifopath, S_READWRITE)`.
pub fn create_device_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| fs_err(dir, e))?;
    fs::set_permissions(dir, fs::Permissions::from_mode(DIR_MODE))
        .map_err(|e| fs_err(dir, e))?;

    create_fifo(&dir.join("cmd"))?;
    debug!("created device node directory {}", dir.display());
    Ok(())
}

fn create_fifo(path: &Path) -> Result<()> {
    match mkfifo(path, FIFO_MODE) {
        Ok(()) => Ok(()),
        Err(Errno::EEXIST) => Ok(()),
        Err(e) => Err(fs_err(path, std::io::Error::from_raw_os_error(e as i32))),
    }
}

/// Write one static attribute file (`model`, `serial`, `connected`),
/// truncating any previous content, then make it read-only (spec.md §4.1:
/// "Data files r--r--r-- after writing"; matches the original's
/// `fclose(file); chmod(path, S_READ);` pattern). A pre-existing read-only
/// file from a prior write is restored to writable first so the rewrite
/// itself can land.
pub fn write_attr(dir: &Path, name: &str, value: &str) -> Result<()> {
    let path = dir.join(name);
    let _ = fs::set_permissions(&path, fs::Permissions::from_mode(0o644));
    fs::write(&path, format!("{value}\n")).map_err(|e| fs_err(&path, e))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(ATTR_MODE)).map_err(|e| fs_err(&path, e))
}

pub fn read_attr(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    fs::read_to_string(&path)
        .map(|s| s.trim_end().to_string())
        .map_err(|e| fs_err(&path, e))
}

/// Remove a device node directory and everything under it. Tolerates
/// `ENOENT`/`ENOTDIR` (spec.md §4.1: removal of an already-absent or
/// already-collapsed path is not an error — the end state is identical).
pub fn remove_device_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e)
            if e.kind() == std::io::ErrorKind::NotFound
                || e.raw_os_error() == Some(libc::ENOTDIR) =>
        {
            Ok(())
        }
        Err(e) => Err(fs_err(dir, e)),
    }
}

/// Path of the directory a slot (by table index) is presented at beneath
/// `root`. Slot 0 is the root directory itself.
pub fn slot_dir(root: &Path, index: usize) -> PathBuf {
    if index == 0 {
        root.to_path_buf()
    } else {
        root.join(format!("ckb{index}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_device_dir_makes_cmd_fifo() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("ckb1");
        create_device_dir(&dir).unwrap();
        assert!(dir.join("cmd").exists());
    }

    #[test]
    fn create_device_dir_is_idempotent() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("ckb1");
        create_device_dir(&dir).unwrap();
        create_device_dir(&dir).unwrap();
    }

    #[test]
    fn attr_round_trips() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        write_attr(&dir, "serial", "ABC123").unwrap();
        assert_eq!(read_attr(&dir, "serial").unwrap(), "ABC123");
    }

    #[test]
    fn remove_missing_dir_is_not_an_error() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("never-created");
        assert!(remove_device_dir(&dir).is_ok());
    }

    #[test]
    fn slot_dir_zero_is_root() {
        let root = PathBuf::from("/tmp/ckb");
        assert_eq!(slot_dir(&root, 0), root);
        assert_eq!(slot_dir(&root, 2), root.join("ckb2"));
    }
}
