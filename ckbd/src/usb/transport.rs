/* USB transport boundary: UsbHandle/UsbTransport traits standing in for the
 * real hidraw backend, plus the production hidraw-backed implementation.
 * Grounded on ratbagd-rs's `driver::DeviceIo` (open/read/write/ioctl a hidraw
 * node) and `driver::DeviceDriver` (the trait the daemon core calls through). */
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::error::DaemonError;
use crate::usb::queue::{Message, MSG_SIZE};

/* One open device handle. The frame loop calls `poll` once per tick to pull
 * any pending interrupt report, and `write` to flush queued outbound
 * messages — both are plain blocking calls kept short by the kernel's
 * nonblocking hidraw mode, matching spec.md §4.5's single-threaded model. */
pub trait UsbHandle: Send {
    /* Non-blocking read of the next interrupt report, if any is queued by
     * the kernel. `Ok(None)` means nothing was waiting. */
    fn poll(&mut self) -> Result<Option<[u8; MSG_SIZE]>, DaemonError>;

    fn write(&mut self, msg: &Message) -> Result<(), DaemonError>;

    /* Round-trip a feature report (used by `hwload`/`hwsave`): write `req`,
     * then read back up to `MSG_SIZE` bytes of the device's reply. */
    fn request(&mut self, req: &Message) -> Result<[u8; MSG_SIZE], DaemonError>;
}

/* Enumerates and opens device nodes. The hotplug watcher hands this a path
 * discovered via udev; a test fixture hands it a synthetic path that never
 * touches the filesystem. */
pub trait UsbTransport: Send {
    fn open(&self, path: &Path) -> Result<Box<dyn UsbHandle>, DaemonError>;
}

/* Compute the HIDIOCGFEATURE(len) ioctl request number (Linux hidraw.h). */
fn hid_get_feature_req(len: usize) -> libc::c_ulong {
    let ioc_read_write: libc::c_ulong = 3;
    let ioc_type: libc::c_ulong = b'H' as libc::c_ulong;
    let ioc_nr: libc::c_ulong = 0x07;
    (ioc_read_write << 30) | (ioc_type << 8) | ioc_nr | ((len as libc::c_ulong) << 16)
}

fn hid_set_feature_req(len: usize) -> libc::c_ulong {
    let ioc_read_write: libc::c_ulong = 3;
    let ioc_type: libc::c_ulong = b'H' as libc::c_ulong;
    let ioc_nr: libc::c_ulong = 0x06;
    (ioc_read_write << 30) | (ioc_type << 8) | ioc_nr | ((len as libc::c_ulong) << 16)
}

pub struct HidrawHandle {
    file: File,
    path: PathBuf,
}

impl HidrawHandle {
    fn open(path: &Path) -> Result<Self, DaemonError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| DaemonError::Transport {
                device: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl UsbHandle for HidrawHandle {
    fn poll(&mut self) -> Result<Option<[u8; MSG_SIZE]>, DaemonError> {
        let mut buf = [0u8; MSG_SIZE];
        match self.file.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(source) => Err(DaemonError::Transport {
                device: self.path.display().to_string(),
                source,
            }),
        }
    }

    fn write(&mut self, msg: &Message) -> Result<(), DaemonError> {
        self.file
            .write_all(&msg.data)
            .map_err(|source| DaemonError::Transport {
                device: self.path.display().to_string(),
                source,
            })
    }

    fn request(&mut self, req: &Message) -> Result<[u8; MSG_SIZE], DaemonError> {
        let fd = self.file.as_raw_fd();
        let mut buf = req.data;

        let set_req = hid_set_feature_req(buf.len());
        /* SAFETY: `fd` is a valid open hidraw fd for the handle's lifetime;
         * `buf` is a live, correctly-sized buffer matching the length baked
         * into `set_req`. */
        let res = unsafe { libc::ioctl(fd, set_req, buf.as_ptr()) };
        if res < 0 {
            return Err(DaemonError::Transport {
                device: self.path.display().to_string(),
                source: std::io::Error::last_os_error(),
            });
        }

        let get_req = hid_get_feature_req(buf.len());
        /* SAFETY: same as above, with `buf` as a live mutable destination. */
        let res = unsafe { libc::ioctl(fd, get_req, buf.as_mut_ptr()) };
        if res < 0 {
            return Err(DaemonError::Transport {
                device: self.path.display().to_string(),
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(buf)
    }
}

pub struct HidrawTransport;

impl UsbTransport for HidrawTransport {
    fn open(&self, path: &Path) -> Result<Box<dyn UsbHandle>, DaemonError> {
        Ok(Box::new(HidrawHandle::open(path)?))
    }
}

/// A handle that never produces input and silently accepts writes — used
/// where a slot needs a placeholder handle before a real one is assigned,
/// and in unit tests that don't exercise transport behavior.
pub struct NullUsbHandle;

impl UsbHandle for NullUsbHandle {
    fn poll(&mut self) -> Result<Option<[u8; MSG_SIZE]>, DaemonError> {
        Ok(None)
    }

    fn write(&mut self, _msg: &Message) -> Result<(), DaemonError> {
        Ok(())
    }

    fn request(&mut self, _req: &Message) -> Result<[u8; MSG_SIZE], DaemonError> {
        Ok([0; MSG_SIZE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_poll_is_always_empty() {
        let mut h = NullUsbHandle;
        assert!(h.poll().unwrap().is_none());
    }

    #[test]
    fn null_handle_write_always_succeeds() {
        let mut h = NullUsbHandle;
        assert!(h.write(&Message::zeroed()).is_ok());
    }
}
