/* OS input synthesis boundary (spec.md §1 external collaborator: "OS input
 * synthesis"). Grounded on ratbagd-rs's `driver::DeviceIo` ioctl-wrapper
 * pattern (open a character device, set up a few ioctls, then read/write
 * fixed-size records) applied here to `/dev/uinput` instead of a hidraw
 * node. */
#[cfg(target_os = "linux")]
use std::fs::{File, OpenOptions};
#[cfg(target_os = "linux")]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

#[cfg(target_os = "linux")]
use tracing::{debug, warn};

use crate::error::DaemonError;

/* Emits synthesized key presses/releases to the host OS. The daemon calls
 * `press`/`release` once per edge detected against a device's raw key
 * bitmap (spec.md §4.5); it never constructs input events directly. */
pub trait InputSynth: Send {
    fn press(&mut self, scancode: u16) -> Result<(), DaemonError>;
    fn release(&mut self, scancode: u16) -> Result<(), DaemonError>;
    /// Flush a SYN_REPORT so the kernel delivers the batch of events above
    /// as one atomic input frame.
    fn sync(&mut self) -> Result<(), DaemonError>;
}

/// The production synth for the running platform: `uinput` on Linux, a
/// no-op elsewhere (spec.md §1: macOS `CGEvent` synthesis is an external
/// collaborator this crate does not implement). Falls back to the no-op
/// synth if `/dev/uinput` can't be opened, logging a warning rather than
/// failing the whole device attach over it.
#[cfg(target_os = "linux")]
pub fn default_synth() -> Box<dyn InputSynth> {
    match UinputSynth::open() {
        Ok(synth) => Box::new(synth),
        Err(e) => {
            warn!("falling back to no-op input synth: {e}");
            Box::new(NullInputSynth)
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn default_synth() -> Box<dyn InputSynth> {
    Box::new(NullInputSynth)
}

/// Does nothing. Used on non-Linux platforms and wherever a slot has not
/// yet been given a real synth (and in tests that don't assert on host
/// input side effects).
#[derive(Debug, Default)]
pub struct NullInputSynth;

impl InputSynth for NullInputSynth {
    fn press(&mut self, _scancode: u16) -> Result<(), DaemonError> {
        Ok(())
    }

    fn release(&mut self, _scancode: u16) -> Result<(), DaemonError> {
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DaemonError> {
        Ok(())
    }
}

#[cfg(target_os = "linux")]
mod uinput_ioctl {
    use nix::{ioctl_none, ioctl_write_int, ioctl_write_ptr};

    const UINPUT_IOCTL_BASE: u8 = b'U';

    ioctl_write_int!(ui_set_evbit, UINPUT_IOCTL_BASE, 100);
    ioctl_write_int!(ui_set_keybit, UINPUT_IOCTL_BASE, 101);
    ioctl_none!(ui_dev_create, UINPUT_IOCTL_BASE, 1);
    ioctl_none!(ui_dev_destroy, UINPUT_IOCTL_BASE, 2);

    #[repr(C)]
    pub struct UinputSetup {
        pub id: InputId,
        pub name: [u8; 80],
        pub ff_effects_max: u32,
    }

    #[repr(C)]
    #[derive(Default)]
    pub struct InputId {
        pub bustype: u16,
        pub vendor: u16,
        pub product: u16,
        pub version: u16,
    }

    ioctl_write_ptr!(ui_dev_setup, UINPUT_IOCTL_BASE, 3, UinputSetup);
}

#[cfg(target_os = "linux")]
#[repr(C)]
struct TimeVal {
    tv_sec: i64,
    tv_usec: i64,
}

#[cfg(target_os = "linux")]
#[repr(C)]
struct InputEvent {
    time: TimeVal,
    kind: u16,
    code: u16,
    value: i32,
}

#[cfg(target_os = "linux")]
const EV_KEY: u16 = 0x01;
#[cfg(target_os = "linux")]
const EV_SYN: u16 = 0x00;
#[cfg(target_os = "linux")]
const SYN_REPORT: u16 = 0;
#[cfg(target_os = "linux")]
const BUS_USB: u16 = 0x03;

/// Production implementation backed by the kernel's `/dev/uinput` virtual
/// input device, the standard way a userspace process injects key events on
/// Linux without root-only `/dev/input/eventN` write access to a real
/// device node.
#[cfg(target_os = "linux")]
pub struct UinputSynth {
    file: File,
}

#[cfg(target_os = "linux")]
impl UinputSynth {
    pub fn open() -> Result<Self, DaemonError> {
        use std::io::Write;

        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open("/dev/uinput")
            .map_err(|source| DaemonError::Transport {
                device: "/dev/uinput".into(),
                source,
            })?;
        let fd = file.as_raw_fd();

        /* SAFETY: `fd` is freshly opened and owned exclusively here; each
         * ioctl call matches the signature nix generated from the uinput
         * header's request numbers. */
        unsafe {
            uinput_ioctl::ui_set_evbit(fd, EV_KEY as i32).map_err(ioctl_err)?;
            for code in 0..crate::keymap::N_KEYS as i32 {
                uinput_ioctl::ui_set_keybit(fd, code).map_err(ioctl_err)?;
            }
        }

        let mut name = [0u8; 80];
        let label = b"ckbd virtual keyboard";
        name[..label.len()].copy_from_slice(label);
        let setup = uinput_ioctl::UinputSetup {
            id: uinput_ioctl::InputId {
                bustype: BUS_USB,
                vendor: 0x1b1c,
                product: 0x1b13,
                version: 1,
            },
            name,
            ff_effects_max: 0,
        };
        /* SAFETY: `setup` is a valid, fully-initialized C struct living on
         * this stack frame for the duration of the call. */
        unsafe {
            uinput_ioctl::ui_dev_setup(fd, &setup).map_err(ioctl_err)?;
            uinput_ioctl::ui_dev_create(fd).map_err(ioctl_err)?;
        }

        debug!("uinput virtual keyboard created");
        let _ = &file; // keep `file` alive; silence unused Write import on some paths
        let mut synth = Self { file };
        synth.write_event(EV_SYN, SYN_REPORT, 0)?;
        Ok(synth)
    }

    fn write_event(&mut self, kind: u16, code: u16, value: i32) -> Result<(), DaemonError> {
        use std::io::Write;
        let ev = InputEvent {
            time: TimeVal { tv_sec: 0, tv_usec: 0 },
            kind,
            code,
            value,
        };
        let bytes = unsafe {
            std::slice::from_raw_parts(
                &ev as *const InputEvent as *const u8,
                std::mem::size_of::<InputEvent>(),
            )
        };
        self.file
            .write_all(bytes)
            .map_err(|source| DaemonError::Transport {
                device: "/dev/uinput".into(),
                source,
            })
    }
}

#[cfg(target_os = "linux")]
fn ioctl_err(e: nix::errno::Errno) -> DaemonError {
    DaemonError::Transport {
        device: "/dev/uinput".into(),
        source: std::io::Error::from_raw_os_error(e as i32),
    }
}

#[cfg(target_os = "linux")]
impl InputSynth for UinputSynth {
    fn press(&mut self, scancode: u16) -> Result<(), DaemonError> {
        self.write_event(EV_KEY, scancode, 1)
    }

    fn release(&mut self, scancode: u16) -> Result<(), DaemonError> {
        self.write_event(EV_KEY, scancode, 0)
    }

    fn sync(&mut self) -> Result<(), DaemonError> {
        self.write_event(EV_SYN, SYN_REPORT, 0)
    }
}

#[cfg(target_os = "linux")]
impl Drop for UinputSynth {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        /* SAFETY: `fd` is still open and owned by `self.file`, destroyed
         * exactly once here. */
        if let Err(e) = unsafe { uinput_ioctl::ui_dev_destroy(fd) } {
            warn!("failed to destroy uinput device: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_synth_never_errors() {
        let mut synth = NullInputSynth;
        assert!(synth.press(30).is_ok());
        assert!(synth.release(30).is_ok());
        assert!(synth.sync().is_ok());
    }
}
