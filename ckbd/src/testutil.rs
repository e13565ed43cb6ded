//! In-memory fixtures for `UsbTransport`/`UsbHandle`/`HotplugSource`, used
//! by unit and integration tests so the daemon core never needs real
//! hardware. Mirrors the teacher's `dev-hooks`/`test_device.rs` synthetic
//! device idiom, renamed here to the `fixtures` feature. Only compiled with
//! `--features fixtures`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::error::DaemonError;
use crate::hotplug::HotplugEvent;
use crate::hotplug::HotplugSource;
use crate::usb::queue::{Message, MSG_SIZE};
use crate::usb::transport::{UsbHandle, UsbTransport};

/// JSON-describable synthetic keyboard, mirroring the teacher's
/// `TestDeviceSpec` shape but for Corsair's model/serial vocabulary
/// instead of mouse profiles/buttons/LEDs.
#[derive(Debug, Default, Deserialize)]
pub struct FixtureDeviceSpec {
    pub model: String,
    pub serial: String,
    #[serde(default)]
    pub devnode: String,
}

/// Shared inbox/outbox for one fixture device, so a test can push interrupt
/// reports in and inspect what the daemon wrote out.
#[derive(Debug, Default)]
struct FixtureChannel {
    inbound: VecDeque<[u8; MSG_SIZE]>,
    outbound: Vec<Message>,
}

pub struct FixtureUsbHandle {
    channel: Arc<Mutex<FixtureChannel>>,
}

impl UsbHandle for FixtureUsbHandle {
    fn poll(&mut self) -> Result<Option<[u8; MSG_SIZE]>, DaemonError> {
        Ok(self.channel.lock().unwrap().inbound.pop_front())
    }

    fn write(&mut self, msg: &Message) -> Result<(), DaemonError> {
        self.channel.lock().unwrap().outbound.push(*msg);
        Ok(())
    }

    fn request(&mut self, _req: &Message) -> Result<[u8; MSG_SIZE], DaemonError> {
        Ok([0; MSG_SIZE])
    }
}

/// A `UsbTransport` that serves whichever fixture channels were registered
/// under a given path, rather than opening a real hidraw node.
#[derive(Default, Clone)]
pub struct FixtureUsbTransport {
    channels: Arc<Mutex<std::collections::HashMap<PathBuf, Arc<Mutex<FixtureChannel>>>>>,
}

impl FixtureUsbTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixture device at `path` and return a handle the test can
    /// use to push inbound reports and inspect outbound ones.
    pub fn register(&self, path: &Path) -> FixtureHandleController {
        let channel = Arc::new(Mutex::new(FixtureChannel::default()));
        self.channels
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), channel.clone());
        FixtureHandleController { channel }
    }
}

impl UsbTransport for FixtureUsbTransport {
    fn open(&self, path: &Path) -> Result<Box<dyn UsbHandle>, DaemonError> {
        let channel = self
            .channels
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| DaemonError::Transport {
                device: path.display().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })?;
        Ok(Box::new(FixtureUsbHandle { channel }))
    }
}

/// Test-side controller for a registered fixture device.
pub struct FixtureHandleController {
    channel: Arc<Mutex<FixtureChannel>>,
}

impl FixtureHandleController {
    pub fn push_report(&self, bytes: [u8; MSG_SIZE]) {
        self.channel.lock().unwrap().inbound.push_back(bytes);
    }

    pub fn take_written(&self) -> Vec<Message> {
        std::mem::take(&mut self.channel.lock().unwrap().outbound)
    }
}

/// Channel-fed hotplug source for tests: the test pushes events, the
/// daemon polls them exactly as it would poll a real udev monitor.
#[derive(Default)]
pub struct FixtureHotplugSource {
    events: VecDeque<HotplugEvent>,
}

impl FixtureHotplugSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: HotplugEvent) {
        self.events.push_back(event);
    }

    /// Convenience: build and push an `Arrived` event from a JSON fixture
    /// spec, the same data shape a test file would hand-author.
    pub fn push_spec(&mut self, spec: &str) -> Result<(), serde_json::Error> {
        let parsed: FixtureDeviceSpec = serde_json::from_str(spec)?;
        let devnode = if parsed.devnode.is_empty() {
            PathBuf::from(format!("/fixture/{}", parsed.serial))
        } else {
            PathBuf::from(parsed.devnode)
        };
        self.events.push_back(HotplugEvent::Arrived {
            devnode,
            serial: parsed.serial,
            model: parsed.model,
        });
        Ok(())
    }
}

impl HotplugSource for FixtureHotplugSource {
    fn poll(&mut self) -> Option<HotplugEvent> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_transport_round_trips_writes_and_reads() {
        let transport = FixtureUsbTransport::new();
        let path = PathBuf::from("/fixture/dev0");
        let controller = transport.register(&path);

        let mut handle = transport.open(&path).unwrap();
        assert!(handle.poll().unwrap().is_none());

        controller.push_report([7; MSG_SIZE]);
        assert_eq!(handle.poll().unwrap().unwrap()[0], 7);

        handle.write(&Message::new([9; MSG_SIZE])).unwrap();
        let written = controller.take_written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].data[0], 9);
    }

    #[test]
    fn opening_unregistered_path_fails() {
        let transport = FixtureUsbTransport::new();
        assert!(transport.open(Path::new("/nope")).is_err());
    }

    #[test]
    fn fixture_hotplug_source_pushes_in_order() {
        let mut source = FixtureHotplugSource::new();
        source
            .push_spec(r#"{"model":"K70","serial":"abc123"}"#)
            .unwrap();
        match source.poll() {
            Some(HotplugEvent::Arrived { serial, model, .. }) => {
                assert_eq!(serial, "abc123");
                assert_eq!(model, "K70");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(source.poll().is_none());
    }
}
