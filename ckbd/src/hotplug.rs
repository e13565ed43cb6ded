//! Hotplug notification boundary (spec.md §1 external collaborator:
//! "Hotplug notification"). Grounded on `dbus/mod.rs`'s `DeviceAction`
//! channel-consumer event loop, re-pointed at this daemon's own
//! arrival/departure vocabulary instead of DBus object registration.

use tracing::{info, warn};

/// Vendor/product ids this daemon recognizes (spec.md §1: Corsair
/// `0x1b1c`, K70 `0x1b13`, K95 `0x1b11`).
pub const VENDOR_CORSAIR: u16 = 0x1b1c;
pub const PRODUCT_K70: u16 = 0x1b13;
pub const PRODUCT_K95: u16 = 0x1b11;

#[derive(Debug, Clone)]
pub enum HotplugEvent {
    Arrived {
        devnode: std::path::PathBuf,
        serial: String,
        model: String,
    },
    Left {
        serial: String,
    },
}

/// A source of hotplug events. The production implementation watches udev;
/// a test fixture is a plain channel fed by the test itself.
pub trait HotplugSource: Send {
    /// Non-blocking poll for the next pending event (spec.md §4.5: the
    /// frame loop checks this once per tick, never blocks on it).
    fn poll(&mut self) -> Option<HotplugEvent>;

    /// Devices already attached when the daemon starts (spec.md §4.5: the
    /// initial device scan happens once, before the frame loop's first
    /// tick, so a keyboard plugged in before `ckbd` started is not missed).
    /// Default: none, which is correct for a fixture seeded explicitly by
    /// its test via `push`/`push_spec`.
    fn enumerate_existing(&mut self) -> Vec<HotplugEvent> {
        Vec::new()
    }
}

fn recognize(vendor: u16, product: u16) -> Option<&'static str> {
    if vendor != VENDOR_CORSAIR {
        return None;
    }
    match product {
        PRODUCT_K70 => Some("K70"),
        PRODUCT_K95 => Some("K95"),
        _ => None,
    }
}

/// Production hotplug source backed by a udev monitor on the `hidraw`
/// subsystem. Devices that don't match a recognized Corsair vendor/product
/// pair are logged and ignored (spec.md §4.5: "unsupported devices are
/// never assigned a slot").
pub struct UdevHotplugSource {
    socket: udev::MonitorSocket,
}

impl UdevHotplugSource {
    pub fn new() -> std::io::Result<Self> {
        let socket = udev::MonitorBuilder::new()?
            .match_subsystem("hidraw")?
            .listen()?;
        Ok(Self { socket })
    }

    /// Vendor/product/serial triple for a `hidraw` device, resolved by
    /// walking up to its parent `usb` device, if it matches a recognized
    /// Corsair model.
    fn identify(device: &udev::Device) -> Option<(String, String)> {
        let parent = device.parent_with_subsystem("usb").ok().flatten()?;

        let vendor = parent
            .attribute_value("idVendor")
            .and_then(|v| v.to_str())
            .and_then(|v| u16::from_str_radix(v, 16).ok())?;
        let product = parent
            .attribute_value("idProduct")
            .and_then(|v| v.to_str())
            .and_then(|v| u16::from_str_radix(v, 16).ok())?;

        let model = recognize(vendor, product)?;

        let serial = parent
            .attribute_value("serial")
            .and_then(|v| v.to_str())
            .unwrap_or("unknown")
            .to_string();

        Some((model.to_string(), serial))
    }

    fn parse_event(event: &udev::Event) -> Option<HotplugEvent> {
        let device = event.device();
        match event.event_type() {
            udev::EventType::Add => {
                let (model, serial) = Self::identify(&device)?;
                let devnode = device.devnode()?.to_path_buf();
                Some(HotplugEvent::Arrived { devnode, serial, model })
            }
            udev::EventType::Remove => {
                let (_, serial) = Self::identify(&device)?;
                Some(HotplugEvent::Left { serial })
            }
            _ => None,
        }
    }
}

impl HotplugSource for UdevHotplugSource {
    fn poll(&mut self) -> Option<HotplugEvent> {
        loop {
            let event = self.socket.iter().next()?;
            match Self::parse_event(&event) {
                Some(ev) => {
                    info!("hotplug: {ev:?}");
                    return Some(ev);
                }
                None => {
                    warn!("ignoring unrecognized hidraw hotplug event");
                    continue;
                }
            }
        }
    }

    /// Enumerate `hidraw` devices already present (spec.md §4.5), grounded
    /// on the original's `libusb_get_device_list` pre-scan in `main.c`
    /// before its hotplug callback is registered.
    fn enumerate_existing(&mut self) -> Vec<HotplugEvent> {
        let mut events = Vec::new();
        let mut enumerator = match udev::Enumerator::new() {
            Ok(e) => e,
            Err(e) => {
                warn!("udev enumeration unavailable: {e}");
                return events;
            }
        };
        if let Err(e) = enumerator.match_subsystem("hidraw") {
            warn!("udev enumeration filter failed: {e}");
            return events;
        }
        let devices = match enumerator.scan_devices() {
            Ok(d) => d,
            Err(e) => {
                warn!("udev enumeration scan failed: {e}");
                return events;
            }
        };
        for device in devices {
            let Some((model, serial)) = Self::identify(&device) else {
                continue;
            };
            let Some(devnode) = device.devnode() else {
                continue;
            };
            events.push(HotplugEvent::Arrived {
                devnode: devnode.to_path_buf(),
                serial,
                model,
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_corsair_models() {
        assert_eq!(recognize(VENDOR_CORSAIR, PRODUCT_K70), Some("K70"));
        assert_eq!(recognize(VENDOR_CORSAIR, PRODUCT_K95), Some("K95"));
    }

    #[test]
    fn rejects_other_vendors_and_products() {
        assert_eq!(recognize(0x046d, PRODUCT_K70), None);
        assert_eq!(recognize(VENDOR_CORSAIR, 0x0001), None);
    }
}
