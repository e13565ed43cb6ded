//! Per-model wire protocol seam (spec.md §1 Non-goals: exact byte layout is
//! out of scope). This module ships one concrete "identity" framing —
//! report id followed by the raw palette/bind bytes a real per-model driver
//! would instead pack into vendor-specific offsets — sufficient to drive the
//! write queue and exercise the frame loop without claiming firmware
//! fidelity. Grounded on `driver/mod.rs`'s per-protocol report builders.

use crate::state::mode::KeyLight;
use crate::usb::queue::{Message, MSG_SIZE};

/// Report id this crate uses for an RGB palette push. A real per-model
/// driver would branch on device model here; this crate does not.
const REPORT_ID_RGB: u8 = 0x01;
const REPORT_ID_FEATURE_REQUEST: u8 = 0x0e;
const REPORT_ID_SET_INPUT: u8 = 0x02;

/// The two input modes a device can be switched between (spec.md §1(a) and
/// §4.4 shutdown). Grounded on `usb.h`'s `#define IN_CORSAIR 0x40` /
/// `#define IN_HID 0x80`; these values are carried into the report this
/// crate builds even though the exact wire layout is out of scope (spec.md
/// §1 Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Vendor mode: the device stops acting as a standard HID keyboard and
    /// starts sending the raw key-state reports this daemon parses.
    Corsair,
    /// Standard HID mode: the stock OS driver can talk to the device again.
    /// Every device is switched back to this mode on shutdown (spec.md §4.4)
    /// so unplugging `ckbd` never leaves a keyboard silently unusable.
    Hid,
}

impl InputMode {
    fn wire_value(self) -> u8 {
        match self {
            InputMode::Corsair => 0x40,
            InputMode::Hid => 0x80,
        }
    }
}

/// Build the outbound message that switches a device's input mode
/// (spec.md §1(a): "switching each device into the vendor input mode").
pub fn encode_set_input_message(mode: InputMode) -> Message {
    let mut data = [0u8; MSG_SIZE];
    data[0] = REPORT_ID_SET_INPUT;
    data[1] = mode.wire_value();
    Message::new(data)
}

/// Build the outbound message that pushes one mode's lighting palette to
/// the device. Layout: `[report_id, r[0..24], g[0..24], b[0..24]]` — the
/// first 24 bytes (48 keys worth of nibbles) of each channel, truncated to
/// fit one 64-byte report; a faithful port would chunk this across several
/// reports the way the original's `updateleds` loop does.
pub fn encode_rgb_message(light: &KeyLight) -> Message {
    let mut data = [0u8; MSG_SIZE];
    data[0] = REPORT_ID_RGB;
    let chunk = (MSG_SIZE - 1) / 3;
    data[1..1 + chunk].copy_from_slice(&light.r[..chunk]);
    data[1 + chunk..1 + 2 * chunk].copy_from_slice(&light.g[..chunk]);
    data[1 + 2 * chunk..1 + 3 * chunk].copy_from_slice(&light.b[..chunk]);
    Message::new(data)
}

/// Build a feature-report request used by `hwload`/`hwsave` to ask the
/// device for its currently stored profile blob (spec.md §4.3). This crate
/// does not interpret the firmware's reply payload; it only demonstrates
/// the request/response round trip through `UsbHandle::request`.
pub fn encode_feature_request(slot_index: u8) -> Message {
    let mut data = [0u8; MSG_SIZE];
    data[0] = REPORT_ID_FEATURE_REQUEST;
    data[1] = slot_index;
    Message::new(data)
}
