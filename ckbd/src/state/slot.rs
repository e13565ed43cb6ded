//! Device table slots (spec.md §3 "Device slot" / "Device table").
//! Grounded on `usb.h`'s `usbdevice` plus the per-device `cmd` FIFO
//! maintained in `devnode.c`.

use std::path::PathBuf;

use crate::fifo::LineReader;
use crate::input::InputSynth;
use crate::state::macros::KeyBitmap;
use crate::state::usbid::UsbId;
use crate::usb::queue::WriteQueue;
use crate::usb::transport::UsbHandle;

pub const DEV_MAX: usize = 10;
pub const SERIAL_LEN: usize = 32;
pub const NAME_LEN: usize = 32;

/// One entry of the fixed-size device table. Slot 0 is always `Root`
/// (spec.md §3: "slot zero never holds a live device"); slots 1..DEV_MAX
/// hold `Device` once a physical keyboard occupies them.
pub enum DeviceSlot {
    Root {
        fifo: LineReader,
    },
    Device {
        /// Table index, 1..DEV_MAX — stable for the life of the slot.
        index: usize,
        usb_id: UsbId,
        model: String,
        serial: String,
        name: String,
        handle: Box<dyn UsbHandle>,
        /// Raw key bitmap from the most recently processed interrupt
        /// message, used for macro-combo edge detection (spec.md §5).
        prev_keys: KeyBitmap,
        indicator_leds: u8,
        fifo: LineReader,
        input_synth: Box<dyn InputSynth>,
        queue: WriteQueue,
    },
}

impl DeviceSlot {
    pub fn new_root() -> Self {
        DeviceSlot::Root {
            fifo: LineReader::new(),
        }
    }

    pub fn new_device(
        index: usize,
        usb_id: UsbId,
        model: String,
        serial: String,
        name: String,
        handle: Box<dyn UsbHandle>,
        input_synth: Box<dyn InputSynth>,
    ) -> Self {
        DeviceSlot::Device {
            index,
            usb_id,
            model,
            serial,
            name,
            handle,
            prev_keys: KeyBitmap::default(),
            indicator_leds: 0,
            fifo: LineReader::new(),
            input_synth,
            queue: WriteQueue::new(),
        }
    }

    pub fn is_device(&self) -> bool {
        matches!(self, DeviceSlot::Device { .. })
    }

    pub fn serial(&self) -> Option<&str> {
        match self {
            DeviceSlot::Root { .. } => None,
            DeviceSlot::Device { serial, .. } => Some(serial),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            DeviceSlot::Root { .. } => None,
            DeviceSlot::Device { name, .. } => Some(name),
        }
    }

    pub fn fifo(&self) -> &LineReader {
        match self {
            DeviceSlot::Root { fifo } => fifo,
            DeviceSlot::Device { fifo, .. } => fifo,
        }
    }

    pub fn fifo_mut(&mut self) -> &mut LineReader {
        match self {
            DeviceSlot::Root { fifo } => fifo,
            DeviceSlot::Device { fifo, .. } => fifo,
        }
    }

    /// Directory name this slot appears under beneath the root
    /// (spec.md §2: "slot N is presented at `<root>/ckbN`" except slot 0
    /// which owns the root directory itself).
    pub fn node_name(&self) -> String {
        match self {
            DeviceSlot::Root { .. } => String::new(),
            DeviceSlot::Device { index, .. } => format!("ckb{index}"),
        }
    }

    pub fn node_path(&self, root: &PathBuf) -> PathBuf {
        match self {
            DeviceSlot::Root { .. } => root.clone(),
            DeviceSlot::Device { .. } => root.join(self.node_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NullInputSynth;
    use crate::usb::transport::NullUsbHandle;

    #[test]
    fn root_slot_has_no_serial() {
        let slot = DeviceSlot::new_root();
        assert!(!slot.is_device());
        assert_eq!(slot.serial(), None);
    }

    #[test]
    fn device_slot_node_name_uses_table_index() {
        let slot = DeviceSlot::new_device(
            3,
            UsbId::default(),
            "K95".into(),
            "serial123".into(),
            "name".into(),
            Box::new(NullUsbHandle),
            Box::new(NullInputSynth),
        );
        assert!(slot.is_device());
        assert_eq!(slot.node_name(), "ckb3");
        assert_eq!(slot.serial(), Some("serial123"));
    }

    #[test]
    fn root_node_path_is_root_itself() {
        let slot = DeviceSlot::new_root();
        let root = PathBuf::from("/tmp/ckb");
        assert_eq!(slot.node_path(&root), root);
    }
}
