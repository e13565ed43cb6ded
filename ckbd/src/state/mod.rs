//! Device/profile/mode state (spec.md §3 "Data Model"). Grounded on
//! `usb.h`'s fixed-size device and profile tables.

pub mod macros;
pub mod mode;
pub mod profile;
pub mod slot;
pub mod storage;
pub mod usbid;

use std::path::PathBuf;

use slot::{DeviceSlot, DEV_MAX};
use storage::StorageTable;

/// Truncate `s` to at most `max_units` UTF-16 code units (spec.md §3: mode
/// and profile names are a fixed `unsigned short name[LEN]` array in the
/// original, i.e. UTF-16 storage, not bytes or `char`s). Truncating on a
/// code-unit boundary can split a surrogate pair; that matches the
/// original's plain array truncation, which has the same property.
pub fn truncate_name_utf16(s: &str, max_units: usize) -> String {
    let units: Vec<u16> = s.encode_utf16().take(max_units).collect();
    String::from_utf16_lossy(&units)
}

/// The fixed-size device table (spec.md's "Slot table" in the GLOSSARY):
/// slot 0 is always `DeviceSlot::Root`, slots `1..DEV_MAX` are populated as
/// hardware is plugged in and vacated on unplug.
pub struct SlotTable {
    slots: Vec<Option<DeviceSlot>>,
}

impl SlotTable {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(DEV_MAX);
        slots.push(Some(DeviceSlot::new_root()));
        for _ in 1..DEV_MAX {
            slots.push(None);
        }
        Self { slots }
    }

    pub fn get(&self, index: usize) -> Option<&DeviceSlot> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DeviceSlot> {
        self.slots.get_mut(index).and_then(|s| s.as_mut())
    }

    /// First vacant slot in `1..DEV_MAX`, the index a freshly arrived
    /// device is assigned to (spec.md §4.1: "the lowest free slot index").
    pub fn first_free(&self) -> Option<usize> {
        (1..DEV_MAX).find(|&i| self.slots[i].is_none())
    }

    pub fn occupy(&mut self, index: usize, slot: DeviceSlot) {
        self.slots[index] = Some(slot);
    }

    pub fn vacate(&mut self, index: usize) -> Option<DeviceSlot> {
        if index == 0 {
            return None;
        }
        self.slots[index].take()
    }

    pub fn find_by_serial(&self, serial: &str) -> Option<usize> {
        (1..DEV_MAX).find(|&i| {
            self.slots[i]
                .as_ref()
                .and_then(|s| s.serial())
                .map(|s| s == serial)
                .unwrap_or(false)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &DeviceSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut DeviceSlot)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|s| (i, s)))
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

/// All state owned by the frame loop (spec.md §5: "no `Arc<RwLock<_>>`
/// anywhere in the core" — a single owner, no shared access).
pub struct DaemonState {
    pub slots: SlotTable,
    pub storage: StorageTable,
    pub root: PathBuf,
    pub fps: u32,
}

impl DaemonState {
    pub fn new(root: PathBuf, fps: u32) -> Self {
        Self {
            slots: SlotTable::new(),
            storage: StorageTable::new(),
            root,
            fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NullInputSynth;
    use crate::state::usbid::UsbId;
    use crate::usb::transport::NullUsbHandle;

    #[test]
    fn fresh_table_has_only_root_occupied() {
        let table = SlotTable::new();
        assert!(table.get(0).is_some());
        assert!(!table.get(0).unwrap().is_device());
        for i in 1..DEV_MAX {
            assert!(table.get(i).is_none());
        }
    }

    #[test]
    fn first_free_skips_root_and_occupied_slots() {
        let mut table = SlotTable::new();
        assert_eq!(table.first_free(), Some(1));
        table.occupy(
            1,
            DeviceSlot::new_device(
                1,
                UsbId::default(),
                "K70".into(),
                "serial-a".into(),
                "name".into(),
                Box::new(NullUsbHandle),
                Box::new(NullInputSynth),
            ),
        );
        assert_eq!(table.first_free(), Some(2));
    }

    #[test]
    fn find_by_serial_locates_the_right_slot() {
        let mut table = SlotTable::new();
        table.occupy(
            2,
            DeviceSlot::new_device(
                2,
                UsbId::default(),
                "K95".into(),
                "serial-b".into(),
                "name".into(),
                Box::new(NullUsbHandle),
                Box::new(NullInputSynth),
            ),
        );
        assert_eq!(table.find_by_serial("serial-b"), Some(2));
        assert_eq!(table.find_by_serial("missing"), None);
    }

    #[test]
    fn vacate_root_is_a_no_op() {
        let mut table = SlotTable::new();
        assert!(table.vacate(0).is_none());
        assert!(table.get(0).is_some());
    }
}
