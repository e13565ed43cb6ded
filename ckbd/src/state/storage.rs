//! Storage table: serial-keyed settings that survive unplug (spec.md §3
//! "Storage entry"). Grounded on `usb.h`'s `usbsetting` plus `findstore`/
//! `addstore` from `devnode.c`'s `readcmd`.

use std::collections::HashMap;

use crate::state::profile::Profile;

pub const SERIAL_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct StorageEntry {
    pub serial: String,
    pub profile: Profile,
}

impl StorageEntry {
    fn new(serial: String) -> Self {
        Self {
            serial,
            profile: Profile::new(),
        }
    }
}

/// Entries are created lazily on first mention and outlive unplug
/// (spec.md §3 "Lifecycle").
#[derive(Debug, Default)]
pub struct StorageTable {
    entries: HashMap<String, StorageEntry>,
}

impl StorageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, serial: &str) -> Option<&StorageEntry> {
        self.entries.get(serial)
    }

    pub fn get_mut(&mut self, serial: &str) -> Option<&mut StorageEntry> {
        self.entries.get_mut(serial)
    }

    /// Find an existing entry or create a fresh one (spec.md §4.3: the
    /// `device <serial>` verb "if serial is unknown, create storage entry").
    pub fn get_or_create(&mut self, serial: &str) -> &mut StorageEntry {
        self.entries
            .entry(serial.to_string())
            .or_insert_with(|| StorageEntry::new(serial.to_string()))
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.entries.contains_key(serial)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let mut table = StorageTable::new();
        table.get_or_create("ABCDEF0123456789ABCDEF0123456789").profile.name = "x".into();
        let entry = table.get_or_create("ABCDEF0123456789ABCDEF0123456789");
        assert_eq!(entry.profile.name, "x");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_serial_is_absent_until_created() {
        let table = StorageTable::new();
        assert!(table.get("nope").is_none());
    }

    #[test]
    fn entries_survive_independently() {
        let mut table = StorageTable::new();
        table.get_or_create("a");
        table.get_or_create("b");
        assert_eq!(table.len(), 2);
    }
}
