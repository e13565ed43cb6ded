//! Modification-tracked identity (spec.md §3 "usbid"). Grounded on
//! `usb.h`'s `usbid { char guid[16]; char modified[2]; }`.

/// A 16-byte identity plus a 16-bit modification counter. External tools
/// poll `modified` to detect dirty state (spec.md §3 invariant: "modification
/// counters monotonically increase on name or binding changes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbId {
    pub guid: [u8; 16],
    pub modified: u16,
}

impl Default for UsbId {
    fn default() -> Self {
        Self {
            guid: generate_guid(),
            modified: 0,
        }
    }
}

impl UsbId {
    /// Monotonically bump the modification counter. Wraps on overflow
    /// rather than panicking or saturating — spec.md only requires
    /// "monotonically increase", and a `u16` wraparound after 65536 edits
    /// to one mode/profile is an acceptable, documented limitation rather
    /// than a crash.
    pub fn bump_modified(&mut self) {
        self.modified = self.modified.wrapping_add(1);
    }
}

/// Generate a new pseudo-random GUID for a freshly created mode/profile.
/// Real hardware GUIDs are assigned by firmware on `hwsave`; this is purely
/// an in-memory identity used to distinguish modes/profiles before any
/// hardware round-trip, so a simple non-cryptographic generator is enough.
fn generate_guid() -> [u8; 16] {
    use std::cell::Cell;
    use std::time::{SystemTime, UNIX_EPOCH};

    thread_local! {
        static COUNTER: Cell<u64> = Cell::new(0);
    }

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let counter = COUNTER.with(|c| {
        let v = c.get();
        c.set(v.wrapping_add(1));
        v
    });

    let mut guid = [0u8; 16];
    guid[0..8].copy_from_slice(&seed.to_le_bytes());
    guid[8..16].copy_from_slice(&counter.to_le_bytes());
    guid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_modified_increments() {
        let mut id = UsbId::default();
        id.modified = 0;
        id.bump_modified();
        assert_eq!(id.modified, 1);
    }

    #[test]
    fn bump_modified_wraps_instead_of_panicking() {
        let mut id = UsbId::default();
        id.modified = u16::MAX;
        id.bump_modified();
        assert_eq!(id.modified, 0);
    }

    #[test]
    fn freshly_generated_ids_differ() {
        let a = UsbId::default();
        let b = UsbId::default();
        assert_ne!(a.guid, b.guid);
    }
}
