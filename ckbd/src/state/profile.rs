//! Profile: an ordered list of modes plus the currently-selected one
//! (spec.md §3 "Profile"). Grounded on `usb.h`'s `usbprofile`.

use crate::error::{DaemonError, Result};
use crate::state::mode::Mode;
use crate::state::usbid::UsbId;

pub const MODE_MAX: usize = 16;
pub const PR_NAME_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct Profile {
    pub modes: Vec<Mode>,
    /// Index into `modes`, not a pointer (spec.md §9: "an owning list of
    /// modes plus a separate index into it avoids an internal
    /// self-reference that is hard to model in languages with strict
    /// aliasing").
    pub current_mode: usize,
    pub name: String,
    pub id: UsbId,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            modes: vec![Mode::new()],
            current_mode: 0,
            name: String::new(),
            id: UsbId::default(),
        }
    }
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mode currently selected for commit (spec.md §3 invariant: always
    /// one of `modes[0..modecount]`, never dangling).
    pub fn current_mode(&self) -> &Mode {
        &self.modes[self.current_mode]
    }

    pub fn current_mode_mut(&mut self) -> &mut Mode {
        &mut self.modes[self.current_mode]
    }

    /// Get mode `index`, creating it (and any gap before it, up to
    /// `MODE_MAX`) if absent. Returns `None` if `index` is out of range or
    /// the profile is already at capacity.
    pub fn get_or_create_mode(&mut self, index: usize) -> Result<usize> {
        if index >= MODE_MAX {
            return Err(DaemonError::ModeCapacityExceeded { max: MODE_MAX });
        }
        while self.modes.len() <= index {
            if self.modes.len() >= MODE_MAX {
                return Err(DaemonError::ModeCapacityExceeded { max: MODE_MAX });
            }
            self.modes.push(Mode::new());
        }
        Ok(index)
    }

    /// Clear all modes, recreating a fresh mode 0 and selecting it
    /// (spec.md §4.3 `eraseprofile`).
    pub fn erase(&mut self) {
        self.modes.clear();
        self.modes.push(Mode::new());
        self.current_mode = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_profile_has_one_valid_mode() {
        let profile = Profile::new();
        assert_eq!(profile.modes.len(), 1);
        assert_eq!(profile.current_mode, 0);
    }

    #[test]
    fn get_or_create_extends_modes() {
        let mut profile = Profile::new();
        let idx = profile.get_or_create_mode(3).unwrap();
        assert_eq!(idx, 3);
        assert_eq!(profile.modes.len(), 4);
    }

    #[test]
    fn get_or_create_beyond_cap_errors() {
        let mut profile = Profile::new();
        assert!(profile.get_or_create_mode(MODE_MAX).is_err());
    }

    #[test]
    fn erase_profile_reseats_current_mode_invariant() {
        let mut profile = Profile::new();
        profile.get_or_create_mode(5).unwrap();
        profile.current_mode = 5;
        profile.erase();
        assert_eq!(profile.modes.len(), 1);
        assert_eq!(profile.current_mode, 0);
        // Invariant: current_mode is always a valid index.
        let _ = profile.current_mode();
    }
}
