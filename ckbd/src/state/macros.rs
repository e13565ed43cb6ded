//! Macro: an ordered action sequence triggered by a key combination
//! (spec.md §3 "Macro"). Grounded on `usb.h`'s `keymacro`/`macroaction`.

use crate::keymap::{KEY_BITMAP_BYTES, N_KEYS};

pub const MACRO_MAX: usize = 1024;

/// A single recorded key event within a macro's action sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroAction {
    pub scancode: u16,
    pub down: bool,
}

/// Fixed-width bitset over the key matrix, used both for a macro's trigger
/// combo and for raw key-state reports (spec.md §3, §9 "keep as a
/// fixed-width bitset sized to N_KEYS rounded up to a byte").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyBitmap(pub [u8; KEY_BITMAP_BYTES]);

impl KeyBitmap {
    pub fn set(&mut self, key: usize) {
        if key < N_KEYS {
            self.0[key / 8] |= 1 << (key % 8);
        }
    }

    pub fn get(&self, key: usize) -> bool {
        key < N_KEYS && (self.0[key / 8] & (1 << (key % 8))) != 0
    }

    /// True if every bit set in `self` is also set in `other` (used to test
    /// whether a macro's trigger combo is currently fully held).
    pub fn is_subset_of(&self, other: &KeyBitmap) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a & b == *a)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

#[derive(Debug, Clone)]
pub struct Macro {
    pub actions: Vec<MacroAction>,
    pub combo: KeyBitmap,
    /// Transient: true while the combo is held and the macro has already
    /// fired once, so the event path doesn't refire on every tick.
    pub triggered: bool,
}

impl Macro {
    pub fn new(combo: KeyBitmap, actions: Vec<MacroAction>) -> Self {
        Self {
            actions,
            combo,
            triggered: false,
        }
    }
}
