//! Key index constants and the name -> index table used by the command
//! interpreter's key-selector grammar (`all`, `#<dec>`, `#x<hex>`, or a
//! keymap name). Grounded on `usb.h`'s `N_KEYS`-sized arrays; the exact
//! physical layout of a given keyboard model is out of scope (spec.md §1),
//! so this ships one representative US-ANSI layout large enough to exercise
//! every key-selector code path.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Total addressable keys. Sized so `N_KEYS / 8` (bitmap bytes) and
/// `N_KEYS / 2` (packed-palette bytes) are whole numbers.
pub const N_KEYS: usize = 144;

/// Bytes needed for a 1-bit-per-key bitmap.
pub const KEY_BITMAP_BYTES: usize = N_KEYS / 8;

/// Bytes needed for a 4-bit-per-key (one nibble) channel array.
pub const KEY_CHANNEL_BYTES: usize = N_KEYS / 2;

/// A name -> key-index table, as consulted by the interpreter when a word
/// in a colon-parameter's LHS isn't `all` or a `#`-prefixed numeric index.
pub struct Keymap {
    by_name: HashMap<&'static str, usize>,
}

impl Keymap {
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }
}

/// Representative US-ANSI layout. Real products would ship one table per
/// physical layout; that specificity is the out-of-scope "per-model wire
/// protocol" detail spec.md §1 carves out.
const NAMES: &[&str] = &[
    "esc", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "printscreen",
    "scrolllock", "pausebreak", "grave", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "minus",
    "equal", "backspace", "insert", "home", "pageup", "numlock", "numslash", "numstar", "numminus",
    "tab", "q", "w", "e", "r", "t", "y", "u", "i", "o", "p", "lbrace", "rbrace", "backslash", "delete",
    "end", "pagedown", "num7", "num8", "num9", "numplus", "caps", "a", "s", "d", "f", "g", "h", "j", "k",
    "l", "semicolon", "quote", "enter", "num4", "num5", "num6", "lshift", "z", "x", "c", "v", "b", "n",
    "m", "comma", "period", "slash", "rshift", "up", "num1", "num2", "num3", "numenter", "lctrl", "lwin",
    "lalt", "space", "ralt", "rwin", "rmenu", "rctrl", "left", "down", "right", "num0", "numdot", "mr",
    "m1", "m2", "m3", "lock", "light", "mute", "volup", "voldn", "stop", "prev", "play", "next", "g1",
    "g2", "g3", "g4", "g5", "g6", "g7", "g8", "g9", "g10", "g11", "g12", "g13", "g14", "g15", "g16",
    "g17", "g18",
];

fn build_keymap() -> Keymap {
    let mut by_name = HashMap::with_capacity(NAMES.len());
    for (i, name) in NAMES.iter().enumerate().take(N_KEYS) {
        by_name.insert(*name, i);
    }
    Keymap { by_name }
}

static KEYMAP: OnceLock<Keymap> = OnceLock::new();

pub fn keymap() -> &'static Keymap {
    KEYMAP.get_or_init(build_keymap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_key() {
        assert_eq!(keymap().lookup("g1"), Some(NAMES.iter().position(|n| *n == "g1").unwrap()));
    }

    #[test]
    fn lookup_unknown_key_is_none() {
        assert_eq!(keymap().lookup("not-a-key"), None);
    }

    #[test]
    fn all_names_fit_within_n_keys() {
        assert!(NAMES.len() <= N_KEYS);
    }
}
