//! Raw key-state -> synthesized input events (spec.md §1(b): "receiving raw
//! key-state reports and synthesizing standard input events into the OS").
//! Grounded on `usb.h`'s `intinput[MSG_SIZE]`/`previntinput[N_KEYS/8]` pair:
//! the daemon diffs the freshly read bitmap against the previous one to find
//! press/release edges, rather than having the firmware report edges itself.

use tracing::warn;

use crate::input::InputSynth;
use crate::keymap::{KEY_BITMAP_BYTES, N_KEYS};
use crate::state::macros::KeyBitmap;
use crate::state::mode::{Binding, KeyBind};
use crate::usb::queue::MSG_SIZE;

/// Resolve the scancode synthesized for a pressed/released key, honoring a
/// per-key binding override (spec.md §4.3 `bind`/`unbind`/`rebind`).
/// `Binding::Disabled` keys never reach the OS at all; `Binding::Default`
/// passes the key's own index through as its scancode, since the exact
/// physical-layout scancode table is a per-model detail spec.md §1 carves
/// out of scope.
fn resolve_scancode(bind: &KeyBind, key: usize) -> Option<u16> {
    match bind.base[key] {
        Binding::Disabled => None,
        Binding::Default => Some(key as u16),
        Binding::Scancode(code) => Some(code),
    }
}

/// Extract the held-key bitmap from one interrupt-in report. The bitmap
/// occupies the report's first `KEY_BITMAP_BYTES` bytes, matching
/// `previntinput`'s sizing in the original.
fn bitmap_from_report(report: &[u8; MSG_SIZE]) -> KeyBitmap {
    let mut bits = [0u8; KEY_BITMAP_BYTES];
    bits.copy_from_slice(&report[..KEY_BITMAP_BYTES]);
    KeyBitmap(bits)
}

/// Process one interrupt-in report for a device: diff against `prev_keys`,
/// synthesize press/release events for every edge found, fire any macro
/// whose trigger combo newly becomes fully held, and reset macros whose
/// combo is no longer held so they can refire later (spec.md §3: "a
/// transient already-triggered flag used by the event path to avoid
/// refiring while held").
pub fn process_report(
    report: &[u8; MSG_SIZE],
    prev_keys: &mut KeyBitmap,
    bind: &mut KeyBind,
    synth: &mut dyn InputSynth,
) {
    let current = bitmap_from_report(report);

    for key in 0..N_KEYS {
        let was_down = prev_keys.get(key);
        let is_down = current.get(key);
        if was_down == is_down {
            continue;
        }
        let Some(scancode) = resolve_scancode(bind, key) else {
            continue;
        };
        let result = if is_down {
            synth.press(scancode)
        } else {
            synth.release(scancode)
        };
        if let Err(e) = result {
            warn!("input synth failed for scancode {scancode}: {e}");
        }
    }

    for m in bind.macros.iter_mut() {
        let fully_held = !m.combo.is_empty() && m.combo.is_subset_of(&current);
        if fully_held && !m.triggered {
            for action in &m.actions {
                let result = if action.down {
                    synth.press(action.scancode)
                } else {
                    synth.release(action.scancode)
                };
                if let Err(e) = result {
                    warn!("macro action failed for scancode {}: {e}", action.scancode);
                }
            }
            m.triggered = true;
        } else if !fully_held {
            m.triggered = false;
        }
    }

    if let Err(e) = synth.sync() {
        warn!("input synth sync failed: {e}");
    }

    *prev_keys = current;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NullInputSynth;
    use crate::state::macros::{Macro, MacroAction};

    fn report_with_keys(keys: &[usize]) -> [u8; MSG_SIZE] {
        let mut data = [0u8; MSG_SIZE];
        for &key in keys {
            data[key / 8] |= 1 << (key % 8);
        }
        data
    }

    #[test]
    fn press_then_release_emits_both_edges_once() {
        let mut prev = KeyBitmap::default();
        let mut bind = KeyBind::default();
        let mut synth = NullInputSynth;

        process_report(&report_with_keys(&[5]), &mut prev, &mut bind, &mut synth);
        assert!(prev.get(5));
        process_report(&report_with_keys(&[5]), &mut prev, &mut bind, &mut synth);
        assert!(prev.get(5));
        process_report(&report_with_keys(&[]), &mut prev, &mut bind, &mut synth);
        assert!(!prev.get(5));
    }

    #[test]
    fn disabled_binding_suppresses_the_key() {
        let mut prev = KeyBitmap::default();
        let mut bind = KeyBind::default();
        bind.base[5] = Binding::Disabled;
        let mut synth = NullInputSynth;
        process_report(&report_with_keys(&[5]), &mut prev, &mut bind, &mut synth);
        assert!(prev.get(5));
    }

    #[test]
    fn macro_fires_once_while_held_and_can_refire_after_release() {
        let mut prev = KeyBitmap::default();
        let mut bind = KeyBind::default();
        let mut combo = KeyBitmap::default();
        combo.set(1);
        combo.set(2);
        bind.macros.push(Macro::new(
            combo,
            vec![MacroAction { scancode: 30, down: true }, MacroAction { scancode: 30, down: false }],
        ));
        let mut synth = NullInputSynth;

        process_report(&report_with_keys(&[1, 2]), &mut prev, &mut bind, &mut synth);
        assert!(bind.macros[0].triggered);

        process_report(&report_with_keys(&[1, 2]), &mut prev, &mut bind, &mut synth);
        assert!(bind.macros[0].triggered);

        process_report(&report_with_keys(&[]), &mut prev, &mut bind, &mut synth);
        assert!(!bind.macros[0].triggered);
    }
}
