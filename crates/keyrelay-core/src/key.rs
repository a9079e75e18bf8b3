// Keyrelay Key Type
// Linux input-event-codes.h key codes with named constants

use std::fmt;
use std::str::FromStr;

include!(concat!(env!("OUT_DIR"), "/key_codes.rs"));

/// Highest key code the kernel accepts (KEY_MAX)
pub const KEY_MAX: u16 = 0x2ff;

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    KEY_NAMES
        .binary_search_by_key(&code, |&(c, _)| c)
        .map(|idx| KEY_NAMES[idx].1)
        .unwrap_or("UNKNOWN")
}

/// Parse a key name to a key code.
///
/// Matching is case-insensitive and accepts the kernel spelling with a
/// `KEY_` prefix (`KEY_LEFTCTRL`) as well as the short names used here
/// (`LEFT_CTRL`, `ESC`).
pub fn key_from_name(name: &str) -> Option<Key> {
    let upper = name.trim().to_uppercase();
    if upper == "ESCAPE" {
        return Some(Key::ESC);
    }

    let lookup = |candidate: &str| {
        KEY_NAMES
            .iter()
            .find(|(_, n)| *n == candidate || n.replace('_', "") == candidate)
            .map(|&(code, _)| Key(code))
    };

    lookup(&upper).or_else(|| upper.strip_prefix("KEY_").and_then(lookup))
}
