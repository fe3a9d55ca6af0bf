//! Screen fingerprinting.
//!
//! The fingerprint is the classic 31-multiplier string hash over UTF-16 code
//! units with 32-bit wrapping arithmetic. Hosts that already fingerprint
//! their text this way produce identical values, so filter decisions can be
//! compared one-to-one against recorded sessions.

use narrator_core::types::{ScreenFingerprint, ScreenSnapshot};

/// Hash `text` into a [`ScreenFingerprint`].
pub fn fingerprint(text: &str) -> ScreenFingerprint {
    let hash = text
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    ScreenFingerprint(hash)
}

/// Fingerprint of the snapshot's narration text.
pub fn snapshot_fingerprint(snapshot: &ScreenSnapshot) -> ScreenFingerprint {
    fingerprint(snapshot.narration())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_hashes_to_zero() {
        assert_eq!(fingerprint(""), ScreenFingerprint(0));
    }

    #[test]
    fn test_known_values() {
        assert_eq!(fingerprint("a"), ScreenFingerprint(97));
        assert_eq!(fingerprint("ab"), ScreenFingerprint(97 * 31 + 98));
        assert_eq!(fingerprint("hello"), ScreenFingerprint(99_162_322));
        // Overflows and wraps negative.
        assert_eq!(fingerprint("Hello World"), ScreenFingerprint(-862_545_276));
    }

    #[test]
    fn test_hashes_utf16_code_units() {
        // U+1F600 is a surrogate pair: 0xD83D 0xDE00.
        let expected = 0xD83Di32.wrapping_mul(31).wrapping_add(0xDE00);
        assert_eq!(fingerprint("\u{1F600}"), ScreenFingerprint(expected));
        assert_eq!(fingerprint("é"), ScreenFingerprint(0xE9));
    }

    #[test]
    fn test_last_character_change_is_small_distance() {
        let a = fingerprint("Hello. World.");
        let b = fingerprint("Hello. World!");
        assert_eq!(a.distance(b), i32::from(b'.') - i32::from(b'!'));
    }

    #[test]
    fn test_snapshot_fingerprint_ignores_outer_whitespace() {
        let snapshot = ScreenSnapshot::new("Hello. World. ".to_string());
        assert_eq!(snapshot_fingerprint(&snapshot), fingerprint("Hello. World."));
    }
}
