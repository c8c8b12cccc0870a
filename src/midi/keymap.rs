//! Computer-keyboard to semitone mapping for live playing.
//!
//! The layout mirrors a two-row piano: the bottom letter row is the lower
//! octave (with its sharps on the home row), the top letter row continues
//! upward (with its sharps on the number row), and a handful of navigation
//! keys extend the range past the letter rows.

/// A physical input key, independent of the terminal backend.
///
/// `Char` values are stored lowercase; callers normalize before lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyId {
    /// A printable character key.
    Char(char),
    Enter,
    Backspace,
    Delete,
    End,
    PageUp,
    PageDown,
}

/// Fixed mapping from input key to semitone offset above the octave base.
///
/// Offsets 0-38 cover just over three octaves across the letter rows;
/// the trailing navigation keys reach the top of the playable range.
pub const KEY_OFFSETS: [(KeyId, u8); 44] = [
    // Bottom row: naturals of the first octave and a bit beyond.
    (KeyId::Char('z'), 0),
    (KeyId::Char('x'), 2),
    (KeyId::Char('c'), 4),
    (KeyId::Char('v'), 5),
    (KeyId::Char('b'), 7),
    (KeyId::Char('n'), 9),
    (KeyId::Char('m'), 11),
    (KeyId::Char(','), 12),
    (KeyId::Char('.'), 14),
    (KeyId::Char('/'), 16),
    // Home row: sharps for the bottom row.
    (KeyId::Char('s'), 1),
    (KeyId::Char('d'), 3),
    (KeyId::Char('g'), 6),
    (KeyId::Char('h'), 8),
    (KeyId::Char('j'), 10),
    (KeyId::Char('l'), 13),
    (KeyId::Char(';'), 15),
    // Top letter row: second octave upward.
    (KeyId::Char('q'), 17),
    (KeyId::Char('w'), 19),
    (KeyId::Char('e'), 21),
    (KeyId::Char('r'), 23),
    (KeyId::Char('t'), 24),
    (KeyId::Char('y'), 26),
    (KeyId::Char('u'), 28),
    (KeyId::Char('i'), 29),
    (KeyId::Char('o'), 31),
    (KeyId::Char('p'), 33),
    (KeyId::Char('['), 35),
    (KeyId::Char(']'), 36),
    (KeyId::Enter, 38),
    // Number row: sharps for the top letter row.
    (KeyId::Char('2'), 18),
    (KeyId::Char('3'), 20),
    (KeyId::Char('4'), 22),
    (KeyId::Char('6'), 25),
    (KeyId::Char('7'), 27),
    (KeyId::Char('9'), 30),
    (KeyId::Char('0'), 32),
    (KeyId::Char('-'), 34),
    (KeyId::Char('='), 37),
    // Extension keys above the letter rows.
    (KeyId::Backspace, 49),
    (KeyId::Delete, 52),
    (KeyId::End, 53),
    (KeyId::PageUp, 54),
    (KeyId::PageDown, 55),
];

/// Returns the semitone offset for a key, or None if the key plays no note.
pub fn semitone_offset(key: KeyId) -> Option<u8> {
    KEY_OFFSETS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, offset)| *offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_letter_row_offsets() {
        assert_eq!(semitone_offset(KeyId::Char('z')), Some(0));
        assert_eq!(semitone_offset(KeyId::Char('s')), Some(1));
        assert_eq!(semitone_offset(KeyId::Char('q')), Some(17));
        assert_eq!(semitone_offset(KeyId::Enter), Some(38));
    }

    #[test]
    fn test_extension_key_offsets() {
        assert_eq!(semitone_offset(KeyId::Backspace), Some(49));
        assert_eq!(semitone_offset(KeyId::PageDown), Some(55));
    }

    #[test]
    fn test_unmapped_keys() {
        assert_eq!(semitone_offset(KeyId::Char('a')), None);
        assert_eq!(semitone_offset(KeyId::Char('1')), None);
        assert_eq!(semitone_offset(KeyId::Char('5')), None);
    }

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<KeyId> = KEY_OFFSETS.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys.len(), KEY_OFFSETS.len());
    }

    #[test]
    fn test_letter_rows_are_contiguous() {
        // The two letter rows plus their sharps cover every semitone 0-38.
        let offsets: HashSet<u8> = KEY_OFFSETS.iter().map(|(_, o)| *o).collect();
        for semitone in 0..=38 {
            assert!(offsets.contains(&semitone), "missing offset {}", semitone);
        }
    }
}
