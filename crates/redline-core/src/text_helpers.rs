//! Char-offset text helpers.
//!
//! Every offset in this crate counts Unicode scalar values (chars), never
//! bytes. These helpers convert between the two and find word boundaries.

use std::ops::Range;

/// Length of `s` in chars.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the char at `char_offset`, or `s.len()` for the end
/// position. Returns None past the end.
pub fn char_to_byte(s: &str, char_offset: usize) -> Option<usize> {
    s.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(s.len()))
        .nth(char_offset)
}

/// Slice `s` by a char range. Returns None if the range is reversed or out
/// of bounds.
pub fn char_slice(s: &str, range: Range<usize>) -> Option<&str> {
    if range.start > range.end {
        return None;
    }
    let start = char_to_byte(s, range.start)?;
    let end = char_to_byte(s, range.end)?;
    Some(&s[start..end])
}

/// Characters that belong to a word for boundary snapping: letters, digits,
/// apostrophes (straight and curly) and hyphens.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '\'' | '\u{2019}' | '-')
}

/// Expand `range` outward to the enclosing word boundaries.
///
/// Walks left from `range.start` and right from `range.end` while the
/// neighbouring char is a word char.
pub fn word_bounds(chars: &[char], range: Range<usize>) -> Range<usize> {
    let mut start = range.start.min(chars.len());
    let mut end = range.end.min(chars.len());

    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }

    start..end
}
