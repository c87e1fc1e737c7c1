//! Positional cursor over a header string.
//!
//! The cursor keeps a `[from, to)` window. [`HeaderCursor::next`] slides the
//! window forward by exactly `len` characters; fields are never located by
//! scanning for delimiters.

use super::dec;
use crate::error::{Data64Error, Result};
use crate::settings::Settings;

/// Cursor used by version rules to read header fields into a [`Settings`].
pub struct HeaderCursor<'a> {
    input: &'a str,
    settings: &'a mut Settings,
    from: usize,
    to: usize,
}

impl<'a> HeaderCursor<'a> {
    /// Create a cursor whose first window is `[0, to)`.
    pub fn new(input: &'a str, settings: &'a mut Settings, to: usize) -> Self {
        Self {
            input,
            settings,
            from: 0,
            to,
        }
    }

    /// The current window, or `None` if it runs past the end of the input.
    pub fn get(&self) -> Option<&'a str> {
        self.input.get(self.from..self.to)
    }

    /// Move the window start to the current end and extend it by `len`.
    pub fn next(&mut self, len: usize) {
        self.from = self.to;
        self.to += len;
    }

    /// The `len` characters after the current window, without moving.
    pub fn peek(&self, len: usize) -> Option<&'a str> {
        self.input.get(self.to..self.to.checked_add(len)?)
    }

    /// Start of the current window; after parsing, this is the payload offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.from
    }

    /// The full input being parsed.
    #[inline]
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// The settings being populated.
    #[inline]
    pub fn settings(&mut self) -> &mut Settings {
        &mut *self.settings
    }

    /// Advance over `literal.len()` characters and report whether they match.
    pub fn literal(&mut self, literal: &str) -> bool {
        self.next(literal.len());
        self.get() == Some(literal)
    }

    /// Advance over a fixed-width hex field and decode it.
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::InvalidHeader`] if the field is short or not hex.
    pub fn read_hex(&mut self, len: usize, field: &str) -> Result<u8> {
        self.next(len);
        let raw = self.get().ok_or_else(|| {
            Data64Error::InvalidHeader(format!(
                "{} field truncated at offset {}",
                field, self.from
            ))
        })?;
        dec(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Format;

    #[test]
    fn test_window_moves_positionally() {
        let mut settings = Settings::new(Format::None, None);
        let mut cursor = HeaderCursor::new("SV03F1", &mut settings, 2);

        assert_eq!(cursor.get(), Some("SV"));
        cursor.next(2);
        assert_eq!(cursor.get(), Some("03"));
        assert_eq!(cursor.position(), 2);
        assert!(cursor.literal("F"));
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_get_past_end_is_none() {
        let mut settings = Settings::new(Format::None, None);
        let mut cursor = HeaderCursor::new("SV0", &mut settings, 2);
        cursor.next(2);
        assert_eq!(cursor.get(), None);
    }

    #[test]
    fn test_read_hex() {
        let mut settings = Settings::new(Format::None, None);
        let mut cursor = HeaderCursor::new("SVff", &mut settings, 2);
        assert_eq!(cursor.read_hex(2, "version").unwrap(), 255);
    }

    #[test]
    fn test_read_hex_truncated() {
        let mut settings = Settings::new(Format::None, None);
        let mut cursor = HeaderCursor::new("SV3", &mut settings, 2);
        let err = cursor.read_hex(2, "version").unwrap_err();
        assert!(err.to_string().contains("version field truncated"));
    }

    #[test]
    fn test_peek_does_not_move() {
        let mut settings = Settings::new(Format::None, None);
        let mut cursor = HeaderCursor::new("SV03F1", &mut settings, 2);
        cursor.next(2);
        assert_eq!(cursor.peek(2), Some("F1"));
        assert_eq!(cursor.peek(3), None);
        assert_eq!(cursor.position(), 2);
        assert!(cursor.literal("F"));
    }

    #[test]
    fn test_literal_mismatch_keeps_position() {
        let mut settings = Settings::new(Format::None, None);
        let mut cursor = HeaderCursor::new("SV03abc", &mut settings, 2);
        cursor.next(2);
        assert!(!cursor.literal("F"));
        assert_eq!(cursor.position(), 4);
    }
}
