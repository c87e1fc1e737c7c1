//! Per-stage metadata record.
//!
//! A [`Settings`] carries the format, return type and version found in (or
//! destined for) a header, plus the value under consideration at one
//! pipeline stage. Moving to the next stage produces a new record that
//! shares its predecessor through `prev`; linked records are never modified.

use std::sync::Arc;

use crate::common::{Format, ReturnType};
use crate::data::Data;
use crate::error::{Data64Error, Result};
use crate::header::{self, HeaderFields, VERSION_LEN};

/// Metadata record for one encode/decode stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Serialization format.
    pub format: Format,
    /// Return type, or `None` when the header carried no type field.
    pub rtype: Option<ReturnType>,
    version: u8,
    value: Data,
    offset: usize,
    prev: Option<Arc<Settings>>,
}

impl Settings {
    /// Create a record with no header version and an empty value.
    pub fn new(format: Format, rtype: impl Into<Option<ReturnType>>) -> Self {
        Self {
            format,
            rtype: rtype.into(),
            version: 0,
            value: Data::default(),
            offset: 0,
            prev: None,
        }
    }

    /// Consume this record, producing its successor with a new value.
    ///
    /// The successor keeps format, type and version, and holds `self` as `prev`.
    /// Cloning a record shares its chain instead of copying it.
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::InvalidOffset`] if `offset` does not fit `value`.
    pub fn next(self, value: Data, offset: usize) -> Result<Settings> {
        let mut next = Settings {
            format: self.format,
            rtype: self.rtype,
            version: self.version,
            value: Data::default(),
            offset: 0,
            prev: None,
        };
        next.set_value(value, offset)?;
        next.prev = Some(Arc::new(self));
        Ok(next)
    }

    /// Store a value, with the payload starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::InvalidOffset`] if `offset > 0` and the value is
    /// not text, or the offset is outside the text or not on a char boundary.
    pub fn set_value(&mut self, value: Data, offset: usize) -> Result<()> {
        if offset > 0 {
            let text = value.as_text().ok_or(Data64Error::InvalidOffset {
                offset,
                reason: "only text values can carry an offset",
            })?;
            if !text.is_char_boundary(offset) {
                return Err(Data64Error::InvalidOffset {
                    offset,
                    reason: "offset is outside the text",
                });
            }
        }
        self.value = value;
        self.offset = offset;
        Ok(())
    }

    /// The effective payload: the value with the header prefix removed.
    pub fn value(&self) -> Data {
        match self.text() {
            Some(text) if self.offset > 0 => Data::Text(text.to_string()),
            _ => self.value.clone(),
        }
    }

    /// The effective payload as text, if the value is text.
    pub fn text(&self) -> Option<&str> {
        self.value.as_text().map(|s| &s[self.offset..])
    }

    /// The stored value including any header prefix.
    #[inline]
    pub fn raw_value(&self) -> &Data {
        &self.value
    }

    /// Consume the record, returning the effective payload.
    pub fn into_value(self) -> Data {
        match self.value {
            Data::Text(mut s) if self.offset > 0 => {
                s.drain(..self.offset);
                Data::Text(s)
            }
            other => other,
        }
    }

    /// Payload offset within the stored value.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Header version (0 = no header was present).
    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Set the header version.
    #[inline]
    pub fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    /// The version as two lowercase hex digits.
    pub fn version_hex(&self) -> String {
        header::hex(self.version, VERSION_LEN)
    }

    /// Set the version from a hex string.
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::InvalidHeader`] if `hex` is not a valid byte in hex.
    pub fn set_version_hex(&mut self, hex: &str) -> Result<()> {
        self.version = header::dec(hex)?;
        Ok(())
    }

    /// The record this one superseded.
    #[inline]
    pub fn prev(&self) -> Option<&Settings> {
        self.prev.as_deref()
    }

    /// Iterate over this record and all predecessors, newest first.
    pub fn chain(&self) -> impl Iterator<Item = &Settings> {
        std::iter::successors(Some(self), |s| s.prev())
    }

    /// Build a header from this record's fields.
    ///
    /// A record with version 0 had no header, so the result is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::UnsupportedVersion`] if the version is not registered.
    pub fn make_header(&self, full_header: bool) -> Result<String> {
        if self.version == 0 {
            return Ok(String::new());
        }
        header::build(&HeaderFields {
            format: self.format,
            rtype: self.rtype.unwrap_or(ReturnType::Raw),
            version: Some(self.version),
            full_header,
        })
    }

    /// The header of this record.
    ///
    /// Returns the retained prefix when the value carries one, otherwise a
    /// header rebuilt from the fields.
    ///
    /// # Errors
    ///
    /// Returns error if the header has to be rebuilt for an unsupported version.
    pub fn header(&self) -> Result<String> {
        match self.value.as_text() {
            Some(text) if self.offset > 0 => Ok(text[..self.offset].to_string()),
            _ => self.make_header(false),
        }
    }
}
