//! Header module - versioned header grammar.
//!
//! Every header starts with the version marker `SVvv`, where `SV` are
//! literal characters and `vv` is the version as two lowercase hex digits.
//! What follows is defined by the [`VersionRule`] registered for that version.
//!
//! ```text
//! header   := "SV" version ( "F" format ( "T" type )? )?
//! version  := 2 lowercase-hex digits
//! format   := 1 lowercase-hex digit
//! type     := 1 lowercase-hex digit
//! ```
//!
//! # Example
//!
//! ```
//! use data64::header::{self, HeaderFields};
//! use data64::{Format, ReturnType};
//!
//! let fields = HeaderFields {
//!     format: Format::Json,
//!     rtype: ReturnType::ArrObj,
//!     version: None,
//!     full_header: false,
//! };
//! assert_eq!(header::build(&fields).unwrap(), "SV03F1T1");
//! assert_eq!(header::detect("SV03F1T1eyJhIjoxfQ"), 3);
//! ```

mod cursor;
mod registry;
mod v3;

pub use cursor::HeaderCursor;
pub use registry::VersionRegistry;
pub use v3::{FORMAT_LEN, FORMAT_TAG, TYPE_LEN, TYPE_TAG, V3};

use crate::common::{Format, ReturnType};
use crate::error::{Data64Error, Result};
use crate::options::Options;
use crate::settings::Settings;

/// Literal version marker.
pub const MARKER: &str = "SV";

/// Width of the version field in hex digits.
pub const VERSION_LEN: usize = 2;

/// Rules for building and parsing the part of a header after `SVvv`.
pub trait VersionRule: Send + Sync {
    /// The version number this rule handles (1-255).
    fn version(&self) -> u8;

    /// Build the header suffix for the given fields.
    fn build(&self, fields: &HeaderFields) -> String;

    /// Parse the header suffix, storing the fields in the cursor's settings.
    ///
    /// On return, the cursor position must be the start of the payload.
    fn parse(&self, cursor: &mut HeaderCursor<'_>) -> Result<()>;
}

/// Inputs for building a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFields {
    /// Serialization format.
    pub format: Format,
    /// Return type.
    pub rtype: ReturnType,
    /// Version; `None` selects the newest registered one.
    pub version: Option<u8>,
    /// Emit every optional field.
    pub full_header: bool,
}

impl From<&Options> for HeaderFields {
    fn from(opts: &Options) -> Self {
        Self {
            format: opts.format,
            rtype: opts.rtype,
            version: opts.version,
            full_header: opts.full_header,
        }
    }
}

/// Render `number` as lowercase hex, zero-padded to `width` digits.
pub fn hex(number: u8, width: usize) -> String {
    format!("{:0width$x}", number, width = width)
}

/// Decode a fixed-width hex field.
///
/// # Errors
///
/// Returns [`Data64Error::InvalidHeader`] if `field` is empty, contains
/// non-hex characters, or does not fit in a byte.
pub fn dec(field: &str) -> Result<u8> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Data64Error::InvalidHeader(format!(
            "'{}' is not a hex field",
            field
        )));
    }
    u8::from_str_radix(field, 16).map_err(|e| Data64Error::InvalidHeader(e.to_string()))
}

/// The version marker for a version, e.g. `SV03`.
pub fn marker(version: u8) -> String {
    let mut m = String::with_capacity(MARKER.len() + VERSION_LEN);
    m.push_str(MARKER);
    m.push_str(&hex(version, VERSION_LEN));
    m
}

/// Build a header with the global registry.
///
/// # Errors
///
/// Returns [`Data64Error::UnsupportedVersion`] if the version is not registered.
pub fn build(fields: &HeaderFields) -> Result<String> {
    VersionRegistry::global().build(fields)
}

/// Parse a header with the global registry.
///
/// The returned settings hold `Format::None` and no return type for fields
/// absent from the header.
///
/// # Errors
///
/// Returns error if the header names an unsupported version or is malformed.
pub fn parse(input: &str) -> Result<Settings> {
    let mut settings = Settings::new(Format::None, None);
    VersionRegistry::global().parse(input, &mut settings)?;
    Ok(settings)
}

/// Detect a header version with the global registry (0 if none).
pub fn detect(input: &str) -> u8 {
    VersionRegistry::global().detect(input)
}
