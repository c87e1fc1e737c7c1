//! Version 3 header rule.
//!
//! ```text
//! SVvvFfTt
//! ```
//!
//! - `vv` version, 2 hex digits (mandatory, handled by the registry)
//! - `f`  format, 1 hex digit (omitted for `Format::None`)
//! - `t`  type, 1 hex digit (omitted for `ReturnType::Raw` or `Format::Php`)
//!
//! Examples: `SV03F1T1` (JSON, ArrObj), `SV03F2` (PHP), `SV03` (no format).

use super::{hex, HeaderCursor, HeaderFields, VersionRule};
use crate::common::{Format, ReturnType};
use crate::error::Result;

/// Format field tag.
pub const FORMAT_TAG: &str = "F";
/// Format field width.
pub const FORMAT_LEN: usize = 1;
/// Type field tag.
pub const TYPE_TAG: &str = "T";
/// Type field width.
pub const TYPE_LEN: usize = 1;

/// The version 3 header rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct V3;

impl VersionRule for V3 {
    fn version(&self) -> u8 {
        3
    }

    fn build(&self, fields: &HeaderFields) -> String {
        let full = fields.full_header;
        let mut suffix = String::new();

        if full || fields.format != Format::None {
            suffix.push_str(FORMAT_TAG);
            suffix.push_str(&hex(fields.format.id(), FORMAT_LEN));

            if full || (fields.rtype != ReturnType::Raw && fields.format != Format::Php) {
                suffix.push_str(TYPE_TAG);
                suffix.push_str(&hex(fields.rtype.id(), TYPE_LEN));
            }
        }

        suffix
    }

    fn parse(&self, cursor: &mut HeaderCursor<'_>) -> Result<()> {
        if !cursor.literal(FORMAT_TAG) {
            // No format field means no serialization.
            cursor.settings().format = Format::None;
            return Ok(());
        }

        let format = cursor.read_hex(FORMAT_LEN, "format")?;
        cursor.settings().format = Format::try_from(format)?;

        if has_type_field(cursor) {
            cursor.literal(TYPE_TAG);
            let rtype = cursor.read_hex(TYPE_LEN, "type")?;
            cursor.settings().rtype = Some(ReturnType::try_from(rtype)?);
        }
        cursor.next(0);

        Ok(())
    }
}

/// A `T` only starts a type field when a hex digit follows; PHP payloads
/// such as `Tjs` (`N;`) sit right after the format field.
fn has_type_field(cursor: &HeaderCursor<'_>) -> bool {
    cursor
        .peek(TYPE_TAG.len() + TYPE_LEN)
        .and_then(|window| window.strip_prefix(TYPE_TAG))
        .is_some_and(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
}
