//! Shared protocol constants and enums.
//!
//! | Format   | Id | Description                                   |
//! |----------|----|-----------------------------------------------|
//! | `None`   | 0  | No serialization, payload is the literal data |
//! | `Json`   | 1  | JSON text (the default)                       |
//! | `Php`    | 2  | PHP `serialize()` text                        |
//! | `Ubjson` | 3  | Universal Binary JSON                         |
//! | `Jsox`   | 4  | JSOX, a JSON superset                         |
//!
//! [`ReturnType`] only matters for object-like decoded data. `ArrObj` and
//! `StdObj` behave identically in this crate; both exist so headers stay
//! compatible with implementations that distinguish them (PHP associative
//! arrays vs `stdClass`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Data64Error, Result};

/// Current (newest) header version.
pub const VERSION: u8 = 3;

/// Supported header versions, newest first.
pub const VERSIONS: &[u8] = &[VERSION];

/// Serialization format recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Format {
    /// No serialization.
    None = 0,
    /// JSON.
    Json = 1,
    /// PHP `serialize()`.
    Php = 2,
    /// Universal Binary JSON.
    Ubjson = 3,
    /// JSOX.
    Jsox = 4,
}

impl Format {
    /// All formats in id order.
    pub const ALL: [Format; 5] = [
        Format::None,
        Format::Json,
        Format::Php,
        Format::Ubjson,
        Format::Jsox,
    ];

    /// Numeric wire id.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Format {
    type Error = Data64Error;

    fn try_from(id: u8) -> Result<Self> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or(Data64Error::InvalidFormat(id))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::None => "NONE",
            Format::Json => "JSON",
            Format::Php => "PHP",
            Format::Ubjson => "UBJSON",
            Format::Jsox => "JSOX",
        };
        f.write_str(name)
    }
}

/// Return-shape convention for object-like decoded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnType {
    /// Return the raw string/bytes, skip deserialization.
    Raw = 0,
    /// Objects as associative arrays.
    ArrObj = 1,
    /// Objects as standard objects.
    StdObj = 2,
}

impl ReturnType {
    /// Numeric wire id.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ReturnType {
    type Error = Data64Error;

    fn try_from(id: u8) -> Result<Self> {
        match id {
            0 => Ok(ReturnType::Raw),
            1 => Ok(ReturnType::ArrObj),
            2 => Ok(ReturnType::StdObj),
            other => Err(Data64Error::InvalidType(other)),
        }
    }
}
