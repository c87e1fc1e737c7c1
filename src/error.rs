//! Error types for data64.

use thiserror::Error;

/// Main error type for all Data64 operations.
#[derive(Debug, Error)]
pub enum Data64Error {
    /// Header build or parse referenced a version that is not registered.
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),

    /// No format plugin is available for the given format id.
    #[error("Invalid plugin format: {0}")]
    InvalidFormat(u8),

    /// Unknown return type id found in a header.
    #[error("Invalid return type: {0}")]
    InvalidType(u8),

    /// A version rule was rejected at registration time.
    #[error("Invalid version rule: {0}")]
    InvalidVersionRule(String),

    /// Decode stage received pipeline data it cannot work with.
    #[error("Cannot decode: {0}")]
    InvalidState(&'static str),

    /// Short or non-hexadecimal header field.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Metadata offset does not fit the value it applies to.
    #[error("Invalid offset {offset}: {reason}")]
    InvalidOffset {
        /// The rejected offset.
        offset: usize,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Base64 payload could not be decoded.
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded payload was not valid UTF-8 text.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// PHP serialize format error.
    #[error("PHP serialize error: {0}")]
    Php(String),

    /// UBJSON format error.
    #[error("UBJSON error: {0}")]
    Ubjson(String),

    /// JSOX format error.
    #[error("JSOX error: {0}")]
    Jsox(String),
}

/// Result type alias using Data64Error.
pub type Result<T> = std::result::Result<T, Data64Error>;
