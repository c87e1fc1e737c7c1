//! # data64
//!
//! Self-describing, versioned, URL-safe Base64 encoding for serialized values.
//!
//! A value is serialized by a format plugin (JSON, PHP `serialize()`, UBJSON
//! or JSOX), Base64-encoded, and prefixed with a short header recording the
//! header version, the format and the return type. A receiver that only
//! knows the header grammar can reverse the whole thing, so a value can
//! travel inside a URL query parameter.
//!
//! ## Wire Format
//!
//! ```text
//! SV 03 F1 T1 eyJhIjoxfQ
//! │  │  │  │  └─ payload: URL-safe Base64
//! │  │  │  └──── return type (omitted for RAW and for PHP)
//! │  │  └─────── format (omitted for NONE)
//! │  └────────── version, 2 hex digits
//! └───────────── marker
//! ```
//!
//! ## Example
//!
//! ```
//! use data64::{Data, Format, Options};
//! use serde_json::json;
//!
//! let encoded = data64::encode(json!({"a": 1}), Options::default()).unwrap();
//! assert_eq!(encoded, "SV03F1T1eyJhIjoxfQ");
//!
//! let decoded = data64::decode(&encoded, Options::default()).unwrap();
//! assert_eq!(decoded, Data::from(json!({"a": 1})));
//!
//! // Literal text without serialization.
//! let raw = data64::encode("hello", Options::default().format(Format::None)).unwrap();
//! assert_eq!(raw, "SV03aGVsbG8");
//! assert_eq!(data64::detect_header(&raw), 3);
//! ```

pub mod codec;
pub mod encoding;
pub mod error;
pub mod header;

mod common;
mod data;
mod options;
mod profile;
mod settings;
mod state;
mod transcoder;

pub use common::{Format, ReturnType, VERSION, VERSIONS};
pub use data::Data;
pub use error::{Data64Error, Result};
pub use options::{Hook, Options, Overrides};
pub use profile::{PluginFactory, Profile};
pub use settings::Settings;
pub use state::{StageData, State};
pub use transcoder::{Decoded, Transcoder};

/// Encode `data` with a throwaway [`Transcoder`].
///
/// # Errors
///
/// See [`Transcoder::encode`].
pub fn encode(data: impl Into<Data>, options: Options) -> Result<String> {
    Transcoder::new(options).encode(data, &Overrides::new())
}

/// Decode `input` with a throwaway [`Transcoder`].
///
/// `want_state` is ignored since the state cannot outlive the transcoder.
///
/// # Errors
///
/// See [`Transcoder::decode`].
pub fn decode(input: &str, options: Options) -> Result<Data> {
    let transcoder = Transcoder::new(options);
    let decoded = transcoder.decode(input, &Overrides::new().want_state(false))?;
    Ok(decoded.into_data())
}

/// Version of the header at the start of `input`, or 0 if there is none.
pub fn detect_header(input: &str) -> u8 {
    header::detect(input)
}
