//! Base64 transform for the payload.
//!
//! With `url` enabled the URL-safe alphabet (`-` and `_`) is used and no
//! padding is written. Otherwise the standard alphabet with padding is used.
//! Decoding accepts both padded and unpadded input.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

use crate::error::Result;

const URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[inline]
fn engine(url: bool) -> &'static GeneralPurpose {
    if url {
        &URL_SAFE
    } else {
        &STANDARD
    }
}

/// Encode raw bytes.
pub fn encode_bytes(bytes: &[u8], url: bool) -> String {
    engine(url).encode(bytes)
}

/// Encode text as its UTF-8 bytes.
pub fn encode_text(text: &str, url: bool) -> String {
    encode_bytes(text.as_bytes(), url)
}

/// Decode to raw bytes.
///
/// # Errors
///
/// Returns error if `input` is not valid Base64 in the selected alphabet.
pub fn decode_bytes(input: &str, url: bool) -> Result<Vec<u8>> {
    Ok(engine(url).decode(input)?)
}

/// Decode to UTF-8 text.
///
/// # Errors
///
/// Returns error if `input` is not valid Base64 or the bytes are not UTF-8.
pub fn decode_text(input: &str, url: bool) -> Result<String> {
    Ok(String::from_utf8(decode_bytes(input, url)?)?)
}
