//! Codec module - format plugins for the serialization step.
//!
//! Each plugin implements [`FormatPlugin`] for one [`Format`]:
//!
//! - [`JsonFormat`] - JSON text via `serde_json`
//! - [`PhpFormat`] - PHP `serialize()` text
//! - [`UbjsonFormat`] - Universal Binary JSON
//! - [`JsoxFormat`] - JSOX, a JSON superset
//!
//! # Design
//!
//! Plugins are stateless and receive the per-call [`State`] explicitly.
//! `encode()` reads the current data and returns the serialized form;
//! `decode()` calls [`State::decode`] to obtain the Base64-decoded payload
//! and deserializes it.
//!
//! # Example
//!
//! ```
//! use data64::codec::{FormatPlugin, JsonFormat};
//! use data64::{Data, Format, Options, State, Transcoder};
//! use serde_json::json;
//!
//! let transcoder = Transcoder::default();
//! let mut state = State::new(&transcoder, Data::from(json!([1, 2])), Options::default());
//!
//! let out = JsonFormat.encode(&mut state).unwrap();
//! assert_eq!(out, Some(Data::from("[1,2]")));
//! assert_eq!(JsonFormat.id(), Format::Json);
//! ```

mod json;
pub mod jsox;
pub mod php;
pub mod ubjson;

pub use json::JsonFormat;
pub use jsox::JsoxFormat;
pub use php::PhpFormat;
pub use ubjson::UbjsonFormat;

use crate::common::Format;
use crate::data::Data;
use crate::error::Result;
use crate::state::State;

/// Maximum nesting depth accepted by the decoders.
pub const MAX_DEPTH: usize = 512;

/// A serialization codec selectable by format id.
pub trait FormatPlugin: Send + Sync {
    /// The format this plugin handles.
    fn id(&self) -> Format;

    /// Serialize the state's current data.
    ///
    /// Returning `None` leaves the state data unchanged.
    fn encode(&self, state: &mut State<'_>) -> Result<Option<Data>>;

    /// Decode the payload held by the state and deserialize it.
    fn decode(&self, state: &mut State<'_>) -> Result<Data>;
}

/// Text view of a decoded payload; bytes must be valid UTF-8.
pub(crate) fn payload_text(data: Data) -> Result<String> {
    match data {
        Data::Text(s) => Ok(s),
        Data::Bytes(b) => Ok(String::from_utf8(b.to_vec())?),
        Data::Value(v) => Ok(v.to_string()),
    }
}
