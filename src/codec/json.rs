//! JSON format plugin using `serde_json`.
//!
//! The optional `replacer` hook runs before serialization and the optional
//! `reviver` hook after parsing.

use super::{payload_text, FormatPlugin};
use crate::common::Format;
use crate::data::Data;
use crate::error::Result;
use crate::state::State;

/// JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl FormatPlugin for JsonFormat {
    fn id(&self) -> Format {
        Format::Json
    }

    fn encode(&self, state: &mut State<'_>) -> Result<Option<Data>> {
        let mut value = state.input_value();
        if let Some(replacer) = &state.opts.replacer {
            value = replacer.apply(value);
        }
        Ok(Some(Data::Text(serde_json::to_string(&value)?)))
    }

    fn decode(&self, state: &mut State<'_>) -> Result<Data> {
        let text = payload_text(state.decode()?)?;
        let mut value = serde_json::from_str(&text)?;
        if let Some(reviver) = &state.opts.reviver {
            value = reviver.apply(value);
        }
        Ok(Data::Value(value))
    }
}
