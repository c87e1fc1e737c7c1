//! Per-call pipeline state.
//!
//! A [`State`] is created for every `encode()`/`decode()` call. It binds the
//! owning [`Transcoder`], the data of the current stage, and the effective
//! options. Each [`State::update`] pushes the previous data onto an
//! append-only history before replacing it.

use serde_json::Value;

use crate::data::Data;
use crate::error::Result;
use crate::options::Options;
use crate::settings::Settings;
use crate::transcoder::Transcoder;

/// Data held by a pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageData {
    /// A caller value, plain text, or bytes.
    Data(Data),
    /// A parsed (or derived) metadata record.
    Settings(Settings),
}

impl StageData {
    /// Returns the data if this stage holds plain data.
    pub fn as_data(&self) -> Option<&Data> {
        match self {
            StageData::Data(d) => Some(d),
            StageData::Settings(_) => None,
        }
    }

    /// Returns the record if this stage holds one.
    pub fn as_settings(&self) -> Option<&Settings> {
        match self {
            StageData::Settings(s) => Some(s),
            StageData::Data(_) => None,
        }
    }

    /// Check if this stage holds plain text.
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self, StageData::Data(Data::Text(_)))
    }

    /// The effective payload of this stage.
    pub fn to_data(&self) -> Data {
        match self {
            StageData::Data(d) => d.clone(),
            StageData::Settings(s) => s.value(),
        }
    }

    /// Consume the stage, returning its effective payload.
    pub fn into_data(self) -> Data {
        match self {
            StageData::Data(d) => d,
            StageData::Settings(s) => s.into_value(),
        }
    }
}

impl From<Data> for StageData {
    fn from(d: Data) -> Self {
        StageData::Data(d)
    }
}

impl From<Settings> for StageData {
    fn from(s: Settings) -> Self {
        StageData::Settings(s)
    }
}

/// Mutable state threaded through one encode/decode call.
pub struct State<'t> {
    parent: &'t Transcoder,
    data: StageData,
    /// Effective options for this call.
    pub opts: Options,
    history: Vec<StageData>,
}

impl<'t> State<'t> {
    /// Create a state for `parent` with the given data and effective options.
    pub fn new(parent: &'t Transcoder, data: impl Into<StageData>, opts: Options) -> Self {
        Self {
            parent,
            data: data.into(),
            opts,
            history: Vec::new(),
        }
    }

    /// The transcoder running this pipeline.
    #[inline]
    pub fn parent(&self) -> &'t Transcoder {
        self.parent
    }

    /// Data of the current stage.
    #[inline]
    pub fn data(&self) -> &StageData {
        &self.data
    }

    /// Previous stage data, oldest first.
    #[inline]
    pub fn history(&self) -> &[StageData] {
        &self.history
    }

    /// Move to the next stage.
    ///
    /// The current data is pushed onto the history. If it is a [`Settings`],
    /// the new data becomes the value of its successor record.
    ///
    /// # Errors
    ///
    /// Returns error if a successor record rejects the value.
    pub fn update(&mut self, new_data: Data) -> Result<&mut Self> {
        let next = match &self.data {
            StageData::Settings(s) => StageData::Settings(s.clone().next(new_data, 0)?),
            StageData::Data(_) => StageData::Data(new_data),
        };
        let old = std::mem::replace(&mut self.data, next);
        self.history.push(old);
        Ok(self)
    }

    /// Replace the current data without recording history.
    pub(crate) fn set_data(&mut self, data: StageData) {
        self.data = data;
    }

    /// The current data as a structured value, for format plugins.
    pub fn input_value(&self) -> Value {
        self.data.to_data().into_value()
    }

    /// Run the Base64 decode stage on this state.
    ///
    /// # Errors
    ///
    /// Returns error if the header or payload cannot be decoded.
    pub fn decode(&mut self) -> Result<Data> {
        let parent = self.parent;
        parent.decode_value(self)
    }

    /// Consume the state, returning the current effective payload.
    pub fn into_data(self) -> Data {
        self.data.into_data()
    }
}

impl std::fmt::Debug for State<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("data", &self.data)
            .field("opts", &self.opts)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Format, ReturnType};
    use serde_json::json;

    #[test]
    fn test_update_plain_data() {
        let transcoder = Transcoder::default();
        let mut state = State::new(&transcoder, Data::from(json!({"a": 1})), Options::default());

        state.update(Data::from("{\"a\":1}")).unwrap();

        assert_eq!(state.data(), &StageData::Data(Data::from("{\"a\":1}")));
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.history()[0], StageData::Data(Data::from(json!({"a": 1}))));
    }

    #[test]
    fn test_update_chains_settings() {
        let transcoder = Transcoder::default();
        let mut settings = Settings::new(Format::Json, ReturnType::ArrObj);
        settings.set_version(3);
        settings.set_value(Data::from("SV03F1T1eyJhIjoxfQ"), 8).unwrap();

        let mut state = State::new(&transcoder, settings.clone(), Options::default());
        state.update(Data::from(json!({"a": 1}))).unwrap();

        let current = state.data().as_settings().unwrap();
        assert_eq!(current.value(), Data::from(json!({"a": 1})));
        assert_eq!(current.prev(), Some(&settings));
        assert_eq!(state.history(), &[StageData::Settings(settings)]);
    }

    #[test]
    fn test_update_shares_settings_chain() {
        let transcoder = Transcoder::default();
        let mut settings = Settings::new(Format::Json, ReturnType::ArrObj);
        settings.set_version(3);
        settings.set_value(Data::from("SV03F1T1eyJhIjoxfQ"), 8).unwrap();

        let mut state = State::new(&transcoder, settings, Options::default());
        state
            .update(Data::from("{\"a\":1}"))
            .unwrap()
            .update(Data::from(json!({"a": 1})))
            .unwrap();

        let current = state.data().as_settings().unwrap();
        let stored = state.history()[1].as_settings().unwrap();
        assert_eq!(current.chain().count(), 3);
        assert!(std::ptr::eq(
            stored.prev().unwrap(),
            current.prev().unwrap().prev().unwrap()
        ));
    }

    #[test]
    fn test_history_is_append_only() {
        let transcoder = Transcoder::default();
        let mut state = State::new(&transcoder, Data::from("a"), Options::default());
        state
            .update(Data::from("b"))
            .unwrap()
            .update(Data::from("c"))
            .unwrap();

        let history: Vec<_> = state
            .history()
            .iter()
            .map(|d| d.to_data())
            .collect();
        assert_eq!(history, vec![Data::from("a"), Data::from("b")]);
        assert_eq!(state.into_data(), Data::from("c"));
    }

    #[test]
    fn test_decode_through_parent() {
        let transcoder = Transcoder::default();
        let mut state = State::new(&transcoder, Data::from("SV03eyJhIjoxfQ"), Options::default());
        assert_eq!(state.decode().unwrap(), Data::from("{\"a\":1}"));
        assert!(state.data().as_settings().is_some());
    }

    #[test]
    fn test_input_value() {
        let transcoder = Transcoder::default();
        let state = State::new(&transcoder, Data::from("text"), Options::default());
        assert_eq!(state.input_value(), json!("text"));
    }
}
