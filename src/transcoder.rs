//! Transcoder - the encode/decode pipeline.
//!
//! A [`Transcoder`] holds default [`Options`], a [`Profile`] of available
//! format plugins and the [`VersionRegistry`] used for headers.
//!
//! Encoding runs the format plugin (unless the data is text and
//! `encode_strings` is off), then the Base64 stage, which prepends the
//! header. Decoding parses the header first and lets it decide between the
//! Base64 stage alone and a full plugin decode.
//!
//! # Example
//!
//! ```
//! use data64::{Overrides, Transcoder};
//! use serde_json::json;
//!
//! let transcoder = Transcoder::default();
//! let encoded = transcoder.encode(json!({"a": 1}), &Overrides::new()).unwrap();
//! assert_eq!(encoded, "SV03F1T1eyJhIjoxfQ");
//!
//! let decoded = transcoder.decode(&encoded, &Overrides::new()).unwrap();
//! assert_eq!(decoded.into_data().into_value(), json!({"a": 1}));
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::codec::FormatPlugin;
use crate::common::{Format, ReturnType};
use crate::data::Data;
use crate::encoding;
use crate::error::{Data64Error, Result};
use crate::header::{HeaderFields, VersionRegistry};
use crate::options::{Options, Overrides};
use crate::profile::Profile;
use crate::settings::Settings;
use crate::state::{StageData, State};

/// Result of [`Transcoder::decode`].
#[derive(Debug)]
pub enum Decoded<'t> {
    /// The decoded value.
    Data(Data),
    /// The whole pipeline state, returned when `want_state` is set.
    ///
    /// The decoded value is the state's current data.
    State(State<'t>),
}

impl Decoded<'_> {
    /// The decoded value, taken out of the state if necessary.
    pub fn into_data(self) -> Data {
        match self {
            Decoded::Data(data) => data,
            Decoded::State(state) => state.into_data(),
        }
    }

    /// Returns the state if one was requested.
    pub fn as_state(&self) -> Option<&State<'_>> {
        match self {
            Decoded::State(state) => Some(state),
            Decoded::Data(_) => None,
        }
    }
}

/// Encoder/decoder with default options and a plugin profile.
pub struct Transcoder {
    options: Options,
    profile: Profile,
    registry: Arc<VersionRegistry>,
    /// Plugin cache indexed by format id.
    plugins: [OnceLock<Box<dyn FormatPlugin>>; Format::ALL.len()],
}

impl Transcoder {
    /// Create a transcoder with every built-in plugin.
    pub fn new(options: Options) -> Self {
        Self::with_profile(options, Profile::all())
    }

    /// Create a transcoder restricted to the plugins of `profile`.
    pub fn with_profile(options: Options, profile: Profile) -> Self {
        Self {
            options,
            profile,
            registry: VersionRegistry::global(),
            plugins: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// Use a custom version registry instead of the global one.
    pub fn with_registry(mut self, registry: Arc<VersionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Default options.
    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Plugin profile.
    #[inline]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Version registry used for headers.
    #[inline]
    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    /// Resolve the plugin for `format`, instantiating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::InvalidFormat`] if the profile has no plugin for
    /// `format` or the factory produced a plugin for another format.
    pub fn format_plugin(&self, format: Format) -> Result<&dyn FormatPlugin> {
        let slot = &self.plugins[format.id() as usize];
        if let Some(plugin) = slot.get() {
            return Ok(plugin.as_ref());
        }

        let factory = self
            .profile
            .factory(format)
            .ok_or(Data64Error::InvalidFormat(format.id()))?;
        let plugin = factory();
        if plugin.id() != format {
            return Err(Data64Error::InvalidFormat(format.id()));
        }

        tracing::debug!(%format, profile = self.profile.name(), "format plugin loaded");
        Ok(slot.get_or_init(|| plugin).as_ref())
    }

    /// Parse the header of `input` with this transcoder's registry.
    ///
    /// A missing format field reads as `Format::None`, a missing type field as
    /// no return type.
    ///
    /// # Errors
    ///
    /// Returns error if the header is malformed or names an unsupported version.
    pub fn parse_header(&self, input: &str) -> Result<Settings> {
        let mut settings = Settings::new(Format::None, None);
        self.registry.parse(input, &mut settings)?;
        Ok(settings)
    }

    /// Version of the header at the start of `input`, or 0.
    pub fn detect_header(&self, input: &str) -> u8 {
        self.registry.detect(input)
    }

    /// Create a pipeline state with the effective options for a call.
    pub fn state(&self, data: impl Into<StageData>, extra: &Overrides) -> State<'_> {
        State::new(self, data, self.options.merged(extra))
    }

    /// Encode data into a header-prefixed Base64 string.
    ///
    /// # Errors
    ///
    /// Returns error if the plugin is unavailable, serialization fails, or the
    /// header version is unsupported.
    pub fn encode(&self, data: impl Into<Data>, extra: &Overrides) -> Result<String> {
        let mut state = self.state(data.into(), extra);
        self.encode_state(&mut state)
    }

    /// Encode any serializable type.
    ///
    /// # Errors
    ///
    /// Returns error if `value` cannot be represented as JSON or encoding fails.
    pub fn encode_serde<T: Serialize + ?Sized>(&self, value: &T, extra: &Overrides) -> Result<String> {
        self.encode(serde_json::to_value(value)?, extra)
    }

    /// Run the encode pipeline on an existing state.
    ///
    /// # Errors
    ///
    /// See [`Transcoder::encode`].
    pub fn encode_state(&self, state: &mut State<'_>) -> Result<String> {
        let format = state.opts.format;
        if format != Format::None && (state.opts.encode_strings || !state.data().is_text()) {
            let plugin = self.format_plugin(format)?;
            tracing::debug!(%format, "encoding with plugin");
            if let Some(out) = plugin.encode(state)? {
                state.update(out)?;
            }
        }
        self.encode_value(state)
    }

    /// The Base64 stage: header plus encoded payload of the state's data.
    ///
    /// Values that are still structured at this point are stringified: a
    /// JSON string verbatim, anything else as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::UnsupportedVersion`] if the header cannot be built.
    pub fn encode_value(&self, state: &State<'_>) -> Result<String> {
        let url = state.opts.url;
        let mut out = self.registry.build(&HeaderFields::from(&state.opts))?;

        let payload = match state.data().to_data() {
            Data::Text(text) => encoding::encode_text(&text, url),
            Data::Bytes(bytes) => encoding::encode_bytes(&bytes, url),
            Data::Value(Value::String(text)) => encoding::encode_text(&text, url),
            Data::Value(value) => encoding::encode_text(&value.to_string(), url),
        };

        tracing::trace!(header = %out, len = payload.len(), "payload encoded");
        out.push_str(&payload);
        Ok(out)
    }

    /// Decode a header-prefixed Base64 string.
    ///
    /// Without a format, or with an explicit `Raw` type field (`T0`), only
    /// the Base64 stage runs and the result is text, or bytes with
    /// `want_bytes`. Otherwise the format plugin deserializes the payload.
    ///
    /// # Errors
    ///
    /// Returns error if the header is invalid, the plugin is unavailable, or
    /// the payload cannot be decoded.
    pub fn decode(&self, input: &str, extra: &Overrides) -> Result<Decoded<'_>> {
        let settings = self.parse_header(input)?;
        let (format, rtype) = (settings.format, settings.rtype);
        let mut state = self.state(settings, extra);

        let result = if format == Format::None || rtype == Some(ReturnType::Raw) {
            tracing::debug!(%format, "decoding payload only");
            self.decode_value(&mut state)?
        } else {
            let plugin = self.format_plugin(format)?;
            tracing::debug!(%format, "decoding with plugin");
            plugin.decode(&mut state)?
        };

        if state.opts.want_state {
            state.update(result)?;
            Ok(Decoded::State(state))
        } else {
            Ok(Decoded::Data(result))
        }
    }

    /// Decode into any deserializable type.
    ///
    /// # Errors
    ///
    /// Returns error if decoding fails or the value does not match `T`.
    pub fn decode_as<T: DeserializeOwned>(&self, input: &str, extra: &Overrides) -> Result<T> {
        let extra = Overrides {
            want_state: Some(false),
            ..extra.clone()
        };
        let value = self.decode(input, &extra)?.into_data().into_value();
        Ok(serde_json::from_value(value)?)
    }

    /// The Base64 decode stage.
    ///
    /// Text data has its header parsed first and is replaced by the
    /// resulting [`Settings`].
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::InvalidState`] if the state holds neither text
    /// nor a parsed record, and Base64/UTF-8 errors for a bad payload.
    pub fn decode_value(&self, state: &mut State<'_>) -> Result<Data> {
        if let StageData::Data(Data::Text(text)) = state.data() {
            let settings = self.parse_header(text)?;
            state.set_data(StageData::Settings(settings));
        }

        let settings = state
            .data()
            .as_settings()
            .ok_or(Data64Error::InvalidState("expected text or a parsed header"))?;
        let payload = settings
            .text()
            .ok_or(Data64Error::InvalidState("payload is not text"))?;

        let url = state.opts.url;
        if state.opts.want_bytes {
            Ok(Data::Bytes(Bytes::from(encoding::decode_bytes(payload, url)?)))
        } else {
            Ok(Data::Text(encoding::decode_text(payload, url)?))
        }
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcoder")
            .field("options", &self.options)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{HeaderCursor, VersionRule};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_encode_object_json() {
        let t = Transcoder::default();
        let encoded = t.encode(json!({"a": 1}), &Overrides::new()).unwrap();

        assert!(encoded.starts_with("SV03F1T1"));
        assert_eq!(
            encoding::decode_text(&encoded[8..], true).unwrap(),
            "{\"a\":1}"
        );

        let decoded = t.decode(&encoded, &Overrides::new()).unwrap();
        assert_eq!(decoded.into_data(), Data::from(json!({"a": 1})));
    }

    #[test]
    fn test_header_elision() {
        let t = Transcoder::default();
        let v = json!([1]);

        let none = t.encode(v.clone(), &Overrides::new().format(Format::None)).unwrap();
        assert_eq!(t.parse_header(&none).unwrap().header().unwrap(), "SV03");

        let php = t
            .encode(
                v.clone(),
                &Overrides::new().format(Format::Php).rtype(ReturnType::ArrObj),
            )
            .unwrap();
        assert_eq!(t.parse_header(&php).unwrap().header().unwrap(), "SV03F2");

        let raw = t
            .encode(v.clone(), &Overrides::new().rtype(ReturnType::Raw))
            .unwrap();
        assert_eq!(t.parse_header(&raw).unwrap().header().unwrap(), "SV03F1");

        let arr = t.encode(v, &Overrides::new()).unwrap();
        assert_eq!(t.parse_header(&arr).unwrap().header().unwrap(), "SV03F1T1");
    }

    #[test]
    fn test_full_header() {
        let t = Transcoder::default();
        let extra = Overrides::new()
            .format(Format::None)
            .rtype(ReturnType::Raw)
            .full_header(true);
        let encoded = t.encode("abc", &extra).unwrap();
        assert_eq!(encoded, "SV03F0T0YWJj");

        let extra = Overrides::new().format(Format::Php).full_header(true);
        assert!(t.encode(json!(1), &extra).unwrap().starts_with("SV03F2T1"));
    }

    #[test]
    fn test_detect_header() {
        let t = Transcoder::default();
        assert_eq!(t.detect_header("SV03F1T1eyJhIjoxfQ"), 3);
        assert_eq!(t.detect_header("SV03"), 3);
        assert_eq!(t.detect_header("eyJhIjoxfQ"), 0);
        assert_eq!(t.detect_header("SV09abc"), 0);
        assert_eq!(t.detect_header(""), 0);
    }

    #[test]
    fn test_php_payloads_starting_with_t() {
        let t = Transcoder::default();
        let extra = Overrides::new().format(Format::Php);

        for value in [json!(null), json!({})] {
            let encoded = t.encode(value.clone(), &extra).unwrap();
            assert!(encoded.starts_with("SV03F2T"), "{}", encoded);
            assert_eq!(t.parse_header(&encoded).unwrap().offset(), 6);
            assert_eq!(
                t.decode(&encoded, &Overrides::new()).unwrap().into_data(),
                Data::from(value)
            );
        }
    }

    #[test]
    fn test_raw_needs_type_field() {
        let t = Transcoder::default();
        let v = json!({"a": 1});

        let elided = t
            .encode(v.clone(), &Overrides::new().rtype(ReturnType::Raw))
            .unwrap();
        assert_eq!(t.parse_header(&elided).unwrap().rtype, None);
        assert_eq!(
            t.decode(&elided, &Overrides::new()).unwrap().into_data(),
            Data::from(v.clone())
        );

        let explicit = t
            .encode(
                v,
                &Overrides::new().rtype(ReturnType::Raw).full_header(true),
            )
            .unwrap();
        assert_eq!(
            t.parse_header(&explicit).unwrap().rtype,
            Some(ReturnType::Raw)
        );
        assert_eq!(
            t.decode(&explicit, &Overrides::new()).unwrap().into_data(),
            Data::from("{\"a\":1}")
        );
    }

    #[test]
    fn test_decode_without_header() {
        let t = Transcoder::default();
        let decoded = t.decode("aGVsbG8", &Overrides::new()).unwrap();
        assert_eq!(decoded.into_data(), Data::from("hello"));
    }

    #[test]
    fn test_decode_want_bytes() {
        let t = Transcoder::default();
        let decoded = t
            .decode("SV03AAEC", &Overrides::new().want_bytes(true))
            .unwrap();
        assert_eq!(decoded.into_data(), Data::from(vec![0u8, 1, 2]));
    }

    #[test]
    fn test_unsupported_version() {
        let t = Transcoder::default();
        assert!(matches!(
            t.encode(json!(1), &Overrides::new().version(9)),
            Err(Data64Error::UnsupportedVersion(9))
        ));
        assert!(matches!(
            t.decode("SV09F1T1eyJhIjoxfQ", &Overrides::new()),
            Err(Data64Error::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_profile_without_php() {
        let t = Transcoder::with_profile(Options::default(), Profile::bin());
        assert!(matches!(
            t.encode(json!({"a": 1}), &Overrides::new().format(Format::Php)),
            Err(Data64Error::InvalidFormat(2))
        ));
        // JSON is still available.
        assert!(t.encode(json!({"a": 1}), &Overrides::new()).is_ok());
    }

    #[test]
    fn test_core_profile_passes_text_through() {
        let t = Transcoder::with_profile(Options::default(), Profile::core());
        let encoded = t.encode("{\"a\":1}", &Overrides::new()).unwrap();
        assert_eq!(encoded, "SV03F1T1eyJhIjoxfQ");
        assert!(matches!(
            t.decode(&encoded, &Overrides::new()),
            Err(Data64Error::InvalidFormat(1))
        ));
    }

    #[test]
    fn test_text_is_not_reserialized() {
        let t = Transcoder::default();
        let plain = t.encode("[1,2]", &Overrides::new()).unwrap();
        let quoted = t
            .encode("[1,2]", &Overrides::new().encode_strings(true))
            .unwrap();

        assert_eq!(
            t.decode(&plain, &Overrides::new()).unwrap().into_data(),
            Data::from(json!([1, 2]))
        );
        assert_eq!(
            t.decode(&quoted, &Overrides::new()).unwrap().into_data(),
            Data::from(json!("[1,2]"))
        );
    }

    #[test]
    fn test_plugin_is_cached() {
        static CREATED: AtomicUsize = AtomicUsize::new(0);

        let profile = Profile::custom("counting").with(Format::Json, || {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Box::new(crate::codec::JsonFormat)
        });
        let t = Transcoder::with_profile(Options::default(), profile);

        t.encode(json!([1]), &Overrides::new()).unwrap();
        t.encode(json!([2]), &Overrides::new()).unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);

        assert!(matches!(
            t.format_plugin(Format::None),
            Err(Data64Error::InvalidFormat(0))
        ));
    }

    #[test]
    fn test_factory_with_wrong_id() {
        let profile = Profile::custom("broken").with(Format::Php, || Box::new(crate::codec::JsonFormat));
        let t = Transcoder::with_profile(Options::default(), profile);
        assert!(matches!(
            t.format_plugin(Format::Php),
            Err(Data64Error::InvalidFormat(2))
        ));
    }

    #[test]
    fn test_want_state() {
        let t = Transcoder::default();
        let decoded = t
            .decode("SV03F1T1eyJhIjoxfQ", &Overrides::new().want_state(true))
            .unwrap();

        let state = decoded.as_state().unwrap();
        assert_eq!(state.history().len(), 1);
        let current = state.data().as_settings().unwrap();
        assert_eq!(current.format, Format::Json);
        assert_eq!(current.value(), Data::from(json!({"a": 1})));
        assert_eq!(current.prev().unwrap().header().unwrap(), "SV03F1T1");

        assert_eq!(decoded.into_data(), Data::from(json!({"a": 1})));
    }

    #[test]
    fn test_decode_value_rejects_values() {
        let t = Transcoder::default();
        let mut state = t.state(Data::from(json!(1)), &Overrides::new());
        assert!(matches!(
            t.decode_value(&mut state),
            Err(Data64Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_standard_alphabet() {
        let t = Transcoder::default();
        let extra = Overrides::new().format(Format::None).url(false);
        let encoded = t.encode(Data::from(vec![0xfbu8, 0xff]), &extra).unwrap();
        assert_eq!(encoded, "SV03+/8=");

        let decoded = t
            .decode(&encoded, &Overrides::new().url(false).want_bytes(true))
            .unwrap();
        assert_eq!(decoded.into_data(), Data::from(vec![0xfbu8, 0xff]));
    }

    #[test]
    fn test_serde_helpers() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Point {
            x: i32,
            y: i32,
        }

        let t = Transcoder::default();
        let encoded = t
            .encode_serde(&Point { x: 1, y: -2 }, &Overrides::new().format(Format::Ubjson))
            .unwrap();
        let point: Point = t.decode_as(&encoded, &Overrides::new()).unwrap();
        assert_eq!(point, Point { x: 1, y: -2 });
    }

    struct V4;

    impl VersionRule for V4 {
        fn version(&self) -> u8 {
            4
        }

        fn build(&self, _fields: &HeaderFields) -> String {
            String::new()
        }

        fn parse(&self, cursor: &mut HeaderCursor<'_>) -> Result<()> {
            cursor.next(0);
            Ok(())
        }
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = VersionRegistry::builtin();
        registry.register(Box::new(V4)).unwrap();
        let t = Transcoder::default().with_registry(Arc::new(registry));

        let encoded = t.encode("hi", &Overrides::new()).unwrap();
        assert_eq!(encoded, "SV04aGk");
        assert_eq!(t.detect_header(&encoded), 4);
        assert_eq!(
            t.decode(&encoded, &Overrides::new()).unwrap().into_data(),
            Data::from("hi")
        );
    }
}
