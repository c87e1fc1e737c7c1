//! Transcoder configuration.
//!
//! [`Options`] is the full effective configuration of one call. A
//! [`Transcoder`](crate::Transcoder) keeps a set of default options and every
//! call may pass [`Overrides`]; per-call values win.
//!
//! # Example
//!
//! ```
//! use data64::{Format, Options, Overrides};
//!
//! let defaults = Options::default();
//! let effective = defaults.merged(&Overrides::new().format(Format::Php));
//!
//! assert_eq!(effective.format, Format::Php);
//! assert!(effective.url);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{Format, ReturnType};
use crate::error::Result;

/// A value transform applied by the JSON and JSOX plugins.
///
/// Used as a replacer before serialization and as a reviver after parsing.
#[derive(Clone)]
pub struct Hook(Arc<dyn Fn(Value) -> Value + Send + Sync>);

impl Hook {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Apply the hook to a value.
    #[inline]
    pub fn apply(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// Effective configuration for an encode/decode call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Serialization format used by `encode()`.
    pub format: Format,
    /// Return type recorded in the header.
    #[serde(rename = "type")]
    pub rtype: ReturnType,
    /// Always emit every optional header field.
    pub full_header: bool,
    /// Serialize text inputs with the format plugin instead of passing them through.
    pub encode_strings: bool,
    /// Use the URL-safe Base64 alphabet.
    pub url: bool,
    /// Header version; `None` means the newest supported version.
    pub version: Option<u8>,
    /// Decode to raw bytes instead of text.
    pub want_bytes: bool,
    /// Return the whole pipeline state from `decode()`.
    pub want_state: bool,
    /// Applied to values before JSON/JSOX serialization.
    #[serde(skip)]
    pub replacer: Option<Hook>,
    /// Applied to values after JSON/JSOX parsing.
    #[serde(skip)]
    pub reviver: Option<Hook>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            format: Format::Json,
            rtype: ReturnType::ArrObj,
            full_header: false,
            encode_strings: false,
            url: true,
            version: None,
            want_bytes: false,
            want_state: false,
            replacer: None,
            reviver: None,
        }
    }
}

impl Options {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid JSON or has wrong field types.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Set the return type.
    pub fn rtype(mut self, rtype: ReturnType) -> Self {
        self.rtype = rtype;
        self
    }

    /// Always emit every header field.
    pub fn full_header(mut self, full: bool) -> Self {
        self.full_header = full;
        self
    }

    /// Serialize text inputs too.
    pub fn encode_strings(mut self, enabled: bool) -> Self {
        self.encode_strings = enabled;
        self
    }

    /// Toggle the URL-safe alphabet.
    pub fn url(mut self, url: bool) -> Self {
        self.url = url;
        self
    }

    /// Pin the header version.
    pub fn version(mut self, version: u8) -> Self {
        self.version = Some(version);
        self
    }

    /// Decode to bytes.
    pub fn want_bytes(mut self, enabled: bool) -> Self {
        self.want_bytes = enabled;
        self
    }

    /// Return the pipeline state from `decode()`.
    pub fn want_state(mut self, enabled: bool) -> Self {
        self.want_state = enabled;
        self
    }

    /// Set the pre-serialization hook.
    pub fn replacer(mut self, hook: Hook) -> Self {
        self.replacer = Some(hook);
        self
    }

    /// Set the post-parse hook.
    pub fn reviver(mut self, hook: Hook) -> Self {
        self.reviver = Some(hook);
        self
    }

    /// Produce the effective options for a call, with `extra` taking precedence.
    pub fn merged(&self, extra: &Overrides) -> Options {
        Options {
            format: extra.format.unwrap_or(self.format),
            rtype: extra.rtype.unwrap_or(self.rtype),
            full_header: extra.full_header.unwrap_or(self.full_header),
            encode_strings: extra.encode_strings.unwrap_or(self.encode_strings),
            url: extra.url.unwrap_or(self.url),
            version: extra.version.or(self.version),
            want_bytes: extra.want_bytes.unwrap_or(self.want_bytes),
            want_state: extra.want_state.unwrap_or(self.want_state),
            replacer: extra.replacer.clone().or_else(|| self.replacer.clone()),
            reviver: extra.reviver.clone().or_else(|| self.reviver.clone()),
        }
    }
}

/// Per-call overrides. Unset fields fall back to the transcoder defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Overrides {
    /// See [`Options::format`].
    pub format: Option<Format>,
    /// See [`Options::rtype`].
    #[serde(rename = "type")]
    pub rtype: Option<ReturnType>,
    /// See [`Options::full_header`].
    pub full_header: Option<bool>,
    /// See [`Options::encode_strings`].
    pub encode_strings: Option<bool>,
    /// See [`Options::url`].
    pub url: Option<bool>,
    /// See [`Options::version`].
    pub version: Option<u8>,
    /// See [`Options::want_bytes`].
    pub want_bytes: Option<bool>,
    /// See [`Options::want_state`].
    pub want_state: Option<bool>,
    /// See [`Options::replacer`].
    #[serde(skip)]
    pub replacer: Option<Hook>,
    /// See [`Options::reviver`].
    #[serde(skip)]
    pub reviver: Option<Hook>,
}

impl Overrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Override the return type.
    pub fn rtype(mut self, rtype: ReturnType) -> Self {
        self.rtype = Some(rtype);
        self
    }

    /// Override header completeness.
    pub fn full_header(mut self, full: bool) -> Self {
        self.full_header = Some(full);
        self
    }

    /// Override string serialization.
    pub fn encode_strings(mut self, enabled: bool) -> Self {
        self.encode_strings = Some(enabled);
        self
    }

    /// Override the URL-safe alphabet.
    pub fn url(mut self, url: bool) -> Self {
        self.url = Some(url);
        self
    }

    /// Override the header version.
    pub fn version(mut self, version: u8) -> Self {
        self.version = Some(version);
        self
    }

    /// Override byte output.
    pub fn want_bytes(mut self, enabled: bool) -> Self {
        self.want_bytes = Some(enabled);
        self
    }

    /// Override state output.
    pub fn want_state(mut self, enabled: bool) -> Self {
        self.want_state = Some(enabled);
        self
    }

    /// Override the pre-serialization hook.
    pub fn replacer(mut self, hook: Hook) -> Self {
        self.replacer = Some(hook);
        self
    }

    /// Override the post-parse hook.
    pub fn reviver(mut self, hook: Hook) -> Self {
        self.reviver = Some(hook);
        self
    }
}
