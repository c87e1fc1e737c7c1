//! Plugin profiles.
//!
//! A [`Profile`] decides which format plugins a [`Transcoder`](crate::Transcoder)
//! can resolve. Every entry maps a [`Format`] to a factory; a format mapped to
//! `None` is deliberately unavailable, and so is a format with no entry.
//!
//! | Profile   | Formats                  |
//! |-----------|--------------------------|
//! | `all`     | JSON, PHP, UBJSON, JSOX  |
//! | `default` | JSON, PHP, UBJSON        |
//! | `bin`     | JSON, UBJSON             |
//! | `jso`     | JSON, JSOX               |
//! | `php`     | JSON, PHP                |
//! | `core`    | none                     |
//!
//! # Example
//!
//! ```
//! use data64::{Format, Profile};
//!
//! let profile = Profile::core().with(Format::Json, || Box::new(data64::codec::JsonFormat));
//! assert!(profile.contains(Format::Json));
//! assert!(!profile.contains(Format::Php));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::{FormatPlugin, JsonFormat, JsoxFormat, PhpFormat, UbjsonFormat};
use crate::common::Format;

/// Creates a plugin instance on first use.
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn FormatPlugin> + Send + Sync>;

/// Named, immutable map of available format plugins.
#[derive(Clone)]
pub struct Profile {
    name: String,
    entries: BTreeMap<Format, Option<PluginFactory>>,
}

impl Profile {
    /// Start an empty profile with a name.
    pub fn custom(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    fn builtin(name: &str, formats: &[Format]) -> Self {
        let mut profile = Self::custom(name);
        for &format in formats {
            profile.entries.insert(format, builtin_factory(format));
        }
        profile
    }

    /// Every built-in plugin.
    pub fn all() -> Self {
        Self::builtin(
            "all",
            &[Format::Json, Format::Php, Format::Ubjson, Format::Jsox],
        )
    }

    /// JSON, PHP and UBJSON.
    pub fn default_set() -> Self {
        Self::builtin("default", &[Format::Json, Format::Php, Format::Ubjson])
    }

    /// JSON and UBJSON.
    pub fn bin() -> Self {
        Self::builtin("bin", &[Format::Json, Format::Ubjson])
    }

    /// JSON and JSOX.
    pub fn jso() -> Self {
        Self::builtin("jso", &[Format::Json, Format::Jsox])
    }

    /// JSON and PHP.
    pub fn php() -> Self {
        Self::builtin("php", &[Format::Json, Format::Php])
    }

    /// No plugins; only header handling and the Base64 stage.
    pub fn core() -> Self {
        Self::builtin("core", &[])
    }

    /// Look up a built-in profile by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Self::all()),
            "default" => Some(Self::default_set()),
            "bin" => Some(Self::bin()),
            "jso" => Some(Self::jso()),
            "php" => Some(Self::php()),
            "core" => Some(Self::core()),
            _ => None,
        }
    }

    /// Map `format` to a plugin factory, replacing any previous entry.
    pub fn with<F>(mut self, format: Format, factory: F) -> Self
    where
        F: Fn() -> Box<dyn FormatPlugin> + Send + Sync + 'static,
    {
        self.entries.insert(format, Some(Arc::new(factory)));
        self
    }

    /// Mark `format` as unavailable.
    pub fn without(mut self, format: Format) -> Self {
        self.entries.insert(format, None);
        self
    }

    /// Profile name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The factory for `format`, if available.
    pub fn factory(&self, format: Format) -> Option<&PluginFactory> {
        self.entries.get(&format).and_then(Option::as_ref)
    }

    /// Check if `format` can be resolved.
    pub fn contains(&self, format: Format) -> bool {
        self.factory(format).is_some()
    }

    /// Available formats in id order.
    pub fn formats(&self) -> impl Iterator<Item = Format> + '_ {
        self.entries
            .iter()
            .filter(|(_, factory)| factory.is_some())
            .map(|(format, _)| *format)
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("formats", &self.formats().collect::<Vec<_>>())
            .finish()
    }
}

fn builtin_factory(format: Format) -> Option<PluginFactory> {
    let factory: PluginFactory = match format {
        Format::None => return None,
        Format::Json => Arc::new(|| Box::new(JsonFormat) as Box<dyn FormatPlugin>),
        Format::Php => Arc::new(|| Box::new(PhpFormat) as Box<dyn FormatPlugin>),
        Format::Ubjson => Arc::new(|| Box::new(UbjsonFormat) as Box<dyn FormatPlugin>),
        Format::Jsox => Arc::new(|| Box::new(JsoxFormat) as Box<dyn FormatPlugin>),
    };
    Some(factory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sets() {
        let formats = |p: Profile| p.formats().collect::<Vec<_>>();

        assert_eq!(
            formats(Profile::all()),
            vec![Format::Json, Format::Php, Format::Ubjson, Format::Jsox]
        );
        assert_eq!(
            formats(Profile::default_set()),
            vec![Format::Json, Format::Php, Format::Ubjson]
        );
        assert_eq!(formats(Profile::bin()), vec![Format::Json, Format::Ubjson]);
        assert_eq!(formats(Profile::jso()), vec![Format::Json, Format::Jsox]);
        assert_eq!(formats(Profile::php()), vec![Format::Json, Format::Php]);
        assert!(formats(Profile::core()).is_empty());
    }

    #[test]
    fn test_factories_match_format() {
        let profile = Profile::all();
        for format in profile.formats() {
            let plugin = (profile.factory(format).unwrap())();
            assert_eq!(plugin.id(), format);
        }
    }

    #[test]
    fn test_without_disables() {
        let profile = Profile::all().without(Format::Php);
        assert!(!profile.contains(Format::Php));
        assert!(profile.contains(Format::Json));
    }

    #[test]
    fn test_custom_with() {
        let profile = Profile::custom("mine").with(Format::Jsox, || Box::new(JsoxFormat));
        assert_eq!(profile.name(), "mine");
        assert_eq!(profile.formats().collect::<Vec<_>>(), vec![Format::Jsox]);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(Profile::by_name("bin").unwrap().name(), "bin");
        assert_eq!(Profile::by_name("default").unwrap().name(), "default");
        assert!(Profile::by_name("xml").is_none());
    }

    #[test]
    fn test_none_is_never_available() {
        assert!(!Profile::all().contains(Format::None));
    }
}
