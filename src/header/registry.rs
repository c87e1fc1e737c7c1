//! Version registry mapping header versions to their rules.
//!
//! The process-wide registry is built once on first use and never mutated
//! afterwards. Custom registries can be assembled with
//! [`VersionRegistry::register`] and handed to a transcoder.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use tracing::{trace, warn};

use super::{marker, HeaderCursor, HeaderFields, VersionRule, MARKER, VERSION_LEN};
use crate::common::VERSION;
use crate::data::Data;
use crate::error::{Data64Error, Result};
use crate::settings::Settings;

static GLOBAL: LazyLock<Arc<VersionRegistry>> =
    LazyLock::new(|| Arc::new(VersionRegistry::builtin()));

/// Registry of header version rules.
#[derive(Default)]
pub struct VersionRegistry {
    rules: BTreeMap<u8, Box<dyn VersionRule>>,
}

impl VersionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in version rule.
    pub fn builtin() -> Self {
        let mut rules: BTreeMap<u8, Box<dyn VersionRule>> = BTreeMap::new();
        rules.insert(3, Box::new(super::V3));
        Self { rules }
    }

    /// The shared process-wide registry.
    pub fn global() -> Arc<VersionRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Register a version rule.
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::InvalidVersionRule`] if the rule claims version 0
    /// (reserved for "no header") or its version is already registered.
    pub fn register(&mut self, rule: Box<dyn VersionRule>) -> Result<()> {
        let version = rule.version();
        if version == 0 {
            return Err(Data64Error::InvalidVersionRule(
                "version 0 is reserved".to_string(),
            ));
        }
        if self.rules.contains_key(&version) {
            return Err(Data64Error::InvalidVersionRule(format!(
                "version {} is already registered",
                version
            )));
        }
        self.rules.insert(version, rule);
        Ok(())
    }

    /// Look up the rule for a version.
    pub fn lookup(&self, version: u8) -> Option<&dyn VersionRule> {
        self.rules.get(&version).map(|r| r.as_ref())
    }

    /// Registered versions, newest first.
    pub fn versions(&self) -> impl Iterator<Item = u8> + '_ {
        self.rules.keys().rev().copied()
    }

    /// Newest registered version.
    pub fn newest(&self) -> Option<u8> {
        self.rules.keys().next_back().copied()
    }

    /// Build a complete header (`SVvv` + rule suffix).
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::UnsupportedVersion`] if the version is not registered.
    pub fn build(&self, fields: &HeaderFields) -> Result<String> {
        let version = fields
            .version
            .or_else(|| self.newest())
            .unwrap_or(VERSION);

        let rule = self.lookup(version).ok_or_else(|| {
            warn!(version, "cannot build header for unsupported version");
            Data64Error::UnsupportedVersion(version)
        })?;

        let mut header = marker(version);
        header.push_str(&rule.build(fields));
        Ok(header)
    }

    /// Parse the header of `input` into `settings`.
    ///
    /// Without a `SV` marker at offset 0 the version stays 0 and the whole
    /// input becomes the payload. Otherwise the settings receive the parsed
    /// fields, the full input as value and the header length as offset.
    ///
    /// # Errors
    ///
    /// Returns [`Data64Error::UnsupportedVersion`] for unregistered versions and
    /// [`Data64Error::InvalidHeader`] for malformed fields.
    pub fn parse(&self, input: &str, settings: &mut Settings) -> Result<()> {
        let offset = {
            let mut cursor = HeaderCursor::new(input, settings, MARKER.len());

            if cursor.get() == Some(MARKER) {
                let version = cursor.read_hex(VERSION_LEN, "version")?;
                let rule = self.lookup(version).ok_or_else(|| {
                    warn!(version, "cannot parse header for unsupported version");
                    Data64Error::UnsupportedVersion(version)
                })?;
                cursor.settings().set_version(version);
                rule.parse(&mut cursor)?;
            }

            cursor.position()
        };

        trace!(offset, version = settings.version(), "header parsed");
        settings.set_value(Data::Text(input.to_string()), offset)
    }

    /// Detect the version of a header at the start of `input`.
    ///
    /// Returns 0 when no registered version marker is a prefix of `input`.
    pub fn detect(&self, input: &str) -> u8 {
        self.versions()
            .find(|&version| input.starts_with(&marker(version)))
            .unwrap_or(0)
    }
}
