//! Decryption plugins and the codec context
//!
//! The codec holds no decryption logic of its own: V3/V4 entries with a
//! non-zero algorithm id are routed through a host-supplied
//! [`DecryptionPlugin`], looked up by the id the entry declares. Manifest
//! converters are registered the same way, keyed by the format version they
//! support.
//!
//! [`KomContext`] replaces the original tool's process-wide static plugin
//! lists: it is built once at startup and passed by reference into the
//! orchestrator, so there is no hidden global mutable state and
//! registration happens exactly once per run.

use crate::convert::{ManifestConverter, V2Converter, V3Converter, V4Converter};
use crate::error::DecryptError;
use std::collections::HashMap;

/// Per-algorithm decryptor supplied by the hosting application.
///
/// `archive_base_name` is the archive's base filename, which the format
/// uses as a key-derivation input. `algorithm` is the id the entry
/// declared; a plugin registered under several ids can branch on it.
pub trait DecryptionPlugin {
    fn decrypt(
        &self,
        data: &[u8],
        archive_base_name: &str,
        algorithm: u8,
    ) -> Result<Vec<u8>, DecryptError>;
}

/// Registries for decryption plugins and manifest converters.
pub struct KomContext {
    plugins: HashMap<u8, Box<dyn DecryptionPlugin>>,
    converters: HashMap<u8, Box<dyn ManifestConverter>>,
}

impl KomContext {
    /// Context with no plugins and no converters.
    pub fn new() -> Self {
        KomContext {
            plugins: HashMap::new(),
            converters: HashMap::new(),
        }
    }

    /// Context with the three built-in manifest converters registered.
    /// Decryption plugins always come from the host.
    pub fn with_default_converters() -> Self {
        let mut context = KomContext::new();
        context.register_converter(Box::new(V2Converter));
        context.register_converter(Box::new(V3Converter));
        context.register_converter(Box::new(V4Converter));
        context
    }

    /// Register a decryption plugin for `algorithm`, replacing any prior
    /// registration for the same id.
    pub fn register_plugin(&mut self, algorithm: u8, plugin: Box<dyn DecryptionPlugin>) {
        self.plugins.insert(algorithm, plugin);
    }

    /// Register a manifest converter under its declared supported version.
    pub fn register_converter(&mut self, converter: Box<dyn ManifestConverter>) {
        self.converters.insert(converter.supported_version(), converter);
    }

    /// Look up the decryption plugin for `algorithm`.
    pub fn plugin(&self, algorithm: u8) -> Option<&dyn DecryptionPlugin> {
        self.plugins.get(&algorithm).map(Box::as_ref)
    }

    /// Look up the manifest converter for `version`.
    pub fn converter(&self, version: u8) -> Option<&dyn ManifestConverter> {
        self.converters.get(&version).map(Box::as_ref)
    }
}

impl Default for KomContext {
    fn default() -> Self {
        KomContext::with_default_converters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullPlugin;

    impl DecryptionPlugin for NullPlugin {
        fn decrypt(
            &self,
            data: &[u8],
            _archive_base_name: &str,
            _algorithm: u8,
        ) -> Result<Vec<u8>, DecryptError> {
            Ok(data.to_vec())
        }
    }

    #[test]
    fn test_plugin_lookup() {
        let mut context = KomContext::new();
        assert!(context.plugin(2).is_none());

        context.register_plugin(2, Box::new(NullPlugin));
        let plugin = context.plugin(2).unwrap();
        assert_eq!(plugin.decrypt(b"abc", "base", 2).unwrap(), b"abc");
        assert!(context.plugin(3).is_none());
    }

    #[test]
    fn test_default_converters_cover_all_versions() {
        let context = KomContext::with_default_converters();
        for version in [2, 3, 4] {
            let converter = context.converter(version).unwrap();
            assert_eq!(converter.supported_version(), version);
        }
        assert!(context.converter(5).is_none());
    }
}
