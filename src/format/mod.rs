//! File format loaders.
//!
//! A [`FormatLoader`] turns raw bytes into a flat [`MapSource`]. Nested
//! structures are flattened into dotted keys, sequences into `key[i]`.

mod properties;
mod structured;
mod yaml;

pub use properties::PropertiesLoader;
pub use structured::StructuredLoader;
pub use yaml::{ACTIVATE_ON_PROFILE_PROPERTY, YamlLoader};

use crate::error::Result;
use crate::sources::MapSource;
use std::sync::Arc;

/// Parses one file format into a property source.
pub trait FormatLoader: Send + Sync {
    /// Extensions this loader handles, without the leading dot.
    fn file_extensions(&self) -> &[&'static str];

    /// Whether this loader handles the given file name.
    fn supports(&self, file_name: &str) -> bool {
        let Some((_, extension)) = file_name.rsplit_once('.') else {
            return false;
        };
        self.file_extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Parse `contents` into a source called `source_name`.
    ///
    /// With `profile` set, only sections that apply to that profile are
    /// loaded. `Ok(None)` means nothing applied or the document was empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`](crate::error::ConfigError::Parse) for
    /// invalid UTF-8 or malformed documents.
    fn load(
        &self,
        source_name: &str,
        contents: &[u8],
        profile: Option<&str>,
    ) -> Result<Option<MapSource>>;
}

/// Ordered set of format loaders.
///
/// The default registry knows `properties`, `yml`, `yaml`, `toml` and `json`,
/// in that order.
#[derive(Clone)]
pub struct FormatRegistry {
    loaders: Vec<Arc<dyn FormatLoader>>,
}

impl FormatRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Register a loader after the existing ones.
    pub fn with_loader<L: FormatLoader + 'static>(mut self, loader: L) -> Self {
        self.register(Arc::new(loader));
        self
    }

    /// Register a shared loader after the existing ones.
    pub fn register(&mut self, loader: Arc<dyn FormatLoader>) {
        self.loaders.push(loader);
    }

    /// Every known extension, in registration order, without duplicates.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = Vec::new();
        for ext in self.loaders.iter().flat_map(|l| l.file_extensions()) {
            if !extensions.iter().any(|e| e == ext) {
                extensions.push(ext.to_string());
            }
        }
        extensions
    }

    /// The first loader that supports `file_name`.
    pub fn loader_for(&self, file_name: &str) -> Option<&dyn FormatLoader> {
        self.loaders
            .iter()
            .find(|loader| loader.supports(file_name))
            .map(|loader| loader.as_ref())
    }

    /// Number of registered loaders.
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Whether no loader is registered.
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::empty()
            .with_loader(PropertiesLoader)
            .with_loader(YamlLoader)
            .with_loader(StructuredLoader::toml())
            .with_loader(StructuredLoader::json())
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

pub(crate) fn utf8<'a>(source_name: &str, contents: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(contents)
        .map_err(|e| crate::error::ConfigError::parse(source_name, format!("invalid UTF-8: {}", e)))
}

pub(crate) fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extensions() {
        let registry = FormatRegistry::default();
        assert_eq!(
            registry.extensions(),
            vec!["properties", "yml", "yaml", "toml", "json"]
        );
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_loader_lookup() {
        let registry = FormatRegistry::default();
        assert!(registry.loader_for("application.yml").is_some());
        assert!(registry.loader_for("application.YAML").is_some());
        assert!(registry.loader_for("application.json").is_some());
        assert!(registry.loader_for("application.txt").is_none());
        assert!(registry.loader_for("application").is_none());
        assert!(FormatRegistry::empty().loader_for("a.yml").is_none());
    }

    #[test]
    fn test_invalid_utf8() {
        let err = utf8("bad", &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, crate::error::ConfigError::Parse { .. }));
    }
}
