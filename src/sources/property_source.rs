//! Property source trait and the map-backed implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared, immutable handle to a property source.
pub type SharedSource = Arc<dyn PropertySource>;

/// A named key/value lookup surface.
///
/// Sources are immutable once constructed and are shared between the
/// environment, composites and the caller through [`SharedSource`].
///
/// # Examples
///
/// ```rust
/// use layered_config::sources::{MapSource, PropertySource};
///
/// let source = MapSource::new("defaults").with_property("server.port", "8080");
/// assert_eq!(source.get_property("server.port").as_deref(), Some("8080"));
/// ```
pub trait PropertySource: fmt::Debug + Send + Sync {
    /// The unique name of this source.
    fn name(&self) -> &str;

    /// Look up a single property.
    fn get_property(&self, key: &str) -> Option<String>;

    /// Whether this source holds `key`.
    fn contains_property(&self, key: &str) -> bool {
        self.get_property(key).is_some()
    }

    /// All keys this source can answer, if it is enumerable.
    fn property_names(&self) -> Option<Vec<String>> {
        None
    }

    /// Child sources, when this source is an aggregate.
    fn children(&self) -> Option<&[SharedSource]> {
        None
    }
}

/// Enumerable property source backed by an ordered map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapSource {
    name: String,
    properties: BTreeMap<String, String>,
}

impl MapSource {
    /// Create an empty source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Create a source from an existing map.
    pub fn from_map(name: impl Into<String>, properties: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    /// Add a property, replacing any previous value.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a property, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the source holds no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Borrow the underlying map.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

impl PropertySource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_property(&self, key: &str) -> Option<String> {
        self.properties.get(key).cloned()
    }

    fn contains_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    fn property_names(&self) -> Option<Vec<String>> {
        Some(self.properties.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_source_lookup() {
        let source = MapSource::new("test")
            .with_property("foo", "bar")
            .with_property("foo.db", "mycooldb");

        assert_eq!(source.name(), "test");
        assert_eq!(source.get_property("foo.db").as_deref(), Some("mycooldb"));
        assert!(source.contains_property("foo"));
        assert!(!source.contains_property("missing"));
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn test_map_source_names_are_sorted() {
        let source = MapSource::new("test")
            .with_property("b", "2")
            .with_property("a", "1");

        assert_eq!(
            source.property_names(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_insert_overwrites() {
        let mut source = MapSource::new("test");
        source.insert("k", "1");
        source.insert("k", "2");
        assert_eq!(source.get_property("k").as_deref(), Some("2"));
        assert_eq!(source.len(), 1);
    }
}
