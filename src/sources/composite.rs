//! Ordered aggregates of sibling property sources.

use super::{PropertySource, SharedSource};
use std::collections::HashSet;
use std::sync::Arc;

/// An immutable, named group of property sources.
///
/// Lookup walks the children in insertion order and returns the first hit, so
/// the first child has the highest precedence within the group.
///
/// # Examples
///
/// ```rust
/// use layered_config::sources::{CompositeBuilder, MapSource, PropertySource};
///
/// let composite = CompositeBuilder::new("group")
///     .with_source(MapSource::new("first").with_property("k", "1"))
///     .with_source(MapSource::new("second").with_property("k", "2"))
///     .build();
///
/// assert_eq!(composite.get_property("k").as_deref(), Some("1"));
/// ```
#[derive(Debug, Clone)]
pub struct CompositeSource {
    name: String,
    sources: Vec<SharedSource>,
}

impl CompositeSource {
    /// Create a composite directly from its children.
    pub fn new(name: impl Into<String>, sources: Vec<SharedSource>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }

    /// The children, highest precedence first.
    pub fn sources(&self) -> &[SharedSource] {
        &self.sources
    }

    /// Names of the direct children, in order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the composite has no children.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl PropertySource for CompositeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_property(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|s| s.get_property(key))
    }

    fn contains_property(&self, key: &str) -> bool {
        self.sources.iter().any(|s| s.contains_property(key))
    }

    fn property_names(&self) -> Option<Vec<String>> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for source in &self.sources {
            for name in source.property_names().unwrap_or_default() {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }
        Some(names)
    }

    fn children(&self) -> Option<&[SharedSource]> {
        Some(&self.sources)
    }
}

/// Owned, mutable staging area for a [`CompositeSource`].
#[derive(Debug, Clone)]
pub struct CompositeBuilder {
    name: String,
    sources: Vec<SharedSource>,
}

impl CompositeBuilder {
    /// Start an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
        }
    }

    /// Start from the children of an existing composite.
    pub fn from_composite(composite: &CompositeSource) -> Self {
        Self {
            name: composite.name.clone(),
            sources: composite.sources.clone(),
        }
    }

    /// Append a source; it ranks below every source already present.
    pub fn push(&mut self, source: SharedSource) {
        self.sources.push(source);
    }

    /// Append a source by value.
    pub fn with_source<S: PropertySource + 'static>(mut self, source: S) -> Self {
        self.push(Arc::new(source));
        self
    }

    /// The group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of staged children.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Snapshot the staged children into an immutable composite.
    pub fn build(&self) -> CompositeSource {
        CompositeSource::new(self.name.clone(), self.sources.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MapSource;

    fn group() -> CompositeSource {
        CompositeBuilder::new("group")
            .with_source(
                MapSource::new("a")
                    .with_property("shared", "a")
                    .with_property("only.a", "1"),
            )
            .with_source(
                MapSource::new("b")
                    .with_property("shared", "b")
                    .with_property("only.b", "2"),
            )
            .build()
    }

    #[test]
    fn test_first_child_wins() {
        let composite = group();
        assert_eq!(composite.get_property("shared").as_deref(), Some("a"));
        assert_eq!(composite.get_property("only.b").as_deref(), Some("2"));
        assert_eq!(composite.get_property("missing"), None);
    }

    #[test]
    fn test_property_names_deduplicated_in_order() {
        let names = group().property_names().unwrap();
        assert_eq!(names, vec!["only.a", "shared", "only.b"]);
    }

    #[test]
    fn test_builder_snapshot_is_independent() {
        let mut builder = CompositeBuilder::new("g");
        builder.push(Arc::new(MapSource::new("one")));
        let first = builder.build();
        builder.push(Arc::new(MapSource::new("two")));

        assert_eq!(first.source_names(), vec!["one"]);
        assert_eq!(builder.build().source_names(), vec!["one", "two"]);
    }

    #[test]
    fn test_children_exposed() {
        let composite = group();
        assert_eq!(composite.children().map(|c| c.len()), Some(2));
        assert_eq!(CompositeBuilder::from_composite(&composite).len(), 2);
    }
}
