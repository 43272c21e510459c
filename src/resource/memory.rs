//! In-memory resources, mostly for tests and embedding.

use super::{MissingResource, Resource, ResourceResolver};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Entry {
    Bytes(Arc<[u8]>),
    Unreadable(String),
}

/// Resolver over a fixed map of location strings.
///
/// Locations are matched exactly, so register them the way the search will
/// produce them, e.g. `classpath:/application-db.yml`.
///
/// # Examples
///
/// ```rust
/// use layered_config::resource::{MemoryResolver, ResourceResolver};
///
/// let resolver = MemoryResolver::new().with_resource("classpath:/application.yml", "a: 1");
/// assert!(resolver.resolve("classpath:/application.yml").exists());
/// assert!(!resolver.resolve("classpath:/application.toml").exists());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    entries: HashMap<String, Entry>,
}

impl MemoryResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register contents for a location.
    pub fn with_resource(
        mut self,
        location: impl Into<String>,
        contents: impl AsRef<[u8]>,
    ) -> Self {
        self.insert(location, contents);
        self
    }

    /// Register a location that exists but fails to read.
    pub fn with_unreadable(
        mut self,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.entries
            .insert(location.into(), Entry::Unreadable(message.into()));
        self
    }

    /// Register or overwrite contents for a location.
    pub fn insert(&mut self, location: impl Into<String>, contents: impl AsRef<[u8]>) {
        self.entries
            .insert(location.into(), Entry::Bytes(Arc::from(contents.as_ref())));
    }

    /// Number of registered locations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceResolver for MemoryResolver {
    fn resolve(&self, location: &str) -> Box<dyn Resource> {
        match self.entries.get(location) {
            Some(entry) => Box::new(MemoryResource {
                location: location.to_string(),
                entry: entry.clone(),
            }),
            None => Box::new(MissingResource::new(location)),
        }
    }
}

#[derive(Debug)]
struct MemoryResource {
    location: String,
    entry: Entry,
}

impl Resource for MemoryResource {
    fn exists(&self) -> bool {
        true
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        match &self.entry {
            Entry::Bytes(bytes) => Ok(bytes.to_vec()),
            Entry::Unreadable(message) => Err(io::Error::other(message.clone())),
        }
    }

    fn uri(&self) -> String {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_resource() {
        let mut resolver = MemoryResolver::new();
        resolver.insert("file:./a.properties", "a=1");
        assert_eq!(resolver.len(), 1);

        let resource = resolver.resolve("file:./a.properties");
        assert!(resource.exists());
        assert_eq!(resource.read().unwrap(), b"a=1");
        assert_eq!(resource.uri(), "file:./a.properties");
    }

    #[test]
    fn test_unreadable_resource() {
        let resolver =
            MemoryResolver::new().with_unreadable("file:./broken.yml", "permission denied");
        let resource = resolver.resolve("file:./broken.yml");

        assert!(resource.exists());
        let err = resource.read().unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }
}
