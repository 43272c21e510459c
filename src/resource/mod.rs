//! Resolving search locations to readable resources.

mod filesystem;
mod memory;

pub use filesystem::FileSystemResolver;
pub use memory::MemoryResolver;

use std::io;

/// Prefix for locations searched under the classpath roots.
pub const CLASSPATH_PREFIX: &str = "classpath:";

/// Prefix for plain filesystem locations.
pub const FILE_PREFIX: &str = "file:";

/// Something a location resolved to. It may or may not exist.
pub trait Resource: Send {
    /// Whether the resource can be loaded.
    fn exists(&self) -> bool;

    /// Read the full contents.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the resource exists but cannot be read.
    fn read(&self) -> io::Result<Vec<u8>>;

    /// Human-readable identifier used in logs and errors.
    fn uri(&self) -> String;
}

/// Turns location strings such as `classpath:/application.yml` into resources.
///
/// Resolution itself never fails: a location that points nowhere yields a
/// resource whose [`exists`](Resource::exists) is `false`.
pub trait ResourceResolver: Send + Sync {
    /// Resolve a location string.
    fn resolve(&self, location: &str) -> Box<dyn Resource>;
}

/// Resource that does not exist.
#[derive(Debug, Clone)]
pub(crate) struct MissingResource {
    location: String,
}

impl MissingResource {
    pub(crate) fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

impl Resource for MissingResource {
    fn exists(&self) -> bool {
        false
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", self.location),
        ))
    }

    fn uri(&self) -> String {
        self.location.clone()
    }
}
