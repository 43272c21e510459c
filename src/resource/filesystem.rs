//! Filesystem-backed resources.

use super::{CLASSPATH_PREFIX, FILE_PREFIX, MissingResource, Resource, ResourceResolver};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resolves `classpath:` and `file:` locations against directories on disk.
///
/// `classpath:` locations are looked up under each classpath root in order and
/// the first existing match is returned. `file:` and scheme-less locations are
/// resolved against `base_dir` unless absolute. Any other scheme never exists.
///
/// # Examples
///
/// ```rust,no_run
/// use layered_config::resource::{FileSystemResolver, ResourceResolver};
///
/// let resolver = FileSystemResolver::new("/srv/app").with_classpath_root("/srv/app/resources");
/// let resource = resolver.resolve("classpath:/application.yml");
/// println!("{} exists: {}", resource.uri(), resource.exists());
/// ```
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    base_dir: PathBuf,
    classpath_roots: Vec<PathBuf>,
}

impl FileSystemResolver {
    /// Resolve relative paths against `base_dir`, with no classpath roots.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            classpath_roots: Vec::new(),
        }
    }

    /// Resolve against the process working directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    /// Add a directory searched for `classpath:` locations.
    pub fn with_classpath_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.classpath_roots.push(root.into());
        self
    }

    /// The base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The classpath roots, in search order.
    pub fn classpath_roots(&self) -> &[PathBuf] {
        &self.classpath_roots
    }

    fn resolve_classpath(&self, path: &str) -> Option<PathBuf> {
        let relative = path.trim_start_matches('/');
        self.classpath_roots
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.is_file())
    }

    fn resolve_file(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl Default for FileSystemResolver {
    fn default() -> Self {
        Self::current_dir()
    }
}

impl ResourceResolver for FileSystemResolver {
    fn resolve(&self, location: &str) -> Box<dyn Resource> {
        if let Some(path) = location.strip_prefix(CLASSPATH_PREFIX) {
            return match self.resolve_classpath(path) {
                Some(found) => Box::new(FileResource::new(location, found)),
                None => Box::new(MissingResource::new(location)),
            };
        }

        let path = match location.strip_prefix(FILE_PREFIX) {
            Some(path) => path,
            None if location.contains("://") => return Box::new(MissingResource::new(location)),
            None => location,
        };
        Box::new(FileResource::new(location, self.resolve_file(path)))
    }
}

/// A file on disk.
#[derive(Debug, Clone)]
struct FileResource {
    location: String,
    path: PathBuf,
}

impl FileResource {
    fn new(location: &str, path: PathBuf) -> Self {
        Self {
            location: location.to_string(),
            path,
        }
    }
}

impl Resource for FileResource {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    fn uri(&self) -> String {
        format!("{} ({})", self.location, self.path.display())
    }
}
