//! Builder for constructing ResolutionEngine instances.

use crate::core::search::SearchConfig;
use crate::core::{FileResolutionEngine, ResolutionEngine};
use crate::error::{ConfigError, Result};
use crate::format::{FormatLoader, FormatRegistry};
use crate::observer::ProfileActivationObserver;
use crate::resource::ResourceResolver;
use crate::sources::{RemoteConfigLocator, RuntimeContext, validate_remote_uri};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builder for constructing a [`ResolutionEngine`].
///
/// Provides a fluent interface for every resolution setting. Nothing is
/// loaded until [`ResolutionEngine::resolve`] is called.
///
/// # Examples
///
/// ```rust,no_run
/// use layered_config::prelude::*;
/// use layered_config::resource::FileSystemResolver;
///
/// # fn example() -> Result<()> {
/// let engine = ResolutionEngine::builder()
///     .with_application_name("foo")
///     .with_profiles(["development", "db"])
///     .with_resource_resolver(
///         FileSystemResolver::new("/srv/foo").with_classpath_root("/srv/foo/resources"),
///     )
///     .build()?;
///
/// let resolved = engine.resolve()?;
/// println!("active profiles: {:?}", resolved.active_profiles());
/// # Ok(())
/// # }
/// ```
pub struct ResolutionEngineBuilder {
    application_name: Option<String>,
    profiles: Vec<String>,
    default_profiles: Option<Vec<String>>,
    default_properties: BTreeMap<String, String>,
    remote: Option<Arc<dyn RemoteConfigLocator>>,
    #[cfg(feature = "remote")]
    config_server_uri: Option<String>,
    fail_fast: bool,
    context: Option<RuntimeContext>,
    search: SearchConfig,
    files: FileResolutionEngine,
    extra_loaders: Vec<Arc<dyn FormatLoader>>,
}

impl ResolutionEngineBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            application_name: None,
            profiles: Vec::new(),
            default_profiles: None,
            default_properties: BTreeMap::new(),
            remote: None,
            #[cfg(feature = "remote")]
            config_server_uri: None,
            fail_fast: false,
            context: None,
            search: SearchConfig::default(),
            files: FileResolutionEngine::new(),
            extra_loaders: Vec::new(),
        }
    }

    /// Set the application name, seeded as `application.name`.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Set the explicitly active profiles.
    ///
    /// The last profile listed has the highest precedence.
    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    /// Add one explicitly active profile after the existing ones.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profiles.push(profile.into());
        self
    }

    /// Replace the fallback profiles used when nothing is active.
    pub fn with_default_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_profiles = Some(profiles.into_iter().map(Into::into).collect());
        self
    }

    /// Add a property to the lowest precedence `defaultProperties` source.
    pub fn with_default_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_properties.insert(key.into(), value.into());
        self
    }

    /// Fetch remote configuration through `locator`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use layered_config::prelude::*;
    /// use layered_config::sources::{MapSource, SharedSource};
    /// use std::sync::Arc;
    ///
    /// # fn example() -> Result<()> {
    /// let engine = ResolutionEngine::builder()
    ///     .with_remote(|_env: &Environment| -> Result<Option<SharedSource>> {
    ///         Ok(Some(Arc::new(MapSource::new("remote").with_property("foo", "remote"))))
    ///     })
    ///     .build()?;
    ///
    /// assert_eq!(engine.resolve()?.get_property("foo").as_deref(), Some("remote"));
    /// # Ok(())
    /// # }
    /// # example().unwrap();
    /// ```
    pub fn with_remote<L: RemoteConfigLocator + 'static>(mut self, locator: L) -> Self {
        self.remote = Some(Arc::new(locator));
        self
    }

    /// Fetch remote configuration through a shared locator.
    pub fn with_shared_remote(mut self, locator: Arc<dyn RemoteConfigLocator>) -> Self {
        self.remote = Some(locator);
        self
    }

    /// Fetch remote configuration from a config server at `uri`.
    ///
    /// The locator is created in [`build`](Self::build), which fails if the
    /// URI is not a valid `http://` or `https://` URI.
    #[cfg(feature = "remote")]
    pub fn with_config_server(mut self, uri: impl Into<String>) -> Self {
        self.config_server_uri = Some(uri.into());
        self
    }

    /// Abort resolution when the remote locator fails or finds nothing.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Seed system properties and environment variables from `context`.
    ///
    /// Defaults to [`RuntimeContext::from_process`].
    pub fn with_runtime_context(mut self, context: RuntimeContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Replace the search settings.
    pub fn with_search_config(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Replace the search locations (least specific first).
    pub fn with_search_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the search names (least specific first).
    pub fn with_search_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Override the search locations with a comma-separated list.
    pub fn with_config_location(mut self, location: impl Into<String>) -> Self {
        self.search.config_location = Some(location.into());
        self
    }

    /// Override the search names with a comma-separated list.
    pub fn with_config_name(mut self, name: impl Into<String>) -> Self {
        self.search.config_name = Some(name.into());
        self
    }

    /// Resolve locations through `resolver` instead of the filesystem.
    pub fn with_resource_resolver<R: ResourceResolver + 'static>(mut self, resolver: R) -> Self {
        self.files = self.files.with_resource_resolver(resolver);
        self
    }

    /// Replace the format registry.
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.files = self.files.with_formats(formats);
        self
    }

    /// Register an additional format loader, tried after the built-in ones.
    ///
    /// Its extensions are appended to the searched extensions.
    pub fn with_format_loader<L: FormatLoader + 'static>(mut self, loader: L) -> Self {
        self.extra_loaders.push(Arc::new(loader));
        self
    }

    /// Report profile declarations to `observer`.
    pub fn with_observer<O: ProfileActivationObserver + 'static>(mut self, observer: O) -> Self {
        self.files = self.files.with_observer(Arc::new(observer));
        self
    }

    /// Report profile declarations to a shared observer.
    pub fn with_shared_observer(mut self, observer: Arc<dyn ProfileActivationObserver>) -> Self {
        self.files = self.files.with_observer(observer);
        self
    }

    /// Bound the number of profiles processed in one resolution.
    pub fn with_max_profile_iterations(mut self, limit: usize) -> Self {
        self.files = self.files.with_max_profile_iterations(limit);
        self
    }

    /// Validate the settings and build the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] if:
    /// - the remote endpoint is empty or lacks an `http://`/`https://` scheme
    /// - no search location, name or extension remains
    /// - the profile iteration bound is zero
    pub fn build(self) -> Result<ResolutionEngine> {
        #[allow(unused_mut)]
        let mut remote = self.remote;

        #[cfg(feature = "remote")]
        if let Some(uri) = self.config_server_uri {
            let locator = crate::sources::ConfigServerLocator::builder()
                .with_uri(uri)
                .build()?;
            remote = Some(Arc::new(locator));
        }

        if let Some(endpoint) = remote.as_ref().and_then(|r| r.endpoint()) {
            validate_remote_uri(endpoint)?;
        }

        let mut search = self.search;
        let mut formats = self.files.formats().clone();
        for loader in self.extra_loaders {
            for ext in loader.file_extensions() {
                if !search.extensions.iter().any(|e| e == ext) {
                    search.extensions.push(ext.to_string());
                }
            }
            formats.register(loader);
        }
        search.validate()?;

        if self.files.max_profile_iterations() == 0 {
            return Err(ConfigError::Configuration(
                "The profile iteration bound must be at least 1".to_string(),
            ));
        }

        Ok(ResolutionEngine {
            application_name: self.application_name,
            profiles: self.profiles,
            default_profiles: self.default_profiles,
            default_properties: self.default_properties,
            remote,
            fail_fast: self.fail_fast,
            context: self.context.unwrap_or_else(RuntimeContext::from_process),
            files: self.files.with_search_config(search).with_formats(formats),
        })
    }
}

impl Default for ResolutionEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
