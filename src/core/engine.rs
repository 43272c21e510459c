//! The resolution pipeline: seeding, remote lookup and local file resolution.

use crate::core::accumulator::SourceAccumulator;
use crate::core::profile::{Activation, DEFAULT_MAX_PROFILE_ITERATIONS};
use crate::core::search::{Candidate, CandidateSearch, SearchConfig};
use crate::core::{
    APPLICATION_CONFIGURATION_SOURCE_NAME, APPLICATION_NAME_PROPERTY,
    DEFAULT_PROPERTIES_SOURCE_NAME, Environment, Profile, ProfileDeclarations, ProfileWorklist,
    ResolvedConfig, ResolutionEngineBuilder,
};
use crate::error::{ConfigError, Result};
use crate::format::FormatRegistry;
use crate::observer::{ActivationEvent, ProfileActivationObserver};
use crate::resource::{FileSystemResolver, ResourceResolver};
use crate::sources::{
    CONFIG_SERVICE_SOURCE_NAME, CompositeSource, MapSource, RandomValueSource,
    RemoteConfigLocator, RuntimeContext, SYSTEM_ENVIRONMENT_SOURCE_NAME,
    SYSTEM_PROPERTIES_SOURCE_NAME, SharedSource,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name given to declarations found in the seeded environment.
const SEEDED_DECLARATIONS_SOURCE: &str = "environment";

/// Discovers, loads and stacks local configuration files into an environment.
///
/// This is the file half of a resolution with no remote or process coupling:
/// hand it an [`Environment`] and it adds the
/// `applicationConfigurationProperties` aggregate.
///
/// # Examples
///
/// ```rust
/// use layered_config::core::{Environment, FileResolutionEngine};
/// use layered_config::resource::MemoryResolver;
///
/// let resolver = MemoryResolver::new()
///     .with_resource("classpath:/application.properties", "foo=baz");
/// let files = FileResolutionEngine::new().with_resource_resolver(resolver);
///
/// let mut env = Environment::new();
/// files.load(&mut env).unwrap();
/// assert_eq!(env.get_property("foo").as_deref(), Some("baz"));
/// ```
#[derive(Clone)]
pub struct FileResolutionEngine {
    search: SearchConfig,
    resolver: Arc<dyn ResourceResolver>,
    formats: FormatRegistry,
    observer: Option<Arc<dyn ProfileActivationObserver>>,
    max_profile_iterations: usize,
}

impl FileResolutionEngine {
    /// Default search, filesystem resources relative to the working directory,
    /// and every built-in format.
    pub fn new() -> Self {
        Self {
            search: SearchConfig::default(),
            resolver: Arc::new(FileSystemResolver::current_dir()),
            formats: FormatRegistry::default(),
            observer: None,
            max_profile_iterations: DEFAULT_MAX_PROFILE_ITERATIONS,
        }
    }

    /// Replace the search settings.
    pub fn with_search_config(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Replace the resource resolver.
    pub fn with_resource_resolver<R: ResourceResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Replace the resource resolver with a shared one.
    pub fn with_shared_resolver(mut self, resolver: Arc<dyn ResourceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the format registry.
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Report profile declarations to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn ProfileActivationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Bound the number of profile tokens processed.
    pub fn with_max_profile_iterations(mut self, limit: usize) -> Self {
        self.max_profile_iterations = limit;
        self
    }

    /// The search settings.
    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    /// The format registry.
    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// The profile iteration bound.
    pub fn max_profile_iterations(&self) -> usize {
        self.max_profile_iterations
    }

    /// Resolve local files into `env` and return the aggregate that was added.
    ///
    /// # Errors
    ///
    /// Fails if `env` already holds an aggregate, a resource cannot be read or
    /// parsed, or profile processing does not converge.
    pub fn load(&self, env: &mut Environment) -> Result<Arc<CompositeSource>> {
        if env.sources().contains(APPLICATION_CONFIGURATION_SOURCE_NAME) {
            return Err(ConfigError::EnvironmentAlreadyResolved(
                APPLICATION_CONFIGURATION_SOURCE_NAME.to_string(),
            ));
        }

        let search = CandidateSearch::from_config(&self.search, env);
        let mut worklist = ProfileWorklist::new(self.max_profile_iterations);
        let mut accumulator = SourceAccumulator::new();

        let mut explicit = env.active_profiles().to_vec();
        let seeded = ProfileDeclarations::from_environment(env);
        self.apply_declarations(SEEDED_DECLARATIONS_SOURCE, &seeded, &mut worklist, env);
        let seeded = seeded.all();
        explicit.retain(|profile| !seeded.contains(profile));

        worklist.push_explicit(&explicit);
        if worklist.is_empty() {
            worklist.push_defaults(env.default_profiles());
        }
        worklist.push_base();

        while let Some(token) = worklist.pop()? {
            tracing::trace!(profile = %token, "Processing profile");
            let processed = worklist.processed_profiles();
            for candidate in search.candidates(&token, &processed) {
                let Some(source) = self.load_candidate(&candidate)? else {
                    continue;
                };
                let declarations = ProfileDeclarations::from_source(source.as_ref(), env);
                self.apply_declarations(source.name(), &declarations, &mut worklist, env);
                accumulator.add(&token, source)?;
            }
            worklist.mark_processed(token);
        }

        let aggregate = Arc::new(accumulator.finish());
        SourceAccumulator::insert_into(env, aggregate.clone())?;
        tracing::debug!(
            groups = ?aggregate.source_names(),
            active_profiles = ?env.active_profile_names(),
            "Resolved local configuration"
        );
        Ok(aggregate)
    }

    /// Load one candidate. Missing resources and empty documents yield `None`.
    fn load_candidate(&self, candidate: &Candidate) -> Result<Option<SharedSource>> {
        let location = candidate.location.as_str();
        let resource = self.resolver.resolve(location);
        if !resource.exists() {
            tracing::trace!(location, "Skipped missing config");
            return Ok(None);
        }
        let Some(loader) = self.formats.loader_for(location) else {
            tracing::trace!(location, "Skipped config with no registered format");
            return Ok(None);
        };

        let bytes = resource.read().map_err(|source| ConfigError::ResourceRead {
            location: resource.uri(),
            source,
        })?;
        let name = source_name(candidate);
        match loader.load(&name, &bytes, candidate.profile.as_deref())? {
            Some(source) => {
                tracing::debug!(
                    location,
                    profile = candidate.profile.as_deref().unwrap_or(""),
                    properties = source.len(),
                    "Loaded config file"
                );
                Ok(Some(Arc::new(source)))
            }
            None => {
                tracing::debug!(
                    location,
                    profile = candidate.profile.as_deref().unwrap_or(""),
                    "Skipped empty config file"
                );
                Ok(None)
            }
        }
    }

    fn apply_declarations(
        &self,
        source: &str,
        declarations: &ProfileDeclarations,
        worklist: &mut ProfileWorklist,
        env: &mut Environment,
    ) {
        if declarations.is_empty() {
            return;
        }

        let mut event = ActivationEvent {
            source: source.to_string(),
            activated: Vec::new(),
            included: Vec::new(),
            ignored: Vec::new(),
        };

        match worklist.activate(&declarations.active) {
            Activation::Applied(pushed) => {
                if !declarations.active.is_empty() {
                    tracing::debug!(
                        source,
                        profiles = ?names(&declarations.active),
                        "Activated profiles"
                    );
                    prepend_profiles(env, &declarations.active);
                }
                event.activated = pushed;
            }
            Activation::Ignored(ignored) => {
                tracing::debug!(
                    source,
                    profiles = ?names(&ignored),
                    "Profiles already activated, ignoring declaration"
                );
                event.ignored = ignored;
            }
        }

        if !declarations.include.is_empty() {
            tracing::debug!(source, profiles = ?names(&declarations.include), "Included profiles");
            event.included = worklist.include(&declarations.include);
            prepend_profiles(env, &declarations.include);
        }

        if let Some(observer) = &self.observer {
            observer.on_activation(&event);
        }
    }
}

impl Default for FileResolutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileResolutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileResolutionEngine")
            .field("search", &self.search)
            .field("formats", &self.formats)
            .field("observer", &self.observer.is_some())
            .field("max_profile_iterations", &self.max_profile_iterations)
            .finish()
    }
}

/// `applicationConfig: [<location>]`, plus `#<profile>` for filtered loads.
fn source_name(candidate: &Candidate) -> String {
    match &candidate.profile {
        Some(profile) => format!("applicationConfig: [{}]#{}", candidate.location, profile),
        None => format!("applicationConfig: [{}]", candidate.location),
    }
}

/// Prepend so the active list ends up in declared order, ahead of earlier entries.
fn prepend_profiles(env: &mut Environment, profiles: &[Profile]) {
    for profile in profiles.iter().rev() {
        env.prepend_active_profile(profile.name());
    }
}

fn names(profiles: &[Profile]) -> Vec<&str> {
    profiles.iter().map(Profile::name).collect()
}

/// Orchestrates one full resolution.
///
/// Seeds a fresh [`Environment`] from the [`RuntimeContext`], asks the remote
/// locator (if any) for configuration, resolves local files and returns the
/// result. The final precedence, highest first, is:
///
/// `systemProperties > systemEnvironment > <remote> > random >
/// applicationConfigurationProperties > defaultProperties`
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
/// use layered_config::resource::MemoryResolver;
///
/// # fn example() -> Result<()> {
/// let engine = ResolutionEngine::builder()
///     .with_application_name("foo")
///     .with_profiles(["db"])
///     .with_resource_resolver(
///         MemoryResolver::new()
///             .with_resource("classpath:/application.yml", "foo:\n  db: base")
///             .with_resource("classpath:/application-db.yml", "foo:\n  db: mycooldb"),
///     )
///     .build()?;
///
/// let resolved = engine.resolve()?;
/// assert_eq!(resolved.get_property("foo.db").as_deref(), Some("mycooldb"));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct ResolutionEngine {
    pub(crate) application_name: Option<String>,
    pub(crate) profiles: Vec<String>,
    pub(crate) default_profiles: Option<Vec<String>>,
    pub(crate) default_properties: BTreeMap<String, String>,
    pub(crate) remote: Option<Arc<dyn RemoteConfigLocator>>,
    pub(crate) fail_fast: bool,
    pub(crate) context: RuntimeContext,
    pub(crate) files: FileResolutionEngine,
}

impl ResolutionEngine {
    /// Create a new builder.
    pub fn builder() -> ResolutionEngineBuilder {
        ResolutionEngineBuilder::new()
    }

    /// The explicitly requested profiles, in caller order.
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// The file resolution half of this engine.
    pub fn files(&self) -> &FileResolutionEngine {
        &self.files
    }

    /// Whether remote failures abort resolution.
    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Create a fresh environment seeded from the runtime context.
    ///
    /// Sources, highest precedence first: `systemProperties`,
    /// `systemEnvironment`, `random`, `defaultProperties`.
    pub fn seed_environment(&self) -> Environment {
        let mut env = Environment::new();
        env.add_last(self.context.system_properties_source());
        env.add_last(self.context.system_environment_source());
        env.add_last(RandomValueSource::new());

        let mut defaults = MapSource::from_map(
            DEFAULT_PROPERTIES_SOURCE_NAME,
            self.default_properties.clone(),
        );
        if let Some(name) = &self.application_name {
            defaults.insert(APPLICATION_NAME_PROPERTY, name.clone());
        }
        env.add_last(defaults);

        env.set_active_profiles(&self.profiles);
        if let Some(defaults) = &self.default_profiles {
            env.set_default_profiles(defaults);
        }
        env
    }

    /// Run a full resolution against a freshly seeded environment.
    ///
    /// # Errors
    ///
    /// Any fatal [`ConfigError`]; remote failures only with fail-fast enabled.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let mut env = self.seed_environment();
        let source = self.resolve_environment(&mut env)?;
        Ok(ResolvedConfig::new(env, source))
    }

    /// Resolve into a caller-provided environment and return the final source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvironmentAlreadyResolved`] if `env` already
    /// holds the output of an earlier resolution, plus every error
    /// [`resolve`](Self::resolve) can return.
    pub fn resolve_environment(&self, env: &mut Environment) -> Result<SharedSource> {
        for name in [APPLICATION_CONFIGURATION_SOURCE_NAME, CONFIG_SERVICE_SOURCE_NAME] {
            if env.sources().contains(name) {
                return Err(ConfigError::EnvironmentAlreadyResolved(name.to_string()));
            }
        }

        let remote = self.locate_remote(env)?;
        if let Some(remote) = &remote {
            if env.sources().contains(remote.name()) {
                return Err(ConfigError::EnvironmentAlreadyResolved(remote.name().to_string()));
            }
            // Directly below the lowest-ranked system source that is present.
            let anchor = [SYSTEM_PROPERTIES_SOURCE_NAME, SYSTEM_ENVIRONMENT_SOURCE_NAME]
                .into_iter()
                .filter_map(|name| env.sources().position(name).map(|pos| (pos, name)))
                .max();
            match anchor {
                Some((_, name)) => env.sources_mut().add_after(name, remote.clone())?,
                None => env.sources_mut().add_first(remote.clone()),
            }
            tracing::info!(source = remote.name(), "Added remote configuration");
        }

        let aggregate = self.files.load(env)?;

        let source: SharedSource = match remote {
            Some(remote) if remote.children().is_some() => {
                Arc::new(fold_sources(&remote, &aggregate, env))
            }
            Some(remote) => remote,
            None => aggregate,
        };
        Ok(source)
    }

    fn locate_remote(&self, env: &Environment) -> Result<Option<SharedSource>> {
        let Some(locator) = &self.remote else {
            return Ok(None);
        };

        match locator.locate(env) {
            Ok(Some(source)) => Ok(Some(source)),
            Ok(None) if self.fail_fast => Err(ConfigError::RemoteUnavailable(
                "No remote configuration was found".to_string(),
            )),
            Ok(None) => {
                tracing::debug!("No remote configuration found, continuing with local sources");
                Ok(None)
            }
            Err(e) if self.fail_fast => Err(match e {
                ConfigError::RemoteUnavailable(_) => e,
                other => ConfigError::RemoteUnavailable(other.to_string()),
            }),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Could not locate remote configuration, continuing with local sources"
                );
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("application_name", &self.application_name)
            .field("profiles", &self.profiles)
            .field("default_profiles", &self.default_profiles)
            .field("remote", &self.remote.as_ref().map(|r| r.endpoint()))
            .field("fail_fast", &self.fail_fast)
            .field("files", &self.files)
            .finish()
    }
}

/// Fold the environment into one composite named after the remote source.
///
/// Children follow environment precedence, with the remote composite and the
/// local aggregate expanded one level.
fn fold_sources(
    remote: &SharedSource,
    aggregate: &CompositeSource,
    env: &Environment,
) -> CompositeSource {
    let mut children = Vec::new();
    for source in env.sources().iter() {
        if source.name() == remote.name() {
            children.extend(remote.children().unwrap_or_default().iter().cloned());
        } else if source.name() == APPLICATION_CONFIGURATION_SOURCE_NAME {
            children.extend(aggregate.sources().iter().cloned());
        } else {
            children.push(source.clone());
        }
    }
    CompositeSource::new(remote.name(), children)
}
