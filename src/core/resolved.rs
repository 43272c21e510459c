//! The outcome of a resolution, with typed binding.

use crate::core::Environment;
use crate::core::binding::{Node, NodeDeserializer};
use crate::error::{ConfigError, Result};
use crate::sources::{SYSTEM_ENVIRONMENT_SOURCE_NAME, SharedSource};
use serde::de::DeserializeOwned;
use std::collections::HashSet;

/// A resolved environment plus the source the resolution produced.
///
/// Lookups go through the environment, so system properties and environment
/// variables keep their precedence over remote and file values.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    environment: Environment,
    source: SharedSource,
}

impl ResolvedConfig {
    pub(crate) fn new(environment: Environment, source: SharedSource) -> Self {
        Self {
            environment,
            source,
        }
    }

    /// The environment after resolution.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The source returned by the resolution: the remote source (folded with
    /// the environment when it is a composite), else the local aggregate.
    pub fn source(&self) -> &SharedSource {
        &self.source
    }

    /// Active profile names after resolution.
    pub fn active_profiles(&self) -> Vec<String> {
        self.environment.active_profile_names()
    }

    /// Source names in precedence order.
    pub fn source_names(&self) -> Vec<String> {
        self.environment.sources().names()
    }

    /// Look up a property with placeholders resolved.
    pub fn get_property(&self, key: &str) -> Option<String> {
        self.environment
            .get_property(key)
            .map(|value| self.environment.resolve_placeholders(&value))
    }

    /// Look up a property, falling back to `default`.
    pub fn get_property_or(&self, key: &str, default: &str) -> String {
        self.get_property(key).unwrap_or_else(|| default.to_string())
    }

    /// Whether any source holds `key`.
    pub fn contains_property(&self, key: &str) -> bool {
        self.environment.contains_property(key)
    }

    /// Every enumerable key, in precedence order.
    pub fn property_names(&self) -> Vec<String> {
        self.environment.property_names()
    }

    /// Deserialize the resolved properties into `T`.
    ///
    /// Keys come from every enumerable source except `systemEnvironment`;
    /// values are looked up with full precedence, so environment variables
    /// still override bound keys. Key case is kept. A key that collides with
    /// a higher-precedence key of a different shape (`a=1` against `a.b=2`)
    /// is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DeserializationError`] if the properties do not
    /// fit `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use layered_config::prelude::*;
    /// use layered_config::resource::MemoryResolver;
    /// use serde::Deserialize;
    ///
    /// #[derive(Debug, Deserialize)]
    /// struct Server {
    ///     port: u16,
    /// }
    ///
    /// #[derive(Debug, Deserialize)]
    /// struct AppConfig {
    ///     server: Server,
    /// }
    ///
    /// # fn example() -> Result<()> {
    /// let engine = ResolutionEngine::builder()
    ///     .with_resource_resolver(
    ///         MemoryResolver::new()
    ///             .with_resource("classpath:/application.yml", "server:\n  port: 8080"),
    ///     )
    ///     .build()?;
    ///
    /// let config: AppConfig = engine.resolve()?.bind()?;
    /// assert_eq!(config.server.port, 8080);
    /// # Ok(())
    /// # }
    /// # example().unwrap();
    /// ```
    pub fn bind<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut root = Node::root();
        for key in self.bindable_keys() {
            let Some(value) = self.get_property(&key) else {
                continue;
            };
            if !root.insert(&key, value) {
                tracing::trace!(key = %key, "Skipping property that cannot be bound");
            }
        }

        serde::Deserialize::deserialize(NodeDeserializer(&root)).map_err(|e| {
            ConfigError::DeserializationError(format!("Failed to deserialize configuration: {}", e))
        })
    }

    fn bindable_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.environment
            .sources()
            .iter()
            .filter(|source| source.name() != SYSTEM_ENVIRONMENT_SOURCE_NAME)
            .filter_map(|source| source.property_names())
            .flatten()
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MapSource, SystemEnvironmentSource};
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestConfig {
        port: u16,
        host: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn resolved(sources: Vec<SharedSource>) -> ResolvedConfig {
        let mut env = Environment::new();
        for source in sources {
            env.sources_mut().add_last(source);
        }
        let source: SharedSource = Arc::new(MapSource::new("unused"));
        ResolvedConfig::new(env, source)
    }

    #[test]
    fn test_bind_single_source() {
        let config = resolved(vec![Arc::new(
            MapSource::new("file")
                .with_property("port", "8080")
                .with_property("host", "localhost")
                .with_property("tags[0]", "a")
                .with_property("tags[1]", "b"),
        )]);

        let bound: TestConfig = config.bind().unwrap();
        assert_eq!(bound.port, 8080);
        assert_eq!(bound.host, "localhost");
        assert_eq!(bound.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_bind_uses_precedence() {
        let config = resolved(vec![
            Arc::new(MapSource::new("override").with_property("port", "9090")),
            Arc::new(
                MapSource::new("defaults")
                    .with_property("port", "8080")
                    .with_property("host", "localhost"),
            ),
        ]);

        let bound: TestConfig = config.bind().unwrap();
        assert_eq!(bound.port, 9090);
        assert_eq!(bound.host, "localhost");
    }

    #[test]
    fn test_environment_variables_override_but_are_not_enumerated() {
        let mut vars = BTreeMap::new();
        vars.insert("PORT".to_string(), "7070".to_string());
        vars.insert("UNRELATED".to_string(), "x".to_string());
        let config = resolved(vec![
            Arc::new(SystemEnvironmentSource::new(vars)),
            Arc::new(
                MapSource::new("file")
                    .with_property("port", "8080")
                    .with_property("host", "localhost"),
            ),
        ]);

        assert!(!config.bindable_keys().contains(&"UNRELATED".to_string()));
        let bound: TestConfig = config.bind().unwrap();
        assert_eq!(bound.port, 7070);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct PoolConfig {
        max_connections: u32,
        idle_timeout_ms: u64,
    }

    #[test]
    fn test_bind_camel_case_keys() {
        let config = resolved(vec![
            Arc::new(MapSource::new("override").with_property("pool.maxConnections", "9")),
            Arc::new(
                MapSource::new("file")
                    .with_property("pool.maxConnections", "7")
                    .with_property("pool.idleTimeoutMs", "500"),
            ),
        ]);

        assert_eq!(config.get_property("pool.maxConnections").as_deref(), Some("9"));
        let bound: BTreeMap<String, PoolConfig> = config.bind().unwrap();
        assert_eq!(
            bound["pool"],
            PoolConfig {
                max_connections: 9,
                idle_timeout_ms: 500,
            }
        );
    }

    #[test]
    fn test_bind_missing_field() {
        let config = resolved(vec![Arc::new(MapSource::new("file").with_property("port", "1"))]);
        let result: Result<TestConfig> = config.bind();
        assert!(matches!(result, Err(ConfigError::DeserializationError(_))));
    }

    #[test]
    fn test_get_property_resolves_placeholders() {
        let config = resolved(vec![Arc::new(
            MapSource::new("file")
                .with_property("host", "localhost")
                .with_property("url", "http://${host}:${port:80}"),
        )]);

        assert_eq!(config.get_property("url").as_deref(), Some("http://localhost:80"));
        assert_eq!(config.get_property_or("missing", "fallback"), "fallback");
        assert!(config.contains_property("host"));
        assert_eq!(config.source_names(), vec!["file"]);
    }
}
