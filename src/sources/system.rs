//! System property and environment variable sources.

use super::{MapSource, PropertySource};
use std::collections::BTreeMap;

/// Name of the system properties source.
pub const SYSTEM_PROPERTIES_SOURCE_NAME: &str = "systemProperties";

/// Name of the system environment source.
pub const SYSTEM_ENVIRONMENT_SOURCE_NAME: &str = "systemEnvironment";

/// Snapshot of process-level settings used to seed an environment.
///
/// The context is constructed explicitly and handed to the resolution engine,
/// so tests and embedders can control exactly which variables are visible.
///
/// # Examples
///
/// ```rust
/// use layered_config::sources::RuntimeContext;
///
/// let context = RuntimeContext::new()
///     .with_system_property("server.port", "9090")
///     .with_env_var("CONFIG_PROFILES_ACTIVE", "db");
/// assert_eq!(context.env_vars().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeContext {
    system_properties: BTreeMap<String, String>,
    env_vars: BTreeMap<String, String>,
}

impl RuntimeContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment variables.
    ///
    /// Variables whose names or values are not valid unicode are skipped.
    pub fn from_process() -> Self {
        let env_vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self {
            system_properties: BTreeMap::new(),
            env_vars,
        }
    }

    /// Add a system property (highest precedence source).
    pub fn with_system_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.system_properties.insert(key.into(), value.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(name.into(), value.into());
        self
    }

    /// The captured system properties.
    pub fn system_properties(&self) -> &BTreeMap<String, String> {
        &self.system_properties
    }

    /// The captured environment variables.
    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env_vars
    }

    pub(crate) fn system_properties_source(&self) -> MapSource {
        MapSource::from_map(SYSTEM_PROPERTIES_SOURCE_NAME, self.system_properties.clone())
    }

    pub(crate) fn system_environment_source(&self) -> SystemEnvironmentSource {
        SystemEnvironmentSource::new(self.env_vars.clone())
    }
}

/// Environment variable source with relaxed key matching.
///
/// A lookup for `foo.bar-baz` tries, in order: `foo.bar-baz`, `foo_bar_baz`,
/// `FOO.BAR-BAZ` and `FOO_BAR_BAZ`.
#[derive(Debug, Clone, Default)]
pub struct SystemEnvironmentSource {
    vars: BTreeMap<String, String>,
}

impl SystemEnvironmentSource {
    /// Create the source from a variable map.
    pub fn new(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    fn resolve_name(&self, key: &str) -> Option<&str> {
        let underscored = key.replace(['.', '-'], "_");
        let candidates = [
            key.to_string(),
            underscored.clone(),
            key.to_uppercase(),
            underscored.to_uppercase(),
        ];
        candidates
            .into_iter()
            .find_map(|name| self.vars.get_key_value(&name).map(|(k, _)| k.as_str()))
    }
}

impl PropertySource for SystemEnvironmentSource {
    fn name(&self) -> &str {
        SYSTEM_ENVIRONMENT_SOURCE_NAME
    }

    fn get_property(&self, key: &str) -> Option<String> {
        let name = self.resolve_name(key)?;
        self.vars.get(name).cloned()
    }

    fn contains_property(&self, key: &str) -> bool {
        self.resolve_name(key).is_some()
    }

    fn property_names(&self) -> Option<Vec<String>> {
        Some(self.vars.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxed_lookup() {
        let source = SystemEnvironmentSource::new(
            [
                ("CONFIG_PROFILES_ACTIVE".to_string(), "db".to_string()),
                ("server_port".to_string(), "9090".to_string()),
                ("CONFIG_TEST".to_string(), "foobar".to_string()),
            ]
            .into_iter()
            .collect(),
        );

        assert_eq!(source.get_property("config.profiles.active").as_deref(), Some("db"));
        assert_eq!(source.get_property("server.port").as_deref(), Some("9090"));
        assert_eq!(source.get_property("CONFIG_TEST").as_deref(), Some("foobar"));
        assert!(source.contains_property("config-test"));
        assert_eq!(source.get_property("missing.key"), None);
    }

    #[test]
    fn test_exact_name_preferred() {
        let source = SystemEnvironmentSource::new(
            [
                ("foo.bar".to_string(), "exact".to_string()),
                ("FOO_BAR".to_string(), "relaxed".to_string()),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(source.get_property("foo.bar").as_deref(), Some("exact"));
    }

    #[test]
    fn test_runtime_context_sources() {
        let context = RuntimeContext::new()
            .with_system_property("a", "1")
            .with_env_var("B", "2");

        let props = context.system_properties_source();
        assert_eq!(props.name(), SYSTEM_PROPERTIES_SOURCE_NAME);
        assert_eq!(props.get_property("a").as_deref(), Some("1"));

        let env = context.system_environment_source();
        assert_eq!(env.name(), SYSTEM_ENVIRONMENT_SOURCE_NAME);
        assert_eq!(env.get_property("b").as_deref(), Some("2"));
    }
}
