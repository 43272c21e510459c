//! Where to look for configuration files, and which candidates to try per profile.

use crate::core::environment::collect_list;
use crate::core::{Environment, Profile, ProfileToken};
use crate::error::{ConfigError, Result};
use crate::resource::{CLASSPATH_PREFIX, FILE_PREFIX};
use serde::Deserialize;
use std::collections::HashSet;

/// Property that replaces the search locations.
pub const CONFIG_LOCATION_PROPERTY: &str = "config.location";

/// Property that replaces the search names.
pub const CONFIG_NAME_PROPERTY: &str = "config.name";

/// Locations searched when nothing else is configured, least specific first.
pub const DEFAULT_SEARCH_LOCATIONS: &[&str] =
    &["classpath:/", "classpath:/config/", "file:./", "file:./config/"];

/// Base name searched when nothing else is configured.
pub const DEFAULT_CONFIG_NAME: &str = "application";

/// Extensions tried for every location and name, in order.
pub const DEFAULT_EXTENSIONS: &[&str] = &["properties", "yml", "yaml", "toml", "json"];

/// Search settings for local configuration files.
///
/// Lists are written least specific first; later entries win.
///
/// # Examples
///
/// ```rust
/// use layered_config::core::SearchConfig;
///
/// let config: SearchConfig = serde_json::from_str(r#"{"names": ["app"]}"#).unwrap();
/// assert_eq!(config.names, vec!["app"]);
/// assert_eq!(config.locations.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base locations; entries ending in `/` are directories
    pub locations: Vec<String>,
    /// File base names
    pub names: Vec<String>,
    /// Extensions tried per location and name
    pub extensions: Vec<String>,
    /// Comma-separated override for `locations`
    pub config_location: Option<String>,
    /// Comma-separated override for `names`
    pub config_name: Option<String>,
}

impl SearchConfig {
    /// Check that something can be searched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] if no location, name or
    /// extension would be searched.
    pub fn validate(&self) -> Result<()> {
        if self.locations.is_empty() && is_blank(&self.config_location) {
            return Err(ConfigError::Configuration(
                "At least one search location is required".to_string(),
            ));
        }
        if self.names.is_empty() && is_blank(&self.config_name) {
            return Err(ConfigError::Configuration(
                "At least one search name is required".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Configuration(
                "At least one file extension is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            locations: DEFAULT_SEARCH_LOCATIONS.iter().map(|s| s.to_string()).collect(),
            names: vec![DEFAULT_CONFIG_NAME.to_string()],
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            config_location: None,
            config_name: None,
        }
    }
}

/// One resource to try, plus the profile sections to keep from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Location string handed to the resource resolver
    pub location: String,
    /// Only load sections for this profile; `None` loads the whole file
    pub profile: Option<String>,
}

impl Candidate {
    fn whole(location: String) -> Self {
        Self {
            location,
            profile: None,
        }
    }

    fn filtered(location: String, profile: &str) -> Self {
        Self {
            location,
            profile: Some(profile.to_string()),
        }
    }
}

/// Effective locations, names and extensions, most specific first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSearch {
    locations: Vec<String>,
    names: Vec<String>,
    extensions: Vec<String>,
}

impl CandidateSearch {
    /// Build from lists already in search order (most specific first).
    pub fn new(locations: Vec<String>, names: Vec<String>, extensions: Vec<String>) -> Self {
        Self {
            locations,
            names,
            extensions,
        }
    }

    /// Compute the effective search from settings and the seeded environment.
    ///
    /// `config.location` and `config.name` in the environment take precedence
    /// over the overrides in `config`, which take precedence over the plain
    /// lists. Every list is reversed so the last configured entry is tried
    /// first.
    pub fn from_config(config: &SearchConfig, env: &Environment) -> Self {
        let location_override =
            override_list(env, CONFIG_LOCATION_PROPERTY, &config.config_location);
        let locations = match location_override {
            Some(locations) => locations.into_iter().map(with_file_prefix).collect(),
            None => resolved(env, &config.locations),
        };
        let names = override_list(env, CONFIG_NAME_PROPERTY, &config.config_name)
            .unwrap_or_else(|| resolved(env, &config.names));

        Self {
            locations: most_specific_first(locations),
            names: most_specific_first(names),
            extensions: config.extensions.clone(),
        }
    }

    /// Locations in search order.
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Names in search order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Extensions in search order.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Every candidate to try for `token`, in load order.
    ///
    /// `processed` holds the profiles already handled; their files are
    /// re-read for sections that target the current profile.
    pub fn candidates(&self, token: &ProfileToken, processed: &[Profile]) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for location in &self.locations {
            if !location.ends_with('/') {
                candidates.push(Candidate {
                    location: location.clone(),
                    profile: token.profile_name().map(str::to_string),
                });
                continue;
            }

            for name in &self.names {
                for ext in &self.extensions {
                    let base = format!("{}{}.{}", location, name, ext);
                    let Some(profile) = token.profile_name() else {
                        candidates.push(Candidate::whole(base));
                        continue;
                    };

                    let specific = format!("{}{}-{}.{}", location, name, profile, ext);
                    candidates.push(Candidate::whole(specific.clone()));
                    for other in processed {
                        let earlier = format!("{}{}-{}.{}", location, name, other.name(), ext);
                        candidates.push(Candidate::filtered(earlier, profile));
                    }
                    candidates.push(Candidate::filtered(specific, profile));
                    candidates.push(Candidate::filtered(base, profile));
                }
            }
        }
        candidates
    }
}

fn override_list(env: &Environment, key: &str, configured: &Option<String>) -> Option<Vec<String>> {
    let from_env = collect_list(|k| env.get_property(k), key, env);
    if !from_env.is_empty() {
        return Some(from_env);
    }
    let configured = configured.as_deref()?;
    let list = collect_list(
        |k| (k == key).then(|| configured.to_string()),
        key,
        env,
    );
    (!list.is_empty()).then_some(list)
}

fn resolved(env: &Environment, values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| env.resolve_placeholders(v.trim()))
        .filter(|v| !v.is_empty())
        .collect()
}

fn with_file_prefix(location: String) -> String {
    if location.starts_with(CLASSPATH_PREFIX)
        || location.starts_with(FILE_PREFIX)
        || location.contains("://")
    {
        location
    } else {
        format!("{}{}", FILE_PREFIX, location)
    }
}

fn most_specific_first(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .rev()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
