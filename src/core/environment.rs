//! Ordered property sources plus profile state.

use crate::core::Profile;
use crate::error::{ConfigError, Result};
use crate::sources::{PropertySource, SharedSource};
use std::collections::HashSet;
use std::sync::Arc;

/// Name of the fallback source seeded with the application name.
pub const DEFAULT_PROPERTIES_SOURCE_NAME: &str = "defaultProperties";

/// Name of the aggregate holding every locally loaded file group.
pub const APPLICATION_CONFIGURATION_SOURCE_NAME: &str = "applicationConfigurationProperties";

/// Property carrying the application name.
pub const APPLICATION_NAME_PROPERTY: &str = "application.name";

/// Name of the profile used when nothing else is active.
pub const DEFAULT_PROFILE_NAME: &str = "default";

const MAX_PLACEHOLDER_DEPTH: usize = 8;

/// Ordered list of uniquely named property sources.
///
/// Earlier sources win on lookup. Adding a source whose name is already
/// present removes the old entry first, so names stay unique.
#[derive(Debug, Clone, Default)]
pub struct PropertySources {
    sources: Vec<SharedSource>,
}

impl PropertySources {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with the highest precedence.
    pub fn add_first(&mut self, source: SharedSource) {
        self.remove(source.name());
        self.sources.insert(0, source);
    }

    /// Insert with the lowest precedence.
    pub fn add_last(&mut self, source: SharedSource) {
        self.remove(source.name());
        self.sources.push(source);
    }

    /// Insert directly above the source named `relative`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceNotFound`] if `relative` does not exist.
    pub fn add_before(&mut self, relative: &str, source: SharedSource) -> Result<()> {
        self.insert_relative(relative, source, 0)
    }

    /// Insert directly below the source named `relative`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceNotFound`] if `relative` does not exist.
    pub fn add_after(&mut self, relative: &str, source: SharedSource) -> Result<()> {
        self.insert_relative(relative, source, 1)
    }

    fn insert_relative(
        &mut self,
        relative: &str,
        source: SharedSource,
        offset: usize,
    ) -> Result<()> {
        if source.name() == relative {
            return Err(ConfigError::Configuration(format!(
                "Property source '{}' cannot be positioned relative to itself",
                relative
            )));
        }
        if !self.contains(relative) {
            return Err(ConfigError::SourceNotFound(relative.to_string()));
        }
        self.remove(source.name());
        let index = self.position(relative).unwrap_or(self.sources.len());
        self.sources.insert(index + offset, source);
        Ok(())
    }

    /// Swap the source named `name` for `source`, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceNotFound`] if `name` does not exist.
    pub fn replace(&mut self, name: &str, source: SharedSource) -> Result<()> {
        let index = self
            .position(name)
            .ok_or_else(|| ConfigError::SourceNotFound(name.to_string()))?;
        self.sources[index] = source;
        Ok(())
    }

    /// Remove and return the source named `name`.
    pub fn remove(&mut self, name: &str) -> Option<SharedSource> {
        let index = self.position(name)?;
        Some(self.sources.remove(index))
    }

    /// Find a source by name.
    pub fn get(&self, name: &str) -> Option<&SharedSource> {
        self.sources.iter().find(|s| s.name() == name)
    }

    /// Whether a source with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Index of the named source, 0 being the highest precedence.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.name() == name)
    }

    /// Iterate from highest to lowest precedence.
    pub fn iter(&self) -> impl Iterator<Item = &SharedSource> {
        self.sources.iter()
    }

    /// Source names in precedence order.
    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Lookup across all sources; the first hit wins.
    pub fn get_property(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|s| s.get_property(key))
    }
}

/// The mutable state of one resolution: ordered sources and profiles.
///
/// # Examples
///
/// ```rust
/// use layered_config::core::Environment;
/// use layered_config::sources::MapSource;
/// use std::sync::Arc;
///
/// let mut env = Environment::new();
/// env.sources_mut().add_last(Arc::new(MapSource::new("low").with_property("k", "low")));
/// env.sources_mut().add_first(Arc::new(MapSource::new("high").with_property("k", "high")));
///
/// assert_eq!(env.get_property("k").as_deref(), Some("high"));
/// assert_eq!(env.resolve_placeholders("value=${k}"), "value=high");
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    sources: PropertySources,
    active_profiles: Vec<Profile>,
    default_profiles: Vec<Profile>,
}

impl Environment {
    /// Create an environment with no sources and the `default` default profile.
    pub fn new() -> Self {
        Self {
            sources: PropertySources::new(),
            active_profiles: Vec::new(),
            default_profiles: vec![Profile::fallback(DEFAULT_PROFILE_NAME)],
        }
    }

    /// The ordered sources.
    pub fn sources(&self) -> &PropertySources {
        &self.sources
    }

    /// Mutable access to the ordered sources.
    pub fn sources_mut(&mut self) -> &mut PropertySources {
        &mut self.sources
    }

    /// Convenience for adding an owned source at the lowest precedence.
    pub fn add_last<S: PropertySource + 'static>(&mut self, source: S) {
        self.sources.add_last(Arc::new(source));
    }

    /// Active profiles, in order.
    pub fn active_profiles(&self) -> &[Profile] {
        &self.active_profiles
    }

    /// Names of the active profiles.
    pub fn active_profile_names(&self) -> Vec<String> {
        self.active_profiles.iter().map(|p| p.name().to_string()).collect()
    }

    /// Replace the active profiles. Blank and duplicate names are dropped.
    pub fn set_active_profiles<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.active_profiles.clear();
        for name in names {
            self.add_active_profile(name.as_ref());
        }
    }

    /// Append an active profile unless it is blank or already active.
    pub fn add_active_profile(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.has_active_profile(name) {
            self.active_profiles.push(Profile::new(name));
        }
    }

    /// Put a profile first in the active list unless it is already active.
    pub fn prepend_active_profile(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.has_active_profile(name) {
            self.active_profiles.insert(0, Profile::new(name));
        }
    }

    /// Whether a profile with this name is active.
    pub fn has_active_profile(&self, name: &str) -> bool {
        self.active_profiles.iter().any(|p| p.name() == name)
    }

    /// Fallback profiles used when none are active.
    pub fn default_profiles(&self) -> &[Profile] {
        &self.default_profiles
    }

    /// Replace the fallback profiles.
    pub fn set_default_profiles<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        self.default_profiles = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty() && seen.insert(n.clone()))
            .map(Profile::fallback)
            .collect();
    }

    /// Active profile names, or the default ones when nothing is active.
    pub fn profiles_for_lookup(&self) -> Vec<String> {
        let profiles = if self.active_profiles.is_empty() {
            &self.default_profiles
        } else {
            &self.active_profiles
        };
        profiles.iter().map(|p| p.name().to_string()).collect()
    }

    /// Lookup across all sources; the first hit wins.
    pub fn get_property(&self, key: &str) -> Option<String> {
        self.sources.get_property(key)
    }

    /// Whether any source holds `key`.
    pub fn contains_property(&self, key: &str) -> bool {
        self.sources.iter().any(|s| s.contains_property(key))
    }

    /// Every key known to an enumerable source, deduplicated, in precedence order.
    pub fn property_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sources
            .iter()
            .filter_map(|s| s.property_names())
            .flatten()
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Replace `${key}` and `${key:fallback}` placeholders with property values.
    ///
    /// Unresolvable placeholders without a fallback are left untouched.
    pub fn resolve_placeholders(&self, text: &str) -> String {
        self.resolve_with_depth(text, 0)
    }

    fn resolve_with_depth(&self, text: &str, depth: usize) -> String {
        if depth >= MAX_PLACEHOLDER_DEPTH || !text.contains("${") {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };

            let expression = &after[..end];
            let (key, fallback) = match expression.split_once(':') {
                Some((key, fallback)) => (key, Some(fallback)),
                None => (expression, None),
            };
            match self.get_property(key.trim()).or_else(|| fallback.map(str::to_string)) {
                Some(value) => out.push_str(&self.resolve_with_depth(&value, depth + 1)),
                None => out.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a list-valued property: a comma-separated value, or indexed keys
/// `key[0]`, `key[1]`, ... when the plain key is absent.
///
/// Placeholders are resolved against `env` before splitting. Blank entries and
/// duplicates are dropped; the first occurrence wins.
pub(crate) fn collect_list<F>(lookup: F, key: &str, env: &Environment) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = Vec::new();
    if let Some(value) = lookup(key) {
        values.push(value);
    } else {
        let mut index = 0;
        while let Some(value) = lookup(&format!("{}[{}]", key, index)) {
            values.push(value);
            index += 1;
        }
    }

    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| env.resolve_placeholders(value))
        .flat_map(|value| {
            value
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
