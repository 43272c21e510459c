//! YAML files, including multi-document files with profile sections.

use super::{FormatLoader, join_key, utf8};
use crate::error::{ConfigError, Result};
use crate::sources::MapSource;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Key that restricts a YAML document to a list of profiles.
pub const ACTIVATE_ON_PROFILE_PROPERTY: &str = "config.activate.on-profile";

/// Loader for `.yml` and `.yaml` files.
///
/// Documents are separated by `---`. A document carrying
/// `config.activate.on-profile` only applies to the listed profiles. Without a
/// profile filter every unrestricted document is merged, later documents
/// overriding earlier ones. With a filter only the documents selecting that
/// profile are merged.
///
/// # Examples
///
/// ```rust
/// use layered_config::format::{FormatLoader, YamlLoader};
/// use layered_config::sources::PropertySource;
///
/// let text = "server:\n  port: 8080\n---\nconfig.activate.on-profile: prod\nserver:\n  port: 80\n";
///
/// let base = YamlLoader.load("app", text.as_bytes(), None).unwrap().unwrap();
/// assert_eq!(base.get_property("server.port").as_deref(), Some("8080"));
///
/// let prod = YamlLoader.load("app", text.as_bytes(), Some("prod")).unwrap().unwrap();
/// assert_eq!(prod.get_property("server.port").as_deref(), Some("80"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLoader;

impl FormatLoader for YamlLoader {
    fn file_extensions(&self) -> &[&'static str] {
        &["yml", "yaml"]
    }

    fn load(
        &self,
        source_name: &str,
        contents: &[u8],
        profile: Option<&str>,
    ) -> Result<Option<MapSource>> {
        let text = utf8(source_name, contents)?;

        let mut merged = BTreeMap::new();
        for document in serde_yaml::Deserializer::from_str(text) {
            let value =
                Value::deserialize(document).map_err(|e| ConfigError::parse(source_name, e))?;
            let mut flat = BTreeMap::new();
            flatten("", &value, &mut flat);

            let selector = take_selector(&mut flat);
            let applies = match (profile, &selector) {
                (None, None) => true,
                (Some(wanted), Some(profiles)) => profiles.iter().any(|p| p == wanted),
                _ => false,
            };
            if applies {
                merged.extend(flat);
            }
        }

        if merged.is_empty() {
            return Ok(None);
        }
        Ok(Some(MapSource::from_map(source_name, merged)))
    }
}

/// Remove the selector keys from a flattened document and return the profiles.
fn take_selector(flat: &mut BTreeMap<String, String>) -> Option<Vec<String>> {
    let mut values = Vec::new();
    if let Some(value) = flat.remove(ACTIVATE_ON_PROFILE_PROPERTY) {
        values.push(value);
    }
    let indexed_prefix = format!("{}[", ACTIVATE_ON_PROFILE_PROPERTY);
    let indexed: Vec<String> = flat
        .keys()
        .filter(|k| k.starts_with(&indexed_prefix))
        .cloned()
        .collect();
    for key in indexed {
        if let Some(value) = flat.remove(&key) {
            values.push(value);
        }
    }

    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .flat_map(|v| v.split(','))
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
    )
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                match scalar_to_string(key) {
                    Some(key) => flatten(&join_key(prefix, &key), child, out),
                    None => tracing::trace!(prefix, "Skipping YAML entry with a non-scalar key"),
                }
            }
        }
        Value::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(&format!("{}[{}]", prefix, index), child, out);
            }
        }
        Value::Tagged(tagged) => flatten(prefix, &tagged.value, out),
        scalar => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), scalar_to_string(scalar).unwrap_or_default());
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::PropertySource;

    const MULTI: &str = r#"
app:
  name: demo
  tags: [a, b]
---
config:
  activate:
    on-profile: dev, test
app:
  name: demo-dev
---
config.activate.on-profile: prod
app:
  name: demo-prod
"#;

    #[test]
    fn test_flatten_nested_values() {
        let text = "server:\n  port: 8080\n  ssl: true\n  hosts:\n    - a\n    - name: b\nempty:\n";
        let source = YamlLoader.load("t", text.as_bytes(), None).unwrap().unwrap();

        assert_eq!(source.get_property("server.port").as_deref(), Some("8080"));
        assert_eq!(source.get_property("server.ssl").as_deref(), Some("true"));
        assert_eq!(source.get_property("server.hosts[0]").as_deref(), Some("a"));
        assert_eq!(source.get_property("server.hosts[1].name").as_deref(), Some("b"));
        assert_eq!(source.get_property("empty").as_deref(), Some(""));
    }

    #[test]
    fn test_unrestricted_documents_without_filter() {
        let source = YamlLoader.load("t", MULTI.as_bytes(), None).unwrap().unwrap();
        assert_eq!(source.get_property("app.name").as_deref(), Some("demo"));
        assert_eq!(source.get_property("app.tags[1]").as_deref(), Some("b"));
    }

    #[test]
    fn test_profile_sections() {
        let dev = YamlLoader.load("t", MULTI.as_bytes(), Some("test")).unwrap().unwrap();
        assert_eq!(dev.get_property("app.name").as_deref(), Some("demo-dev"));
        assert!(dev.get_property("app.tags[0]").is_none());
        assert!(dev.get_property(ACTIVATE_ON_PROFILE_PROPERTY).is_none());

        let prod = YamlLoader.load("t", MULTI.as_bytes(), Some("prod")).unwrap().unwrap();
        assert_eq!(prod.get_property("app.name").as_deref(), Some("demo-prod"));

        assert!(YamlLoader.load("t", MULTI.as_bytes(), Some("qa")).unwrap().is_none());
    }

    #[test]
    fn test_later_documents_override() {
        let text = "a: 1\nb: 1\n---\nb: 2\n";
        let source = YamlLoader.load("t", text.as_bytes(), None).unwrap().unwrap();
        assert_eq!(source.get_property("a").as_deref(), Some("1"));
        assert_eq!(source.get_property("b").as_deref(), Some("2"));
    }

    #[test]
    fn test_empty_document() {
        assert!(YamlLoader.load("t", b"", None).unwrap().is_none());
        assert!(YamlLoader.load("t", b"# only a comment\n", None).unwrap().is_none());
    }

    #[test]
    fn test_syntax_error() {
        let err = YamlLoader.load("bad.yml", b"a: [1, 2\n", None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref location, .. } if location == "bad.yml"));
    }
}
