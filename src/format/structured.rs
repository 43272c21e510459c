//! TOML and JSON files.

use super::{FormatLoader, join_key, utf8};
use crate::error::{ConfigError, Result};
use crate::sources::MapSource;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Toml,
    Json,
}

/// Loader for `.toml` or `.json` files.
///
/// Keys keep their case. These formats carry no profile sections, so a load
/// with a profile filter returns `None`.
#[derive(Debug, Clone, Copy)]
pub struct StructuredLoader {
    syntax: Syntax,
}

impl StructuredLoader {
    /// Loader for `.toml` files.
    pub fn toml() -> Self {
        Self {
            syntax: Syntax::Toml,
        }
    }

    /// Loader for `.json` files.
    pub fn json() -> Self {
        Self {
            syntax: Syntax::Json,
        }
    }
}

impl FormatLoader for StructuredLoader {
    fn file_extensions(&self) -> &[&'static str] {
        match self.syntax {
            Syntax::Toml => &["toml"],
            Syntax::Json => &["json"],
        }
    }

    fn load(
        &self,
        source_name: &str,
        contents: &[u8],
        profile: Option<&str>,
    ) -> Result<Option<MapSource>> {
        if profile.is_some() {
            return Ok(None);
        }
        let text = utf8(source_name, contents)?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        let mut flat = BTreeMap::new();
        match self.syntax {
            Syntax::Toml => {
                let table: toml::Table = text
                    .parse()
                    .map_err(|e: toml::de::Error| ConfigError::parse(source_name, e))?;
                for (key, value) in &table {
                    flatten_toml(key, value, &mut flat);
                }
            }
            Syntax::Json => {
                let value: serde_json::Value =
                    serde_json::from_str(text).map_err(|e| ConfigError::parse(source_name, e))?;
                if !value.is_object() {
                    return Err(ConfigError::parse(
                        source_name,
                        "expected an object at the top level",
                    ));
                }
                flatten_json("", &value, &mut flat);
            }
        }

        if flat.is_empty() {
            return Ok(None);
        }
        Ok(Some(MapSource::from_map(source_name, flat)))
    }
}

fn flatten_toml(prefix: &str, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                flatten_toml(&join_key(prefix, key), child, out);
            }
        }
        toml::Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_toml(&format!("{}[{}]", prefix, index), child, out);
            }
        }
        toml::Value::String(text) => {
            out.insert(prefix.to_string(), text.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

fn flatten_json(prefix: &str, value: &serde_json::Value, out: &mut BTreeMap<String, String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                flatten_json(&join_key(prefix, key), child, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_json(&format!("{}[{}]", prefix, index), child, out);
            }
        }
        serde_json::Value::Null => {
            out.insert(prefix.to_string(), String::new());
        }
        serde_json::Value::String(text) => {
            out.insert(prefix.to_string(), text.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}
