//! `.properties` files.

use super::{FormatLoader, utf8};
use crate::error::{ConfigError, Result};
use crate::sources::MapSource;

/// Loader for `key=value` property files.
///
/// Supports `=`, `:` and whitespace separators, `#`/`!` comment lines,
/// backslash line continuations and the usual escapes including `\uXXXX`.
/// The format has no profile sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesLoader;

impl FormatLoader for PropertiesLoader {
    fn file_extensions(&self) -> &[&'static str] {
        &["properties"]
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

        let mut source = MapSource::new(source_name);
        for (key, value) in parse(text).map_err(|e| ConfigError::parse(source_name, e))? {
            source.insert(key, value);
        }
        Ok((!source.is_empty()).then_some(source))
    }
}

fn parse(text: &str) -> std::result::Result<Vec<(String, String)>, String> {
    let mut entries = Vec::new();
    let mut logical = String::new();
    let mut continuing = false;

    for line in text.lines() {
        let line = line.trim_start();
        if !continuing && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }
        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continuing = true;
            continue;
        }
        logical.push_str(line);
        continuing = false;
        entries.push(split_entry(&logical)?);
        logical.clear();
    }
    if !logical.is_empty() {
        entries.push(split_entry(&logical)?);
    }
    Ok(entries)
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> std::result::Result<(String, String), String> {
    let chars: Vec<char> = line.chars().collect();

    let mut key_end = chars.len();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == '=' || c == ':' || c.is_whitespace() {
            key_end = i;
            break;
        }
        i += 1;
    }

    let mut value_start = key_end;
    while value_start < chars.len() && chars[value_start].is_whitespace() {
        value_start += 1;
    }
    if value_start < chars.len() && (chars[value_start] == '=' || chars[value_start] == ':') {
        value_start += 1;
    }
    while value_start < chars.len() && chars[value_start].is_whitespace() {
        value_start += 1;
    }

    Ok((
        unescape(&chars[..key_end])?,
        unescape(&chars[value_start..])?,
    ))
}

fn unescape(chars: &[char]) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(chars.len());
    let mut iter = chars.iter();
    while let Some(&c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = iter.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("malformed \\uXXXX escape: \\u{}", hex))?;
                out.push(decoded);
            }
            Some(&other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::PropertySource;

    fn load(text: &str) -> MapSource {
        PropertiesLoader
            .load("test", text.as_bytes(), None)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_separators() {
        let source = load("a=1\nb: 2\nc 3\nd  =  4  \ne=\n");
        assert_eq!(source.get_property("a").as_deref(), Some("1"));
        assert_eq!(source.get_property("b").as_deref(), Some("2"));
        assert_eq!(source.get_property("c").as_deref(), Some("3"));
        assert_eq!(source.get_property("d").as_deref(), Some("4  "));
        assert_eq!(source.get_property("e").as_deref(), Some(""));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = load("# comment\n! other\n\n   \nfoo=bar\n");
        assert_eq!(source.len(), 1);
        assert_eq!(source.get_property("foo").as_deref(), Some("bar"));
    }

    #[test]
    fn test_line_continuation() {
        let source = load("list=a,\\\n    b,\\\n    c\nnext=1\n");
        assert_eq!(source.get_property("list").as_deref(), Some("a,b,c"));
        assert_eq!(source.get_property("next").as_deref(), Some("1"));
    }

    #[test]
    fn test_escaped_backslash_is_not_continuation() {
        let source = load("path=C:\\\\\nnext=1\n");
        assert_eq!(source.get_property("path").as_deref(), Some("C:\\"));
        assert_eq!(source.get_property("next").as_deref(), Some("1"));
    }

    #[test]
    fn test_escapes() {
        let source = load("key\\ with\\=sep=tab\\there\ngreek=\\u03b1\n");
        assert_eq!(source.get_property("key with=sep").as_deref(), Some("tab\there"));
        assert_eq!(source.get_property("greek").as_deref(), Some("α"));
    }

    #[test]
    fn test_malformed_unicode_escape() {
        let err = PropertiesLoader
            .load("bad.properties", b"a=\\u12", None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let source = load("a=1\na=2\n");
        assert_eq!(source.get_property("a").as_deref(), Some("2"));
    }

    #[test]
    fn test_profile_filter_and_empty() {
        assert!(PropertiesLoader.load("t", b"a=1", Some("dev")).unwrap().is_none());
        assert!(PropertiesLoader.load("t", b"# nothing\n", None).unwrap().is_none());
    }
}
