//! Random value property source.

use super::PropertySource;

/// Name of the random value source in the environment.
pub const RANDOM_SOURCE_NAME: &str = "random";

const PREFIX: &str = "random.";

/// Property source that produces a fresh random value on every lookup.
///
/// Recognised keys:
/// - `random.int`, `random.long` - any value of that width
/// - `random.int(10)`, `random.int[5,10]` - bounded, upper bound exclusive
/// - `random.uuid` - a version 4 UUID
/// - any other `random.*` key - 32 hexadecimal characters
///
/// The source is not enumerable.
#[derive(Debug, Clone, Default)]
pub struct RandomValueSource;

impl RandomValueSource {
    /// Create the random source.
    pub fn new() -> Self {
        Self
    }

    fn generate(kind: &str) -> Option<String> {
        match kind {
            "int" => return Some(fastrand::i32(..).to_string()),
            "long" => return Some(fastrand::i64(..).to_string()),
            "uuid" => return Some(uuid::Uuid::new_v4().to_string()),
            _ => {}
        }

        if let Some(range) = kind.strip_prefix("int").filter(|r| is_bracketed(r)) {
            let (low, high) = parse_range(range)?;
            let low = i32::try_from(low).ok()?;
            let high = i32::try_from(high).ok()?;
            return Some(fastrand::i32(low..high).to_string());
        }
        if let Some(range) = kind.strip_prefix("long").filter(|r| is_bracketed(r)) {
            let (low, high) = parse_range(range)?;
            return Some(fastrand::i64(low..high).to_string());
        }

        Some(random_hex(32))
    }
}

impl PropertySource for RandomValueSource {
    fn name(&self) -> &str {
        RANDOM_SOURCE_NAME
    }

    fn get_property(&self, key: &str) -> Option<String> {
        let kind = key.strip_prefix(PREFIX)?;
        let value = Self::generate(kind);
        if value.is_none() {
            tracing::debug!(key, "Invalid random value range");
        }
        value
    }
}

fn is_bracketed(text: &str) -> bool {
    text.starts_with(['(', '['])
}

/// Parse `(max)`, `(min,max)` or `[min,max]` into a half-open range.
fn parse_range(text: &str) -> Option<(i64, i64)> {
    let open = text.chars().next()?;
    let close = text.chars().last()?;
    if !matches!(open, '(' | '[') || !matches!(close, ')' | ']') || text.len() < 2 {
        return None;
    }

    let inner = &text[1..text.len() - 1];
    let (low, high) = match inner.split_once(',') {
        Some((low, high)) => (low.trim().parse().ok()?, high.trim().parse().ok()?),
        None => (0, inner.trim().parse().ok()?),
    };

    (low < high).then_some((low, high))
}

fn random_hex(len: usize) -> String {
    (0..len)
        .map(|_| char::from_digit(fastrand::u32(..16), 16).unwrap_or('0'))
        .collect()
}
