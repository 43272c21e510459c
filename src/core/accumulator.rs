//! Grouping loaded files into per-profile buckets.

use crate::core::{APPLICATION_CONFIGURATION_SOURCE_NAME, DEFAULT_PROPERTIES_SOURCE_NAME};
use crate::core::{Environment, PropertySources, ProfileToken};
use crate::error::Result;
use crate::sources::{CompositeBuilder, CompositeSource, SharedSource};
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the composite holding every file loaded for one token.
pub fn bucket_name(token: &ProfileToken) -> String {
    format!("applicationConfig: [{}]", token.bucket_key())
}

/// Collects loaded sources into one composite per profile bucket.
///
/// A bucket is staged at the front the first time something loads into it,
/// so buckets created later outrank earlier ones. Later additions to an
/// existing bucket rebuild it in place without moving it. Inside a bucket the
/// first loaded source wins.
#[derive(Debug, Default)]
pub struct SourceAccumulator {
    buckets: HashMap<String, CompositeBuilder>,
    staged: PropertySources,
}

impl SourceAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a loaded source to the bucket of `token`.
    pub fn add(&mut self, token: &ProfileToken, source: SharedSource) -> Result<()> {
        let name = bucket_name(token);
        let builder = self
            .buckets
            .entry(token.bucket_key())
            .or_insert_with(|| CompositeBuilder::new(name.clone()));
        builder.push(source);

        let composite: SharedSource = Arc::new(builder.build());
        if self.staged.contains(&name) {
            self.staged.replace(&name, composite)?;
        } else {
            self.staged.add_first(composite);
        }
        Ok(())
    }

    /// Staged bucket names, highest precedence first.
    pub fn bucket_names(&self) -> Vec<String> {
        self.staged.names()
    }

    /// The staged buckets.
    pub fn staged(&self) -> &PropertySources {
        &self.staged
    }

    /// Number of staged buckets.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Whether nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Wrap the staged buckets, in order, into the application aggregate.
    pub fn finish(&self) -> CompositeSource {
        CompositeSource::new(
            APPLICATION_CONFIGURATION_SOURCE_NAME,
            self.staged.iter().cloned().collect(),
        )
    }

    /// Place the aggregate right above `defaultProperties`, or last.
    pub fn insert_into(env: &mut Environment, aggregate: SharedSource) -> Result<()> {
        if env.sources().contains(DEFAULT_PROPERTIES_SOURCE_NAME) {
            env.sources_mut()
                .add_before(DEFAULT_PROPERTIES_SOURCE_NAME, aggregate)
        } else {
            env.sources_mut().add_last(aggregate);
            Ok(())
        }
    }
}
