//! Lock-free handle over the latest resolution.

use crate::core::{ResolutionEngine, ResolvedConfig};
use crate::error::Result;
use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Holds the most recent [`ResolvedConfig`] and re-resolves on demand.
///
/// Reads are lock-free through `arc-swap`; a refresh swaps in a complete new
/// resolution atomically, so readers never observe a partial one.
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
/// use layered_config::resource::MemoryResolver;
///
/// # fn example() -> Result<()> {
/// let engine = ResolutionEngine::builder()
///     .with_resource_resolver(
///         MemoryResolver::new().with_resource("classpath:/application.properties", "foo=baz"),
///     )
///     .with_runtime_context(RuntimeContext::new())
///     .build()?;
///
/// let handle = ConfigHandle::new(engine)?;
/// assert_eq!(handle.get().get_property("foo").as_deref(), Some("baz"));
///
/// handle.refresh()?;
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct ConfigHandle {
    /// The current resolution, wrapped in ArcSwap for atomic updates
    current: Arc<ArcSwap<ResolvedConfig>>,
    /// Engine used for refreshes
    engine: Arc<ResolutionEngine>,
}

impl ConfigHandle {
    /// Resolve once and wrap the result.
    ///
    /// # Errors
    ///
    /// Returns the error of the initial resolution.
    pub fn new(engine: ResolutionEngine) -> Result<Self> {
        let initial = engine.resolve()?;
        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
            engine: Arc::new(engine),
        })
    }

    /// The current resolution. Never blocks.
    pub fn get(&self) -> Arc<ResolvedConfig> {
        self.current.load_full()
    }

    /// Re-run resolution against a freshly seeded environment.
    ///
    /// On error the previous resolution stays in place.
    ///
    /// # Errors
    ///
    /// Returns the error of the failed resolution.
    pub fn refresh(&self) -> Result<Arc<ResolvedConfig>> {
        match self.engine.resolve() {
            Ok(resolved) => {
                let resolved = Arc::new(resolved);
                self.current.store(Arc::clone(&resolved));
                tracing::debug!(
                    active_profiles = ?resolved.active_profiles(),
                    "Refreshed configuration"
                );
                Ok(resolved)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Refresh failed, keeping previous configuration");
                Err(e)
            }
        }
    }

    /// Bind the current resolution into `T`.
    ///
    /// # Errors
    ///
    /// See [`ResolvedConfig::bind`].
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T> {
        self.get().bind()
    }

    /// The engine used for refreshes.
    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }
}

impl Clone for ConfigHandle {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
            engine: Arc::clone(&self.engine),
        }
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("current", &self.current.load().source_names())
            .finish()
    }
}
