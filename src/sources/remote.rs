//! Remote configuration locator contract.

use super::SharedSource;
use crate::core::Environment;
use crate::error::{ConfigError, Result};
use std::time::Duration;

/// Name of the composite a config server contributes.
pub const CONFIG_SERVICE_SOURCE_NAME: &str = "configService";

/// Name of the child source carrying config server metadata (version, state).
pub const CONFIG_CLIENT_SOURCE_NAME: &str = "configClient";

const HTTP_SCHEME: &str = "http://";
const HTTPS_SCHEME: &str = "https://";

/// Collaborator that fetches configuration from outside the process.
///
/// The resolution engine calls [`locate`](Self::locate) once per resolution,
/// after the environment has been seeded. Returning `Ok(None)` means there is
/// nothing to contribute. Errors are absorbed by the engine unless it was built
/// with fail-fast enabled.
///
/// Closures with the matching signature implement this trait, which keeps
/// test doubles short:
///
/// ```rust
/// use layered_config::core::Environment;
/// use layered_config::error::Result;
/// use layered_config::sources::{MapSource, RemoteConfigLocator, SharedSource};
/// use std::sync::Arc;
///
/// let locator = |_env: &Environment| -> Result<Option<SharedSource>> {
///     Ok(Some(Arc::new(MapSource::new("remote").with_property("k", "v"))))
/// };
/// let found = locator.locate(&Environment::new()).unwrap();
/// assert!(found.is_some());
/// ```
pub trait RemoteConfigLocator: Send + Sync {
    /// Fetch the remote property source for the given environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote system could not be reached or answered
    /// with something unusable.
    fn locate(&self, environment: &Environment) -> Result<Option<SharedSource>>;

    /// The endpoint this locator talks to, validated when the engine is built.
    fn endpoint(&self) -> Option<&str> {
        None
    }
}

impl<F> RemoteConfigLocator for F
where
    F: Fn(&Environment) -> Result<Option<SharedSource>> + Send + Sync,
{
    fn locate(&self, environment: &Environment) -> Result<Option<SharedSource>> {
        self(environment)
    }
}

/// Check that a remote URI is present and carries an explicit HTTP(S) scheme.
///
/// # Errors
///
/// Returns [`ConfigError::Configuration`] for an empty URI or a missing scheme.
pub fn validate_remote_uri(uri: &str) -> Result<()> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(ConfigError::Configuration(
            "The config server URI must be set".to_string(),
        ));
    }
    if !uri.starts_with(HTTP_SCHEME) && !uri.starts_with(HTTPS_SCHEME) {
        return Err(ConfigError::Configuration(format!(
            "The config server URI must start with http:// or https://: {}",
            uri
        )));
    }
    Ok(())
}

/// Bounded retry with exponential backoff for remote fetches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_interval: Duration,
    /// Growth factor applied to each following delay
    pub multiplier: f64,
    /// Upper bound for any single delay
    pub max_interval: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_interval: Duration::ZERO,
            multiplier: 1.0,
            max_interval: Duration::ZERO,
        }
    }

    /// Ten attempts starting at 3s, growing by 1.5x, capped at 10s.
    pub fn standard() -> Self {
        Self {
            max_attempts: 10,
            initial_interval: Duration::from_millis(3000),
            multiplier: 1.5,
            max_interval: Duration::from_millis(10_000),
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_interval.as_secs_f64()).max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MapSource, PropertySource};
    use std::sync::Arc;

    #[test]
    fn test_validate_remote_uri() {
        assert!(validate_remote_uri("http://localhost:8888").is_ok());
        assert!(validate_remote_uri("https://config.example.com").is_ok());
        assert!(matches!(
            validate_remote_uri(""),
            Err(ConfigError::Configuration(_))
        ));
        assert!(matches!(
            validate_remote_uri("localhost:8888"),
            Err(ConfigError::Configuration(_))
        ));
    }

    #[test]
    fn test_standard_backoff() {
        let policy = RetryPolicy::standard();
        assert_eq!(policy.delay_for(1), Duration::from_millis(3000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(6750));
        assert_eq!(policy.delay_for(4), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(9), Duration::from_millis(10_000));
    }

    #[test]
    fn test_default_is_single_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_closure_locator() {
        let locator = |_env: &Environment| -> Result<Option<SharedSource>> {
            Ok(Some(Arc::new(MapSource::new("remote"))))
        };
        let source = locator.locate(&Environment::new()).unwrap().unwrap();
        assert_eq!(source.name(), "remote");
        assert!(locator.endpoint().is_none());
    }
}
