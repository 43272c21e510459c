//! Error types for layered-config.

/// Result type alias for layered-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The engine was built with invalid settings (bad remote URI, empty search paths).
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A resource exists but could not be read.
    #[error("Failed to read configuration resource '{location}': {source}")]
    ResourceRead {
        /// The location that was being loaded
        location: String,
        /// The underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A resource was read but its contents could not be parsed.
    #[error("Failed to parse configuration resource '{location}': {message}")]
    Parse {
        /// The location (or source name) that failed to parse
        location: String,
        /// Parser message
        message: String,
    },

    /// The remote configuration locator failed.
    ///
    /// Absorbed during resolution unless fail-fast is enabled.
    #[error("Remote configuration unavailable: {0}")]
    RemoteUnavailable(String),

    /// Profile processing did not converge within the configured bound.
    #[error("Profile resolution exceeded {limit} iterations")]
    ProfileLimitExceeded {
        /// The configured iteration bound
        limit: usize,
    },

    /// The environment already holds the output of an earlier resolution.
    #[error(
        "Environment already contains source '{0}'; resolve against a freshly seeded environment"
    )]
    EnvironmentAlreadyResolved(String),

    /// A relative insertion referenced a source that does not exist.
    #[error("Property source '{0}' does not exist")]
    SourceNotFound(String),

    /// Failed to bind resolved properties into a typed value.
    #[error("Failed to deserialize configuration: {0}")]
    DeserializationError(String),
}

impl ConfigError {
    /// Whether this error aborts a resolution regardless of fail-fast settings.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RemoteUnavailable(_))
    }

    pub(crate) fn parse(location: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            location: location.into(),
            message: message.to_string(),
        }
    }
}
