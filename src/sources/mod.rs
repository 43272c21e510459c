//! Property source implementations.

mod composite;
mod property_source;
mod random;
mod remote;
mod system;

#[cfg(feature = "remote")]
mod config_server;

pub use composite::{CompositeBuilder, CompositeSource};
pub use property_source::{MapSource, PropertySource, SharedSource};
pub use random::{RANDOM_SOURCE_NAME, RandomValueSource};
pub use remote::{
    CONFIG_CLIENT_SOURCE_NAME, CONFIG_SERVICE_SOURCE_NAME, RemoteConfigLocator, RetryPolicy,
    validate_remote_uri,
};
pub use system::{
    RuntimeContext, SYSTEM_ENVIRONMENT_SOURCE_NAME, SYSTEM_PROPERTIES_SOURCE_NAME,
    SystemEnvironmentSource,
};

#[cfg(feature = "remote")]
pub use config_server::{
    ConfigServerLocator, ConfigServerLocatorBuilder, HttpAuth, parse_environment,
};
