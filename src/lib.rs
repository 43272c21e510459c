//! # layered-config
//!
//! Profile-aware hierarchical configuration resolution.
//!
//! ## Overview
//!
//! `layered-config` discovers, activates, loads and merges layered
//! configuration into one deterministically ordered lookup surface:
//! - System properties and environment variables from an injected
//!   [`RuntimeContext`](sources::RuntimeContext)
//! - An optional remote source, such as a config server
//! - Local `application[-profile].{properties,yml,yaml,toml,json}` files,
//!   searched across several locations
//! - Default properties
//!
//! Profiles can be requested explicitly, activated by a file through
//! `config.profiles.active` (the first activation wins) or pulled in with
//! `config.profiles.include`. Files for later profiles override earlier ones.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use layered_config::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct AppConfig {
//!     server: ServerConfig,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct ServerConfig {
//!     port: u16,
//! }
//!
//! # fn example() -> layered_config::error::Result<()> {
//! let engine = ResolutionEngine::builder()
//!     .with_application_name("foo")
//!     .with_profiles(["development", "db"])
//!     .with_config_server("http://localhost:8888")
//!     .build()?;
//!
//! let resolved = engine.resolve()?;
//! println!("foo.db = {:?}", resolved.get_property("foo.db"));
//!
//! let config: AppConfig = resolved.bind()?;
//! println!("Server port: {}", config.server.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Precedence
//!
//! Highest first:
//!
//! | source | origin |
//! |---|---|
//! | `systemProperties` | [`RuntimeContext`](sources::RuntimeContext) |
//! | `systemEnvironment` | [`RuntimeContext`](sources::RuntimeContext), relaxed names |
//! | `configService` | remote locator |
//! | `random` | `random.*` values |
//! | `applicationConfigurationProperties` | local files, one group per profile |
//! | `defaultProperties` | application name and builder defaults |
//!
//! ## Feature Flags
//!
//! - `remote` (default): HTTP config server locator built on `reqwest`

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod format;
pub mod observer;
pub mod resource;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ConfigHandle, Environment, Profile, ResolutionEngine, ResolutionEngineBuilder,
        ResolvedConfig, SearchConfig,
    };
    pub use crate::error::{ConfigError, Result};
    pub use crate::observer::{ActivationEvent, ActivationLog, ProfileActivationObserver};
    pub use crate::sources::{PropertySource, RemoteConfigLocator, RuntimeContext, SharedSource};
}
