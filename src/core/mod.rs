//! Core resolution types.

mod accumulator;
mod binding;
mod builder;
mod config_handle;
mod engine;
mod environment;
mod profile;
mod resolved;
mod search;

pub use accumulator::{SourceAccumulator, bucket_name};
pub use builder::ResolutionEngineBuilder;
pub use config_handle::ConfigHandle;
pub use engine::{FileResolutionEngine, ResolutionEngine};
pub use environment::{
    APPLICATION_CONFIGURATION_SOURCE_NAME, APPLICATION_NAME_PROPERTY, DEFAULT_PROFILE_NAME,
    DEFAULT_PROPERTIES_SOURCE_NAME, Environment, PropertySources,
};
pub use profile::{
    ACTIVE_PROFILES_PROPERTY, Activation, DEFAULT_MAX_PROFILE_ITERATIONS,
    INCLUDE_PROFILES_PROPERTY, Profile, ProfileDeclarations, ProfileToken, ProfileWorklist,
};
pub use resolved::ResolvedConfig;
pub use search::{
    CONFIG_LOCATION_PROPERTY, CONFIG_NAME_PROPERTY, Candidate, CandidateSearch,
    DEFAULT_CONFIG_NAME, DEFAULT_EXTENSIONS, DEFAULT_SEARCH_LOCATIONS, SearchConfig,
};
