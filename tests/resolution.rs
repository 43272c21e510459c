//! Integration tests for resolving configuration files from disk.

use layered_config::core::{APPLICATION_CONFIGURATION_SOURCE_NAME, DEFAULT_PROPERTIES_SOURCE_NAME};
use layered_config::prelude::*;
use layered_config::resource::FileSystemResolver;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct ServerConfig {
    port: u16,
    host: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct DatabaseConfig {
    url: String,
    max_connections: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct AppConfig {
    server: ServerConfig,
    database: DatabaseConfig,
}

fn write(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn engine_for(dir: &Path) -> ResolutionEngineBuilder {
    ResolutionEngine::builder()
        .with_resource_resolver(FileSystemResolver::new(dir))
        .with_runtime_context(RuntimeContext::new())
}

#[test]
fn test_single_properties_file_without_profiles() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.properties", "foo=baz\n");

    let resolved = engine_for(temp_dir.path()).build().unwrap().resolve().unwrap();
    assert_eq!(resolved.get_property("foo").as_deref(), Some("baz"));
    assert!(resolved.active_profiles().is_empty());
}

#[test]
fn test_last_explicit_profile_wins() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "app.yml", "k: 1\n");
    write(temp_dir.path(), "app-development.yml", "k: 2\n");
    write(temp_dir.path(), "app-db.yml", "k: 3\n");

    let resolved = engine_for(temp_dir.path())
        .with_search_names(["app"])
        .with_profiles(["development", "db"])
        .build()
        .unwrap()
        .resolve()
        .unwrap();

    assert_eq!(resolved.get_property("k").as_deref(), Some("3"));
    assert_eq!(resolved.active_profiles(), vec!["development", "db"]);
}

#[test]
fn test_profile_file_overrides_base() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.yml", "foo:\n  db: basedb\n  other: base\n");
    write(temp_dir.path(), "application-db.yml", "foo:\n  db: mycooldb\n");

    let resolved = engine_for(temp_dir.path())
        .with_application_name("foo")
        .with_profiles(["db"])
        .build()
        .unwrap()
        .resolve()
        .unwrap();

    assert_eq!(resolved.get_property("foo.db").as_deref(), Some("mycooldb"));
    assert_eq!(resolved.get_property("foo.other").as_deref(), Some("base"));
    assert_eq!(resolved.get_property("application.name").as_deref(), Some("foo"));
}

#[test]
fn test_more_specific_location_wins() {
    let temp_dir = TempDir::new().unwrap();
    let classpath = temp_dir.path().join("resources");
    write(&classpath, "application.properties", "source=classpath\nonly.classpath=yes\n");
    write(temp_dir.path(), "application.properties", "source=file\n");
    write(temp_dir.path(), "config/application.properties", "source=file-config\n");

    let resolved = ResolutionEngine::builder()
        .with_resource_resolver(
            FileSystemResolver::new(temp_dir.path()).with_classpath_root(&classpath),
        )
        .with_runtime_context(RuntimeContext::new())
        .build()
        .unwrap()
        .resolve()
        .unwrap();

    assert_eq!(resolved.get_property("source").as_deref(), Some("file-config"));
    assert_eq!(resolved.get_property("only.classpath").as_deref(), Some("yes"));
}

#[test]
fn test_properties_preferred_over_yaml_in_same_location() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.properties", "format=properties\n");
    write(temp_dir.path(), "application.yml", "format: yaml\nyaml.only: true\n");

    let resolved = engine_for(temp_dir.path()).build().unwrap().resolve().unwrap();
    assert_eq!(resolved.get_property("format").as_deref(), Some("properties"));
    assert_eq!(resolved.get_property("yaml.only").as_deref(), Some("true"));
}

#[test]
fn test_bind_typed_config() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "application.yml",
        r#"
server:
  port: 8080
  host: localhost
database:
  url: postgres://localhost/db
  max_connections: 10
"#,
    );
    write(temp_dir.path(), "application-prod.toml", "[server]\nport = 80\n");

    let config: AppConfig = engine_for(temp_dir.path())
        .with_profiles(["prod"])
        .build()
        .unwrap()
        .resolve()
        .unwrap()
        .bind()
        .unwrap();

    assert_eq!(config.server.port, 80);
    assert_eq!(config.server.host, "localhost");
    assert_eq!(config.database.max_connections, 10);
}

#[test]
fn test_final_source_order() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.properties", "foo=bar\n");

    let resolved = engine_for(temp_dir.path())
        .with_default_property("fallback", "yes")
        .build()
        .unwrap()
        .resolve()
        .unwrap();

    assert_eq!(
        resolved.source_names(),
        vec![
            "systemProperties",
            "systemEnvironment",
            "random",
            APPLICATION_CONFIGURATION_SOURCE_NAME,
            DEFAULT_PROPERTIES_SOURCE_NAME,
        ]
    );
    assert_eq!(resolved.source().name(), APPLICATION_CONFIGURATION_SOURCE_NAME);
    assert_eq!(resolved.get_property("fallback").as_deref(), Some("yes"));
}

#[test]
fn test_environment_variable_shadows_file() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.yml", "foo:\n  db: fromfile\n");

    let resolved = ResolutionEngine::builder()
        .with_resource_resolver(FileSystemResolver::new(temp_dir.path()))
        .with_runtime_context(RuntimeContext::new().with_env_var("FOO_DB", "fromenv"))
        .build()
        .unwrap()
        .resolve()
        .unwrap();

    assert_eq!(resolved.get_property("foo.db").as_deref(), Some("fromenv"));
}

#[test]
fn test_environment_variable_activates_profile() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.properties", "config.profiles.active=ignored\nk=base\n");
    write(temp_dir.path(), "application-cloud.properties", "k=cloud\n");
    write(temp_dir.path(), "application-ignored.properties", "k=ignored\n");

    let resolved = ResolutionEngine::builder()
        .with_resource_resolver(FileSystemResolver::new(temp_dir.path()))
        .with_runtime_context(RuntimeContext::new().with_env_var("CONFIG_PROFILES_ACTIVE", "cloud"))
        .build()
        .unwrap()
        .resolve()
        .unwrap();

    assert_eq!(resolved.get_property("k").as_deref(), Some("cloud"));
    assert_eq!(resolved.active_profiles(), vec!["cloud"]);
}

#[test]
fn test_config_location_system_property() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.properties", "foo=default-location\n");
    write(temp_dir.path(), "override/custom.yml", "foo: overridden\n");

    let location = format!("file:{}", temp_dir.path().join("override/custom.yml").display());
    let resolved = ResolutionEngine::builder()
        .with_resource_resolver(FileSystemResolver::new(temp_dir.path()))
        .with_runtime_context(
            RuntimeContext::new().with_system_property("config.location", location),
        )
        .build()
        .unwrap()
        .resolve()
        .unwrap();

    assert_eq!(resolved.get_property("foo").as_deref(), Some("overridden"));
}

#[test]
fn test_config_name_override() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.properties", "foo=application\n");
    write(temp_dir.path(), "service.properties", "foo=service\n");

    let resolved = engine_for(temp_dir.path())
        .with_config_name("application,service")
        .build()
        .unwrap()
        .resolve()
        .unwrap();

    assert_eq!(resolved.get_property("foo").as_deref(), Some("service"));
}

#[test]
fn test_random_values() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.properties", "instance=${random.uuid}\n");

    let resolved = engine_for(temp_dir.path()).build().unwrap().resolve().unwrap();
    let instance = resolved.get_property("instance").unwrap();
    assert_eq!(instance.len(), 36);
    assert!(!instance.contains("${"));
}

#[test]
fn test_missing_files_resolve_to_empty_aggregate() {
    let temp_dir = TempDir::new().unwrap();

    let resolved = engine_for(temp_dir.path()).build().unwrap().resolve().unwrap();
    assert!(resolved.get_property("anything").is_none());
    assert_eq!(resolved.source().children().map(<[_]>::len), Some(0));
}

#[test]
fn test_malformed_file_fails_resolution() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "application.yml", "a: [1, 2\n");

    let result = engine_for(temp_dir.path()).build().unwrap().resolve();
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct PoolSettings {
    max_connections: u32,
    host_name: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct PoolRoot {
    pool: PoolSettings,
}

#[test]
fn test_mixed_case_keys_across_formats() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "application.json",
        r#"{"pool": {"maxConnections": 5, "hostName": "json-host"}}"#,
    );
    write(temp_dir.path(), "application.toml", "[pool]\nhostName = \"toml-host\"\n");
    write(temp_dir.path(), "application-prod.properties", "pool.maxConnections=20\n");

    let resolved = engine_for(temp_dir.path())
        .with_profiles(["prod"])
        .build()
        .unwrap()
        .resolve()
        .unwrap();

    assert_eq!(resolved.get_property("pool.maxConnections").as_deref(), Some("20"));
    assert_eq!(resolved.get_property("pool.hostName").as_deref(), Some("toml-host"));
    assert!(resolved.get_property("pool.maxconnections").is_none());

    let bound: PoolRoot = resolved.bind().unwrap();
    assert_eq!(
        bound.pool,
        PoolSettings {
            max_connections: 20,
            host_name: "toml-host".to_string(),
        }
    );
}
