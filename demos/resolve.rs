//! Walk through a layered resolution.
//!
//! This example demonstrates:
//! - Base and profile-specific files in one search location
//! - A YAML profile section inside the base file
//! - Profiles included by a loaded file
//! - A remote layer shadowing local files
//! - Environment variables shadowing everything but system properties
//! - Binding the result into typed structs
//!
//! Run with: cargo run --example resolve

use layered_config::prelude::*;
use layered_config::resource::FileSystemResolver;
use layered_config::sources::MapSource;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct AppConfig {
    server: ServerConfig,
    database: DatabaseConfig,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    host: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
    url: String,
    #[serde(default)]
    pool_size: u32,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== Layered Resolution Example ===\n");

    let temp_dir = tempfile::tempdir()?;
    std::fs::create_dir_all(temp_dir.path().join("config"))?;
    std::fs::write(
        temp_dir.path().join("config/application.yml"),
        r#"server:
  host: localhost
  port: 8080
database:
  url: postgres://localhost/dev
  pool_size: 5
---
config:
  activate:
    on-profile: prod
server:
  host: 0.0.0.0
"#,
    )?;
    std::fs::write(
        temp_dir.path().join("config/application-prod.properties"),
        "config.profiles.include=metrics\nserver.port=80\n",
    )?;
    std::fs::write(
        temp_dir.path().join("config/application-metrics.properties"),
        "metrics.enabled=true\n",
    )?;
    println!("Wrote config files to {}\n", temp_dir.path().display());

    let log = Arc::new(ActivationLog::new());
    let engine = ResolutionEngine::builder()
        .with_application_name("orders")
        .with_profiles(["prod"])
        .with_resource_resolver(FileSystemResolver::new(temp_dir.path()))
        .with_runtime_context(
            RuntimeContext::new().with_env_var("DATABASE_POOL_SIZE", "20"),
        )
        .with_remote(|env: &Environment| -> Result<Option<SharedSource>> {
            let name = env.get_property("application.name").unwrap_or_default();
            Ok(Some(Arc::new(
                MapSource::new("configService")
                    .with_property("database.url", format!("postgres://db.internal/{}", name)),
            )))
        })
        .with_shared_observer(log.clone())
        .build()?;

    let resolved = engine.resolve()?;

    println!("Active profiles: {:?}", resolved.active_profiles());
    println!("Sources, highest precedence first:");
    for name in resolved.source_names() {
        println!("  - {}", name);
    }

    println!("\nProfile declarations:");
    for event in log.events() {
        println!(
            "  {} activated={:?} included={:?} ignored={:?}",
            event.source, event.activated, event.included, event.ignored
        );
    }

    let config: AppConfig = resolved.bind()?;
    println!("\nBound configuration:");
    println!("  Server:   {}:{}", config.server.host, config.server.port);
    println!(
        "  Database: {} (pool size: {})",
        config.database.url, config.database.pool_size
    );
    println!(
        "  Metrics:  {}",
        resolved.get_property_or("metrics.enabled", "false")
    );

    Ok(())
}
