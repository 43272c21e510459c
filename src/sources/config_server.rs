//! HTTP client for a config server that serves `{name}/{profiles}/{label}` environments.

use super::{
    CONFIG_CLIENT_SOURCE_NAME, CONFIG_SERVICE_SOURCE_NAME, CompositeBuilder, CompositeSource,
    MapSource, RemoteConfigLocator, RetryPolicy, SharedSource, validate_remote_uri,
};
use crate::core::{APPLICATION_NAME_PROPERTY, Environment};
use crate::error::{ConfigError, Result};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_APPLICATION_NAME: &str = "application";

/// Authentication method for HTTP requests.
#[derive(Clone)]
pub enum HttpAuth {
    /// No authentication
    None,
    /// Bearer token authentication
    Bearer(String),
    /// Basic authentication (username, password)
    Basic(String, String),
}

impl fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bearer(_) => write!(f, "Bearer(***)"),
            Self::Basic(user, _) => write!(f, "Basic({}, ***)", user),
        }
    }
}

/// Environment document returned by the config server.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteEnvironment {
    name: Option<String>,
    #[serde(default)]
    profiles: Vec<String>,
    label: Option<String>,
    version: Option<String>,
    state: Option<String>,
    #[serde(default)]
    property_sources: Vec<RemotePropertySource>,
}

#[derive(Debug, Deserialize)]
struct RemotePropertySource {
    name: String,
    #[serde(default)]
    source: serde_json::Map<String, JsonValue>,
}

/// Remote locator backed by a config server.
///
/// Requests `{uri}/{application}/{profiles}[/{label}]`, where the application
/// name comes from the `application.name` property and the profiles are the
/// environment's active profiles (or its defaults when none are active).
///
/// # Examples
///
/// ```rust,no_run
/// use layered_config::sources::{ConfigServerLocator, RetryPolicy};
/// use std::time::Duration;
///
/// # fn example() -> layered_config::error::Result<()> {
/// let locator = ConfigServerLocator::builder()
///     .with_uri("http://localhost:8888")
///     .with_label("main")
///     .with_timeout(Duration::from_secs(5))
///     .with_retry(RetryPolicy::standard())
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigServerLocator {
    uri: String,
    label: Option<String>,
    client: Client,
    auth: HttpAuth,
    retry: RetryPolicy,
}

impl ConfigServerLocator {
    /// Create a new builder for constructing a config server locator.
    pub fn builder() -> ConfigServerLocatorBuilder {
        ConfigServerLocatorBuilder::new()
    }

    /// The configured server URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Build the request URL for an application and comma-joined profiles.
    pub(crate) fn request_url(&self, name: &str, profiles: &str) -> String {
        let mut url = format!("{}/{}/{}", self.uri.trim_end_matches('/'), name, profiles);
        if let Some(label) = &self.label {
            // Slashes in labels are escaped the way config servers expect.
            url.push('/');
            url.push_str(&label.replace('/', "(_)"));
        }
        url
    }

    /// Fetch the environment document once.
    async fn fetch(&self, url: &str) -> Result<Option<RemoteEnvironment>> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", HeaderValue::from_static("application/json"));

        request = match &self.auth {
            HttpAuth::None => request,
            HttpAuth::Bearer(token) => {
                let header_value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(
                    |e| ConfigError::RemoteUnavailable(format!("Invalid bearer token: {}", e)),
                )?;
                request.header("Authorization", header_value)
            }
            HttpAuth::Basic(username, password) => request.basic_auth(username, Some(password)),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ConfigError::RemoteUnavailable(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ConfigError::RemoteUnavailable(format!(
                "HTTP request failed with status {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let environment = response.json::<RemoteEnvironment>().await.map_err(|e| {
            ConfigError::RemoteUnavailable(format!("Failed to parse environment: {}", e))
        })?;
        Ok(Some(environment))
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Option<RemoteEnvironment>> {
        let mut attempt = 1;
        loop {
            match self.fetch(url).await {
                Ok(environment) => return Ok(environment),
                Err(e) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Config server request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Drive a future to completion from synchronous code.
    ///
    /// Inside a tokio runtime the future runs on a scoped thread with its own
    /// runtime, so callers on either runtime flavor never block a worker.
    fn block_on<F>(future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            return Self::run_to_completion(future);
        }
        std::thread::scope(|scope| scope.spawn(|| Self::run_to_completion(future)).join())
            .map_err(|_| {
                ConfigError::RemoteUnavailable("Config server request thread panicked".to_string())
            })?
    }

    fn run_to_completion<F: Future>(future: F) -> Result<F::Output> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                ConfigError::RemoteUnavailable(format!("Failed to create runtime: {}", e))
            })?;
        Ok(runtime.block_on(future))
    }
}

impl RemoteConfigLocator for ConfigServerLocator {
    fn locate(&self, environment: &Environment) -> Result<Option<SharedSource>> {
        let name = environment
            .get_property(APPLICATION_NAME_PROPERTY)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string());
        let profiles = environment.profiles_for_lookup().join(",");
        let url = self.request_url(&name, &profiles);

        tracing::info!(url = %url, "Fetching config from server");
        let Some(remote) = Self::block_on(self.fetch_with_retry(&url))?? else {
            tracing::info!(url = %url, "Config server has no environment for this application");
            return Ok(None);
        };

        tracing::info!(
            name = remote.name.as_deref().unwrap_or(&name),
            profiles = ?remote.profiles,
            label = remote.label.as_deref().unwrap_or(""),
            version = remote.version.as_deref().unwrap_or(""),
            "Located environment"
        );
        Ok(Some(Arc::new(into_composite(remote))))
    }

    fn endpoint(&self) -> Option<&str> {
        Some(&self.uri)
    }
}

/// Parse a config server environment document into a `configService` composite.
///
/// The first child is `configClient` (server version and state), followed by one
/// source per remote property source, in the order the server sent them.
///
/// # Errors
///
/// Returns [`ConfigError::RemoteUnavailable`] if the body is not a valid document.
pub fn parse_environment(body: &str) -> Result<CompositeSource> {
    let remote: RemoteEnvironment = serde_json::from_str(body).map_err(|e| {
        ConfigError::RemoteUnavailable(format!("Failed to parse environment: {}", e))
    })?;
    Ok(into_composite(remote))
}

fn into_composite(remote: RemoteEnvironment) -> CompositeSource {
    let mut builder = CompositeBuilder::new(CONFIG_SERVICE_SOURCE_NAME);

    let mut client = MapSource::new(CONFIG_CLIENT_SOURCE_NAME);
    if let Some(version) = remote.version {
        client.insert("config.client.version", version);
    }
    if let Some(state) = remote.state {
        client.insert("config.client.state", state);
    }
    builder.push(Arc::new(client));

    for source in remote.property_sources {
        let mut properties = BTreeMap::new();
        for (key, value) in &source.source {
            flatten_json(key, value, &mut properties);
        }
        builder.push(Arc::new(MapSource::from_map(source.name, properties)));
    }

    builder.build()
}

fn flatten_json(prefix: &str, value: &JsonValue, out: &mut BTreeMap<String, String>) {
    match value {
        JsonValue::Object(map) => {
            for (key, value) in map {
                flatten_json(&format!("{}.{}", prefix, key), value, out);
            }
        }
        JsonValue::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten_json(&format!("{}[{}]", prefix, index), value, out);
            }
        }
        JsonValue::Null => {
            out.insert(prefix.to_string(), String::new());
        }
        JsonValue::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

/// Builder for constructing a [`ConfigServerLocator`].
pub struct ConfigServerLocatorBuilder {
    uri: Option<String>,
    label: Option<String>,
    auth: HttpAuth,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ConfigServerLocatorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            uri: None,
            label: None,
            auth: HttpAuth::None,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::none(),
        }
    }

    /// Set the config server URI. Must start with `http://` or `https://`.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Request a specific label (branch, tag) from the server.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set Bearer token authentication.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth = HttpAuth::Bearer(token.into());
        self
    }

    /// Set Basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth = HttpAuth::Basic(username.into(), password.into());
        self
    }

    /// Set the per-request timeout. Default is 10 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy. Default is a single attempt.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the locator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] if:
    /// - No URI is provided, or it lacks an HTTP(S) scheme
    /// - The HTTP client cannot be constructed
    pub fn build(self) -> Result<ConfigServerLocator> {
        let uri = self.uri.ok_or_else(|| {
            ConfigError::Configuration("The config server URI must be set".to_string())
        })?;
        validate_remote_uri(&uri)?;

        let client = Client::builder().timeout(self.timeout).build().map_err(|e| {
            ConfigError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(ConfigServerLocator {
            uri: uri.trim().to_string(),
            label: self.label,
            client,
            auth: self.auth,
            retry: self.retry,
        })
    }
}

impl Default for ConfigServerLocatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
