//! Remote HTTP/HTTPS configuration service.

use super::{ConfigMetadata, FetchResult, JsonConfigData, RemoteConfigService};
use crate::error::{ConfigError, Result, ServiceError};
use crate::sync::SyncResult;
use async_trait::async_trait;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value as JsonValue;
use std::time::Duration;

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

/// HTTP-based configuration service.
///
/// Configurations live at `{base_url}/{env}`, with the version passed as a
/// `version` query parameter. The environment is appended as a single
/// percent-encoded path segment, so `team/a` is requested as `team%2Fa`. The response body is a JSON object holding the
/// configuration values and the `ETag` header carries the sync identifier.
/// Sync checks are `HEAD` requests with `If-None-Match`, so they never
/// transfer the configuration itself.
///
/// # Examples
///
/// ```rust,no_run
/// use config_mediator::sources::HttpConfigService;
/// use std::time::Duration;
///
/// # fn example() -> config_mediator::error::Result<()> {
/// let service = HttpConfigService::builder()
///     .with_base_url("https://config.example.com/api/configs")
///     .with_auth_token("secret-token")
///     .with_timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct HttpConfigService {
    base_url: Url,
    client: Client,
    auth: HttpAuth,
}

impl HttpConfigService {
    /// Create a new builder for constructing an HTTP service.
    pub fn builder() -> HttpConfigServiceBuilder {
        HttpConfigServiceBuilder::new()
    }

    fn url_for(&self, env: &str) -> Url {
        let mut url = self.base_url.clone();
        // Bases are validated in `build`, so segments are always available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(env);
        }
        url
    }

    fn request(&self, method: Method, env: &str, version: Option<&str>) -> RequestBuilder {
        let mut request = self.client.request(method, self.url_for(env));

        if let Some(version) = version {
            request = request.query(&[("version", version)]);
        }

        match &self.auth {
            HttpAuth::None => request,
            HttpAuth::Bearer(token) => request.bearer_auth(token),
            HttpAuth::Basic(username, password) => request.basic_auth(username, Some(password)),
        }
    }
}

#[async_trait]
impl RemoteConfigService for HttpConfigService {
    async fn fetch_config(&self, env: &str, version: Option<&str>) -> FetchResult {
        let response = self
            .request(Method::GET, env, version)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(backend_error(status));
        }

        let metadata = etag_metadata(&response);

        let json: JsonValue = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidPayload(format!("Failed to parse JSON: {}", e)))?;

        let data = JsonConfigData::from_value(json).ok_or_else(|| {
            ServiceError::InvalidPayload("Expected JSON object at root level".to_string())
        })?;

        let data = match metadata {
            Some(metadata) => data.with_metadata(metadata),
            None => data,
        };

        Ok(Some(Box::new(data)))
    }

    async fn check_for_updates(
        &self,
        local: &ConfigMetadata,
        env: &str,
        version: Option<&str>,
    ) -> SyncResult {
        let response = match self
            .request(Method::HEAD, env, version)
            .header(IF_NONE_MATCH, format!("\"{}\"", local.sync_identifier))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return SyncResult::Error(ServiceError::Transport(format!(
                    "HTTP request failed: {}",
                    e
                )));
            }
        };

        match response.status() {
            StatusCode::NOT_MODIFIED => SyncResult::UpToDate,
            StatusCode::NOT_FOUND => SyncResult::NotFound,
            status if status.is_success() => match etag_metadata(&response) {
                Some(remote) if remote == *local => SyncResult::UpToDate,
                _ => SyncResult::NeedsUpdate,
            },
            status => SyncResult::Error(backend_error(status)),
        }
    }

    async fn fetch_metadata(
        &self,
        env: &str,
        version: Option<&str>,
    ) -> std::result::Result<Option<ConfigMetadata>, ServiceError> {
        let response = self
            .request(Method::HEAD, env, version)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(backend_error(status));
        }

        Ok(etag_metadata(&response))
    }

    fn name(&self) -> String {
        format!("http:{}", self.base_url.as_str().trim_end_matches('/'))
    }
}

/// Builder for constructing an `HttpConfigService`.
pub struct HttpConfigServiceBuilder {
    base_url: Option<String>,
    auth: HttpAuth,
    timeout: Duration,
}

impl HttpConfigServiceBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth: HttpAuth::None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the base URL under which per-environment configurations live.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
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

    /// Set the request timeout.
    ///
    /// Default is 10 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the HTTP service.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No base URL is provided
    /// - The base URL does not parse, or cannot carry path segments
    /// - The HTTP client cannot be constructed
    pub fn build(self) -> Result<HttpConfigService> {
        let base_url = self.base_url.ok_or_else(|| {
            ConfigError::InvalidSetup("Base URL is required for HttpConfigService".to_string())
        })?;
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidSetup(format!("Invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidSetup(format!(
                "Base URL {base_url} cannot carry an environment path"
            )));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| {
                ConfigError::InvalidSetup(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(HttpConfigService {
            base_url,
            client,
            auth: self.auth,
        })
    }
}

impl Default for HttpConfigServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn backend_error(status: StatusCode) -> ServiceError {
    ServiceError::Backend {
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

/// Read the sync identifier from the `ETag` header, dropping weak markers and quotes.
fn etag_metadata(response: &Response) -> Option<ConfigMetadata> {
    let raw = response.headers().get(ETAG)?.to_str().ok()?;
    let tag = raw.trim().trim_start_matches("W/").trim_matches('"');
    if tag.is_empty() {
        return None;
    }
    Some(ConfigMetadata::new(tag))
}
