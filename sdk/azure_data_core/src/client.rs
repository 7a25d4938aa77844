//! HTTP client shared by every service crate.
//!
//! [`ServiceClient`] owns the endpoint, the credential and the retry policy.
//! Service crates build paths and headers and hand them to
//! [`ServiceClient::send`] (or one of the verb helpers).
//!
//! # Examples
//!
//! ## Using an API key
//! ```rust,no_run
//! use azure_data_core::client::ServiceClient;
//! use azure_data_core::auth::ServiceCredential;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::builder()
//!     .endpoint("https://my-account.documents.azure.com")
//!     .credential(ServiceCredential::api_key("your-key"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the Azure CLI identity
//! ```rust,no_run
//! use azure_data_core::client::ServiceClient;
//! use azure_data_core::auth::ServiceCredential;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::builder()
//!     .endpoint("https://my-vault.vault.azure.net")
//!     .credential(ServiceCredential::azure_cli()?)
//!     .scope("https://vault.azure.net/.default")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as HttpClient, Method};
use url::Url;

use crate::auth::{AuthScheme, ServiceCredential};
use crate::error::{SdkError, SdkResult};
use crate::models::{ErrorBody, MAX_ERROR_MESSAGE_LEN, REQUEST_ID_HEADER, RETRY_AFTER_HEADERS};

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

const REDACTED: &str = "[REDACTED]";

/// Prefixes that are followed by a credential in service error messages.
const SECRET_MARKERS: [&str; 3] = ["Bearer ", "sig=", "sig%3D"];

/// Determines if an HTTP status code represents a retriable error.
///
/// - 429 Too Many Requests (throttling)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
    /// Upper bound on any single delay, server hints included.
    pub max_backoff: Duration,
}

/// Default cap on a single retry delay (30 seconds).
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt + 1`.
    ///
    /// A server-provided hint wins; otherwise exponential backoff with ±25% jitter.
    /// Either way the delay never exceeds [`max_backoff`](Self::max_backoff).
    pub fn backoff(&self, attempt: u32, server_hint: Option<Duration>) -> Duration {
        if let Some(hint) = server_hint {
            return hint.min(self.max_backoff);
        }
        let base = self
            .initial_backoff
            .checked_mul(2_u32.saturating_pow(attempt))
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff);
        let jitter = 0.75 + fastrand::f64() * 0.5;
        base.mul_f64(jitter).min(self.max_backoff)
    }
}

/// Read a retry delay hint from throttling response headers.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    RETRY_AFTER_HEADERS.iter().find_map(|name| {
        let value = headers.get(*name)?.to_str().ok()?.trim();
        if name.ends_with("-ms") {
            let ms = value.parse::<f64>().ok()?;
            Duration::try_from_secs_f64(ms / 1000.0).ok()
        } else {
            value.parse::<u64>().ok().map(Duration::from_secs)
        }
    })
}

/// The base client for talking to an Azure data-plane service.
///
/// The client is cheaply cloneable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: ServiceCredential,
    pub(crate) scope: String,
    pub(crate) auth_scheme: AuthScheme,
    pub(crate) default_headers: HeaderMap,
    pub(crate) retry_policy: RetryPolicy,
}

/// Builder for constructing a [`ServiceClient`].
#[derive(Debug, Default)]
pub struct ServiceClientBuilder {
    endpoint: Option<String>,
    credential: Option<ServiceCredential>,
    scope: Option<String>,
    auth_scheme: AuthScheme,
    headers: Vec<(String, String)>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ServiceClient {
    /// Create a new builder for configuring a `ServiceClient`.
    pub fn builder() -> ServiceClientBuilder {
        ServiceClientBuilder::default()
    }

    /// Get the base endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The OAuth scope requested for token credentials.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// How tokens are rendered into the `authorization` header.
    pub fn auth_scheme(&self) -> AuthScheme {
        self.auth_scheme
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Whether `url` shares scheme, host and port with the endpoint.
    pub fn same_origin(&self, url: &Url) -> bool {
        url.origin() == self.endpoint.origin()
    }

    /// Resolve a path, or an absolute URL issued by the service, against the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined, or if an absolute URL
    /// points at a different origin (credentials are never sent there).
    pub fn url(&self, path: &str) -> SdkResult<Url> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|e| SdkError::invalid_endpoint_with_source("failed to construct URL", e))?;

        if !self.same_origin(&url) {
            return Err(SdkError::invalid_endpoint(format!(
                "refusing to send credentials to {}",
                url.origin().ascii_serialization()
            )));
        }
        Ok(url)
    }

    /// Build an endpoint URL from path segments, percent-encoding each one.
    ///
    /// Use this when a segment comes from user input (resource names, ids).
    pub fn segments_url(&self, segments: &[&str]) -> SdkResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SdkError::invalid_endpoint("endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a GET request with automatic retry on transient errors.
    pub async fn get(&self, path: &str) -> SdkResult<reqwest::Response> {
        self.send(Method::GET, path, HeaderMap::new(), None).await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> SdkResult<reqwest::Response> {
        let body = serde_json::to_value(body)?;
        self.send(Method::PUT, path, HeaderMap::new(), Some(&body))
            .await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> SdkResult<reqwest::Response> {
        self.send(Method::DELETE, path, HeaderMap::new(), None).await
    }

    /// Send a request with extra headers and an optional JSON body.
    ///
    /// Authentication and the client's default headers are added automatically.
    /// `headers` are applied before the body, so a caller-supplied
    /// `content-type` is kept. Retries on 429, 500, 502, 503 and 504 with
    /// exponential backoff, honoring `retry-after` style hints.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails, the request fails after all
    /// retries, or the server returns a non-retriable error response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&serde_json::Value>,
    ) -> SdkResult<reqwest::Response> {
        let url = self.url(path)?;
        let (auth_header, auth_value) = self
            .credential
            .authorization(Some(&self.scope), self.auth_scheme)
            .await?;

        let mut attempt = 0;
        loop {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .headers(self.default_headers.clone())
                .headers(headers.clone())
                .header(auth_header, &auth_value);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            if response.status().is_success() {
                return Ok(response);
            }

            let status = response.status().as_u16();
            if !is_retriable_status(status) || attempt >= self.retry_policy.max_retries {
                return Self::check_response(response).await;
            }

            let backoff = self
                .retry_policy
                .backoff(attempt, retry_after(response.headers()));
            tracing::debug!(
                status,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "retrying request"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Remove credentials that services sometimes echo back in error messages.
    pub(crate) fn sanitize_error_message(msg: &str) -> String {
        let mut result = msg.to_string();

        for marker in SECRET_MARKERS {
            let mut search_start = 0;
            while let Some(relative) = result[search_start..].find(marker) {
                let secret_start = search_start + relative + marker.len();
                let secret_end = result[secret_start..]
                    .find(|c: char| {
                        c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '&' | ';')
                    })
                    .map_or(result.len(), |pos| secret_start + pos);

                if secret_end > secret_start && !result[secret_start..].starts_with(REDACTED) {
                    result.replace_range(secret_start..secret_end, REDACTED);
                    search_start = secret_start + REDACTED.len();
                } else {
                    search_start = secret_start;
                }
            }
        }

        result
    }

    /// Sanitize, then cut the message down to [`MAX_ERROR_MESSAGE_LEN`] bytes.
    pub(crate) fn truncate_message(msg: &str) -> String {
        let sanitized = Self::sanitize_error_message(msg);
        if sanitized.len() <= MAX_ERROR_MESSAGE_LEN {
            return sanitized;
        }

        let mut end = MAX_ERROR_MESSAGE_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &sanitized[..end])
    }

    /// Turn a failed response into an [`SdkError`].
    async fn check_response(response: reqwest::Response) -> SdkResult<reqwest::Response> {
        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.unwrap_or_default();

        tracing::debug!(status, request_id = ?request_id, "service returned an error");

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            let error_value = value.get("error").unwrap_or(&value);
            if let Ok(error) = serde_json::from_value::<ErrorBody>(error_value.clone()) {
                if error.code.is_some() || error.message.is_some() {
                    return Err(SdkError::Api {
                        code: error.code.unwrap_or_else(|| "unknown".into()),
                        message: Self::truncate_message(error.message.as_deref().unwrap_or(&body)),
                    });
                }
            }
        }

        Err(SdkError::http(status, Self::truncate_message(&body)))
    }
}

impl ServiceClientBuilder {
    /// Set the service endpoint URL.
    ///
    /// If not set, the builder will check the `AZURE_DATA_ENDPOINT`
    /// environment variable.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the credential to use for authentication.
    ///
    /// Defaults to [`ServiceCredential::from_env()`].
    pub fn credential(mut self, credential: ServiceCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the OAuth scope requested from token credentials.
    ///
    /// Defaults to `<endpoint origin>/.default`.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set how tokens are rendered into the `authorization` header.
    pub fn auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    /// Add a header sent with every request (e.g. a service version header).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** If you provide a custom HTTP client, any timeout configuration
    /// on this builder is ignored.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout, covering the whole request/response cycle.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Defaults to 3 retries with 500ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the `ServiceClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No endpoint is provided and `AZURE_DATA_ENDPOINT` is not set
    /// - The endpoint URL is invalid
    /// - A default header name or value is invalid
    /// - Credential creation fails (when using environment-based credentials)
    pub fn build(self) -> SdkResult<ServiceClient> {
        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .timeout(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
                .build()?,
        };

        let endpoint_str = self
            .endpoint
            .or_else(|| std::env::var("AZURE_DATA_ENDPOINT").ok())
            .ok_or_else(|| {
                SdkError::MissingConfig(
                    "endpoint is required. Set it via builder or AZURE_DATA_ENDPOINT env var."
                        .into(),
                )
            })?;

        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| SdkError::invalid_endpoint_with_source("invalid endpoint URL", e))?;
        if endpoint.cannot_be_a_base() {
            return Err(SdkError::invalid_endpoint("endpoint must be an absolute http(s) URL"));
        }

        let mut default_headers = HeaderMap::new();
        for (name, value) in self.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|_| SdkError::Builder(format!("invalid header name: {}", name)))?;
            let header_value = HeaderValue::try_from(value)
                .map_err(|_| SdkError::Builder(format!("invalid value for header {}", name)))?;
            default_headers.insert(header_name, header_value);
        }

        let scope = self
            .scope
            .unwrap_or_else(|| format!("{}/.default", endpoint.origin().ascii_serialization()));

        let credential = match self.credential {
            Some(credential) => credential,
            None => ServiceCredential::from_env()?,
        };

        Ok(ServiceClient {
            http,
            endpoint,
            credential,
            scope,
            auth_scheme: self.auth_scheme,
            default_headers,
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}
