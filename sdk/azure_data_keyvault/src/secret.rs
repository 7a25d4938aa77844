//! Secret management for Key Vault.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_data_core::client::ServiceClient;
//! use azure_data_core::feed::FeedOptions;
//! use azure_data_keyvault::secret::{self, SecretSetRequest};
//! use futures::StreamExt;
//! use secrecy::ExposeSecret;
//!
//! # async fn example(client: &ServiceClient) -> azure_data_core::error::SdkResult<()> {
//! let request = SecretSetRequest::builder()
//!     .value("s3cr3t")
//!     .content_type("text/plain")
//!     .tag("env", "dev")
//!     .build()?;
//! secret::set(client, "db-password", &request).await?;
//!
//! let fetched = secret::get(client, "db-password").await?;
//! assert_eq!(fetched.value.expose_secret(), "s3cr3t");
//!
//! let mut pages = Box::pin(secret::list(client, FeedOptions::new().max_item_count(25))?.into_stream());
//! while let Some(page) = pages.next().await {
//!     for props in page?.items() {
//!         println!("{:?}", props.name());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use azure_data_core::client::ServiceClient;
use azure_data_core::error::{SdkError, SdkResult};
use azure_data_core::feed::{FeedIterator, FeedOptions};
use secrecy::SecretString;
use serde::Serialize;
use url::Url;

use crate::executor::NextLinkExecutor;
use crate::models::{
    serialize_secret, DeletedSecret, Secret, SecretAttributes, SecretProperties,
    KEYVAULT_API_VERSION, MAX_PAGE_RESULTS,
};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A request to create a secret or add a new version of it.
#[derive(Debug, Serialize)]
pub struct SecretSetRequest {
    #[serde(serialize_with = "serialize_secret")]
    value: SecretString,

    #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    tags: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<SecretAttributes>,
}

/// Builder for [`SecretSetRequest`].
#[derive(Debug, Default)]
pub struct SecretSetRequestBuilder {
    value: Option<SecretString>,
    content_type: Option<String>,
    tags: HashMap<String, String>,
    attributes: Option<SecretAttributes>,
}

impl SecretSetRequest {
    /// Create a new builder for `SecretSetRequest`.
    pub fn builder() -> SecretSetRequestBuilder {
        SecretSetRequestBuilder::default()
    }
}

impl SecretSetRequestBuilder {
    /// Set the secret value. **Required.**
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(SecretString::from(value.into()));
        self
    }

    /// Set a content type hint, e.g. `text/plain`.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a tag. At most 15 tags are allowed.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Set enabled, not-before and expiry attributes.
    pub fn attributes(mut self, attributes: SecretAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Build the request.
    pub fn build(self) -> SdkResult<SecretSetRequest> {
        let value = self
            .value
            .ok_or_else(|| SdkError::Builder("value is required".into()))?;

        if self.tags.len() > 15 {
            return Err(SdkError::Builder("at most 15 tags are allowed".into()));
        }

        if let Some(attrs) = &self.attributes {
            if let (Some(nbf), Some(exp)) = (attrs.not_before, attrs.expires) {
                if nbf >= exp {
                    return Err(SdkError::Builder(
                        "not_before must be earlier than expires".into(),
                    ));
                }
            }
        }

        Ok(SecretSetRequest {
            value,
            content_type: self.content_type,
            tags: self.tags,
            attributes: self.attributes,
        })
    }
}

// ---------------------------------------------------------------------------
// API functions
// ---------------------------------------------------------------------------

/// Iterator over secret metadata.
pub type SecretFeed = FeedIterator<SecretProperties, NextLinkExecutor<SecretProperties>>;

/// Secret names are 1-127 characters of ASCII letters, digits and dashes.
fn validate_name(name: &str) -> SdkResult<()> {
    if name.is_empty() || name.len() > 127 {
        return Err(SdkError::Builder(
            "secret name must be 1-127 characters".into(),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(SdkError::Builder(format!(
            "secret name may only contain letters, digits and dashes: {}",
            name
        )));
    }
    Ok(())
}

fn validate_page_size(options: &FeedOptions) -> SdkResult<()> {
    match options.max_item_count {
        Some(n) if n == 0 || n > MAX_PAGE_RESULTS => Err(SdkError::Builder(format!(
            "max_item_count must be between 1 and {}",
            MAX_PAGE_RESULTS
        ))),
        _ => Ok(()),
    }
}

fn secret_url(client: &ServiceClient, segments: &[&str]) -> SdkResult<Url> {
    let mut url = client.segments_url(segments)?;
    url.query_pairs_mut()
        .append_pair("api-version", KEYVAULT_API_VERSION);
    Ok(url)
}

/// List the latest version of every secret in the vault.
///
/// Values are not included; call [`get`] for those.
///
/// # Tracing
///
/// Emits a span named `azure::keyvault::secrets::list`.
#[tracing::instrument(name = "azure::keyvault::secrets::list", skip(client, options))]
pub fn list(client: &ServiceClient, options: FeedOptions) -> SdkResult<SecretFeed> {
    validate_page_size(&options)?;
    let url = secret_url(client, &["secrets"])?;
    tracing::debug!("creating secret feed");
    Ok(FeedIterator::with_options(
        NextLinkExecutor::new(client, url),
        options,
    ))
}

/// List every version of one secret.
///
/// # Tracing
///
/// Emits a span named `azure::keyvault::secrets::list_versions` with field `secret`.
#[tracing::instrument(
    name = "azure::keyvault::secrets::list_versions",
    skip(client, options),
    fields(secret = %name)
)]
pub fn list_versions(
    client: &ServiceClient,
    name: &str,
    options: FeedOptions,
) -> SdkResult<SecretFeed> {
    validate_name(name)?;
    validate_page_size(&options)?;
    let url = secret_url(client, &["secrets", name, "versions"])?;
    tracing::debug!("creating secret version feed");
    Ok(FeedIterator::with_options(
        NextLinkExecutor::new(client, url),
        options,
    ))
}

/// Get the latest version of a secret.
///
/// # Tracing
///
/// Emits a span named `azure::keyvault::secrets::get` with field `secret`.
#[tracing::instrument(name = "azure::keyvault::secrets::get", skip(client), fields(secret = %name))]
pub async fn get(client: &ServiceClient, name: &str) -> SdkResult<Secret> {
    validate_name(name)?;
    fetch(client, secret_url(client, &["secrets", name])?).await
}

/// Get a specific version of a secret.
///
/// # Tracing
///
/// Emits a span named `azure::keyvault::secrets::get_version` with fields
/// `secret` and `version`.
#[tracing::instrument(
    name = "azure::keyvault::secrets::get_version",
    skip(client),
    fields(secret = %name, version = %version)
)]
pub async fn get_version(client: &ServiceClient, name: &str, version: &str) -> SdkResult<Secret> {
    validate_name(name)?;
    fetch(client, secret_url(client, &["secrets", name, version])?).await
}

async fn fetch(client: &ServiceClient, url: Url) -> SdkResult<Secret> {
    tracing::debug!("getting secret");
    let response = client.get(url.as_str()).await?;
    Ok(response.json::<Secret>().await?)
}

/// Create a secret, or add a new version if it exists.
///
/// # Tracing
///
/// Emits a span named `azure::keyvault::secrets::set` with field `secret`.
#[tracing::instrument(
    name = "azure::keyvault::secrets::set",
    skip(client, request),
    fields(secret = %name)
)]
pub async fn set(
    client: &ServiceClient,
    name: &str,
    request: &SecretSetRequest,
) -> SdkResult<Secret> {
    validate_name(name)?;
    tracing::debug!("setting secret");

    let url = secret_url(client, &["secrets", name])?;
    let response = client.put(url.as_str(), request).await?;
    let secret = response.json::<Secret>().await?;

    tracing::debug!(version = ?secret.properties.version(), "secret set");
    Ok(secret)
}

/// Delete every version of a secret.
///
/// On soft-delete vaults the secret can be recovered until its purge date.
///
/// # Tracing
///
/// Emits a span named `azure::keyvault::secrets::delete` with field `secret`.
#[tracing::instrument(name = "azure::keyvault::secrets::delete", skip(client), fields(secret = %name))]
pub async fn delete(client: &ServiceClient, name: &str) -> SdkResult<DeletedSecret> {
    validate_name(name)?;
    tracing::debug!("deleting secret");

    let url = secret_url(client, &["secrets", name])?;
    let response = client.delete(url.as_str()).await?;
    Ok(response.json::<DeletedSecret>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{setup_mock_client, TEST_TIMESTAMP};
    use futures::StreamExt;
    use secrecy::ExposeSecret;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn secret_id(server: &MockServer, name: &str, version: &str) -> String {
        format!("{}/secrets/{}/{}", server.uri(), name, version)
    }

    fn secret_json(server: &MockServer, name: &str, version: &str, value: &str) -> serde_json::Value {
        serde_json::json!({
            "value": value,
            "id": secret_id(server, name, version),
            "attributes": {
                "enabled": true,
                "created": TEST_TIMESTAMP,
                "updated": TEST_TIMESTAMP,
                "recoveryLevel": "Recoverable+Purgeable"
            }
        })
    }

    // --- builder ---

    #[test]
    fn set_request_requires_value() {
        let err = SecretSetRequest::builder().build().unwrap_err();
        assert!(matches!(err, SdkError::Builder(ref msg) if msg.contains("value")));
    }

    #[test]
    fn set_request_rejects_inverted_validity_window() {
        let err = SecretSetRequest::builder()
            .value("v")
            .attributes(SecretAttributes {
                not_before: Some(2000),
                expires: Some(1000),
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, SdkError::Builder(ref msg) if msg.contains("not_before")));
    }

    #[test]
    fn set_request_debug_hides_value() {
        let request = SecretSetRequest::builder().value("hunter2").build().unwrap();
        assert!(!format!("{:?}", request).contains("hunter2"));
    }

    #[test]
    fn names_are_validated() {
        assert!(validate_name("db-password-1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("../keys").is_err());
        assert!(validate_name(&"a".repeat(128)).is_err());
    }

    #[test]
    fn page_size_is_bounded() {
        let client = ServiceClient::builder()
            .endpoint("https://vault.vault.azure.net")
            .credential(azure_data_core::auth::ServiceCredential::access_token("t"))
            .build()
            .unwrap();

        for bad in [0, 26] {
            let err = list(&client, FeedOptions::new().max_item_count(bad)).unwrap_err();
            assert!(matches!(err, SdkError::Builder(_)));
        }
        assert!(list(&client, FeedOptions::new().max_item_count(25)).is_ok());
        assert!(list(&client, FeedOptions::new()).is_ok());
    }

    // --- API ---

    #[tokio::test]
    async fn list_secrets_across_pages() {
        let server = MockServer::start().await;
        let next = format!(
            "{}/secrets?api-version=7.4&$skiptoken=page2&maxresults=2",
            server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/secrets"))
            .and(query_param("$skiptoken", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"id": secret_id(&server, "c", ""), "attributes": {"enabled": false}}],
                "nextLink": null
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/secrets"))
            .and(query_param("maxresults", "2"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {"id": format!("{}/secrets/a", server.uri())},
                    {"id": format!("{}/secrets/b", server.uri())}
                ],
                "nextLink": next
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let feed = list(&client, FeedOptions::new().max_item_count(2)).expect("feed");
        let pages: Vec<_> = feed.into_stream().collect().await;

        assert_eq!(pages.len(), 2);
        let names: Vec<Option<String>> = pages
            .into_iter()
            .flat_map(|p| p.expect("page").into_items())
            .map(|props| props.name())
            .collect();
        assert_eq!(
            names,
            vec![Some("a".to_string()), Some("b".to_string()), Some("c".to_string())]
        );
    }

    #[tokio::test]
    async fn list_versions_targets_versions_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/db-password/versions"))
            .and(query_param("api-version", "7.4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {"id": secret_id(&server, "db-password", "v1")},
                    {"id": secret_id(&server, "db-password", "v2")}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let mut feed =
            list_versions(&client, "db-password", FeedOptions::default()).expect("feed");
        let versions: Vec<Option<String>> = feed
            .collect_all()
            .await
            .expect("should succeed")
            .iter()
            .map(SecretProperties::version)
            .collect();

        assert_eq!(versions, vec![Some("v1".into()), Some("v2".into())]);
        assert!(feed.is_exhausted());
    }

    #[tokio::test]
    async fn get_and_get_version() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/db-password"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(secret_json(&server, "db-password", "v2", "latest")),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/secrets/db-password/v1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(secret_json(&server, "db-password", "v1", "older")),
            )
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;

        let latest = get(&client, "db-password").await.expect("get");
        assert_eq!(latest.value.expose_secret(), "latest");
        assert_eq!(latest.properties.version().as_deref(), Some("v2"));

        let older = get_version(&client, "db-password", "v1").await.expect("get version");
        assert_eq!(older.value.expose_secret(), "older");
    }

    #[tokio::test]
    async fn set_puts_request_body() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/secrets/api-key"))
            .and(query_param("api-version", "7.4"))
            .and(body_json(serde_json::json!({
                "value": "s3cr3t",
                "contentType": "text/plain",
                "tags": {"env": "dev"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(secret_json(&server, "api-key", "v9", "s3cr3t")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let request = SecretSetRequest::builder()
            .value("s3cr3t")
            .content_type("text/plain")
            .tag("env", "dev")
            .build()
            .expect("valid request");

        let secret = set(&client, "api-key", &request).await.expect("should succeed");
        assert_eq!(secret.properties.name().as_deref(), Some("api-key"));
        assert_eq!(
            secret.properties.attributes.recovery_level.as_deref(),
            Some("Recoverable+Purgeable")
        );
    }

    #[tokio::test]
    async fn delete_returns_recovery_info() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/secrets/old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "recoveryId": format!("{}/deletedsecrets/old", server.uri()),
                "deletedDate": TEST_TIMESTAMP,
                "scheduledPurgeDate": TEST_TIMESTAMP + 7_776_000,
                "id": secret_id(&server, "old", "v1")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let deleted = delete(&client, "old").await.expect("should succeed");
        assert!(deleted.recovery_id.is_some());
        assert_eq!(deleted.deleted_date, Some(TEST_TIMESTAMP));
    }

    #[tokio::test]
    async fn missing_secret_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/nope"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {
                    "code": "SecretNotFound",
                    "message": "A secret with (name/id) nope was not found in this key vault."
                }
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        match get(&client, "nope").await.unwrap_err() {
            SdkError::Api { code, .. } => assert_eq!(code, "SecretNotFound"),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn get_emits_span_with_secret_field() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/traced"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(secret_json(&server, "traced", "v1", "x")),
            )
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let _ = get(&client, "traced").await;

        assert!(logs_contain("azure::keyvault::secrets::get"));
        assert!(logs_contain("secret=traced"));
        assert!(!logs_contain("Bearer test-token"));
    }
}
