//! Credentials and authorization header formatting.

use std::sync::Arc;

use azure_core::credentials::TokenCredential;
use azure_identity::AzureCliCredential;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{SdkError, SdkResult};

/// Header used for key-based authentication.
pub const API_KEY_HEADER: &str = "api-key";

/// Header used for token-based authentication.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// How a bearer token is rendered into the `authorization` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Bearer <token>`, used by Key Vault and most data-plane services.
    #[default]
    Bearer,
    /// Cosmos DB's URL-encoded `type=aad&ver=1.0&sig=<token>` form.
    CosmosAad,
}

impl AuthScheme {
    /// Render `token` as an `authorization` header value.
    pub fn format(self, token: &str) -> String {
        match self {
            Self::Bearer => format!("Bearer {}", token),
            Self::CosmosAad => {
                let raw = format!("type=aad&ver=1.0&sig={}", token);
                url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
            }
        }
    }
}

/// Credential types supported by the SDK.
#[derive(Clone)]
pub enum ServiceCredential {
    /// Static key sent in the `api-key` header.
    ApiKey(SecretString),

    /// A pre-acquired access token. It is never refreshed.
    AccessToken(SecretString),

    /// Any `azure_core` token credential, such as the ones in `azure_identity`.
    TokenCredential(Arc<dyn TokenCredential>),
}

impl ServiceCredential {
    /// Create a credential from the environment.
    ///
    /// Checks `AZURE_DATA_API_KEY`, then `AZURE_DATA_TOKEN`, and falls back to
    /// the Azure CLI credential.
    pub fn from_env() -> SdkResult<Self> {
        if let Ok(key) = std::env::var("AZURE_DATA_API_KEY") {
            if !key.is_empty() {
                return Ok(Self::api_key(key));
            }
        }
        if let Ok(token) = std::env::var("AZURE_DATA_TOKEN") {
            if !token.is_empty() {
                return Ok(Self::access_token(token));
            }
        }
        Self::azure_cli()
    }

    /// Create an API key credential.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(SecretString::from(key.into()))
    }

    /// Create a credential from an already acquired access token.
    pub fn access_token(token: impl Into<String>) -> Self {
        Self::AccessToken(SecretString::from(token.into()))
    }

    /// Wrap an arbitrary `azure_core` token credential.
    pub fn token_credential(credential: Arc<dyn TokenCredential>) -> Self {
        Self::TokenCredential(credential)
    }

    /// Use the identity of the signed-in Azure CLI user.
    pub fn azure_cli() -> SdkResult<Self> {
        let credential = AzureCliCredential::new(None).map_err(|e| SdkError::Auth(e.to_string()))?;
        Ok(Self::TokenCredential(credential))
    }

    /// Resolve the credential into an `(header name, header value)` pair.
    ///
    /// `scope` is only consulted for [`ServiceCredential::TokenCredential`].
    pub async fn authorization(
        &self,
        scope: Option<&str>,
        scheme: AuthScheme,
    ) -> SdkResult<(&'static str, String)> {
        match self {
            Self::ApiKey(key) => Ok((API_KEY_HEADER, key.expose_secret().to_string())),
            Self::AccessToken(token) => {
                Ok((AUTHORIZATION_HEADER, scheme.format(token.expose_secret())))
            }
            Self::TokenCredential(credential) => {
                let scope = scope.ok_or_else(|| {
                    SdkError::MissingConfig("a token scope is required for token credentials".into())
                })?;
                let token = credential
                    .get_token(&[scope], None)
                    .await
                    .map_err(|e| SdkError::Auth(e.to_string()))?;
                Ok((AUTHORIZATION_HEADER, scheme.format(token.token.secret())))
            }
        }
    }
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "ServiceCredential::ApiKey(****)"),
            Self::AccessToken(_) => write!(f, "ServiceCredential::AccessToken(****)"),
            Self::TokenCredential(_) => write!(f, "ServiceCredential::TokenCredential"),
        }
    }
}
