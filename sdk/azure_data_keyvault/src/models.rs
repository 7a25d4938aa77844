//! Secret types and wire constants for the Key Vault REST API.

use std::collections::HashMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// REST API version sent as the `api-version` query parameter.
pub const KEYVAULT_API_VERSION: &str = "7.4";

/// OAuth scope for every vault in the public cloud.
pub const KEYVAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Largest page size the service accepts for `maxresults`.
pub const MAX_PAGE_RESULTS: u32 = 25;

/// Lifecycle attributes of a secret. Times are Unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretAttributes {
    /// Whether the secret can be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Not valid before this time.
    #[serde(rename = "nbf", skip_serializing_if = "Option::is_none")]
    pub not_before: Option<u64>,

    /// Expiry time.
    #[serde(rename = "exp", skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,

    #[serde(skip_serializing)]
    pub created: Option<u64>,

    #[serde(skip_serializing)]
    pub updated: Option<u64>,

    /// Deletion recovery level, e.g. `Recoverable+Purgeable`.
    #[serde(rename = "recoveryLevel", skip_serializing)]
    pub recovery_level: Option<String>,
}

/// A secret's metadata, as returned by list operations (no value).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecretProperties {
    /// Full identifier, `https://<vault>/secrets/<name>[/<version>]`.
    pub id: String,

    #[serde(default)]
    pub attributes: SecretAttributes,

    #[serde(rename = "contentType", default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Set when the secret backs a Key Vault certificate.
    #[serde(default)]
    pub managed: Option<bool>,
}

impl SecretProperties {
    /// Secret name parsed from [`id`](Self::id).
    pub fn name(&self) -> Option<String> {
        id_segment(&self.id, 1)
    }

    /// Version parsed from [`id`](Self::id), absent for unversioned ids.
    pub fn version(&self) -> Option<String> {
        id_segment(&self.id, 2)
    }
}

fn id_segment(id: &str, index: usize) -> Option<String> {
    let url = url::Url::parse(id).ok()?;
    let mut segments = url.path_segments()?;
    if segments.next()? != "secrets" {
        return None;
    }
    segments
        .nth(index - 1)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// A secret including its value.
#[derive(Deserialize)]
pub struct Secret {
    /// The secret value. Use `expose_secret()` to read it.
    #[serde(deserialize_with = "deserialize_secret")]
    pub value: SecretString,

    #[serde(flatten)]
    pub properties: SecretProperties,
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("value", &"[REDACTED]")
            .field("properties", &self.properties)
            .finish()
    }
}

/// A secret moved to the vault's recycle bin.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedSecret {
    /// Identifier to recover the secret with, on soft-delete vaults.
    #[serde(rename = "recoveryId", default)]
    pub recovery_id: Option<String>,

    #[serde(rename = "deletedDate", default)]
    pub deleted_date: Option<u64>,

    #[serde(rename = "scheduledPurgeDate", default)]
    pub scheduled_purge_date: Option<u64>,

    #[serde(flatten)]
    pub properties: SecretProperties,
}

/// Body of every Key Vault list response.
#[derive(Debug, Deserialize)]
pub(crate) struct ListBody<T> {
    #[serde(default = "Vec::new")]
    pub(crate) value: Vec<T>,

    #[serde(rename = "nextLink", default)]
    pub(crate) next_link: Option<String>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

pub(crate) fn serialize_secret<S>(value: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.expose_secret())
}
