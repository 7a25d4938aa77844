//! Shared types and header plumbing for the Cosmos DB REST API.

use azure_data_core::error::{SdkError, SdkResult};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

/// REST API version sent in `x-ms-version`.
pub const COSMOS_API_VERSION: &str = "2018-12-31";

pub(crate) const HEADER_VERSION: &str = "x-ms-version";
pub(crate) const HEADER_DATE: &str = "x-ms-date";
pub(crate) const HEADER_CONTINUATION: &str = "x-ms-continuation";
pub(crate) const HEADER_MAX_ITEM_COUNT: &str = "x-ms-max-item-count";
pub(crate) const HEADER_IS_QUERY: &str = "x-ms-documentdb-isquery";
pub(crate) const HEADER_CROSS_PARTITION: &str = "x-ms-documentdb-query-enablecrosspartition";
pub(crate) const HEADER_PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";
pub(crate) const HEADER_IS_UPSERT: &str = "x-ms-documentdb-is-upsert";

/// Request charge reported on every response, in request units.
pub const HEADER_REQUEST_CHARGE: &str = "x-ms-request-charge";

/// Content type Cosmos DB requires for SQL query bodies.
pub(crate) const QUERY_CONTENT_TYPE: &str = "application/query+json";

/// Headers every Cosmos DB request carries besides the client defaults.
///
/// `x-ms-date` must be fresh, so this is built per request.
pub(crate) fn request_headers() -> SdkResult<HeaderMap> {
    let date = chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    let mut headers = HeaderMap::new();
    headers.insert(HEADER_DATE, header_value(&date)?);
    Ok(headers)
}

pub(crate) fn header_value(value: &str) -> SdkResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| SdkError::Builder(format!("invalid header value: {}", value)))
}

/// The value of a document's partition key.
///
/// Sent as a one-element JSON array in `x-ms-documentdb-partitionkey`.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionKey(serde_json::Value);

impl PartitionKey {
    /// Partition key for documents where the key path is missing (`{}` on the wire).
    pub fn none() -> Self {
        Self(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Header representation, e.g. `["books"]`.
    pub(crate) fn header_value(&self) -> SdkResult<HeaderValue> {
        let encoded = serde_json::to_string(&[&self.0])?;
        header_value(&encoded)
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        Self(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        Self(serde_json::Value::String(value))
    }
}

impl From<i64> for PartitionKey {
    fn from(value: i64) -> Self {
        Self(serde_json::Value::from(value))
    }
}

impl From<bool> for PartitionKey {
    fn from(value: bool) -> Self {
        Self(serde_json::Value::Bool(value))
    }
}

/// System properties Cosmos DB attaches to every resource.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SystemProperties {
    /// Resource id assigned by the service.
    #[serde(rename = "_rid", default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,

    /// Self link.
    #[serde(rename = "_self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,

    /// Entity tag for optimistic concurrency.
    #[serde(rename = "_etag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Last modified time, in seconds since the Unix epoch.
    #[serde(rename = "_ts", default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<u64>,
}

/// Body of every Cosmos DB feed response.
///
/// The array property is named after the resource type.
#[derive(Debug, Deserialize)]
pub(crate) struct FeedBody<T> {
    #[serde(alias = "Databases", alias = "DocumentCollections", alias = "Documents")]
    pub(crate) items: Vec<T>,

    #[serde(rename = "_count", default)]
    pub(crate) count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_header_is_json_array() {
        let key = PartitionKey::from("books");
        assert_eq!(key.header_value().unwrap(), "[\"books\"]");

        let key = PartitionKey::from(42_i64);
        assert_eq!(key.header_value().unwrap(), "[42]");

        assert_eq!(PartitionKey::none().header_value().unwrap(), "[{}]");
    }

    #[test]
    fn request_headers_carry_rfc1123_date() {
        let headers = request_headers().unwrap();
        let date = headers.get(HEADER_DATE).unwrap().to_str().unwrap();
        assert!(date.ends_with(" GMT"), "unexpected date: {date}");
        assert_eq!(date.len(), "Mon, 01 Jan 2024 00:00:00 GMT".len());
    }

    #[test]
    fn feed_body_reads_each_resource_array() {
        for name in ["Databases", "DocumentCollections", "Documents"] {
            let json = format!(r#"{{"_rid": "", "{name}": [{{"id": "x"}}], "_count": 1}}"#);
            let body: FeedBody<serde_json::Value> = serde_json::from_str(&json).unwrap();
            assert_eq!(body.items.len(), 1);
            assert_eq!(body.count, Some(1));
        }
    }

    #[test]
    fn system_properties_deserialization() {
        let props: SystemProperties = serde_json::from_str(
            r#"{"_rid": "abc==", "_self": "dbs/abc==/", "_etag": "\"00\"", "_ts": 1700000000}"#,
        )
        .unwrap();
        assert_eq!(props.rid.as_deref(), Some("abc=="));
        assert_eq!(props.ts, Some(1700000000));
    }
}
