//! Container (collection) operations for Cosmos DB.

use azure_data_core::client::ServiceClient;
use azure_data_core::error::SdkResult;
use azure_data_core::feed::{FeedIterator, FeedOptions};
use reqwest::Method;
use serde::Deserialize;

use crate::executor::CosmosFeedExecutor;
use crate::models::{request_headers, SystemProperties};

/// How a container's documents are partitioned.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PartitionKeyDefinition {
    /// JSON paths of the partition key, e.g. `["/category"]`.
    pub paths: Vec<String>,

    /// `Hash` or `MultiHash`.
    #[serde(default)]
    pub kind: Option<String>,

    /// Partition key schema version.
    #[serde(default)]
    pub version: Option<u32>,
}

/// A Cosmos DB container.
#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    /// User-assigned name.
    pub id: String,

    /// Partition key definition, absent on legacy non-partitioned containers.
    #[serde(rename = "partitionKey", default)]
    pub partition_key: Option<PartitionKeyDefinition>,

    /// Time-to-live for documents in seconds (`-1` means no expiry).
    #[serde(rename = "defaultTtl", default)]
    pub default_ttl: Option<i64>,

    /// Indexing policy as returned by the service.
    #[serde(rename = "indexingPolicy", default)]
    pub indexing_policy: Option<serde_json::Value>,

    /// Service-assigned properties.
    #[serde(flatten)]
    pub system: SystemProperties,
}

/// Iterator over the containers of a database.
pub type ContainerFeed = FeedIterator<Container, CosmosFeedExecutor<Container>>;

/// List the containers in `database`.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::containers::list` with field `database`.
#[tracing::instrument(
    name = "azure::cosmos::containers::list",
    skip(client, options),
    fields(database = %database)
)]
pub fn list(
    client: &ServiceClient,
    database: &str,
    options: FeedOptions,
) -> SdkResult<ContainerFeed> {
    let url = client.segments_url(&["dbs", database, "colls"])?;
    tracing::debug!("creating container feed");
    Ok(FeedIterator::with_options(
        CosmosFeedExecutor::read_feed(client, url),
        options,
    ))
}

/// Get a container by id.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::containers::get` with fields
/// `database` and `container`.
#[tracing::instrument(
    name = "azure::cosmos::containers::get",
    skip(client),
    fields(database = %database, container = %id)
)]
pub async fn get(client: &ServiceClient, database: &str, id: &str) -> SdkResult<Container> {
    tracing::debug!("getting container");

    let url = client.segments_url(&["dbs", database, "colls", id])?;
    let response = client
        .send(Method::GET, url.as_str(), request_headers()?, None)
        .await?;
    Ok(response.json::<Container>().await?)
}
