//! Document operations for Cosmos DB.
//!
//! Documents are generic over any serde type. Point reads, writes and deletes
//! need the document's [`PartitionKey`]; read feeds span every partition.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_data_core::client::ServiceClient;
//! use azure_data_cosmos::document;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Item {
//!     id: String,
//!     category: String,
//! }
//!
//! # async fn example(client: &ServiceClient) -> azure_data_core::error::SdkResult<()> {
//! let item = Item { id: "1".into(), category: "books".into() };
//! document::upsert(client, "shop", "items", "books", &item).await?;
//!
//! let fetched: Item = document::get(client, "shop", "items", "1", "books").await?;
//! println!("{fetched:?}");
//! # Ok(())
//! # }
//! ```

use azure_data_core::client::ServiceClient;
use azure_data_core::error::SdkResult;
use azure_data_core::feed::{FeedIterator, FeedOptions};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::executor::CosmosFeedExecutor;
use crate::models::{request_headers, PartitionKey, HEADER_IS_UPSERT, HEADER_PARTITION_KEY};

/// Iterator over the documents of a container.
pub type DocumentFeed<T> = FeedIterator<T, CosmosFeedExecutor<T>>;

fn point_headers(partition_key: &PartitionKey) -> SdkResult<HeaderMap> {
    let mut headers = request_headers()?;
    headers.insert(HEADER_PARTITION_KEY, partition_key.header_value()?);
    Ok(headers)
}

/// List every document in a container.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::documents::list` with fields
/// `database` and `container`.
#[tracing::instrument(
    name = "azure::cosmos::documents::list",
    skip(client, options),
    fields(database = %database, container = %container)
)]
pub fn list<T>(
    client: &ServiceClient,
    database: &str,
    container: &str,
    options: FeedOptions,
) -> SdkResult<DocumentFeed<T>>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    let url = client.segments_url(&["dbs", database, "colls", container, "docs"])?;
    tracing::debug!("creating document feed");
    Ok(FeedIterator::with_options(
        CosmosFeedExecutor::read_feed(client, url),
        options,
    ))
}

/// Read a single document.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::documents::get` with field `document`.
#[tracing::instrument(
    name = "azure::cosmos::documents::get",
    skip(client, partition_key),
    fields(database = %database, container = %container, document = %id)
)]
pub async fn get<T: DeserializeOwned>(
    client: &ServiceClient,
    database: &str,
    container: &str,
    id: &str,
    partition_key: impl Into<PartitionKey>,
) -> SdkResult<T> {
    tracing::debug!("reading document");

    let url = client.segments_url(&["dbs", database, "colls", container, "docs", id])?;
    let headers = point_headers(&partition_key.into())?;
    let response = client.send(Method::GET, url.as_str(), headers, None).await?;
    Ok(response.json::<T>().await?)
}

/// Create a document. Fails with a `Conflict` error if the id is taken.
///
/// Returns the stored document, including its system properties when `T`
/// captures them.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::documents::create`.
#[tracing::instrument(
    name = "azure::cosmos::documents::create",
    skip(client, partition_key, document),
    fields(database = %database, container = %container)
)]
pub async fn create<T>(
    client: &ServiceClient,
    database: &str,
    container: &str,
    partition_key: impl Into<PartitionKey>,
    document: &T,
) -> SdkResult<T>
where
    T: Serialize + DeserializeOwned,
{
    write(client, database, container, &partition_key.into(), document, false).await
}

/// Create a document, or replace it if the id already exists.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::documents::upsert`.
#[tracing::instrument(
    name = "azure::cosmos::documents::upsert",
    skip(client, partition_key, document),
    fields(database = %database, container = %container)
)]
pub async fn upsert<T>(
    client: &ServiceClient,
    database: &str,
    container: &str,
    partition_key: impl Into<PartitionKey>,
    document: &T,
) -> SdkResult<T>
where
    T: Serialize + DeserializeOwned,
{
    write(client, database, container, &partition_key.into(), document, true).await
}

async fn write<T>(
    client: &ServiceClient,
    database: &str,
    container: &str,
    partition_key: &PartitionKey,
    document: &T,
    upsert: bool,
) -> SdkResult<T>
where
    T: Serialize + DeserializeOwned,
{
    tracing::debug!(upsert, "writing document");

    let url = client.segments_url(&["dbs", database, "colls", container, "docs"])?;
    let mut headers = point_headers(partition_key)?;
    if upsert {
        headers.insert(HEADER_IS_UPSERT, HeaderValue::from_static("True"));
    }
    let body = serde_json::to_value(document)?;
    let response = client
        .send(Method::POST, url.as_str(), headers, Some(&body))
        .await?;
    Ok(response.json::<T>().await?)
}

/// Delete a document.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::documents::delete` with field `document`.
#[tracing::instrument(
    name = "azure::cosmos::documents::delete",
    skip(client, partition_key),
    fields(database = %database, container = %container, document = %id)
)]
pub async fn delete(
    client: &ServiceClient,
    database: &str,
    container: &str,
    id: &str,
    partition_key: impl Into<PartitionKey>,
) -> SdkResult<()> {
    tracing::debug!("deleting document");

    let url = client.segments_url(&["dbs", database, "colls", container, "docs", id])?;
    let headers = point_headers(&partition_key.into())?;
    client
        .send(Method::DELETE, url.as_str(), headers, None)
        .await?;
    Ok(())
}
