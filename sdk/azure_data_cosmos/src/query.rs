//! Parameterized SQL queries over a container.
//!
//! Queries are POSTed to the container's `docs` resource with
//! `content-type: application/query+json`. Results page exactly like read
//! feeds, so [`query_documents`] returns a [`FeedIterator`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_data_core::client::ServiceClient;
//! use azure_data_cosmos::query::{self, Query, QueryOptions};
//!
//! # async fn example(client: &ServiceClient) -> azure_data_core::error::SdkResult<()> {
//! let query = Query::builder()
//!     .text("SELECT c.id FROM c WHERE c.price > @min")
//!     .parameter("@min", 20)
//!     .build()?;
//!
//! let mut feed = query::query_documents::<serde_json::Value>(
//!     client,
//!     "shop",
//!     "items",
//!     &query,
//!     QueryOptions::new().partition_key("books"),
//! )?;
//! let rows = feed.collect_all().await?;
//! println!("{} rows", rows.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;

use azure_data_core::client::ServiceClient;
use azure_data_core::error::{SdkError, SdkResult};
use azure_data_core::feed::{FeedIterator, FeedOptions};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::executor::CosmosFeedExecutor;
use crate::models::{
    PartitionKey, HEADER_CROSS_PARTITION, HEADER_IS_QUERY, HEADER_PARTITION_KEY,
    QUERY_CONTENT_TYPE,
};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A named query parameter, e.g. `@category`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParameter {
    /// Parameter name, including the leading `@`.
    pub name: String,

    /// Parameter value.
    pub value: serde_json::Value,
}

/// A Cosmos DB SQL query with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    /// Query text.
    pub query: String,

    /// Parameters referenced by the query text.
    pub parameters: Vec<QueryParameter>,
}

/// Builder for [`Query`].
#[derive(Debug, Default)]
pub struct QueryBuilder {
    text: Option<String>,
    parameters: Vec<QueryParameter>,
}

impl Query {
    /// Create a new builder for `Query`.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// A query without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            query: text.into(),
            parameters: Vec::new(),
        }
    }
}

impl QueryBuilder {
    /// Set the query text. **Required.**
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Bind a value to a parameter name. Names must start with `@`.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.push(QueryParameter {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Build the query, checking the text and parameter names.
    pub fn build(self) -> SdkResult<Query> {
        let text = self
            .text
            .ok_or_else(|| SdkError::Builder("query text is required".into()))?;
        if text.trim().is_empty() {
            return Err(SdkError::Builder("query text cannot be empty".into()));
        }

        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if !parameter.name.starts_with('@') || parameter.name.len() < 2 {
                return Err(SdkError::Builder(format!(
                    "parameter name must start with '@': {}",
                    parameter.name
                )));
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(SdkError::Builder(format!(
                    "duplicate parameter: {}",
                    parameter.name
                )));
            }
        }

        Ok(Query {
            query: text,
            parameters: self.parameters,
        })
    }
}

/// Options for [`query_documents`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    partition_key: Option<PartitionKey>,
    cross_partition: bool,
    feed: FeedOptions,
}

impl QueryOptions {
    /// Create default options: single partition, no page size hint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope the query to one logical partition.
    ///
    /// Takes precedence over [`cross_partition`](Self::cross_partition).
    pub fn partition_key(mut self, key: impl Into<PartitionKey>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// Allow the query to fan out across partitions.
    pub fn cross_partition(mut self, enabled: bool) -> Self {
        self.cross_partition = enabled;
        self
    }

    /// Page size hint and resume token for the feed.
    pub fn feed(mut self, feed: FeedOptions) -> Self {
        self.feed = feed;
        self
    }

    fn headers(&self) -> SdkResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_IS_QUERY, HeaderValue::from_static("True"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(QUERY_CONTENT_TYPE));
        match &self.partition_key {
            Some(key) => {
                headers.insert(HEADER_PARTITION_KEY, key.header_value()?);
            }
            None if self.cross_partition => {
                headers.insert(HEADER_CROSS_PARTITION, HeaderValue::from_static("True"));
            }
            None => {}
        }
        Ok(headers)
    }
}

// ---------------------------------------------------------------------------
// API functions
// ---------------------------------------------------------------------------

/// Iterator over query results.
pub type QueryFeed<T> = FeedIterator<T, CosmosFeedExecutor<T>>;

/// Run `query` against a container.
///
/// Nothing is sent until the feed is polled. Each page is one POST carrying
/// the continuation token of the previous page.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::documents::query` with fields
/// `database` and `container`.
#[tracing::instrument(
    name = "azure::cosmos::documents::query",
    skip(client, query, options),
    fields(database = %database, container = %container)
)]
pub fn query_documents<T>(
    client: &ServiceClient,
    database: &str,
    container: &str,
    query: &Query,
    options: QueryOptions,
) -> SdkResult<QueryFeed<T>>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    let url = client.segments_url(&["dbs", database, "colls", container, "docs"])?;
    let body = serde_json::to_value(query)?;
    let headers = options.headers()?;
    tracing::debug!(parameters = query.parameters.len(), "creating query feed");

    Ok(FeedIterator::with_options(
        CosmosFeedExecutor::query(client, url, body, headers),
        options.feed,
    ))
}
