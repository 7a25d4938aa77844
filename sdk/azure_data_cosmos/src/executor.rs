//! Fetch executor for Cosmos DB feeds.
//!
//! Read feeds (`GET .../docs`) and SQL queries (`POST .../docs`) page the same
//! way: the service returns `x-ms-continuation` while more results remain, and
//! the client sends it back on the next request.

use std::marker::PhantomData;

use async_trait::async_trait;
use azure_data_core::client::ServiceClient;
use azure_data_core::error::SdkResult;
use azure_data_core::feed::{FetchExecutor, Page, PageRequest};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::models::{
    header_value, request_headers, FeedBody, HEADER_CONTINUATION, HEADER_MAX_ITEM_COUNT,
};

/// Fetches one page of a Cosmos DB read feed or query.
pub struct CosmosFeedExecutor<T> {
    client: ServiceClient,
    url: String,
    headers: HeaderMap,
    query: Option<serde_json::Value>,
    _item: PhantomData<fn() -> T>,
}

impl<T> CosmosFeedExecutor<T> {
    /// Executor for a read feed at `url`.
    pub fn read_feed(client: &ServiceClient, url: impl Into<String>) -> Self {
        Self {
            client: client.clone(),
            url: url.into(),
            headers: HeaderMap::new(),
            query: None,
            _item: PhantomData,
        }
    }

    /// Executor that POSTs `query` to `url` with the given query headers.
    pub(crate) fn query(
        client: &ServiceClient,
        url: impl Into<String>,
        query: serde_json::Value,
        headers: HeaderMap,
    ) -> Self {
        Self {
            client: client.clone(),
            url: url.into(),
            headers,
            query: Some(query),
            _item: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for CosmosFeedExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosFeedExecutor")
            .field("url", &self.url)
            .field("is_query", &self.query.is_some())
            .finish()
    }
}

#[async_trait]
impl<T> FetchExecutor<T> for CosmosFeedExecutor<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, request: PageRequest) -> SdkResult<Page<T>> {
        let mut headers = request_headers()?;
        headers.extend(self.headers.clone());
        if let Some(count) = request.max_item_count {
            headers.insert(HEADER_MAX_ITEM_COUNT, HeaderValue::from(count));
        }
        if let Some(token) = &request.continuation {
            headers.insert(HEADER_CONTINUATION, header_value(token.as_str())?);
        }

        let method = if self.query.is_some() {
            Method::POST
        } else {
            Method::GET
        };
        let response = self
            .client
            .send(method, &self.url, headers, self.query.as_ref())
            .await?;

        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let continuation = response_headers
            .get(HEADER_CONTINUATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = response.json::<FeedBody<T>>().await?;
        tracing::trace!(count = ?body.count, has_more = continuation.is_some(), "cosmos page received");

        Ok(Page::new(body.items, continuation)
            .with_status(status)
            .with_headers(&response_headers))
    }
}
