//! Fetch executor for Key Vault list operations.
//!
//! Key Vault pages with a `nextLink`: an absolute URL, query string included,
//! that fetches the following page. It is used as the continuation token
//! verbatim, so it survives being saved and handed to a new iterator.

use std::marker::PhantomData;

use async_trait::async_trait;
use azure_data_core::client::ServiceClient;
use azure_data_core::error::SdkResult;
use azure_data_core::feed::{FetchExecutor, Page, PageRequest};
use serde::de::DeserializeOwned;
use url::Url;

use crate::models::ListBody;

/// Fetches one page of a Key Vault collection.
pub struct NextLinkExecutor<T> {
    client: ServiceClient,
    first_page: Url,
    _item: PhantomData<fn() -> T>,
}

impl<T> NextLinkExecutor<T> {
    /// Executor whose first page is `first_page`; later pages follow `nextLink`.
    pub fn new(client: &ServiceClient, first_page: Url) -> Self {
        Self {
            client: client.clone(),
            first_page,
            _item: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for NextLinkExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NextLinkExecutor")
            .field("first_page", &self.first_page.as_str())
            .finish()
    }
}

#[async_trait]
impl<T> FetchExecutor<T> for NextLinkExecutor<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, request: PageRequest) -> SdkResult<Page<T>> {
        // Next links already carry the page size and api-version.
        let url = match &request.continuation {
            Some(link) => self.client.url(link.as_str())?,
            None => {
                let mut url = self.first_page.clone();
                if let Some(max) = request.max_item_count {
                    url.query_pairs_mut()
                        .append_pair("maxresults", &max.to_string());
                }
                url
            }
        };

        let response = self.client.get(url.as_str()).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.json::<ListBody<T>>().await?;

        tracing::trace!(
            count = body.value.len(),
            has_more = body.next_link.is_some(),
            "key vault page received"
        );
        Ok(Page::new(body.value, body.next_link)
            .with_status(status)
            .with_headers(&headers))
    }
}
