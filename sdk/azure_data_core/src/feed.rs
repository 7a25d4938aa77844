//! Paginated feeds.
//!
//! Services return large collections a page at a time, handing back an opaque
//! continuation token to fetch the next one. [`FeedIterator`] hides that
//! behind a pull-based sequence of [`Page`]s: it keeps the token between
//! calls and knows when the feed is exhausted. The network round trip itself
//! is delegated to a [`FetchExecutor`] supplied by the service crate.
//!
//! ## Example
//!
//! ```rust
//! use azure_data_core::error::SdkError;
//! use azure_data_core::feed::{executor_fn, FeedIterator, Page, PageRequest};
//!
//! # async fn example() -> azure_data_core::error::SdkResult<()> {
//! let executor = executor_fn(|request: PageRequest| async move {
//!     let page = match request.continuation {
//!         None => Page::new(vec![1, 2], Some("page-2")),
//!         Some(_) => Page::new(vec![3], None::<String>),
//!     };
//!     Ok::<_, SdkError>(page)
//! });
//!
//! let mut feed = FeedIterator::new(executor);
//! while let Some(page) = feed.next_page().await {
//!     let page = page?;
//!     println!("{} items, more: {}", page.items().len(), page.has_more());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Serialized use
//!
//! A `FeedIterator` must be driven one call at a time: each call has to
//! complete before the next one starts. The `&mut self` receivers make the
//! compiler enforce this for a single owner. Sharing one iterator between
//! tasks behind a lock that is released mid-fetch would let two fetches see
//! the same token and skip or duplicate pages. Separate iterators, even over
//! the same query, share nothing and can run concurrently.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use reqwest::header::HeaderMap;

use crate::error::{SdkError, SdkResult};

/// An opaque, server-issued continuation token.
///
/// The value is passed back verbatim on the next request. Empty strings are
/// treated as "no token".
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wrap a server-issued token; `None` for an empty string.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// The raw token, for putting back on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token, returning the raw value.
    pub fn into_string(self) -> String {
        self.0
    }
}

// Tokens can be long and may embed query state; keep logs short.
impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationToken({} bytes)", self.0.len())
    }
}

/// One page of results plus the response metadata that came with it.
#[derive(Debug, Clone)]
pub struct Page<T> {
    items: Vec<T>,
    continuation: Option<ContinuationToken>,
    status: Option<u16>,
    headers: HashMap<String, String>,
}

impl<T> Page<T> {
    /// Create a page from its items and the token for the following page.
    pub fn new<S: Into<String>>(items: Vec<T>, continuation: Option<S>) -> Self {
        Self {
            items,
            continuation: continuation.and_then(ContinuationToken::new),
            status: None,
            headers: HashMap::new(),
        }
    }

    /// A page with no items and no continuation.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            continuation: None,
            status: None,
            headers: HashMap::new(),
        }
    }

    /// Attach the HTTP status of the response that produced this page.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach response headers. Names are lower-cased; non-UTF-8 values are skipped.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        self.headers = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        self
    }

    /// The items in server order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// The token for the next page, if the server issued one.
    pub fn continuation(&self) -> Option<&ContinuationToken> {
        self.continuation.as_ref()
    }

    /// Whether the server reported more pages after this one.
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }

    /// HTTP status of the response, when the executor recorded it.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// All recorded response headers, keyed by lower-case name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Look up a single response header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Where a [`FeedIterator`] is in its walk over the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    /// No page has been fetched yet.
    NotStarted,
    /// The last fetch returned this token; more pages remain.
    HasMore(ContinuationToken),
    /// The server reported the last page. No further requests are made.
    Exhausted,
}

/// What an executor is asked to fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Token from the previous page; `None` for the first page.
    pub continuation: Option<ContinuationToken>,
    /// Preferred number of items per page. Services may return fewer.
    pub max_item_count: Option<u32>,
}

/// Options applied when a [`FeedIterator`] is constructed.
#[derive(Debug, Clone, Default)]
pub struct FeedOptions {
    /// Page size hint forwarded with every request.
    pub max_item_count: Option<u32>,
    /// Resume a feed from a token saved by an earlier iterator.
    pub continuation: Option<ContinuationToken>,
}

impl FeedOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size hint.
    pub fn max_item_count(mut self, count: u32) -> Self {
        self.max_item_count = Some(count);
        self
    }

    /// Start from a previously saved continuation token.
    pub fn continuation(mut self, token: impl Into<String>) -> Self {
        self.continuation = ContinuationToken::new(token);
        self
    }
}

/// Fetches a single page of a feed.
///
/// Implementations perform exactly one round trip per call and report the
/// next continuation token through [`Page::continuation`]. Errors are passed
/// to the caller of the iterator unchanged.
#[async_trait]
pub trait FetchExecutor<T>: Send + Sync {
    /// Fetch the page identified by `request`.
    async fn fetch(&self, request: PageRequest) -> SdkResult<Page<T>>;
}

/// A [`FetchExecutor`] backed by a closure. See [`executor_fn`].
pub struct FnExecutor<F> {
    f: F,
}

/// Turn an async closure into a [`FetchExecutor`].
pub fn executor_fn<F>(f: F) -> FnExecutor<F> {
    FnExecutor { f }
}

impl<F> fmt::Debug for FnExecutor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExecutor").finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, F, Fut> FetchExecutor<T> for FnExecutor<F>
where
    T: Send + 'static,
    F: Fn(PageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = SdkResult<Page<T>>> + Send + 'static,
{
    async fn fetch(&self, request: PageRequest) -> SdkResult<Page<T>> {
        (self.f)(request).await
    }
}

#[async_trait]
impl<T, E> FetchExecutor<T> for Arc<E>
where
    T: Send + 'static,
    E: FetchExecutor<T> + ?Sized,
{
    async fn fetch(&self, request: PageRequest) -> SdkResult<Page<T>> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl<T, E> FetchExecutor<T> for Box<E>
where
    T: Send + 'static,
    E: FetchExecutor<T> + ?Sized,
{
    async fn fetch(&self, request: PageRequest) -> SdkResult<Page<T>> {
        (**self).fetch(request).await
    }
}

/// A lazily fetched, single-pass sequence of pages.
///
/// Items must be `Clone`: the iterator keeps a copy of the last page for
/// [`current_page`](Self::current_page). [`fetch_next`](Self::fetch_next)
/// copies every page it returns; [`collect_all`](Self::collect_all) copies
/// only the final one.
///
/// Consume it page by page with [`fetch_next`](Self::fetch_next) or
/// [`next_page`](Self::next_page), as a [`Stream`] with
/// [`into_stream`](Self::into_stream), or all at once with
/// [`collect_all`](Self::collect_all). Iterators cannot be rewound; build a
/// new one to run the same query again.
///
/// An executor that keeps handing back tokens for pages already seen makes
/// the feed endless. The iterator does not look for token cycles.
pub struct FeedIterator<T, E> {
    executor: E,
    state: FeedState,
    options: FeedOptions,
    current: Option<Page<T>>,
    _item: PhantomData<fn() -> T>,
}

impl<T, E> FeedIterator<T, E>
where
    T: Clone,
    E: FetchExecutor<T>,
{
    /// Create an iterator that starts from the first page.
    pub fn new(executor: E) -> Self {
        Self::with_options(executor, FeedOptions::default())
    }

    /// Create an iterator with a page size hint and/or resume token.
    pub fn with_options(executor: E, options: FeedOptions) -> Self {
        Self {
            executor,
            state: FeedState::NotStarted,
            options,
            current: None,
            _item: PhantomData,
        }
    }

    /// Current position in the feed.
    pub fn state(&self) -> &FeedState {
        &self.state
    }

    /// The token the next fetch will send, if any.
    ///
    /// Save it to resume the feed later through [`FeedOptions::continuation`].
    pub fn continuation_token(&self) -> Option<&ContinuationToken> {
        match &self.state {
            FeedState::NotStarted => self.options.continuation.as_ref(),
            FeedState::HasMore(token) => Some(token),
            FeedState::Exhausted => None,
        }
    }

    /// Whether the last page has been fetched.
    pub fn is_exhausted(&self) -> bool {
        self.state == FeedState::Exhausted
    }

    /// Fetch the next page.
    ///
    /// Makes exactly one executor call unless the feed is exhausted, in which
    /// case an empty page is returned without any I/O. On error the state is
    /// left as it was, so calling again retries the same page.
    ///
    /// A copy of the returned page is kept for
    /// [`current_page`](Self::current_page).
    #[tracing::instrument(name = "azure::feed::fetch_next", skip(self))]
    pub async fn fetch_next(&mut self) -> SdkResult<Page<T>> {
        if self.is_exhausted() {
            tracing::trace!("feed exhausted; returning empty page");
            return Ok(Page::empty());
        }
        let page = self.advance().await?;
        self.current = Some(page.clone());
        Ok(page)
    }

    /// One executor round trip. Updates the state but not `current`.
    async fn advance(&mut self) -> SdkResult<Page<T>> {
        let request = PageRequest {
            continuation: self.continuation_token().cloned(),
            max_item_count: self.options.max_item_count,
        };
        let first_page = self.state == FeedState::NotStarted;

        let page = match self.executor.fetch(request).await {
            Ok(page) => page,
            Err(err) => {
                tracing::debug!(error = %err, first_page, "page fetch failed; state unchanged");
                return Err(err);
            }
        };

        self.state = match page.continuation() {
            Some(token) => FeedState::HasMore(token.clone()),
            None => FeedState::Exhausted,
        };
        tracing::debug!(
            item_count = page.len(),
            has_more = page.has_more(),
            first_page,
            "page fetched"
        );
        Ok(page)
    }

    /// Pull the next page of the sequence.
    ///
    /// Returns `None` once the feed is exhausted. An `Err` does not end the
    /// sequence; pulling again retries the failed page.
    pub async fn next_page(&mut self) -> Option<SdkResult<Page<T>>> {
        if self.is_exhausted() {
            return None;
        }
        Some(self.fetch_next().await)
    }

    /// Drain the feed, concatenating every page's items in order.
    ///
    /// The first error aborts the drain and is returned; items gathered
    /// before it are dropped. On an already exhausted feed this returns an
    /// empty vector without any I/O.
    ///
    /// Pages are moved into the result as they arrive. Only the final page is
    /// copied for [`current_page`](Self::current_page); after an error the
    /// current page is the last one fetched successfully.
    #[tracing::instrument(name = "azure::feed::collect_all", skip(self))]
    pub async fn collect_all(&mut self) -> SdkResult<Vec<T>> {
        let mut items = Vec::new();
        let mut pages = 0usize;
        // Held back one step so it can become `current` without a copy on error.
        let mut last: Option<Page<T>> = None;

        while !self.is_exhausted() {
            match self.advance().await {
                Ok(page) => {
                    pages += 1;
                    if let Some(previous) = last.replace(page) {
                        items.extend(previous.into_items());
                    }
                }
                Err(err) => {
                    if last.is_some() {
                        self.current = last;
                    }
                    return Err(err);
                }
            }
        }

        if let Some(page) = last {
            self.current = Some(page.clone());
            items.extend(page.into_items());
        }
        tracing::debug!(pages, item_count = items.len(), "feed drained");
        Ok(items)
    }

    /// The most recently fetched page, without advancing.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::NoCurrentPage`] if no fetch has succeeded yet.
    pub fn current_page(&self) -> SdkResult<&Page<T>> {
        self.current.as_ref().ok_or(SdkError::NoCurrentPage)
    }

    /// Turn the iterator into a [`Stream`] of pages.
    ///
    /// The stream ends when the feed is exhausted. Errors are yielded as
    /// items; polling after an error retries the same page.
    pub fn into_stream(self) -> impl Stream<Item = SdkResult<Page<T>>> {
        futures::stream::unfold(self, |mut feed| async move {
            let page = feed.next_page().await?;
            Some((page, feed))
        })
    }
}

impl<T, E> fmt::Debug for FeedIterator<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedIterator")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("has_current_page", &self.current.is_some())
            .finish_non_exhaustive()
    }
}
