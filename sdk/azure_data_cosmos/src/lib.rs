//! # Azure Data Cosmos
//!
//! Cosmos DB (SQL API) client for the Azure data-plane Rust SDK.
//!
//! Every listing in this crate returns a [`FeedIterator`](azure_data_core::FeedIterator):
//! pages are fetched lazily and the service's `x-ms-continuation` header is
//! sent back until the feed is exhausted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azure_data_core::auth::ServiceCredential;
//! use azure_data_core::feed::FeedOptions;
//! use azure_data_cosmos::document;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = azure_data_cosmos::client_builder()
//!         .endpoint("https://my-account.documents.azure.com")
//!         .credential(ServiceCredential::azure_cli()?)
//!         .build()?;
//!
//!     let mut feed = document::list::<serde_json::Value>(
//!         &client,
//!         "shop",
//!         "items",
//!         FeedOptions::new().max_item_count(50),
//!     )?;
//!
//!     while let Some(page) = feed.next_page().await {
//!         let page = page?;
//!         println!("{} documents", page.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`database`] - Create, retrieve, list, and delete databases
//! - [`container`] - Retrieve and list containers
//! - [`document`] - Read, write, list, and delete documents
//! - [`query`] - Run parameterized SQL queries as a feed
//! - [`executor`] - The fetch executor shared by all feeds

pub mod container;
pub mod database;
pub mod document;
pub mod executor;
pub mod models;
pub mod query;

use azure_data_core::auth::AuthScheme;
use azure_data_core::client::{ServiceClient, ServiceClientBuilder};

use crate::models::{COSMOS_API_VERSION, HEADER_VERSION};

/// A client builder preconfigured for Cosmos DB.
///
/// Sets the `type=aad` authorization scheme and the `x-ms-version` header.
/// The endpoint and credential still need to be supplied.
pub fn client_builder() -> ServiceClientBuilder {
    ServiceClient::builder()
        .auth_scheme(AuthScheme::CosmosAad)
        .header(HEADER_VERSION, COSMOS_API_VERSION)
}
