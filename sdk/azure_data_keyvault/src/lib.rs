//! # Azure Data Key Vault
//!
//! Key Vault secrets client for the Azure data-plane Rust SDK.
//!
//! Listing operations return a [`FeedIterator`](azure_data_core::FeedIterator)
//! that follows the service's `nextLink`. A saved link can resume a listing
//! later through [`FeedOptions::continuation`](azure_data_core::FeedOptions::continuation).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azure_data_core::auth::ServiceCredential;
//! use azure_data_core::feed::FeedOptions;
//! use azure_data_keyvault::secret;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = azure_data_keyvault::client_builder()
//!         .endpoint("https://my-vault.vault.azure.net")
//!         .credential(ServiceCredential::azure_cli()?)
//!         .build()?;
//!
//!     let mut feed = secret::list(&client, FeedOptions::new().max_item_count(10))?;
//!     let first = feed.fetch_next().await?;
//!     println!("{} secrets on the first page", first.len());
//!
//!     if let Some(token) = feed.continuation_token() {
//!         println!("resume later from {}", token.as_str());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`secret`] - Set, get, list, and delete secrets
//! - [`executor`] - The `nextLink` fetch executor

pub mod executor;
pub mod models;
pub mod secret;

use azure_data_core::client::{ServiceClient, ServiceClientBuilder};

use crate::models::KEYVAULT_SCOPE;

/// A client builder preconfigured for Key Vault.
///
/// Vault tokens are issued for a fixed scope rather than the vault's own
/// origin. The endpoint and credential still need to be supplied.
pub fn client_builder() -> ServiceClientBuilder {
    ServiceClient::builder().scope(KEYVAULT_SCOPE)
}


#[cfg(test)]
mod tests {
    use super::*;
    use azure_data_core::auth::{AuthScheme, ServiceCredential};

    #[test]
    fn client_builder_uses_vault_scope() {
        let client = client_builder()
            .endpoint("https://my-vault.vault.azure.net")
            .credential(ServiceCredential::access_token("t"))
            .build()
            .expect("should build");

        assert_eq!(client.scope(), "https://vault.azure.net/.default");
        assert_eq!(client.auth_scheme(), AuthScheme::Bearer);
    }
}
