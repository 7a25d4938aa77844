#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod error;
pub mod feed;
pub mod models;

pub use error::{SdkError, SdkResult};
pub use feed::{ContinuationToken, FeedIterator, FeedOptions, FetchExecutor, Page, PageRequest};

/// Helpers for testing service crates against a mock server.
#[cfg(feature = "test-support")]
pub mod test_support {
    use crate::auth::{AuthScheme, ServiceCredential};
    use crate::client::{RetryPolicy, ServiceClient, ServiceClientBuilder};
    use wiremock::MockServer;

    /// Access token used by mock clients (not a real token).
    pub const TEST_TOKEN: &str = "test-token";

    /// A builder pointed at `server`, authenticating with [`TEST_TOKEN`] and
    /// never retrying.
    pub fn mock_client_builder(server: &MockServer, scheme: AuthScheme) -> ServiceClientBuilder {
        ServiceClient::builder()
            .endpoint(server.uri())
            .credential(ServiceCredential::access_token(TEST_TOKEN))
            .auth_scheme(scheme)
            .retry_policy(RetryPolicy::none())
    }
}
