//! Wire-level constants and small types shared by every service crate.

use serde::Deserialize;

/// Longest service error message kept in an `SdkError`; longer ones are truncated.
pub const MAX_ERROR_MESSAGE_LEN: usize = 1000;

/// Response headers that services use to tell clients how long to back off.
pub const RETRY_AFTER_HEADERS: [&str; 3] = ["retry-after-ms", "x-ms-retry-after-ms", "retry-after"];

/// Header carrying the server-assigned request id, used for log correlation.
pub const REQUEST_ID_HEADER: &str = "x-ms-request-id";

/// Structured error body returned by Azure data-plane services.
///
/// Key Vault nests it under an `error` property; Cosmos DB returns it at the
/// top level.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Service-specific error code (e.g. `SecretNotFound`, `NotFound`).
    pub code: Option<String>,
    /// Human readable message.
    pub message: Option<String>,
}
