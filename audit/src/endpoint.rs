//! Remote model seam

use async_trait::async_trait;

use crate::error::RemoteFailure;

/// One non-streaming completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub system_instruction: String,
    pub user_content: String,
}

/// A language-model endpoint that turns a request into free-form text.
///
/// Implementations own transport concerns (HTTP status mapping, their own
/// request timeouts) and must classify every failure into a `RemoteFailure`.
/// `AuditClient` bounds each call on top of that.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<String, RemoteFailure>;

    /// Model name for logs
    fn model_name(&self) -> &str;
}
