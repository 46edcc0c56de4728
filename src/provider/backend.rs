//! Backend trait shared by every model adapter

use super::types::{ChatMessage, ChatOptions, NormalizedResponse, ProviderId};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Response;

/// One model backend.
///
/// Implementations translate the provider-neutral message list into their
/// wire format and extract the reply text. They do not retry and do not
/// enforce timeouts; `ProviderGateway` bounds every call.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Which provider slot this backend serves
    fn provider(&self) -> ProviderId;

    /// Model identifier reported by connectivity checks
    fn model(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<NormalizedResponse>;
}

/// Pass a 2xx response through; turn anything else into `Error::Provider`
/// carrying the raw body.
pub(crate) async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), "Provider returned an error");
    Err(Error::Provider {
        status: status.as_u16(),
        body,
    })
}
