//! Dispatch through a trusted server-side proxy
//!
//! Credentials stay on the server. The request names the provider slot and
//! the proxy answers in the chat-completions shape regardless of which model
//! served it:
//!
//! ```text
//! POST {endpoint}
//! { "messages": [...], "provider": "primary"|"secondary", "temperature": 0.7, "max_tokens": 2000 }
//!
//! 200 { "choices": [{ "message": { "role": "assistant", "content": "..." } }] }
//! 4xx/5xx { "error": { "message": "..." } } | { "error": "..." }
//! ```

use super::backend::ChatBackend;
use super::openai::CompletionResponse;
use super::types::{ChatMessage, ChatOptions, NormalizedResponse, ProviderId};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

pub struct ProxyBackend {
    client: Client,
    endpoint: String,
    provider: ProviderId,
    model: String,
}

#[derive(Serialize)]
struct DispatchRequest<'a> {
    messages: &'a [ChatMessage],
    provider: ProviderId,
    temperature: f32,
    max_tokens: u32,
}

impl ProxyBackend {
    pub fn new(endpoint: impl Into<String>, provider: ProviderId) -> Self {
        Self::with_client(Client::new(), endpoint, provider)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>, provider: ProviderId) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            provider,
            model: provider.default_model().to_string(),
        }
    }

    /// Override the model name reported by connectivity checks.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Pull a human-readable message out of a proxy error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
}

#[async_trait]
impl ChatBackend for ProxyBackend {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<NormalizedResponse> {
        let body = DispatchRequest {
            messages,
            provider: self.provider,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let message = error_message(&raw);
            if let Some(msg) = &message {
                if msg.to_lowercase().contains("not configured") {
                    return Err(Error::Config(msg.clone()));
                }
            }
            return Err(Error::Provider {
                status: status.as_u16(),
                body: message.unwrap_or(raw),
            });
        }

        let reply: CompletionResponse = resp.json().await?;
        NormalizedResponse::from_text(reply.into_text())
    }
}
