//! Provider gateway
//!
//! One `send` and one `test_connection` over whichever backend is selected.
//! The selection lives in `SettingsStore` so it survives restarts. Every call
//! is bounded by a timeout; nothing is retried.

use super::backend::ChatBackend;
use super::classify::classify_restriction;
use super::types::{
    ChatMessage, ChatOptions, ConnectionInfo, NormalizedResponse, ProviderId, DEFAULT_TIMEOUT,
};
use crate::error::{Error, Result};
use crate::settings::SettingsStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Fixed connectivity probe
pub const PROBE_PROMPT: &str = "Reply with OK";
const PROBE_MAX_TOKENS: u32 = 10;

pub struct ProviderGateway {
    backends: HashMap<ProviderId, Arc<dyn ChatBackend>>,
    settings: Arc<SettingsStore>,
    timeout: Duration,
}

impl ProviderGateway {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self {
            backends: HashMap::new(),
            settings,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Register a backend for the slot it reports via `provider()`.
    pub fn with_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backends.insert(backend.provider(), backend);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn selected(&self) -> ProviderId {
        self.settings.provider().await
    }

    /// Persist a new provider selection.
    pub async fn select(&self, provider: ProviderId) -> Result<()> {
        self.settings.set_provider(provider).await?;
        tracing::info!(provider = provider.display_name(), "Provider selected");
        Ok(())
    }

    fn backend(&self, provider: ProviderId) -> Result<&Arc<dyn ChatBackend>> {
        self.backends.get(&provider).ok_or_else(|| {
            Error::Config(format!(
                "no backend configured for {}",
                provider.display_name()
            ))
        })
    }

    /// Send messages to the selected provider.
    pub async fn send(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<NormalizedResponse> {
        let provider = self.selected().await;
        let backend = self.backend(provider)?;
        tracing::debug!(
            provider = provider.display_name(),
            messages = messages.len(),
            max_tokens = options.max_tokens,
            "Sending chat request"
        );

        match tokio::time::timeout(self.timeout, backend.complete(messages, options)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Transport(format!(
                "{} did not respond within {}s",
                provider.display_name(),
                self.timeout.as_secs()
            ))),
        }
    }

    /// Probe the selected provider with a tiny fixed request.
    ///
    /// Failures that look like account restrictions come back as
    /// `Error::AccountRestricted`.
    pub async fn test_connection(&self) -> Result<ConnectionInfo> {
        let provider = self.selected().await;
        let probe = [ChatMessage::user(PROBE_PROMPT)];
        let options = ChatOptions {
            max_tokens: PROBE_MAX_TOKENS,
            ..Default::default()
        };

        match self.send(&probe, &options).await {
            Ok(_) => {
                let backend = self.backend(provider)?;
                Ok(ConnectionInfo {
                    provider_name: provider.display_name().to_string(),
                    model_name: backend.model().to_string(),
                })
            }
            Err(e) => {
                tracing::warn!(provider = provider.display_name(), "Connection test failed: {}", e);
                Err(classify_restriction(e))
            }
        }
    }
}
