//! Settings persistence
//!
//! `SettingsStore` keeps the current `Settings` in memory and writes every
//! change through to the local tier under the `settings` key.

use super::types::{Credential, Settings, SettingsView};
use crate::error::Result;
use crate::provider::ProviderId;
use crate::storage::{load_json, save_json, LocalTier};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Local-tier key holding the settings document
pub const SETTINGS_KEY: &str = "settings";

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub provider: Option<ProviderId>,
    pub manual_mode: Option<bool>,
    /// Key for the provider selected after this update; empty removes it
    pub api_key: Option<String>,
}

pub struct SettingsStore {
    settings: RwLock<Settings>,
    local: Arc<dyn LocalTier>,
}

impl SettingsStore {
    pub fn open(local: Arc<dyn LocalTier>) -> Self {
        let settings = match load_json::<Settings>(local.as_ref(), SETTINGS_KEY) {
            Ok(s) => s.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Unreadable settings, using defaults: {}", e);
                Settings::default()
            }
        };
        Self {
            settings: RwLock::new(settings),
            local,
        }
    }

    /// Whether settings were ever written to the local tier.
    pub fn has_saved(&self) -> bool {
        matches!(self.local.read(SETTINGS_KEY), Ok(Some(_)))
    }

    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Settings with credentials masked
    pub async fn view(&self) -> SettingsView {
        SettingsView::from(&*self.settings.read().await)
    }

    pub async fn provider(&self) -> ProviderId {
        self.settings.read().await.provider
    }

    pub async fn manual_mode(&self) -> bool {
        self.settings.read().await.manual_mode
    }

    pub async fn set_provider(&self, provider: ProviderId) -> Result<()> {
        self.update(SettingsUpdate {
            provider: Some(provider),
            ..Default::default()
        })
        .await
    }

    pub async fn set_manual_mode(&self, enabled: bool) -> Result<()> {
        self.update(SettingsUpdate {
            manual_mode: Some(enabled),
            ..Default::default()
        })
        .await
    }

    /// Store (or with an empty key, remove) the credential for `provider`.
    pub async fn set_credential(&self, provider: ProviderId, key: &str) -> Result<()> {
        let mut settings = self.settings.write().await;
        let key = Credential::new(key);
        if key.is_empty() {
            settings.credentials.remove(&provider);
        } else {
            settings.credentials.insert(provider, key);
        }
        self.persist(&settings)
    }

    pub async fn credential(&self, provider: ProviderId) -> Option<Credential> {
        self.settings.read().await.credentials.get(&provider).cloned()
    }

    /// Apply a partial update and persist it.
    pub async fn update(&self, update: SettingsUpdate) -> Result<()> {
        let mut settings = self.settings.write().await;
        if let Some(provider) = update.provider {
            settings.provider = provider;
        }
        if let Some(enabled) = update.manual_mode {
            settings.manual_mode = enabled;
        }
        if let Some(raw) = update.api_key {
            let provider = settings.provider;
            let key = Credential::new(raw);
            if key.is_empty() {
                settings.credentials.remove(&provider);
            } else {
                settings.credentials.insert(provider, key);
            }
        }
        tracing::debug!(
            provider = %settings.provider,
            manual_mode = settings.manual_mode,
            "Settings updated"
        );
        self.persist(&settings)
    }

    /// Restore defaults, dropping every stored credential.
    pub async fn reset(&self) -> Result<()> {
        let mut settings = self.settings.write().await;
        *settings = Settings::default();
        self.persist(&settings)
    }

    fn persist(&self, settings: &Settings) -> Result<()> {
        save_json(self.local.as_ref(), SETTINGS_KEY, settings)
    }
}

/// Credential lookup order: stored setting first, then the named
/// environment variable.
pub fn resolve_credential(stored: Option<Credential>, env_var: &str) -> Option<Credential> {
    stored.filter(|c| !c.is_empty()).or_else(|| {
        std::env::var(env_var)
            .ok()
            .map(Credential::new)
            .filter(|c| !c.is_empty())
    })
}
