//! Persisted user settings
//!
//! Provider selection, manual mode and client-held credentials. Credentials
//! are wiped from memory on drop and never printed in full: `Debug` and
//! `masked()` show the first 8 and last 4 characters only.

use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An API key held on the client
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn masked(&self) -> String {
        mask_api_key(&self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// User-level settings stored in the local tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub provider: ProviderId,
    /// Bypass the model and answer with a templated draft
    pub manual_mode: bool,
    pub credentials: BTreeMap<ProviderId, Credential>,
}

/// Display form of `Settings` with masked credentials
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub provider: String,
    pub provider_name: String,
    pub manual_mode: bool,
    pub credentials: BTreeMap<String, String>,
}

impl From<&Settings> for SettingsView {
    fn from(settings: &Settings) -> Self {
        Self {
            provider: settings.provider.to_string(),
            provider_name: settings.provider.display_name().to_string(),
            manual_mode: settings.manual_mode,
            credentials: settings
                .credentials
                .iter()
                .map(|(id, key)| (id.to_string(), key.masked()))
                .collect(),
        }
    }
}

/// Mask an API key for display: show first 8 + last 4 chars
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key_normal() {
        assert_eq!(mask_api_key("gsk_abcdefghijklmnop7890"), "gsk_abcd****7890");
    }

    #[test]
    fn test_mask_api_key_short() {
        assert_eq!(mask_api_key("short"), "****");
        assert_eq!(mask_api_key("exactly12ch!"), "****");
        assert_eq!(mask_api_key(""), "");
    }

    #[test]
    fn test_mask_api_key_multibyte() {
        assert_eq!(mask_api_key("ééééééééxyzwvuts"), "éééééééé****vuts");
    }

    #[test]
    fn test_credential_debug_is_masked() {
        let key = Credential::new("  AIzaSyD-1234567890abcdef  ");
        assert_eq!(key.expose(), "AIzaSyD-1234567890abcdef");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("1234567890"));
        assert!(debug.contains("AIzaSyD-"));
    }

    #[test]
    fn test_settings_round_trip() {
        let mut settings = Settings {
            provider: ProviderId::Secondary,
            manual_mode: true,
            ..Default::default()
        };
        settings
            .credentials
            .insert(ProviderId::Primary, Credential::new("gsk_abcdefghijklmnop7890"));

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["provider"], "secondary");
        assert_eq!(json["manualMode"], true);
        assert_eq!(json["credentials"]["primary"], "gsk_abcdefghijklmnop7890");

        let back: Settings = serde_json::from_value(json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_settings_defaults_for_missing_fields() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.provider, ProviderId::Primary);
        assert!(!settings.manual_mode);
        assert!(settings.credentials.is_empty());
    }

    #[test]
    fn test_view_masks_credentials() {
        let mut settings = Settings::default();
        settings
            .credentials
            .insert(ProviderId::Secondary, Credential::new("AIzaSyD-1234567890abcdef"));
        let view = SettingsView::from(&settings);
        assert_eq!(view.provider_name, "Groq");
        assert_eq!(view.credentials["secondary"], "AIzaSyD-****cdef");
    }
}
