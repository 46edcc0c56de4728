//! Provider-neutral request and response types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on a single provider call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A role-tagged turn as sent to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The two interchangeable model backends.
///
/// `primary` speaks the OpenAI chat-completions dialect (Groq);
/// `secondary` is Google Gemini.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[default]
    Primary,
    Secondary,
}

impl ProviderId {
    pub const ALL: [ProviderId; 2] = [Self::Primary, Self::Secondary];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Primary => "Groq",
            Self::Secondary => "Gemini",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Primary => "llama-3.3-70b-versatile",
            Self::Secondary => "gemini-2.0-flash",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Primary => "https://api.groq.com/openai/v1",
            Self::Secondary => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Environment variable consulted for the credential
    pub fn default_api_key_env(self) -> &'static str {
        match self {
            Self::Primary => "GROQ_API_KEY",
            Self::Secondary => "GEMINI_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" | "groq" => Ok(Self::Primary),
            "secondary" | "gemini" => Ok(Self::Secondary),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Sampling options for one call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// Assistant reply, independent of which backend produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    pub content: String,
}

impl NormalizedResponse {
    /// Wrap reply text, rejecting missing or blank text.
    pub fn from_text(text: Option<String>) -> crate::Result<Self> {
        match text {
            Some(content) if !content.trim().is_empty() => Ok(Self { content }),
            _ => Err(crate::Error::EmptyResponse),
        }
    }
}

/// Result of a successful connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub provider_name: String,
    pub model_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_parse_aliases() {
        assert_eq!("groq".parse::<ProviderId>().unwrap(), ProviderId::Primary);
        assert_eq!("Gemini".parse::<ProviderId>().unwrap(), ProviderId::Secondary);
        assert_eq!("secondary".parse::<ProviderId>().unwrap(), ProviderId::Secondary);
        assert!("openai".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_provider_id_wire_names() {
        assert_eq!(serde_json::to_string(&ProviderId::Primary).unwrap(), "\"primary\"");
        assert_eq!(ProviderId::default(), ProviderId::Primary);
        assert_eq!(ProviderId::Secondary.default_model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_normalized_response_rejects_blank() {
        assert!(matches!(
            NormalizedResponse::from_text(Some("  \n".to_string())),
            Err(crate::Error::EmptyResponse)
        ));
        assert!(matches!(
            NormalizedResponse::from_text(None),
            Err(crate::Error::EmptyResponse)
        ));
        assert_eq!(
            NormalizedResponse::from_text(Some("OK".to_string())).unwrap().content,
            "OK"
        );
    }
}
