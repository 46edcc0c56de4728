//! Encore configuration management

use crate::error::{Error, Result};
use crate::memory::MemoryLimits;
use crate::provider::{ChatOptions, ProviderId};
use crate::session::{PromptCaps, SessionOptions};
use crate::storage::JsonFileStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main Encore configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoreConfig {
    /// Model provider configuration
    pub models: ModelsConfig,

    /// Server-side dispatch proxy
    pub proxy: ProxyConfig,

    /// Shared remote tier
    pub remote: RemoteConfig,

    /// Local storage
    pub storage: StorageConfig,

    /// Long-term memory bounds
    pub memory: MemoryConfig,

    /// Conversation tunables
    pub chat: ChatConfig,
}

impl EncoreConfig {
    /// Read a TOML file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid configuration: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Provider used until the operator selects another one
    pub default_provider: ProviderId,

    /// OpenAI-compatible backend
    pub primary: ModelProviderConfig,

    /// Gemini backend
    pub secondary: ModelProviderConfig,
}

impl ModelsConfig {
    pub fn provider(&self, id: ProviderId) -> &ModelProviderConfig {
        match id {
            ProviderId::Primary => &self.primary,
            ProviderId::Secondary => &self.secondary,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default_provider: ProviderId::Primary,
            primary: ModelProviderConfig::defaults_for(ProviderId::Primary),
            secondary: ModelProviderConfig::defaults_for(ProviderId::Secondary),
        }
    }
}

/// Model provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProviderConfig {
    /// API base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Environment variable holding the API key when none is stored
    pub api_key_env: String,
}

impl ModelProviderConfig {
    fn defaults_for(id: ProviderId) -> Self {
        Self {
            base_url: id.default_base_url().to_string(),
            model: id.default_model().to_string(),
            api_key_env: id.default_api_key_env().to_string(),
        }
    }
}

/// Dispatch proxy configuration. When a URL is set, provider credentials
/// live on the server and client-held keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Full dispatch endpoint, e.g. `https://example.com/api/chat`
    pub url: Option<String>,
}

/// Remote tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// REST endpoint of the shared tier
    pub url: Option<String>,

    /// Environment variable holding the anonymous API key
    pub api_key_env: String,

    /// Signed-in user. Without one the remote tier is not used.
    pub user_id: Option<String>,

    /// Whether the signed-in user may manage global documents
    pub is_admin: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key_env: "ENCORE_REMOTE_KEY".to_string(),
            user_id: None,
            is_admin: false,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for local JSON state
    pub base_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: JsonFileStore::default_dir(),
        }
    }
}

/// Memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_insights: usize,
    pub max_facts: usize,
    /// Facts rendered into the system prompt
    pub context_facts: usize,
    /// Insights rendered into the system prompt
    pub context_insights: usize,
    /// Quiet period before a remote write, in milliseconds
    pub debounce_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let limits = MemoryLimits::default();
        Self {
            max_insights: limits.max_insights,
            max_facts: limits.max_facts,
            context_facts: limits.context_facts,
            context_insights: limits.context_insights,
            debounce_ms: limits.debounce.as_millis() as u64,
        }
    }
}

impl MemoryConfig {
    pub fn limits(&self) -> MemoryLimits {
        MemoryLimits {
            max_insights: self.max_insights,
            max_facts: self.max_facts,
            context_facts: self.context_facts,
            context_insights: self.context_insights,
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}

/// Chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Recent turns sent with every request
    pub history_window: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Provider timeout in seconds
    pub timeout_secs: u64,
    /// Profile characters in the system prompt
    pub profile_chars: usize,
    /// Knowledge characters in the system prompt
    pub knowledge_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let session = SessionOptions::default();
        Self {
            history_window: session.history_window,
            temperature: session.chat.temperature,
            max_tokens: session.chat.max_tokens,
            timeout_secs: crate::provider::DEFAULT_TIMEOUT.as_secs(),
            profile_chars: session.caps.profile_chars,
            knowledge_chars: session.caps.knowledge_chars,
        }
    }
}

impl ChatConfig {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            history_window: self.history_window,
            chat: ChatOptions {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
            caps: PromptCaps {
                profile_chars: self.profile_chars,
                knowledge_chars: self.knowledge_chars,
            },
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
