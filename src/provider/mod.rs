//! Model providers
//!
//! Two interchangeable backends behind one gateway:
//! - `primary`: OpenAI-compatible chat completions (Groq)
//! - `secondary`: Google Gemini
//!
//! Either can be reached directly with a client-held key or through the
//! server-side dispatch proxy.

pub mod backend;
pub mod classify;
pub mod gateway;
pub mod gemini;
pub mod openai;
pub mod proxy;
pub mod types;

pub use backend::ChatBackend;
pub use classify::{classify_restriction, is_account_restriction, ACCOUNT_RESTRICTION_PHRASES};
pub use gateway::{ProviderGateway, PROBE_PROMPT};
pub use gemini::GeminiBackend;
pub use openai::OpenAiCompatibleBackend;
pub use proxy::ProxyBackend;
pub use types::{
    ChatMessage, ChatOptions, ConnectionInfo, NormalizedResponse, ProviderId, Role, DEFAULT_TIMEOUT,
};
