//! Encore - Marketing Assistant Core with Conversational Memory
//!
//! Encore mediates between an operator promoting a music artist and a remote
//! large-language-model provider. It keeps multi-turn conversational context,
//! a durable memory of facts and insights learned along the way, and a
//! per-artist knowledge corpus injected into every model call.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        ConversationSession                          │
//! │   Idle / AwaitingResponse · history window · manual-mode drafts     │
//! │                                                                     │
//! │   system prompt = identity → platform → profile → knowledge         │
//! │                   → memory → behavioral rules                       │
//! └──────┬──────────────┬──────────────┬──────────────┬─────────────────┘
//!        │              │              │              │
//! ┌──────▼─────┐ ┌──────▼──────┐ ┌─────▼──────┐ ┌─────▼───────────────┐
//! │ProfileStore│ │KnowledgeStore│ │MemoryStore │ │  ProviderGateway    │
//! │ + Roster   │ │ priorities   │ │ bounded,   │ │ primary: OpenAI API │
//! │            │ │ search       │ │ debounced  │ │ secondary: Gemini   │
//! └──────┬─────┘ └──────┬──────┘ └─────┬──────┘ │ or dispatch proxy   │
//!        │              │              │        └─────────────────────┘
//! ┌──────▼──────────────▼──────────────▼──────────────────────────────┐
//! │  Local tier (JSON files, synchronous)                             │
//! │  Remote tier (REST, optional, asynchronous, last write wins)      │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context wiring every component together
//! - [`session`]: Conversation state machine and system prompt assembly
//! - [`memory`]: Long-term memory with extraction and remote reconciliation
//! - [`knowledge`]: Categorized knowledge documents
//! - [`profile`]: Artist profiles and the artist roster
//! - [`provider`]: Model backends behind a single gateway
//! - [`generator`]: One-shot post generation
//! - [`settings`]: Provider selection, manual mode and credentials
//! - [`storage`]: Local and remote persistence tiers
//! - [`config`]: Configuration management

pub mod app;
pub mod config;
pub mod error;
pub mod generator;
pub mod knowledge;
pub mod memory;
pub mod profile;
pub mod provider;
pub mod session;
pub mod settings;
pub mod storage;

pub use app::{AppContext, UserIdentity};
pub use config::EncoreConfig;
pub use error::{Error, Result};
