//! Conversation sessions and system prompt assembly

pub mod conversation;
pub mod prompt;

pub use conversation::{
    ConversationSession, Message, QuickPrompt, SessionContext, SessionOptions, SessionState,
    DEFAULT_HISTORY_WINDOW, MESSAGES_KEY,
};
pub use prompt::{build_system_prompt, truncate_chars, Platform, PromptCaps, PromptSources};
