//! Knowledge base
//!
//! Categorized briefings, strategy notes and campaign documents that are
//! rendered into the system prompt as a priority-ordered context block.

pub mod store;
pub mod types;

pub use store::{KnowledgeStore, KNOWLEDGE_KEY};
pub use types::{CategoryFilter, DocumentCategory, KnowledgeDocument, KnowledgeStats};
