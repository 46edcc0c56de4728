//! Long-term memory
//!
//! Bounded insights, learned facts and preferences that survive across
//! conversations, rendered into every system prompt as a context block.

pub mod debounce;
pub mod extractor;
pub mod insight;
pub mod merge;
pub mod store;

pub use debounce::Debouncer;
pub use extractor::Extractor;
pub use insight::{Insight, InsightCategory, MemoryState, MemoryStats, MAX_FACTS, MAX_INSIGHTS};
pub use merge::{LargerCollectionWins, MergeStrategy};
pub use store::{MemoryLimits, MemoryStore, MemoryStoreBuilder, MEMORY_KEY};
