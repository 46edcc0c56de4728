//! Two-tier persistence
//!
//! The local tier is device-resident and always available; the remote tier is
//! shared across devices, optional, and only reached asynchronously.

pub mod local;
pub mod remote;

pub use local::{load_json, save_json, JsonFileStore, LocalTier, MemoryTier};
pub use remote::{
    KnowledgeScope, RemoteKnowledgeTier, RemoteMemoryTier, RemoteProfileTier, RestRemote,
};
