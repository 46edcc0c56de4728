//! Reconciliation of local and remote memory
//!
//! When the remote snapshot arrives after the local one has been loaded, a
//! `MergeStrategy` decides which side survives. Strategies are pluggable so a
//! union or per-item timestamp merge can replace the size heuristic without
//! touching the store.

use super::insight::MemoryState;

/// Decides whether a remote snapshot replaces the local state.
pub trait MergeStrategy: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Return the state to adopt, or `None` to keep `local` unchanged.
    fn reconcile(&self, local: &MemoryState, remote: MemoryState) -> Option<MemoryState>;
}

/// Remote replaces local wholesale iff it holds strictly more insights or
/// strictly more learned facts. Items present only locally are lost when
/// remote wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargerCollectionWins;

impl MergeStrategy for LargerCollectionWins {
    fn name(&self) -> &'static str {
        "larger-collection-wins"
    }

    fn reconcile(&self, local: &MemoryState, remote: MemoryState) -> Option<MemoryState> {
        let remote_larger = remote.insights.len() > local.insights.len()
            || remote.learned_facts.len() > local.learned_facts.len();
        remote_larger.then_some(remote)
    }
}
