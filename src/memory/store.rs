//! Long-term memory store
//!
//! `MemoryStore` owns the user's `MemoryState`. Every mutation is written to
//! the local tier immediately and mirrored to the remote tier after a quiet
//! period, so bursts of mutations coalesce into a single remote write of the
//! state as it is when the write fires.
//!
//! On open the local copy is loaded synchronously; when a remote tier and a
//! user id are configured, the remote copy is fetched in the background and
//! reconciled through the configured `MergeStrategy`.

use super::debounce::{Debouncer, DEFAULT_DEBOUNCE};
use super::extractor::Extractor;
use super::insight::{Insight, InsightCategory, MemoryState, MemoryStats, MAX_FACTS, MAX_INSIGHTS};
use super::merge::{LargerCollectionWins, MergeStrategy};
use crate::error::Result;
use crate::storage::{load_json, save_json, LocalTier, RemoteMemoryTier};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Local-tier key holding the serialized `MemoryState`
pub const MEMORY_KEY: &str = "chat_memory";

/// Capacity and rendering limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLimits {
    pub max_insights: usize,
    pub max_facts: usize,
    /// Facts rendered into the context block
    pub context_facts: usize,
    /// Insights rendered into the context block
    pub context_insights: usize,
    /// Quiet period before a remote write
    pub debounce: Duration,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            max_insights: MAX_INSIGHTS,
            max_facts: MAX_FACTS,
            context_facts: 20,
            context_insights: 15,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

struct Inner {
    state: RwLock<MemoryState>,
    local: Arc<dyn LocalTier>,
    remote: Option<(Arc<dyn RemoteMemoryTier>, String)>,
    merge: Box<dyn MergeStrategy>,
    extractor: Extractor,
    debouncer: Debouncer,
    limits: MemoryLimits,
}

/// Builder for `MemoryStore`
pub struct MemoryStoreBuilder {
    local: Arc<dyn LocalTier>,
    remote: Option<(Arc<dyn RemoteMemoryTier>, String)>,
    merge: Box<dyn MergeStrategy>,
    limits: MemoryLimits,
}

impl MemoryStoreBuilder {
    /// Mirror to a remote tier under `user_id`.
    pub fn remote(mut self, remote: Arc<dyn RemoteMemoryTier>, user_id: impl Into<String>) -> Self {
        self.remote = Some((remote, user_id.into()));
        self
    }

    pub fn merge_strategy(mut self, strategy: impl MergeStrategy + 'static) -> Self {
        self.merge = Box::new(strategy);
        self
    }

    pub fn limits(mut self, limits: MemoryLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Load the local copy and start the background remote sync.
    pub fn open(self) -> Result<MemoryStore> {
        let state = match load_json::<MemoryState>(self.local.as_ref(), MEMORY_KEY) {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable local memory: {}", e);
                MemoryState::default()
            }
        };

        let store = MemoryStore {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                local: self.local,
                remote: self.remote,
                merge: self.merge,
                extractor: Extractor::with_default_rules()?,
                debouncer: Debouncer::new(self.limits.debounce),
                limits: self.limits,
            }),
        };

        if store.inner.remote.is_some() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let background = store.clone();
                    handle.spawn(async move {
                        if let Err(e) = background.sync_from_remote().await {
                            tracing::warn!("Remote memory sync failed: {}", e);
                        }
                    });
                }
                Err(_) => tracing::debug!("No runtime available, skipping remote memory sync"),
            }
        }

        Ok(store)
    }
}

/// Per-user long-term memory
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn builder(local: Arc<dyn LocalTier>) -> MemoryStoreBuilder {
        MemoryStoreBuilder {
            local,
            remote: None,
            merge: Box::new(LargerCollectionWins),
            limits: MemoryLimits::default(),
        }
    }

    /// Open a local-only store with default limits.
    pub fn open_local(local: Arc<dyn LocalTier>) -> Result<Self> {
        Self::builder(local).open()
    }

    /// Add an insight unless one with the same text (ignoring case) exists.
    /// Returns whether it was added.
    pub async fn add_insight(&self, category: InsightCategory, content: &str) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }

        let mut state = self.inner.state.write().await;
        if state.insights.iter().any(|i| i.same_content(content)) {
            return false;
        }
        state.insights.insert(0, Insight::new(category, content));
        state.insights.truncate(self.inner.limits.max_insights);
        tracing::debug!(category = %category, "Insight recorded");
        self.persist(&state);
        true
    }

    /// Add a fact unless an identical string exists. Returns whether it was added.
    pub async fn add_fact(&self, fact: &str) -> bool {
        let fact = fact.trim();
        if fact.is_empty() {
            return false;
        }

        let mut state = self.inner.state.write().await;
        if state.learned_facts.iter().any(|f| f == fact) {
            return false;
        }
        state.learned_facts.insert(0, fact.to_string());
        state.learned_facts.truncate(self.inner.limits.max_facts);
        self.persist(&state);
        true
    }

    /// Set or overwrite a preference.
    pub async fn set_preference(&self, key: &str, value: &str) {
        let mut state = self.inner.state.write().await;
        state
            .preferences
            .insert(key.trim().to_string(), value.trim().to_string());
        self.persist(&state);
    }

    /// Run the extraction rules over a user message and record each hit.
    /// Returns how many new insights were stored.
    pub async fn extract_insights(&self, text: &str) -> usize {
        let mut added = 0;
        for (category, content) in self.inner.extractor.extract(text) {
            if self.add_insight(category, &content).await {
                added += 1;
            }
        }
        added
    }

    /// Render the memory as a context block for the system prompt.
    /// Empty memory renders as an empty string.
    pub async fn context_block(&self) -> String {
        let state = self.inner.state.read().await;
        let limits = &self.inner.limits;
        let mut block = String::new();

        if !state.learned_facts.is_empty() {
            block.push_str("\n\n# Known Facts\n");
            let facts: Vec<String> = state
                .learned_facts
                .iter()
                .take(limits.context_facts)
                .map(|f| format!("- {}", f))
                .collect();
            block.push_str(&facts.join("\n"));
        }

        if !state.insights.is_empty() {
            block.push_str("\n\n# Insights\n");
            let insights: Vec<String> = state
                .insights
                .iter()
                .take(limits.context_insights)
                .map(|i| format!("- [{}] {}", i.category, i.content))
                .collect();
            block.push_str(&insights.join("\n"));
        }

        if !state.preferences.is_empty() {
            block.push_str("\n\n# Preferences\n");
            let prefs: Vec<String> = state
                .preferences
                .iter()
                .map(|(k, v)| format!("- {}: {}", k, v))
                .collect();
            block.push_str(&prefs.join("\n"));
        }

        block
    }

    /// Forget everything locally and, best-effort, remotely.
    pub async fn clear(&self) {
        {
            let mut state = self.inner.state.write().await;
            *state = MemoryState::default();
            if let Err(e) = save_json(self.inner.local.as_ref(), MEMORY_KEY, &*state) {
                tracing::warn!("Failed to persist cleared memory: {}", e);
            }
        }
        self.inner.debouncer.cancel();

        if let Some((remote, user_id)) = &self.inner.remote {
            match remote.delete(user_id).await {
                Ok(()) => tracing::info!("Remote memory cleared"),
                Err(e) => tracing::warn!("Failed to clear remote memory: {}", e),
            }
        }
    }

    /// Fetch the remote copy and reconcile it with the local state.
    /// Returns whether the remote copy was adopted.
    pub async fn sync_from_remote(&self) -> Result<bool> {
        let Some((remote, user_id)) = &self.inner.remote else {
            return Ok(false);
        };
        let Some(remote_state) = remote.fetch(user_id).await? else {
            return Ok(false);
        };

        let mut state = self.inner.state.write().await;
        match self.inner.merge.reconcile(&state, remote_state) {
            Some(adopted) => {
                *state = adopted;
                save_json(self.inner.local.as_ref(), MEMORY_KEY, &*state)?;
                tracing::info!(
                    strategy = self.inner.merge.name(),
                    insights = state.insights.len(),
                    facts = state.learned_facts.len(),
                    "Adopted remote memory"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write the current state to the remote tier now, dropping any pending
    /// debounced write.
    pub async fn flush(&self) -> Result<()> {
        self.inner.debouncer.cancel();
        if let Some((remote, user_id)) = &self.inner.remote {
            let snapshot = self.inner.state.read().await.clone();
            remote.upsert(user_id, &snapshot).await?;
        }
        Ok(())
    }

    /// Whether a remote write is waiting for its quiet period to end
    pub fn has_pending_write(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    pub async fn stats(&self) -> MemoryStats {
        self.inner.state.read().await.stats()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.inner.state.read().await.clone()
    }

    pub async fn insights(&self) -> Vec<Insight> {
        self.inner.state.read().await.insights.clone()
    }

    pub async fn facts(&self) -> Vec<String> {
        self.inner.state.read().await.learned_facts.clone()
    }

    pub async fn preferences(&self) -> BTreeMap<String, String> {
        self.inner.state.read().await.preferences.clone()
    }

    fn persist(&self, state: &MemoryState) {
        if let Err(e) = save_json(self.inner.local.as_ref(), MEMORY_KEY, state) {
            tracing::warn!("Failed to persist memory locally: {}", e);
        }
        self.schedule_remote_write();
    }

    fn schedule_remote_write(&self) {
        if self.inner.remote.is_none() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::debug!("No runtime available, remote memory write skipped");
            return;
        }
        let inner = Arc::clone(&self.inner);
        self.inner.debouncer.schedule(async move {
            let Some((remote, user_id)) = &inner.remote else {
                return;
            };
            let snapshot = inner.state.read().await.clone();
            match remote.upsert(user_id, &snapshot).await {
                Ok(()) => tracing::debug!("Remote memory updated"),
                Err(e) => tracing::warn!("Remote memory write failed: {}", e),
            }
        }
        .boxed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::{JsonFileStore, MemoryTier};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRemote {
        stored: Mutex<Option<MemoryState>>,
        upserts: AtomicUsize,
        deletes: AtomicUsize,
        fail: bool,
    }

    impl FakeRemote {
        fn with_state(state: MemoryState) -> Self {
            Self {
                stored: Mutex::new(Some(state)),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl RemoteMemoryTier for FakeRemote {
        async fn fetch(&self, _user_id: &str) -> Result<Option<MemoryState>> {
            if self.fail {
                return Err(Error::Transport("offline".to_string()));
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn upsert(&self, _user_id: &str, state: &MemoryState) -> Result<()> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Transport("offline".to_string()));
            }
            *self.stored.lock().unwrap() = Some(state.clone());
            Ok(())
        }

        async fn delete(&self, _user_id: &str) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Transport("offline".to_string()));
            }
            *self.stored.lock().unwrap() = None;
            Ok(())
        }
    }

    fn local_store() -> MemoryStore {
        MemoryStore::open_local(Arc::new(MemoryTier::new())).unwrap()
    }

    #[tokio::test]
    async fn test_insights_newest_first_and_bounded() {
        let store = local_store();
        for i in 0..150 {
            assert!(store.add_insight(InsightCategory::Note, &format!("note {}", i)).await);
        }
        let insights = store.insights().await;
        assert_eq!(insights.len(), MAX_INSIGHTS);
        assert_eq!(insights[0].content, "note 149");
        assert_eq!(insights[99].content, "note 50");
    }

    #[tokio::test]
    async fn test_insight_dedupe_ignores_case() {
        let store = local_store();
        assert!(store.add_insight(InsightCategory::Event, "  Blue Note ").await);
        assert!(!store.add_insight(InsightCategory::Event, "blue note").await);
        assert!(!store.add_insight(InsightCategory::Event, "   ").await);
        let insights = store.insights().await;
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].content, "Blue Note");
    }

    #[tokio::test]
    async fn test_fact_dedupe_is_exact() {
        let store = local_store();
        assert!(store.add_fact("Prefers short captions").await);
        assert!(!store.add_fact("Prefers short captions").await);
        assert!(store.add_fact("prefers short captions").await);
        assert_eq!(store.facts().await.len(), 2);
    }

    #[tokio::test]
    async fn test_facts_bounded() {
        let store = local_store();
        for i in 0..120 {
            store.add_fact(&format!("fact {}", i)).await;
        }
        let facts = store.facts().await;
        assert_eq!(facts.len(), MAX_FACTS);
        assert_eq!(facts[0], "fact 119");
    }

    #[tokio::test]
    async fn test_preferences_overwrite() {
        let store = local_store();
        store.set_preference("tone", "casual").await;
        store.set_preference("tone", "formal").await;
        let prefs = store.preferences().await;
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs["tone"], "formal");
    }

    #[tokio::test]
    async fn test_extract_insights_records_hits() {
        let store = local_store();
        let added = store
            .extract_insights("Big show at Blue Note Club and 12k followers now")
            .await;
        assert_eq!(added, 2);
        assert_eq!(store.extract_insights("show at blue note club").await, 0);
        let stats = store.stats().await;
        assert_eq!(stats.insight_count, 2);
    }

    #[tokio::test]
    async fn test_context_block_empty() {
        assert_eq!(local_store().context_block().await, "");
    }

    #[tokio::test]
    async fn test_context_block_format_and_caps() {
        let store = local_store();
        for i in 0..25 {
            store.add_fact(&format!("fact {}", i)).await;
        }
        for i in 0..20 {
            store
                .add_insight(InsightCategory::Release, &format!("drop {}", i))
                .await;
        }
        store.set_preference("language", "en").await;

        let block = store.context_block().await;
        assert!(block.starts_with("\n\n# Known Facts\n- fact 24\n"));
        assert!(block.contains("- fact 5\n"));
        assert!(!block.contains("- fact 4\n"));
        assert!(block.contains("\n\n# Insights\n- [release] drop 19\n"));
        assert!(block.contains("- [release] drop 5\n"));
        assert!(!block.contains("drop 4\n"));
        assert!(block.ends_with("\n\n# Preferences\n- language: en"));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let local: Arc<dyn LocalTier> = Arc::new(JsonFileStore::new(dir.path()).unwrap());
        {
            let store = MemoryStore::open_local(local.clone()).unwrap();
            store.add_fact("Based in Lisbon").await;
            store.add_insight(InsightCategory::Album, "Neon Rain").await;
        }
        let reopened = MemoryStore::open_local(local).unwrap();
        assert_eq!(reopened.facts().await, vec!["Based in Lisbon".to_string()]);
        assert_eq!(reopened.insights().await[0].category, InsightCategory::Album);
    }

    #[tokio::test]
    async fn test_corrupt_local_state_starts_empty() {
        let local = Arc::new(MemoryTier::new());
        local.write(MEMORY_KEY, "{not json").unwrap();
        let store = MemoryStore::open_local(local).unwrap();
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let remote = Arc::new(FakeRemote::default());
        let store = MemoryStore::builder(Arc::new(MemoryTier::new()))
            .remote(remote.clone(), "user-1")
            .open()
            .unwrap();
        store.add_fact("fact").await;
        store.set_preference("tone", "warm").await;
        store.clear().await;

        assert!(store.snapshot().await.is_empty());
        assert!(!store.has_pending_write());
        assert_eq!(remote.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_swallows_remote_failure() {
        let remote = Arc::new(FakeRemote::failing());
        let store = MemoryStore::builder(Arc::new(MemoryTier::new()))
            .remote(remote.clone(), "user-1")
            .open()
            .unwrap();
        store.add_fact("fact").await;
        store.clear().await;
        assert!(store.snapshot().await.is_empty());
        assert_eq!(remote.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_with_more_items_is_adopted() {
        let mut remote_state = MemoryState::default();
        remote_state.learned_facts = vec!["a".into(), "b".into(), "c".into()];
        let remote = Arc::new(FakeRemote::with_state(remote_state));

        let local = Arc::new(MemoryTier::new());
        save_json(
            local.as_ref(),
            MEMORY_KEY,
            &MemoryState {
                learned_facts: vec!["local only".into()],
                ..Default::default()
            },
        )
        .unwrap();
        let store = MemoryStore::builder(local.clone())
            .remote(remote, "user-1")
            .open()
            .unwrap();
        store.sync_from_remote().await.unwrap();

        assert_eq!(store.facts().await, vec!["a", "b", "c"]);
        let persisted: MemoryState = load_json(local.as_ref(), MEMORY_KEY).unwrap().unwrap();
        assert_eq!(persisted.learned_facts.len(), 3);
    }

    #[tokio::test]
    async fn test_smaller_remote_is_ignored() {
        let mut remote_state = MemoryState::default();
        remote_state.learned_facts = vec!["remote".into()];
        let remote = Arc::new(FakeRemote::with_state(remote_state));

        let local = Arc::new(MemoryTier::new());
        save_json(
            local.as_ref(),
            MEMORY_KEY,
            &MemoryState {
                learned_facts: vec!["one".into(), "two".into()],
                ..Default::default()
            },
        )
        .unwrap();

        let store = MemoryStore::builder(local).remote(remote, "user-1").open().unwrap();
        assert!(!store.sync_from_remote().await.unwrap());
        assert_eq!(store.facts().await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_open_syncs_in_background() {
        let mut remote_state = MemoryState::default();
        remote_state.insights = vec![Insight::new(InsightCategory::Metric, "12k followers")];
        let remote = Arc::new(FakeRemote::with_state(remote_state));

        let store = MemoryStore::builder(Arc::new(MemoryTier::new()))
            .remote(remote, "user-1")
            .open()
            .unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.stats().await.insight_count, 1);
    }

    #[tokio::test]
    async fn test_sync_failure_is_reported() {
        let store = MemoryStore::builder(Arc::new(MemoryTier::new()))
            .remote(Arc::new(FakeRemote::failing()), "user-1")
            .open()
            .unwrap();
        assert!(store.sync_from_remote().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_writes_are_debounced() {
        let remote = Arc::new(FakeRemote::default());
        let store = MemoryStore::builder(Arc::new(MemoryTier::new()))
            .remote(remote.clone(), "user-1")
            .open()
            .unwrap();

        store.add_fact("one").await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        store.add_fact("two").await;
        store.add_insight(InsightCategory::Note, "three").await;
        assert!(store.has_pending_write());
        assert_eq!(remote.upserts.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(remote.upserts.load(Ordering::SeqCst), 1);
        let written = remote.stored.lock().unwrap().clone().unwrap();
        assert_eq!(written.learned_facts, vec!["two", "one"]);
        assert_eq!(written.insights.len(), 1);
    }

    #[tokio::test]
    async fn test_flush_writes_immediately() {
        let remote = Arc::new(FakeRemote::default());
        let store = MemoryStore::builder(Arc::new(MemoryTier::new()))
            .remote(remote.clone(), "user-1")
            .open()
            .unwrap();
        store.add_fact("one").await;
        store.flush().await.unwrap();
        assert!(!store.has_pending_write());
        assert_eq!(remote.upserts.load(Ordering::SeqCst), 1);
    }
}
