//! Knowledge document store
//!
//! Documents live in the local tier under `knowledge_base` as a single JSON
//! array (newest first) shared by every artist. A store opened for an artist
//! only sees that artist's documents, unassigned ones and global ones; the
//! rest are carried through writes untouched. Every mutation reaches the local
//! tier before the in-memory copy changes.
//!
//! When a remote tier is connected, mutations are written through to it;
//! remote write failures are logged and the local copy stays authoritative.
//!
//! Visibility: global documents are administrator-managed. They are hidden
//! from a non-administrator's list and search unless explicitly requested,
//! but `context_block` always includes them.

use super::types::{CategoryFilter, DocumentCategory, KnowledgeDocument, KnowledgeStats};
use crate::app::UserIdentity;
use crate::error::{Error, Result};
use crate::storage::{load_json, save_json, KnowledgeScope, LocalTier, RemoteKnowledgeTier};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Local-tier key holding the document array
pub const KNOWLEDGE_KEY: &str = "knowledge_base";

/// Categorized reference documents for one user and (optionally) one artist
pub struct KnowledgeStore {
    documents: RwLock<Vec<KnowledgeDocument>>,
    local: Arc<dyn LocalTier>,
    remote: Option<Arc<dyn RemoteKnowledgeTier>>,
    identity: UserIdentity,
    artist_id: Option<String>,
}

impl KnowledgeStore {
    /// Load the local copy. An unreadable copy is discarded with a warning.
    pub fn open(
        local: Arc<dyn LocalTier>,
        remote: Option<Arc<dyn RemoteKnowledgeTier>>,
        identity: UserIdentity,
        artist_id: Option<String>,
    ) -> Self {
        let documents = match load_json::<Vec<KnowledgeDocument>>(local.as_ref(), KNOWLEDGE_KEY) {
            Ok(docs) => docs.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable knowledge base: {}", e);
                Vec::new()
            }
        };
        Self {
            documents: RwLock::new(documents),
            local,
            remote,
            identity,
            artist_id,
        }
    }

    pub fn artist_id(&self) -> Option<&str> {
        self.artist_id.as_deref()
    }

    /// Add a document owned by the current user and artist.
    pub async fn add(
        &self,
        title: &str,
        category: DocumentCategory,
        content: &str,
    ) -> Result<KnowledgeDocument> {
        let doc = self.new_document(title, category, content, false)?;
        self.insert(doc).await
    }

    /// Add a document visible to every user. Administrators only.
    pub async fn add_global(
        &self,
        title: &str,
        category: DocumentCategory,
        content: &str,
    ) -> Result<KnowledgeDocument> {
        self.require_admin("create global documents")?;
        let doc = self.new_document(title, category, content, true)?;
        self.insert(doc).await
    }

    /// Replace title, category and content of an existing document.
    ///
    /// Returns `Ok(None)` when the id is unknown and no remote tier is
    /// connected; with a remote tier the miss is `Error::NotFound`.
    pub async fn update(
        &self,
        id: &str,
        title: &str,
        category: DocumentCategory,
        content: &str,
    ) -> Result<Option<KnowledgeDocument>> {
        let (title, content) = validate(title, content)?;

        let updated = {
            let mut docs = self.documents.write().await;
            let Some(index) = docs.iter().position(|d| d.id == id && self.in_scope(d)) else {
                return match self.remote {
                    Some(_) => Err(Error::NotFound(format!("knowledge document '{}'", id))),
                    None => Ok(None),
                };
            };
            if docs[index].is_global && !self.identity.is_admin {
                return Err(Error::PermissionDenied(
                    "only administrators can edit global documents".to_string(),
                ));
            }
            let mut next = docs.clone();
            let doc = &mut next[index];
            doc.title = title;
            doc.category = category;
            doc.content = content;
            doc.updated_at = Utc::now();
            let updated = doc.clone();
            self.commit(&mut docs, next)?;
            updated
        };

        if let Some(remote) = &self.remote {
            match remote.update(&updated).await {
                Ok(()) => {}
                Err(Error::NotFound(what)) => return Err(Error::NotFound(what)),
                Err(e) => tracing::warn!("Remote knowledge update failed: {}", e),
            }
        }
        Ok(Some(updated))
    }

    /// Delete a non-global document. Returns whether anything was removed.
    pub async fn delete(&self, id: &str) -> bool {
        self.remove_where(id, false).await
    }

    /// Delete a global document. Administrators only.
    pub async fn delete_global(&self, id: &str) -> Result<bool> {
        self.require_admin("delete global documents")?;
        Ok(self.remove_where(id, true).await)
    }

    pub async fn get(&self, id: &str) -> Option<KnowledgeDocument> {
        self.documents
            .read()
            .await
            .iter()
            .find(|d| d.id == id && self.in_scope(d))
            .cloned()
    }

    /// Documents visible to the current user, in stored order.
    pub async fn list(&self, include_global: bool) -> Vec<KnowledgeDocument> {
        let show_global = include_global || self.identity.is_admin;
        self.documents
            .read()
            .await
            .iter()
            .filter(|d| self.in_scope(d))
            .filter(|d| show_global || !d.is_global)
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search over title or content, preserving
    /// stored order. A blank query matches everything.
    pub async fn search(&self, query: &str, filter: CategoryFilter) -> Vec<KnowledgeDocument> {
        self.search_scoped(query, filter, false).await
    }

    /// `search` with explicit control over global documents.
    pub async fn search_scoped(
        &self,
        query: &str,
        filter: CategoryFilter,
        include_global: bool,
    ) -> Vec<KnowledgeDocument> {
        let needle = query.trim().to_lowercase();
        self.list(include_global)
            .await
            .into_iter()
            .filter(|d| match filter {
                CategoryFilter::All => true,
                CategoryFilter::Only(category) => d.category == category,
            })
            .filter(|d| needle.is_empty() || d.matches(&needle))
            .collect()
    }

    /// Render every document (global included) ordered by category priority,
    /// stopping before the first document that would push the block past
    /// `max_length` characters.
    pub async fn context_block(&self, max_length: usize) -> String {
        let docs = self.documents.read().await;
        let mut sorted: Vec<&KnowledgeDocument> =
            docs.iter().filter(|d| self.in_scope(d)).collect();
        sorted.sort_by_key(|d| d.category.priority());

        let mut block = String::new();
        let mut length = 0;
        for doc in sorted {
            let entry = doc.context_entry();
            let entry_len = entry.chars().count();
            if length + entry_len > max_length {
                break;
            }
            block.push_str(&entry);
            length += entry_len;
        }
        block
    }

    pub async fn stats(&self) -> KnowledgeStats {
        let docs = self.documents.read().await;
        let mut stats = KnowledgeStats::default();
        for doc in docs.iter().filter(|d| self.in_scope(d)) {
            stats.total += 1;
            if doc.is_global {
                stats.global += 1;
            }
            *stats.by_category.entry(doc.category).or_insert(0) += 1;
            stats.total_characters += doc.content.chars().count();
        }
        stats
    }

    /// Pretty-printed JSON array of every document in scope.
    pub async fn export_json(&self) -> Result<String> {
        let docs = self.documents.read().await;
        let scoped: Vec<&KnowledgeDocument> = docs.iter().filter(|d| self.in_scope(d)).collect();
        Ok(serde_json::to_string_pretty(&scoped)?)
    }

    /// Replace the documents in scope with a previously exported array.
    /// Returns the number of documents imported.
    pub async fn import_json(&self, raw: &str) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_array() {
            return Err(Error::Validation(
                "knowledge import must be a JSON array".to_string(),
            ));
        }
        let imported: Vec<KnowledgeDocument> = serde_json::from_value(value)?;
        let count = imported.len();

        let mut docs = self.documents.write().await;
        let next = self.replace_scoped(&docs, imported);
        self.commit(&mut docs, next)?;
        tracing::info!(count, "Knowledge base imported");
        Ok(count)
    }

    /// Drop every document in scope from the local copy.
    pub async fn clear(&self) -> Result<()> {
        let mut docs = self.documents.write().await;
        let next = self.replace_scoped(&docs, Vec::new());
        self.commit(&mut docs, next)
    }

    /// Replace the local copy with the remote view for this user and artist.
    /// Returns the number of documents fetched, or `None` without a remote
    /// tier or signed-in user.
    pub async fn refresh_from_remote(&self) -> Result<Option<usize>> {
        let (Some(remote), Some(user_id)) = (&self.remote, &self.identity.user_id) else {
            return Ok(None);
        };
        let scope = KnowledgeScope {
            user_id: user_id.clone(),
            artist_id: self.artist_id.clone(),
            include_global: true,
        };
        let fetched = remote.list(&scope).await?;
        let count = fetched.len();

        let mut docs = self.documents.write().await;
        let next = self.replace_scoped(&docs, fetched);
        self.commit(&mut docs, next)?;
        tracing::debug!(count, "Knowledge base refreshed from remote");
        Ok(Some(count))
    }

    fn new_document(
        &self,
        title: &str,
        category: DocumentCategory,
        content: &str,
        is_global: bool,
    ) -> Result<KnowledgeDocument> {
        let (title, content) = validate(title, content)?;
        let now = Utc::now();
        Ok(KnowledgeDocument {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            category,
            content,
            is_global,
            user_id: self.identity.user_id.clone(),
            artist_id: if is_global { None } else { self.artist_id.clone() },
            created_at: now,
            updated_at: now,
        })
    }

    async fn insert(&self, doc: KnowledgeDocument) -> Result<KnowledgeDocument> {
        {
            let mut docs = self.documents.write().await;
            let mut next = Vec::with_capacity(docs.len() + 1);
            next.push(doc.clone());
            next.extend(docs.iter().cloned());
            self.commit(&mut docs, next)?;
        }
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.insert(&doc).await {
                tracing::warn!("Remote knowledge insert failed: {}", e);
            }
        }
        tracing::debug!(id = %doc.id, category = %doc.category, "Knowledge document added");
        Ok(doc)
    }

    async fn remove_where(&self, id: &str, global: bool) -> bool {
        let removed = {
            let mut docs = self.documents.write().await;
            let next: Vec<KnowledgeDocument> = docs
                .iter()
                .filter(|d| !(d.id == id && d.is_global == global && self.in_scope(d)))
                .cloned()
                .collect();
            if next.len() == docs.len() {
                false
            } else if let Err(e) = self.commit(&mut docs, next) {
                tracing::warn!("Failed to persist knowledge base: {}", e);
                false
            } else {
                true
            }
        };

        if removed {
            if let Some(remote) = &self.remote {
                if let Err(e) = remote.delete(id).await {
                    tracing::warn!("Remote knowledge delete failed: {}", e);
                }
            }
        }
        removed
    }

    fn require_admin(&self, action: &str) -> Result<()> {
        if self.identity.is_admin {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "only administrators can {}",
                action
            )))
        }
    }

    /// Global documents, unassigned documents and the active artist's own.
    fn in_scope(&self, doc: &KnowledgeDocument) -> bool {
        match (&self.artist_id, &doc.artist_id) {
            (Some(active), Some(owner)) => doc.is_global || active == owner,
            _ => true,
        }
    }

    /// `replacement` followed by every stored document outside this scope.
    fn replace_scoped(
        &self,
        docs: &[KnowledgeDocument],
        replacement: Vec<KnowledgeDocument>,
    ) -> Vec<KnowledgeDocument> {
        let mut next = replacement;
        let kept: Vec<KnowledgeDocument> = docs
            .iter()
            .filter(|d| !self.in_scope(d) && !next.iter().any(|n| n.id == d.id))
            .cloned()
            .collect();
        next.extend(kept);
        next
    }

    /// Write `next` to the local tier, then make it the in-memory copy.
    fn commit(
        &self,
        docs: &mut Vec<KnowledgeDocument>,
        next: Vec<KnowledgeDocument>,
    ) -> Result<()> {
        save_json(self.local.as_ref(), KNOWLEDGE_KEY, &next)?;
        *docs = next;
        Ok(())
    }
}

fn validate(title: &str, content: &str) -> Result<(String, String)> {
    let title = title.trim();
    let content = content.trim();
    if title.is_empty() {
        return Err(Error::Validation("document title is empty".to_string()));
    }
    if content.is_empty() {
        return Err(Error::Validation("document content is empty".to_string()));
    }
    Ok((title.to_string(), content.to_string()))
}
