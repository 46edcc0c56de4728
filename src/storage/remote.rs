//! Remote tier: durable state shared across devices
//!
//! The remote tier is optional. Stores receive it as
//! `Option<Arc<dyn Remote...Tier>>` and keep working from the local tier when
//! it is absent or failing.
//!
//! `RestRemote` talks to a PostgREST-compatible endpoint with three tables:
//!
//! ```text
//! chat_memory          (user_id PK, insights, learned_facts, preferences)
//! knowledge_documents  (id PK, user_id, artist_id, title, category, content, is_global, ...)
//! artist_profiles      (id PK, user_id, bio, achievements, events, releases, social)
//! ```

use crate::error::{Error, Result};
use crate::knowledge::KnowledgeDocument;
use crate::memory::MemoryState;
use crate::profile::ArtistProfile;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

/// Remote copy of a user's memory, keyed by user id.
#[async_trait]
pub trait RemoteMemoryTier: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Option<MemoryState>>;
    async fn upsert(&self, user_id: &str, state: &MemoryState) -> Result<()>;
    async fn delete(&self, user_id: &str) -> Result<()>;
}

/// Visibility scope for listing knowledge documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeScope {
    pub user_id: String,
    /// When set, artist-less documents are included alongside this artist's
    pub artist_id: Option<String>,
    pub include_global: bool,
}

/// Remote knowledge documents, upserted by document id.
#[async_trait]
pub trait RemoteKnowledgeTier: Send + Sync {
    async fn list(&self, scope: &KnowledgeScope) -> Result<Vec<KnowledgeDocument>>;
    async fn insert(&self, doc: &KnowledgeDocument) -> Result<()>;
    /// Fails with `Error::NotFound` when no row has `doc.id`.
    async fn update(&self, doc: &KnowledgeDocument) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Remote artist profiles, keyed by (user id, artist id).
#[async_trait]
pub trait RemoteProfileTier: Send + Sync {
    async fn fetch(&self, user_id: &str, artist_id: &str) -> Result<Option<ArtistProfile>>;
    async fn upsert(&self, user_id: &str, artist_id: &str, profile: &ArtistProfile) -> Result<()>;
}

/// PostgREST-style HTTP remote tier
pub struct RestRemote {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize, Deserialize)]
struct MemoryRow {
    user_id: String,
    #[serde(flatten)]
    state: MemoryState,
}

#[derive(Serialize, Deserialize)]
struct ProfileRow {
    id: String,
    user_id: String,
    #[serde(flatten)]
    profile: ArtistProfile,
}

impl RestRemote {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn table(&self, method: reqwest::Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Storage(format!(
            "remote tier returned {}: {}",
            status.as_u16(),
            body
        )))
    }
}

/// PostgREST `or=(...)` filter for a knowledge scope.
fn knowledge_filter(scope: &KnowledgeScope) -> Vec<(String, String)> {
    let user = &scope.user_id;
    match (&scope.artist_id, scope.include_global) {
        (Some(artist), true) => vec![(
            "or".to_string(),
            format!(
                "(and(user_id.eq.{user},artist_id.eq.{artist}),is_global.eq.true,and(user_id.eq.{user},artist_id.is.null))"
            ),
        )],
        (Some(artist), false) => vec![(
            "or".to_string(),
            format!(
                "(and(user_id.eq.{user},artist_id.eq.{artist}),and(user_id.eq.{user},artist_id.is.null))"
            ),
        )],
        (None, true) => vec![(
            "or".to_string(),
            format!("(user_id.eq.{user},is_global.eq.true)"),
        )],
        (None, false) => vec![
            ("user_id".to_string(), format!("eq.{user}")),
            ("is_global".to_string(), "eq.false".to_string()),
        ],
    }
}

#[async_trait]
impl RemoteMemoryTier for RestRemote {
    async fn fetch(&self, user_id: &str) -> Result<Option<MemoryState>> {
        let resp = self
            .table(reqwest::Method::GET, "chat_memory")
            .query(&[("user_id", format!("eq.{user_id}")), ("select", "*".to_string())])
            .send()
            .await?;
        let rows: Vec<MemoryRow> = Self::check(resp).await?.json().await?;
        Ok(rows.into_iter().next().map(|r| r.state))
    }

    async fn upsert(&self, user_id: &str, state: &MemoryState) -> Result<()> {
        let row = MemoryRow {
            user_id: user_id.to_string(),
            state: state.clone(),
        };
        let resp = self
            .table(reqwest::Method::POST, "chat_memory")
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        let resp = self
            .table(reqwest::Method::DELETE, "chat_memory")
            .query(&[("user_id", format!("eq.{user_id}"))])
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteKnowledgeTier for RestRemote {
    async fn list(&self, scope: &KnowledgeScope) -> Result<Vec<KnowledgeDocument>> {
        let mut query = knowledge_filter(scope);
        query.push(("select".to_string(), "*".to_string()));
        query.push(("order".to_string(), "created_at.desc".to_string()));
        let resp = self
            .table(reqwest::Method::GET, "knowledge_documents")
            .query(&query)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn insert(&self, doc: &KnowledgeDocument) -> Result<()> {
        let resp = self
            .table(reqwest::Method::POST, "knowledge_documents")
            .json(&[doc])
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn update(&self, doc: &KnowledgeDocument) -> Result<()> {
        let resp = self
            .table(reqwest::Method::PATCH, "knowledge_documents")
            .query(&[("id", format!("eq.{}", doc.id))])
            .header("Prefer", "return=representation")
            .json(doc)
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = Self::check(resp).await?.json().await?;
        if rows.is_empty() {
            return Err(Error::NotFound(format!("knowledge document '{}'", doc.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let resp = self
            .table(reqwest::Method::DELETE, "knowledge_documents")
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteProfileTier for RestRemote {
    async fn fetch(&self, user_id: &str, artist_id: &str) -> Result<Option<ArtistProfile>> {
        let resp = self
            .table(reqwest::Method::GET, "artist_profiles")
            .query(&[
                ("id", format!("eq.{artist_id}")),
                ("user_id", format!("eq.{user_id}")),
                ("select", "*".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<ProfileRow> = Self::check(resp).await?.json().await?;
        Ok(rows.into_iter().next().map(|r| r.profile))
    }

    async fn upsert(&self, user_id: &str, artist_id: &str, profile: &ArtistProfile) -> Result<()> {
        let row = ProfileRow {
            id: artist_id.to_string(),
            user_id: user_id.to_string(),
            profile: profile.clone(),
        };
        let resp = self
            .table(reqwest::Method::POST, "artist_profiles")
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Insight, InsightCategory};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_knowledge_filter_with_artist_and_global() {
        let scope = KnowledgeScope {
            user_id: "u1".to_string(),
            artist_id: Some("a1".to_string()),
            include_global: true,
        };
        let filter = knowledge_filter(&scope);
        assert_eq!(filter.len(), 1);
        assert_eq!(
            filter[0].1,
            "(and(user_id.eq.u1,artist_id.eq.a1),is_global.eq.true,and(user_id.eq.u1,artist_id.is.null))"
        );
    }

    #[test]
    fn test_knowledge_filter_user_only() {
        let scope = KnowledgeScope {
            user_id: "u1".to_string(),
            artist_id: None,
            include_global: false,
        };
        let filter = knowledge_filter(&scope);
        assert_eq!(filter[0], ("user_id".to_string(), "eq.u1".to_string()));
        assert_eq!(filter[1], ("is_global".to_string(), "eq.false".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_memory_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/chat_memory"))
            .and(query_param("user_id", "eq.u1"))
            .and(header("apikey", "anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "user_id": "u1",
                "insights": [],
                "learned_facts": ["Tours in March"],
                "preferences": {"tone": "warm"}
            }])))
            .mount(&server)
            .await;

        let remote = RestRemote::new(server.uri(), "anon");
        let state = RemoteMemoryTier::fetch(&remote, "u1").await.unwrap().unwrap();
        assert_eq!(state.learned_facts, vec!["Tours in March"]);
        assert_eq!(state.preferences.get("tone").map(String::as_str), Some("warm"));
    }

    #[tokio::test]
    async fn test_fetch_memory_missing_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/chat_memory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let remote = RestRemote::new(server.uri(), "anon");
        assert!(RemoteMemoryTier::fetch(&remote, "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_memory_sends_conflict_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/chat_memory"))
            .and(query_param("on_conflict", "user_id"))
            .and(header("Prefer", "resolution=merge-duplicates"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let remote = RestRemote::new(server.uri(), "anon");
        let mut state = MemoryState::default();
        state.insights.push(Insight::new(InsightCategory::Event, "Blue Note"));
        RemoteMemoryTier::upsert(&remote, "u1", &state).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_is_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/chat_memory"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let remote = RestRemote::new(server.uri(), "anon");
        let err = RemoteMemoryTier::delete(&remote, "u1").await.unwrap_err();
        assert!(matches!(err, Error::Storage(ref m) if m.contains("401")));
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/knowledge_documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let remote = RestRemote::new(server.uri(), "anon");
        let now = chrono::Utc::now();
        let doc = KnowledgeDocument {
            id: "missing".to_string(),
            title: "t".to_string(),
            category: crate::knowledge::DocumentCategory::Other,
            content: "c".to_string(),
            is_global: false,
            user_id: Some("u1".to_string()),
            artist_id: None,
            created_at: now,
            updated_at: now,
        };
        let err = remote.update(&doc).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let remote = RestRemote::new("http://127.0.0.1:9", "anon");
        let err = RemoteMemoryTier::fetch(&remote, "u1").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
