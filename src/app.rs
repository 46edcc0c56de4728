//! Application context
//!
//! Everything the assistant needs is built once here and handed around
//! explicitly: storage tiers, stores, the provider gateway, the conversation
//! session and the generator.

use crate::config::EncoreConfig;
use crate::error::Result;
use crate::generator::ContentGenerator;
use crate::knowledge::KnowledgeStore;
use crate::memory::MemoryStore;
use crate::profile::{ArtistRoster, ProfileStore};
use crate::provider::{
    ChatBackend, GeminiBackend, OpenAiCompatibleBackend, ProviderGateway, ProviderId, ProxyBackend,
};
use crate::session::{ConversationSession, SessionContext};
use crate::settings::{resolve_credential, SettingsStore};
use crate::storage::{
    JsonFileStore, LocalTier, RemoteKnowledgeTier, RemoteMemoryTier, RemoteProfileTier, RestRemote,
};
use std::sync::Arc;

/// Who is using the assistant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: Option<String>,
    pub is_admin: bool,
}

impl UserIdentity {
    pub fn signed_in(user_id: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_admin,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }
}

pub struct AppContext {
    pub config: EncoreConfig,
    pub identity: UserIdentity,
    pub local: Arc<dyn LocalTier>,
    pub settings: Arc<SettingsStore>,
    pub roster: Arc<ArtistRoster>,
    pub profile: Arc<ProfileStore>,
    pub knowledge: Arc<KnowledgeStore>,
    pub memory: Arc<MemoryStore>,
    pub gateway: Arc<ProviderGateway>,
    pub session: Arc<ConversationSession>,
    pub generator: Arc<ContentGenerator>,
}

impl AppContext {
    /// Build the context with the local tier under `config.storage.base_dir`.
    pub async fn build(config: EncoreConfig) -> Result<Self> {
        let local: Arc<dyn LocalTier> = Arc::new(JsonFileStore::new(&config.storage.base_dir)?);
        Self::build_with_local(config, local).await
    }

    pub async fn build_with_local(config: EncoreConfig, local: Arc<dyn LocalTier>) -> Result<Self> {
        let identity = match &config.remote.user_id {
            Some(id) => UserIdentity::signed_in(id.clone(), config.remote.is_admin),
            None => UserIdentity::anonymous(),
        };
        let remote = remote_tier(&config, &identity);

        let settings = Arc::new(SettingsStore::open(local.clone()));
        if !settings.has_saved() {
            settings.set_provider(config.models.default_provider).await?;
        }

        let roster = Arc::new(ArtistRoster::open(local.clone()));
        let artist_id = roster.active().await.map(|a| a.id);

        let profile = Arc::new(ProfileStore::new(
            local.clone(),
            remote.clone().map(|r| r as Arc<dyn RemoteProfileTier>),
            identity.user_id.clone(),
            artist_id.clone(),
        ));
        let knowledge = Arc::new(KnowledgeStore::open(
            local.clone(),
            remote.clone().map(|r| r as Arc<dyn RemoteKnowledgeTier>),
            identity.clone(),
            artist_id,
        ));

        let mut memory = MemoryStore::builder(local.clone()).limits(config.memory.limits());
        if let (Some(remote), Some(user_id)) = (&remote, &identity.user_id) {
            memory = memory.remote(remote.clone() as Arc<dyn RemoteMemoryTier>, user_id.clone());
        }
        let memory = Arc::new(memory.open()?);

        let gateway = Arc::new(build_gateway(&config, &settings).await);

        let session = Arc::new(ConversationSession::open(
            SessionContext {
                gateway: gateway.clone(),
                settings: settings.clone(),
                memory: memory.clone(),
                knowledge: knowledge.clone(),
                profile: profile.clone(),
                local: local.clone(),
            },
            config.chat.session_options(),
        ));
        let generator = Arc::new(
            ContentGenerator::new(
                gateway.clone(),
                settings.clone(),
                profile.clone(),
                knowledge.clone(),
            )?
            .with_temperature(config.chat.temperature),
        );

        tracing::info!(
            signed_in = identity.is_signed_in(),
            remote = remote.is_some(),
            proxy = config.proxy.url.is_some(),
            "Application context ready"
        );

        Ok(Self {
            config,
            identity,
            local,
            settings,
            roster,
            profile,
            knowledge,
            memory,
            gateway,
            session,
            generator,
        })
    }

    /// Pull the remote copies of profile, knowledge and memory. Failures are
    /// logged; the local copies stay in use.
    pub async fn sync_remote(&self) {
        if let Err(e) = self.profile.sync_from_remote().await {
            tracing::warn!("Profile sync failed: {}", e);
        }
        if let Err(e) = self.knowledge.refresh_from_remote().await {
            tracing::warn!("Knowledge sync failed: {}", e);
        }
        if let Err(e) = self.memory.sync_from_remote().await {
            tracing::warn!("Memory sync failed: {}", e);
        }
    }

    /// Wait for pending remote memory writes.
    pub async fn shutdown(&self) {
        if let Err(e) = self.memory.flush().await {
            tracing::warn!("Failed to flush memory on shutdown: {}", e);
        }
    }
}

fn remote_tier(config: &EncoreConfig, identity: &UserIdentity) -> Option<Arc<RestRemote>> {
    let url = config.remote.url.as_ref()?;
    if !identity.is_signed_in() {
        tracing::debug!("Remote tier configured but no user is signed in");
        return None;
    }
    match std::env::var(&config.remote.api_key_env) {
        Ok(key) if !key.trim().is_empty() => Some(Arc::new(RestRemote::new(url.clone(), key))),
        _ => {
            tracing::warn!(
                env = %config.remote.api_key_env,
                "Remote tier URL set but no API key found, running local only"
            );
            None
        }
    }
}

/// Register one backend per provider. With a dispatch proxy configured both
/// slots go through it and client-held keys are never read.
pub async fn build_gateway(
    config: &EncoreConfig,
    settings: &Arc<SettingsStore>,
) -> ProviderGateway {
    let mut gateway = ProviderGateway::new(settings.clone()).with_timeout(config.chat.timeout());

    for id in ProviderId::ALL {
        let provider = config.models.provider(id);
        let backend: Arc<dyn ChatBackend> = match &config.proxy.url {
            Some(url) => {
                Arc::new(ProxyBackend::new(url.clone(), id).with_model(provider.model.clone()))
            }
            None => {
                let key = resolve_credential(settings.credential(id).await, &provider.api_key_env);
                match id {
                    ProviderId::Primary => Arc::new(OpenAiCompatibleBackend::new(
                        provider.base_url.clone(),
                        provider.model.clone(),
                        key,
                    )),
                    ProviderId::Secondary => Arc::new(GeminiBackend::new(
                        provider.base_url.clone(),
                        provider.model.clone(),
                        key,
                    )),
                }
            }
        };
        gateway = gateway.with_backend(backend);
    }
    gateway
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTier;

    #[tokio::test]
    async fn test_build_local_only() {
        let local: Arc<dyn LocalTier> = Arc::new(MemoryTier::new());
        let app = AppContext::build_with_local(EncoreConfig::default(), local).await.unwrap();
        assert!(!app.identity.is_signed_in());
        assert_eq!(app.gateway.selected().await, ProviderId::Primary);
        assert!(app.session.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_configured_default_provider_applies_once() {
        let local: Arc<dyn LocalTier> = Arc::new(MemoryTier::new());
        let mut config = EncoreConfig::default();
        config.models.default_provider = ProviderId::Secondary;

        let app = AppContext::build_with_local(config.clone(), local.clone()).await.unwrap();
        assert_eq!(app.settings.provider().await, ProviderId::Secondary);
        app.gateway.select(ProviderId::Primary).await.unwrap();

        let app = AppContext::build_with_local(config, local).await.unwrap();
        assert_eq!(app.settings.provider().await, ProviderId::Primary);
    }

    #[tokio::test]
    async fn test_active_artist_scopes_profile() {
        let local: Arc<dyn LocalTier> = Arc::new(MemoryTier::new());
        let roster = ArtistRoster::open(local.clone());
        let artist = roster.create("Luna", "Indie Pop").await.unwrap();

        let app = AppContext::build_with_local(EncoreConfig::default(), local).await.unwrap();
        assert_eq!(app.knowledge.artist_id(), Some(artist.id.as_str()));
        assert_eq!(app.profile.load().bio.name, "Luna");
    }

    #[test]
    fn test_identity_constructors() {
        let user = UserIdentity::signed_in("u1", true);
        assert!(user.is_signed_in());
        assert!(user.is_admin);
        assert!(!UserIdentity::anonymous().is_signed_in());
    }
}
