//! Conversation session
//!
//! Owns the running message history and drives one model round trip at a
//! time. A session is either `Idle` or `AwaitingResponse`; the in-flight flag
//! is released by a drop guard, so a failed, timed-out or cancelled send
//! always returns the session to `Idle`.

use super::prompt::{build_system_prompt, Platform, PromptCaps, PromptSources};
use crate::error::{Error, Result};
use crate::generator::manual_template;
use crate::knowledge::KnowledgeStore;
use crate::memory::MemoryStore;
use crate::profile::ProfileStore;
use crate::provider::{ChatMessage, ChatOptions, ProviderGateway, Role};
use crate::settings::SettingsStore;
use crate::storage::{load_json, save_json, LocalTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Local-tier key holding the message history
pub const MESSAGES_KEY: &str = "chat_messages";

/// Number of most recent turns sent along with the system prompt
pub const DEFAULT_HISTORY_WINDOW: usize = 12;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to accept a message
    Idle,
    /// A provider call is in flight
    AwaitingResponse,
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Canned conversation starter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickPrompt {
    pub icon: &'static str,
    pub label: &'static str,
    pub prompt: &'static str,
}

const QUICK_PROMPTS: [QuickPrompt; 4] = [
    QuickPrompt {
        icon: "camera",
        label: "Instagram Strategy",
        prompt: "I need a strategic Instagram post",
    },
    QuickPrompt {
        icon: "megaphone",
        label: "Show/Event",
        prompt: "I need to promote a show with a complete campaign",
    },
    QuickPrompt {
        icon: "lightbulb",
        label: "Creative idea",
        prompt: "Suggest creative content ideas for this week",
    },
    QuickPrompt {
        icon: "calendar",
        label: "Calendar",
        prompt: "Help me build a content calendar for the next 7 days",
    },
];

/// Tunables for a session
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub history_window: usize,
    pub chat: ChatOptions,
    pub caps: PromptCaps,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            chat: ChatOptions::default(),
            caps: PromptCaps::default(),
        }
    }
}

/// Clears the in-flight flag when dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Collaborators a session reads context from
pub struct SessionContext {
    pub gateway: Arc<ProviderGateway>,
    pub settings: Arc<SettingsStore>,
    pub memory: Arc<MemoryStore>,
    pub knowledge: Arc<KnowledgeStore>,
    pub profile: Arc<ProfileStore>,
    pub local: Arc<dyn LocalTier>,
}

pub struct ConversationSession {
    ctx: SessionContext,
    options: SessionOptions,
    messages: RwLock<Vec<Message>>,
    platform: RwLock<Platform>,
    in_flight: AtomicBool,
}

impl ConversationSession {
    /// Open a session, restoring the saved history. An unreadable history is
    /// discarded with a warning.
    pub fn open(ctx: SessionContext, options: SessionOptions) -> Self {
        let messages = match load_json::<Vec<Message>>(ctx.local.as_ref(), MESSAGES_KEY) {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable chat history: {}", e);
                Vec::new()
            }
        };
        Self {
            ctx,
            options,
            messages: RwLock::new(messages),
            platform: RwLock::new(Platform::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.in_flight.load(Ordering::Acquire) {
            SessionState::AwaitingResponse
        } else {
            SessionState::Idle
        }
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    pub async fn platform(&self) -> Platform {
        *self.platform.read().await
    }

    pub async fn set_platform(&self, platform: Platform) {
        *self.platform.write().await = platform;
    }

    /// Drop the whole history, locally persisted copy included.
    pub async fn clear_messages(&self) -> Result<()> {
        let mut messages = self.messages.write().await;
        messages.clear();
        save_json(self.ctx.local.as_ref(), MESSAGES_KEY, &*messages)?;
        tracing::debug!("Chat history cleared");
        Ok(())
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(InFlight(&self.in_flight))
    }

    async fn append(&self, message: Message) {
        let mut messages = self.messages.write().await;
        messages.push(message);
        if let Err(e) = save_json(self.ctx.local.as_ref(), MESSAGES_KEY, &*messages) {
            tracing::warn!("Failed to persist chat history: {}", e);
        }
    }

    /// Send one user message and return the assistant reply.
    ///
    /// Blank input is rejected before anything changes. A send while another
    /// is in flight fails with `Error::Busy` and touches nothing. On failure
    /// the user turn stays in the history but no assistant turn is added.
    pub async fn send_message(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        let _guard = self.begin()?;

        self.append(Message::new(Role::User, text)).await;
        let extracted = self.ctx.memory.extract_insights(text).await;
        if extracted > 0 {
            tracing::debug!(extracted, "Insights extracted from message");
        }

        if self.ctx.settings.manual_mode().await {
            let platform = self.platform().await;
            let draft = manual_template(platform.as_str(), text);
            self.append(Message::new(Role::Assistant, draft.clone())).await;
            return Ok(draft);
        }

        let request = self.build_request().await;
        let reply = self
            .ctx
            .gateway
            .send(&request, &self.options.chat)
            .await
            .map_err(|e| {
                tracing::warn!("Chat request failed: {}", e);
                e
            })?;

        self.append(Message::new(Role::Assistant, reply.content.clone()))
            .await;
        Ok(reply.content)
    }

    /// Current system prompt for this session's context.
    pub async fn system_prompt(&self) -> String {
        let profile = self.ctx.profile.load();
        let profile_text = crate::profile::format_profile(&profile);
        let knowledge = self
            .ctx
            .knowledge
            .context_block(self.options.caps.knowledge_chars)
            .await;
        let memory = self.ctx.memory.context_block().await;
        let platform = self.platform().await;

        build_system_prompt(
            &PromptSources {
                artist_name: &profile.bio.name,
                platform,
                profile: &profile_text,
                knowledge: &knowledge,
                memory: &memory,
            },
            &self.options.caps,
        )
    }

    async fn build_request(&self) -> Vec<ChatMessage> {
        let system = self.system_prompt().await;
        let messages = self.messages.read().await;
        let start = messages.len().saturating_sub(self.options.history_window);

        let mut request = Vec::with_capacity(messages.len() - start + 1);
        request.push(ChatMessage::system(system));
        request.extend(
            messages[start..]
                .iter()
                .map(|m| ChatMessage::new(m.role, m.content.clone())),
        );
        request
    }

    /// Greeting shown when a conversation starts.
    pub async fn welcome_message(&self) -> String {
        let platform = self.platform().await;
        let stats = self.ctx.memory.stats().await;

        let mut welcome = format!(
            "Hi! I'm your music marketing strategist.\n\nPlatform: {}",
            platform.guidance_label()
        );
        if stats.insight_count > 0 || stats.fact_count > 0 {
            welcome.push_str(&format!(
                "\nMemory active: {} insight{}, {} fact{} learned",
                stats.insight_count,
                plural(stats.insight_count),
                stats.fact_count,
                plural(stats.fact_count)
            ));
        }
        welcome.push_str(
            "\n\nTell me what you want to create! The more we talk, the more I learn about you.",
        );
        welcome
    }

    pub fn quick_prompts(&self) -> &'static [QuickPrompt] {
        &QUICK_PROMPTS
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::UserIdentity;
    use crate::memory::InsightCategory;
    use crate::provider::{ChatBackend, NormalizedResponse, ProviderId};
    use crate::storage::MemoryTier;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Backend that records every request and replies with a fixed result
    struct RecordingBackend {
        reply: Mutex<Option<Result<NormalizedResponse>>>,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl RecordingBackend {
        fn replying(text: &str) -> Self {
            Self {
                reply: Mutex::new(Some(Ok(NormalizedResponse {
                    content: text.to_string(),
                }))),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn failing(err: Error) -> Self {
            let backend = Self::replying("");
            *backend.reply.lock().unwrap() = Some(Err(err));
            backend
        }
    }

    #[async_trait]
    impl ChatBackend for RecordingBackend {
        fn provider(&self) -> ProviderId {
            ProviderId::Primary
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            _options: &ChatOptions,
        ) -> Result<NormalizedResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(messages.to_vec());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.reply.lock().unwrap().as_ref() {
                Some(Ok(r)) => Ok(r.clone()),
                Some(Err(Error::Provider { status, body })) => Err(Error::Provider {
                    status: *status,
                    body: body.clone(),
                }),
                _ => Err(Error::EmptyResponse),
            }
        }
    }

    fn session_with(
        backend: Arc<RecordingBackend>,
        local: Arc<dyn LocalTier>,
    ) -> ConversationSession {
        let settings = Arc::new(SettingsStore::open(local.clone()));
        let gateway = Arc::new(ProviderGateway::new(settings.clone()).with_backend(backend));
        let ctx = SessionContext {
            gateway,
            settings,
            memory: Arc::new(MemoryStore::open_local(local.clone()).unwrap()),
            knowledge: Arc::new(KnowledgeStore::open(
                local.clone(),
                None,
                UserIdentity::anonymous(),
                None,
            )),
            profile: Arc::new(ProfileStore::new(local.clone(), None, None, None)),
            local,
        };
        ConversationSession::open(ctx, SessionOptions::default())
    }

    fn session(backend: Arc<RecordingBackend>) -> ConversationSession {
        session_with(backend, Arc::new(MemoryTier::new()))
    }

    #[tokio::test]
    async fn test_send_appends_both_turns() {
        let backend = Arc::new(RecordingBackend::replying("Which platform?"));
        let session = session(backend.clone());

        let reply = session.send_message("Write a post").await.unwrap();
        assert_eq!(reply, "Which platform?");

        let messages = session.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(session.state(), SessionState::Idle);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0][0].role, Role::System);
        assert_eq!(requests[0][1].content, "Write a post");
    }

    #[tokio::test]
    async fn test_blank_input_rejected_without_mutation() {
        let backend = Arc::new(RecordingBackend::replying("x"));
        let session = session(backend.clone());

        let err = session.send_message("   \n").await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
        assert!(session.messages().await.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_history_window_limits_turns() {
        let backend = Arc::new(RecordingBackend::replying("ok"));
        let session = session(backend.clone());
        for i in 0..10 {
            session.send_message(&format!("message {}", i)).await.unwrap();
        }

        let requests = backend.requests.lock().unwrap();
        let last = requests.last().unwrap();
        assert_eq!(last.len(), 1 + DEFAULT_HISTORY_WINDOW);
        assert_eq!(last.last().unwrap().content, "message 9");
        assert!(last[1..].iter().all(|m| m.role != Role::System));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_send_is_busy() {
        let mut backend = RecordingBackend::replying("done");
        backend.delay = Duration::from_secs(5);
        let backend = Arc::new(backend);
        let session = session(backend.clone());

        let (first, second) = tokio::join!(session.send_message("first"), async {
            assert_eq!(session.state(), SessionState::AwaitingResponse);
            session.send_message("second").await
        });

        assert_eq!(first.unwrap(), "done");
        assert!(matches!(second, Err(Error::Busy)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.messages().await.len(), 2);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_failure_keeps_error_kind_and_returns_to_idle() {
        let backend = Arc::new(RecordingBackend::failing(Error::Provider {
            status: 503,
            body: "overloaded".to_string(),
        }));
        let session = session(backend);

        let err = session.send_message("hello").await.unwrap_err();
        assert!(matches!(err, Error::Provider { status: 503, .. }));
        assert_eq!(session.state(), SessionState::Idle);

        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_manual_mode_skips_gateway() {
        let backend = Arc::new(RecordingBackend::replying("unused"));
        let session = session(backend.clone());
        session.ctx.settings.set_manual_mode(true).await.unwrap();
        session.set_platform(Platform::Twitter).await;

        let draft = session.send_message("new single").await.unwrap();
        assert!(draft.starts_with("[DRAFT TWITTER]"));
        assert!(draft.contains("new single"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn test_extraction_feeds_next_prompt() {
        let backend = Arc::new(RecordingBackend::replying("noted"));
        let session = session(backend.clone());

        session
            .send_message("We have a show at the Blue Note, then rest")
            .await
            .unwrap();
        let insights = session.ctx.memory.insights().await;
        assert_eq!(insights[0].category, InsightCategory::Event);

        session.send_message("ok").await.unwrap();
        let requests = backend.requests.lock().unwrap();
        assert!(requests[1][0].content.contains("- [event] Blue Note"));
    }

    #[tokio::test]
    async fn test_history_persists_and_clears() {
        let local: Arc<dyn LocalTier> = Arc::new(MemoryTier::new());
        let backend = Arc::new(RecordingBackend::replying("hi"));
        {
            let session = session_with(backend.clone(), local.clone());
            session.send_message("hello").await.unwrap();
        }

        let reopened = session_with(backend, local.clone());
        assert_eq!(reopened.messages().await.len(), 2);

        reopened.clear_messages().await.unwrap();
        assert!(reopened.messages().await.is_empty());
        let saved: Vec<Message> = load_json(local.as_ref(), MESSAGES_KEY).unwrap().unwrap();
        assert!(saved.is_empty());
    }

    #[tokio::test]
    async fn test_welcome_mentions_memory() {
        let session = session(Arc::new(RecordingBackend::replying("x")));
        assert!(!session.welcome_message().await.contains("Memory active"));

        session.ctx.memory.add_fact("Plays guitar").await;
        let welcome = session.welcome_message().await;
        assert!(welcome.contains("0 insights, 1 fact learned"));
        assert_eq!(session.quick_prompts().len(), 4);
    }
}
