//! One-shot post generation
//!
//! Unlike the conversation session, the generator sends a single
//! system + instruction pair and returns publish-ready text. Manual mode
//! skips the model and returns a draft template instead.

use crate::error::{Error, Result};
use crate::knowledge::KnowledgeStore;
use crate::profile::{format_profile, ProfileStore};
use crate::provider::{ChatMessage, ChatOptions, ProviderGateway};
use crate::session::truncate_chars;
use crate::settings::SettingsStore;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub const GENERATION_MAX_TOKENS: u32 = 1024;
pub const GENERATION_PROFILE_CHARS: usize = 1500;
pub const GENERATION_KNOWLEDGE_CHARS: usize = 2000;

const TWITTER_LIMIT: usize = 280;

/// Kind of post to generate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Instagram,
    Facebook,
    Twitter,
    Tiktok,
    Email,
    Press,
}

impl ContentType {
    /// Parse a content type, falling back to Instagram for unknown names.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "facebook" => Self::Facebook,
            "twitter" | "x" => Self::Twitter,
            "tiktok" => Self::Tiktok,
            "email" => Self::Email,
            "press" => Self::Press,
            _ => Self::Instagram,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::Tiktok => "tiktok",
            Self::Email => "email",
            Self::Press => "press",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Facebook => "Facebook",
            Self::Twitter => "Twitter/X",
            Self::Tiktok => "TikTok",
            Self::Email => "Email",
            Self::Press => "Press Release",
        }
    }

    /// Character limit of the target channel
    pub fn max_length(&self) -> usize {
        match self {
            Self::Instagram | Self::Tiktok => 2200,
            Self::Facebook => 5000,
            Self::Twitter => TWITTER_LIMIT,
            Self::Email => 10_000,
            Self::Press => 15_000,
        }
    }

    fn expertise(&self) -> &'static str {
        match self {
            Self::Instagram => "an Instagram marketing specialist",
            Self::Facebook => "a Facebook specialist",
            Self::Twitter => "a Twitter specialist",
            Self::Tiktok => "a TikTok specialist",
            Self::Email => "an email marketing specialist",
            Self::Press => "a press release specialist",
        }
    }

    pub fn tips(&self) -> &'static [&'static str] {
        match self {
            Self::Instagram => &["Use emojis", "Hashtags"],
            Self::Facebook => &["Tell stories"],
            Self::Twitter => &["Direct and quick"],
            Self::Tiktok => &["Be creative"],
            Self::Email => &["Personalize"],
            Self::Press => &["Professional"],
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to write about
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub content_type: ContentType,
    pub topic: String,
    pub details: String,
    pub tone: String,
}

impl GenerationRequest {
    pub fn new(content_type: ContentType, topic: impl Into<String>) -> Self {
        Self {
            content_type,
            topic: topic.into(),
            details: String::new(),
            tone: "casual".to_string(),
        }
    }
}

/// Measurements of a generated post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    pub characters: usize,
    pub words: usize,
    pub hashtags: usize,
    pub max_length: usize,
    pub within_limit: bool,
}

/// Draft returned instead of a model call in manual mode.
pub fn manual_template(label: &str, topic: &str) -> String {
    format!(
        "[DRAFT {}]\nTopic: {}\n\n[Write your post here...]",
        label.to_uppercase(),
        topic
    )
}

/// Clean model output for publishing: trim, drop markdown emphasis, and cut
/// Twitter posts to the channel limit.
pub fn format_generated_content(text: &str, content_type: ContentType) -> String {
    let cleaned: String = text.trim().chars().filter(|c| *c != '*').collect();
    if content_type == ContentType::Twitter && cleaned.chars().count() > TWITTER_LIMIT {
        let mut cut: String = cleaned.chars().take(TWITTER_LIMIT - 3).collect();
        cut.push_str("...");
        return cut;
    }
    cleaned
}

const HASHTAG_PATTERN: &str = r"#\w+";

/// Measures drafts against their channel. The hashtag pattern is compiled once.
pub struct MetadataCounter {
    hashtag: Regex,
}

impl MetadataCounter {
    pub fn new() -> Result<Self> {
        let hashtag = Regex::new(HASHTAG_PATTERN)
            .map_err(|e| Error::Config(format!("invalid hashtag pattern: {}", e)))?;
        Ok(Self { hashtag })
    }

    pub fn measure(&self, content: &str, content_type: ContentType) -> ContentMetadata {
        let characters = content.chars().count();
        ContentMetadata {
            characters,
            words: content.split_whitespace().count(),
            hashtags: self.hashtag.find_iter(content).count(),
            max_length: content_type.max_length(),
            within_limit: characters <= content_type.max_length(),
        }
    }
}

pub struct ContentGenerator {
    gateway: Arc<ProviderGateway>,
    settings: Arc<SettingsStore>,
    profile: Arc<ProfileStore>,
    knowledge: Arc<KnowledgeStore>,
    counter: MetadataCounter,
    temperature: f32,
}

impl ContentGenerator {
    pub fn new(
        gateway: Arc<ProviderGateway>,
        settings: Arc<SettingsStore>,
        profile: Arc<ProfileStore>,
        knowledge: Arc<KnowledgeStore>,
    ) -> Result<Self> {
        Ok(Self {
            gateway,
            settings,
            profile,
            knowledge,
            counter: MetadataCounter::new()?,
            temperature: ChatOptions::default().temperature,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn metadata(&self, content: &str, content_type: ContentType) -> ContentMetadata {
        self.counter.measure(content, content_type)
    }

    /// Generate a post for `request`.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(Error::Validation("topic must not be empty".to_string()));
        }

        if self.settings.manual_mode().await {
            tracing::debug!(content_type = %request.content_type, "Manual mode, returning draft");
            return Ok(manual_template(request.content_type.as_str(), topic));
        }

        let messages = [
            ChatMessage::system(self.system_prompt(request.content_type).await),
            ChatMessage::user(instruction_prompt(request)),
        ];
        let options = ChatOptions {
            temperature: self.temperature,
            max_tokens: GENERATION_MAX_TOKENS,
        };
        let reply = self.gateway.send(&messages, &options).await?;
        tracing::info!(content_type = %request.content_type, "Content generated");
        Ok(format_generated_content(&reply.content, request.content_type))
    }

    async fn system_prompt(&self, content_type: ContentType) -> String {
        let profile = self.profile.load();
        let rendered = format_profile(&profile);
        let knowledge = self.knowledge.context_block(GENERATION_KNOWLEDGE_CHARS).await;
        let name = if profile.bio.name.is_empty() {
            "the artist"
        } else {
            profile.bio.name.as_str()
        };
        let genre = if profile.bio.genre.is_empty() {
            "music"
        } else {
            profile.bio.genre.as_str()
        };

        format!(
            "You are a music marketing assistant specialized in helping artists.\n\
             Context about {} ({}):\n{}\n{}\n\n\
             You are {}. Use the strategies and briefings from the knowledge base \
             to create content aligned with the artist's communication.",
            name,
            genre,
            truncate_chars(&rendered, GENERATION_PROFILE_CHARS),
            knowledge,
            content_type.expertise()
        )
    }
}

fn instruction_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Create a post for {} about: \"{}\"\n",
        request.content_type.display_name(),
        request.topic.trim()
    );
    if !request.details.trim().is_empty() {
        prompt.push_str(&format!("Additional details: {}\n", request.details.trim()));
    }
    prompt.push_str(&format!("Desired tone: {}\n\n", request.tone));
    prompt.push_str(
        "IMPORTANT: Output ONLY the text of the post, without introductions, \
         explanations or comments. It must be ready to publish.",
    );
    prompt
}
