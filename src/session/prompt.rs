//! System prompt assembly
//!
//! The prompt is built from independently capped sections in a fixed order:
//!
//! 1. identity preamble
//! 2. platform guidance
//! 3. artist profile (first `profile_chars` characters)
//! 4. knowledge context block (rendered by the store within `knowledge_chars`)
//! 5. memory context
//! 6. behavioral rules
//!
//! Each section is capped before assembly, never the assembled whole, so a
//! long memory block can not push the profile or knowledge out.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PROFILE_CHARS: usize = 2500;
pub const DEFAULT_KNOWLEDGE_CHARS: usize = 6000;

/// Target platform the operator is writing for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Generic,
    Instagram,
    Twitter,
    Facebook,
    Tiktok,
    Youtube,
    Email,
    Press,
    /// Several networks at once
    All,
}

impl Platform {
    pub const ALL: [Platform; 9] = [
        Platform::Generic,
        Platform::Instagram,
        Platform::Twitter,
        Platform::Facebook,
        Platform::Tiktok,
        Platform::Youtube,
        Platform::Email,
        Platform::Press,
        Platform::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Generic => "generic",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
            Platform::Email => "email",
            Platform::Press => "press",
            Platform::All => "all",
        }
    }

    /// Human-readable name with the format hint shown to the model
    pub fn guidance_label(&self) -> &'static str {
        match self {
            Platform::Generic => "General purpose (no specific network)",
            Platform::Instagram => "Instagram (Feed/Stories/Reels)",
            Platform::Twitter => "Twitter/X (280 characters maximum)",
            Platform::Facebook => "Facebook",
            Platform::Tiktok => "TikTok (Gen-Z language, trends)",
            Platform::Youtube => "YouTube (titles, descriptions, scripts)",
            Platform::Email => "Email/Newsletter",
            Platform::Press => "Press Release (formal)",
            Platform::All => "Multi-platform (adapt for several networks)",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .or(match lower.as_str() {
                "x" => Some(Platform::Twitter),
                "" => Some(Platform::Generic),
                _ => None,
            })
            .ok_or_else(|| crate::Error::Validation(format!("unknown platform: {}", s)))
    }
}

/// Per-section character caps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptCaps {
    pub profile_chars: usize,
    pub knowledge_chars: usize,
}

impl Default for PromptCaps {
    fn default() -> Self {
        Self {
            profile_chars: DEFAULT_PROFILE_CHARS,
            knowledge_chars: DEFAULT_KNOWLEDGE_CHARS,
        }
    }
}

/// Already-rendered context sources for one prompt
#[derive(Debug, Default)]
pub struct PromptSources<'a> {
    pub artist_name: &'a str,
    pub platform: Platform,
    pub profile: &'a str,
    pub knowledge: &'a str,
    pub memory: &'a str,
}

const IDENTITY: &str = "# Identity\n\
You are a DIGITAL MARKETING STRATEGIST specialized in the music industry.\n\
\n\
# Ground Rules\n\
- NEVER invent dates, numbers, song titles, shows, awards or any other specific data.\n\
- If a piece of information is not in the profile or briefings below, leave it out.\n\
- When asked for something you have no information about, say: \
\"I could not find that in your briefings. Can you tell me more about it?\"\n\
- Base every answer on the PROFILE and BRIEFINGS below and cite them.";

const NO_BRIEFINGS: &str = "(No briefings yet. Ask the user for more information.)";

const BEHAVIOR: &str = "# Behavior\n\
Do not produce finished content straight away. When the user asks for a post, \
content or a strategy, follow these steps:\n\
\n\
## Step 1: Clarify the objective\n\
Ask 2-3 strategic questions: the real goal (engagement, sales, awareness), the \
specific context (release, special date, routine), the emotion to convey and any \
detail that must be included.\n\
\n\
## Step 2: Propose options\n\
Present 2-3 strategic paths, not the content yet, and ask which one fits best.\n\
\n\
## Step 3: Explain the technique\n\
Name the marketing technique you will use (AIDA, storytelling, scarcity, hook, \
social proof, open loop) and why it works for this goal and audience.\n\
\n\
## Step 4: Produce content with justification\n\
Deliver the content together with the strategy used and why it works.\n\
\n\
## Step 5: Request feedback\n\
Ask what the user thinks and whether the tone should change.\n\
\n\
## Never\n\
- Invent dates, shows, awards, numbers or any other information\n\
- Produce content without asking questions first\n\
- Ignore the registered briefings\n\
- Give generic answers that would fit any artist";

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Assemble the system prompt. The knowledge block is expected to be
/// rendered within `caps.knowledge_chars` already; it is capped again here
/// so a caller passing raw text can not exceed it.
pub fn build_system_prompt(sources: &PromptSources<'_>, caps: &PromptCaps) -> String {
    let artist = if sources.artist_name.trim().is_empty() {
        "Artist"
    } else {
        sources.artist_name
    };
    let knowledge = truncate_chars(sources.knowledge, caps.knowledge_chars);
    let knowledge = if knowledge.trim().is_empty() {
        NO_BRIEFINGS
    } else {
        knowledge
    };

    let mut prompt = String::with_capacity(IDENTITY.len() + BEHAVIOR.len() + 1024);
    prompt.push_str(IDENTITY);
    prompt.push_str("\n\n# Selected Platform\n");
    prompt.push_str(&format!(
        "The user selected: {}\n- Optimize the format for this platform\n- Use a fitting tone of voice",
        sources.platform.guidance_label()
    ));
    prompt.push_str(&format!("\n\n# Artist Profile: {}\n", artist));
    prompt.push_str(truncate_chars(sources.profile, caps.profile_chars));
    prompt.push_str("\n\n# Briefings and Strategies\n");
    prompt.push_str(knowledge);
    prompt.push_str(sources.memory);
    prompt.push_str("\n\n");
    prompt.push_str(BEHAVIOR);
    prompt
}
