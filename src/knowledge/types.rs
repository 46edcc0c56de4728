//! Knowledge document types
//!
//! Documents are categorized briefings and strategy notes. Categories carry a
//! fixed priority used to order documents when they are rendered into the
//! model context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Document category with a static priority (lower renders first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Strategy,
    Briefing,
    Voice,
    Campaign,
    Release,
    Audience,
    Hashtags,
    Other,
}

impl DocumentCategory {
    /// Every category in priority order
    pub const ALL: [DocumentCategory; 8] = [
        Self::Strategy,
        Self::Briefing,
        Self::Voice,
        Self::Campaign,
        Self::Release,
        Self::Audience,
        Self::Hashtags,
        Self::Other,
    ];

    pub fn priority(self) -> u8 {
        match self {
            Self::Strategy => 1,
            Self::Briefing => 2,
            Self::Voice => 3,
            Self::Campaign => 4,
            Self::Release => 5,
            Self::Audience => 6,
            Self::Hashtags => 7,
            Self::Other => 10,
        }
    }

    /// Human-readable name used in context blocks
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Strategy => "Marketing Strategy",
            Self::Briefing => "Campaign Briefing",
            Self::Voice => "Tone of Voice",
            Self::Campaign => "Active Campaign",
            Self::Release => "Release",
            Self::Audience => "Target Audience",
            Self::Hashtags => "Hashtags and Keywords",
            Self::Other => "Other",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Briefing => "briefing",
            Self::Voice => "voice",
            Self::Campaign => "campaign",
            Self::Release => "release",
            Self::Audience => "audience",
            Self::Hashtags => "hashtags",
            Self::Other => "other",
        }
    }

    /// Lenient lookup: unknown ids fall back to `Other`.
    pub fn from_id(id: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == id)
            .unwrap_or(Self::Other)
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown document category: {}", s))
    }
}

impl<'de> Deserialize<'de> for DocumentCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Ok(Self::from_id(&id))
    }
}

/// A categorized reference document.
///
/// Field names match the remote `knowledge_documents` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub title: String,
    pub category: DocumentCategory,
    pub content: String,
    /// Visible to every user; administrator-managed
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeDocument {
    /// Render this document the way it appears in a context block.
    pub fn context_entry(&self) -> String {
        format!(
            "\n[{}] {}:\n{}\n",
            self.category.display_name(),
            self.title,
            self.content
        )
    }

    /// Case-insensitive substring match on title or content.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }
}

/// Category filter for searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(DocumentCategory),
}

impl std::str::FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

/// Collection statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStats {
    pub total: usize,
    pub global: usize,
    pub by_category: BTreeMap<DocumentCategory, usize>,
    pub total_characters: usize,
}
