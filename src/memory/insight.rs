//! Long-term memory data types
//!
//! Insights are short categorized notes pulled out of user messages, learned
//! facts are verbatim strings kept long-term, and preferences are free-form
//! key/value pairs. Together they form the `MemoryState` that is persisted to
//! the local tier and mirrored to the remote tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Maximum number of insights retained (oldest evicted first)
pub const MAX_INSIGHTS: usize = 100;

/// Maximum number of learned facts retained (oldest evicted first)
pub const MAX_FACTS: usize = 100;

/// A categorized note extracted from conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    /// Unique insight identifier
    pub id: Uuid,
    /// Category label
    pub category: InsightCategory,
    /// Note text (trimmed)
    pub content: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Insight {
    /// Create an insight stamped with a fresh id and the current time.
    pub fn new(category: InsightCategory, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether `other` is the same note ignoring case.
    pub fn same_content(&self, other: &str) -> bool {
        self.content.to_lowercase() == other.to_lowercase()
    }
}

/// Fixed insight label set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    /// Shows, gigs, appearances
    Event,
    /// Upcoming or recent launches
    Release,
    /// A single / track
    Music,
    /// An album or EP
    Album,
    /// Partnerships and features
    Collaboration,
    /// Audience numbers
    Metric,
    /// Manually recorded note
    Note,
}

impl std::fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::Release => write!(f, "release"),
            Self::Music => write!(f, "music"),
            Self::Album => write!(f, "album"),
            Self::Collaboration => write!(f, "collaboration"),
            Self::Metric => write!(f, "metric"),
            Self::Note => write!(f, "note"),
        }
    }
}

impl std::str::FromStr for InsightCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(Self::Event),
            "release" => Ok(Self::Release),
            "music" => Ok(Self::Music),
            "album" => Ok(Self::Album),
            "collaboration" => Ok(Self::Collaboration),
            "metric" => Ok(Self::Metric),
            "note" => Ok(Self::Note),
            other => Err(format!("unknown insight category: {}", other)),
        }
    }
}

/// Aggregate memory persisted per user.
///
/// Field names match the remote `chat_memory` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    /// Newest first
    #[serde(default)]
    pub insights: Vec<Insight>,
    /// Newest first
    #[serde(default)]
    pub learned_facts: Vec<String>,
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
}

impl MemoryState {
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty() && self.learned_facts.is_empty() && self.preferences.is_empty()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            insight_count: self.insights.len(),
            fact_count: self.learned_facts.len(),
            preference_count: self.preferences.len(),
        }
    }
}

/// Collection sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub insight_count: usize,
    pub fact_count: usize,
    pub preference_count: usize,
}
