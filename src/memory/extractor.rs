//! Rule-based extraction of insights from user messages
//!
//! The Extractor runs a fixed, ordered list of regex rules over a message.
//! Extraction is deterministic (no LLM):
//!
//! 1. Each rule fires at most once per message (first match only).
//! 2. A rule names the capture group that becomes the insight text; group 0
//!    means the whole match.
//! 3. Extracted text is trimmed and discarded when shorter than
//!    `MIN_INSIGHT_CHARS`.
//!
//! Patterns are anchored to domain phrases (venues, launches, collaborations)
//! so false positives stay rare; missing an insight is acceptable.

use super::insight::InsightCategory;
use crate::error::{Error, Result};
use regex::Regex;

/// Shortest extracted text worth keeping
pub const MIN_INSIGHT_CHARS: usize = 4;

/// Declarative form of a rule
pub struct RuleSpec {
    pub name: &'static str,
    pub pattern: &'static str,
    pub category: InsightCategory,
    /// Capture group to keep (0 = whole match)
    pub group: usize,
}

struct ExtractionRule {
    name: &'static str,
    regex: Regex,
    category: InsightCategory,
    group: usize,
}

/// Ordered rule set
pub fn default_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec {
            name: "venue",
            pattern: r"(?i)\b(?:show|gig|concert)\s+(?:at|in)\s+(?:the\s+)?([^,.!?\n]+)",
            category: InsightCategory::Event,
            group: 1,
        },
        RuleSpec {
            name: "launch",
            pattern: r"(?i)\b(?:release|launch)\s+of\s+(?:the\s+|my\s+|our\s+)?([^,.!?\n]+)",
            category: InsightCategory::Release,
            group: 1,
        },
        RuleSpec {
            name: "single",
            pattern: r#"(?i)\bsingle\s+(?:called|named|titled)\s+"?([^",.!?\n]+)"?"#,
            category: InsightCategory::Music,
            group: 1,
        },
        RuleSpec {
            name: "album",
            pattern: r#"(?i)\b(?:album|ep)\s+(?:called|named|titled)\s+"?([^",.!?\n]+)"?"#,
            category: InsightCategory::Album,
            group: 1,
        },
        RuleSpec {
            name: "collaboration",
            pattern: r"(?i)\b(?:collaboration|collab|partnership)\s+with\s+([^,.!?\n]+)",
            category: InsightCategory::Collaboration,
            group: 1,
        },
        RuleSpec {
            name: "audience",
            pattern: r"(?i)\b\d+(?:[.,]\d+)?\s*(?:k|thousand)\s+(?:followers|subscribers|listeners)",
            category: InsightCategory::Metric,
            group: 0,
        },
    ]
}

/// Rule-based extractor that produces (category, text) pairs from messages.
pub struct Extractor {
    rules: Vec<ExtractionRule>,
}

impl Extractor {
    /// Compile a rule set.
    pub fn new(specs: Vec<RuleSpec>) -> Result<Self> {
        let rules = specs
            .into_iter()
            .map(|def| {
                let regex = Regex::new(def.pattern).map_err(|e| {
                    Error::Config(format!("invalid extraction rule '{}': {}", def.name, e))
                })?;
                Ok(ExtractionRule {
                    name: def.name,
                    regex,
                    category: def.category,
                    group: def.group,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Compile `default_rules()`.
    pub fn with_default_rules() -> Result<Self> {
        Self::new(default_rules())
    }

    /// Extract insight candidates in rule order.
    pub fn extract(&self, text: &str) -> Vec<(InsightCategory, String)> {
        let mut found = Vec::new();
        for rule in &self.rules {
            let Some(caps) = rule.regex.captures(text) else {
                continue;
            };
            let Some(m) = caps.get(rule.group) else {
                continue;
            };
            let content = m.as_str().trim();
            if content.chars().count() < MIN_INSIGHT_CHARS {
                tracing::trace!(rule = rule.name, "extracted text too short, discarded");
                continue;
            }
            found.push((rule.category, content.to_string()));
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::with_default_rules().unwrap()
    }

    #[test]
    fn test_extract_venue() {
        let found = extractor().extract("We have a show at the Blue Note Club, it will be great");
        assert_eq!(found, vec![(InsightCategory::Event, "Blue Note Club".to_string())]);
    }

    #[test]
    fn test_extract_multiple_rules_in_order() {
        let found = extractor().extract(
            "Planning the release of Midnight Drive. Also a collaboration with DJ Lumen!",
        );
        assert_eq!(
            found,
            vec![
                (InsightCategory::Release, "Midnight Drive".to_string()),
                (InsightCategory::Collaboration, "DJ Lumen".to_string()),
            ]
        );
    }

    #[test]
    fn test_extract_quoted_single_and_album() {
        let found = extractor()
            .extract(r#"New single called "Glass Hearts" and an album titled Neon Rain."#);
        assert_eq!(
            found,
            vec![
                (InsightCategory::Music, "Glass Hearts".to_string()),
                (InsightCategory::Album, "Neon Rain".to_string()),
            ]
        );
    }

    #[test]
    fn test_extract_metric_keeps_whole_match() {
        let found = extractor().extract("I just passed 12k followers on TikTok");
        assert_eq!(found, vec![(InsightCategory::Metric, "12k followers".to_string())]);
    }

    #[test]
    fn test_each_rule_fires_once() {
        let found = extractor().extract("show at Arena One, then show at Arena Two");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, "Arena One");
    }

    #[test]
    fn test_short_captures_discarded() {
        let found = extractor().extract("gig at Bar.");
        assert!(found.is_empty());
    }

    #[test]
    fn test_no_match() {
        assert!(extractor().extract("Can you write me a caption?").is_empty());
    }

    #[test]
    fn test_invalid_rule_is_config_error() {
        let result = Extractor::new(vec![RuleSpec {
            name: "broken",
            pattern: "(unclosed",
            category: InsightCategory::Note,
            group: 0,
        }]);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
