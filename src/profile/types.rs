//! Artist profile wire types
//!
//! The profile JSON keeps camelCase field names so stored documents stay
//! compatible with the web editor that produces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured record describing one artist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistProfile {
    pub bio: Bio,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub releases: Vec<Release>,
    #[serde(default)]
    pub social: Social,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bio {
    pub name: String,
    pub full_name: String,
    pub genre: String,
    pub description: String,
    pub location: String,
    pub years_active: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Achievement {
    pub title: String,
    pub description: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub title: String,
    pub venue: String,
    pub date: String,
    pub city: String,
    pub ticket_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Release {
    pub title: String,
    /// Single, EP, Album...
    #[serde(rename = "type")]
    pub kind: String,
    pub release_date: String,
    pub description: String,
    pub platforms: ReleasePlatforms,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReleasePlatforms {
    pub spotify: String,
    pub deezer: String,
    pub apple_music: String,
    pub youtube: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Social {
    pub instagram: String,
    pub facebook: String,
    pub twitter: String,
    pub tiktok: String,
    pub youtube: String,
    pub website: String,
}

/// Entry in a user's artist roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ArtistProfile {
    /// Blank profile for a newly created artist
    pub fn blank(name: &str, genre: &str) -> Self {
        Self {
            bio: Bio {
                name: name.trim().to_string(),
                genre: genre.trim().to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Built-in template used when nothing has been saved yet
    pub fn template() -> Self {
        Self {
            bio: Bio {
                name: "Your Artist".to_string(),
                full_name: "Full legal name".to_string(),
                genre: "Pop, R&B, Soul".to_string(),
                description: "Describe the artist's story, sound and what makes them stand out."
                    .to_string(),
                location: "City, Country".to_string(),
                years_active: "2020 - Present".to_string(),
            },
            achievements: vec![Achievement {
                title: "Debut Single".to_string(),
                description: "First release and its streaming milestone".to_string(),
                date: "2020".to_string(),
            }],
            events: vec![Event {
                title: "Hometown Show".to_string(),
                venue: "Venue name".to_string(),
                date: "2025-01-15".to_string(),
                city: "City".to_string(),
                ticket_link: String::new(),
            }],
            releases: vec![Release {
                title: "Latest Single".to_string(),
                kind: "Single".to_string(),
                release_date: "2024-12-01".to_string(),
                description: "One line about the release".to_string(),
                platforms: ReleasePlatforms::default(),
            }],
            social: Social {
                instagram: "@artist".to_string(),
                facebook: "artist.official".to_string(),
                twitter: "@artist".to_string(),
                tiktok: "@artist".to_string(),
                youtube: "@artist".to_string(),
                website: String::new(),
            },
        }
    }
}
