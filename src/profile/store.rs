//! Artist profile persistence and rendering
//!
//! One profile per artist, stored in the local tier under
//! `artist_profile-<artist id>`. Saves go to the local tier synchronously; the
//! remote upsert runs in the background and its failure is only logged.

use super::types::ArtistProfile;
use crate::error::Result;
use crate::storage::{load_json, save_json, LocalTier, RemoteProfileTier};
use std::fmt::Write as _;
use std::sync::Arc;

/// Local-tier key for an artist's profile
pub fn profile_key(artist_id: Option<&str>) -> String {
    match artist_id {
        Some(id) => format!("artist_profile-{}", id),
        None => "artist_profile".to_string(),
    }
}

/// Profile of the active artist
pub struct ProfileStore {
    local: Arc<dyn LocalTier>,
    remote: Option<Arc<dyn RemoteProfileTier>>,
    user_id: Option<String>,
    artist_id: Option<String>,
}

impl ProfileStore {
    pub fn new(
        local: Arc<dyn LocalTier>,
        remote: Option<Arc<dyn RemoteProfileTier>>,
        user_id: Option<String>,
        artist_id: Option<String>,
    ) -> Self {
        Self {
            local,
            remote,
            user_id,
            artist_id,
        }
    }

    fn key(&self) -> String {
        profile_key(self.artist_id.as_deref())
    }

    /// The saved profile, or the built-in template when nothing is saved or
    /// the saved copy is unreadable.
    pub fn load(&self) -> ArtistProfile {
        match load_json::<ArtistProfile>(self.local.as_ref(), &self.key()) {
            Ok(Some(profile)) => profile,
            Ok(None) => ArtistProfile::template(),
            Err(e) => {
                tracing::warn!("Unreadable artist profile, using template: {}", e);
                ArtistProfile::template()
            }
        }
    }

    /// Save locally and push to the remote tier in the background.
    /// Returns `false` when the local write fails.
    pub fn save(&self, profile: &ArtistProfile) -> bool {
        if let Err(e) = save_json(self.local.as_ref(), &self.key(), profile) {
            tracing::error!("Failed to save artist profile: {}", e);
            return false;
        }
        self.push_remote(profile);
        true
    }

    /// Overwrite the profile with the built-in template.
    pub fn reset_to_default(&self) -> ArtistProfile {
        let profile = ArtistProfile::template();
        self.save(&profile);
        profile
    }

    /// Plain-text rendering of the current profile.
    pub fn formatted_context(&self) -> String {
        format_profile(&self.load())
    }

    /// Replace the local copy with the remote one, if the remote tier has it.
    pub async fn sync_from_remote(&self) -> Result<bool> {
        let (Some(remote), Some(user_id), Some(artist_id)) =
            (&self.remote, &self.user_id, &self.artist_id)
        else {
            return Ok(false);
        };
        match remote.fetch(user_id, artist_id).await? {
            Some(profile) => {
                save_json(self.local.as_ref(), &self.key(), &profile)?;
                tracing::debug!(artist_id = %artist_id, "Artist profile pulled from remote");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn push_remote(&self, profile: &ArtistProfile) {
        let (Some(remote), Some(user_id), Some(artist_id)) =
            (&self.remote, &self.user_id, &self.artist_id)
        else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime available, remote profile save skipped");
            return;
        };

        let remote = Arc::clone(remote);
        let user_id = user_id.clone();
        let artist_id = artist_id.clone();
        let profile = profile.clone();
        handle.spawn(async move {
            if let Err(e) = remote.upsert(&user_id, &artist_id, &profile).await {
                tracing::warn!("Failed to save artist profile remotely: {}", e);
            }
        });
    }
}

/// Render a profile as fixed sections: Basic Info, Achievements, Events,
/// Releases, Social. Empty list sections are omitted.
pub fn format_profile(p: &ArtistProfile) -> String {
    let mut out = String::new();
    let bio = &p.bio;

    let _ = writeln!(out, "# Artist Profile: {}\n", bio.name);
    out.push_str("## Basic Info\n");
    let _ = writeln!(out, "Name: {}", bio.name);
    let _ = writeln!(out, "Full Name: {}", bio.full_name);
    let _ = writeln!(out, "Genre: {}", bio.genre);
    let _ = writeln!(out, "Location: {}", bio.location);
    let _ = writeln!(out, "Years Active: {}\n", bio.years_active);
    let _ = writeln!(out, "Description: {}\n", bio.description);

    if !p.achievements.is_empty() {
        out.push_str("## Achievements\n");
        for a in &p.achievements {
            let _ = writeln!(out, "- {} ({}): {}", a.title, a.date, a.description);
        }
        out.push('\n');
    }

    if !p.events.is_empty() {
        out.push_str("## Upcoming Events\n");
        for e in &p.events {
            let _ = writeln!(out, "- {} at {}, {} ({})", e.title, e.venue, e.city, e.date);
        }
        out.push('\n');
    }

    if !p.releases.is_empty() {
        out.push_str("## Recent Releases\n");
        for r in &p.releases {
            let _ = writeln!(
                out,
                "- {} ({}) - {}: {}",
                r.title, r.kind, r.release_date, r.description
            );
        }
        out.push('\n');
    }

    let s = &p.social;
    out.push_str("## Social\n");
    let _ = writeln!(out, "Instagram: {}", s.instagram);
    let _ = writeln!(out, "Facebook: {}", s.facebook);
    let _ = writeln!(out, "Twitter: {}", s.twitter);
    let _ = writeln!(out, "TikTok: {}", s.tiktok);
    let _ = writeln!(out, "YouTube: {}", s.youtube);
    if !s.website.is_empty() {
        let _ = writeln!(out, "Website: {}", s.website);
    }

    out
}
