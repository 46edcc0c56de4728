//! Artist roster
//!
//! A user manages up to `MAX_ARTISTS` artists. Exactly one is active whenever
//! the roster is non-empty:
//! - the first artist created becomes active
//! - `set_active` flips the old active off and the new one on in one write
//! - deleting the active artist activates the first remaining one
//! - the last artist cannot be deleted

use super::store::profile_key;
use super::types::{ArtistProfile, ArtistSummary};
use crate::error::{Error, Result};
use crate::storage::{load_json, save_json, LocalTier};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const MAX_ARTISTS: usize = 10;

/// Local-tier key holding the roster
pub const ARTISTS_KEY: &str = "artists";

pub struct ArtistRoster {
    artists: RwLock<Vec<ArtistSummary>>,
    local: Arc<dyn LocalTier>,
}

impl ArtistRoster {
    pub fn open(local: Arc<dyn LocalTier>) -> Self {
        let artists = match load_json::<Vec<ArtistSummary>>(local.as_ref(), ARTISTS_KEY) {
            Ok(list) => list.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable artist roster: {}", e);
                Vec::new()
            }
        };
        Self {
            artists: RwLock::new(artists),
            local,
        }
    }

    pub async fn list(&self) -> Vec<ArtistSummary> {
        self.artists.read().await.clone()
    }

    /// The active artist, falling back to the first one.
    pub async fn active(&self) -> Option<ArtistSummary> {
        let artists = self.artists.read().await;
        artists
            .iter()
            .find(|a| a.is_active)
            .or_else(|| artists.first())
            .cloned()
    }

    /// Create an artist with a blank profile.
    pub async fn create(&self, name: &str, genre: &str) -> Result<ArtistSummary> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("artist name is empty".to_string()));
        }

        let mut artists = self.artists.write().await;
        if artists.len() >= MAX_ARTISTS {
            return Err(Error::Validation(format!(
                "artist limit of {} reached",
                MAX_ARTISTS
            )));
        }

        let artist = ArtistSummary {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            genre: genre.trim().to_string(),
            is_active: artists.is_empty(),
            created_at: Utc::now(),
        };
        let seeded = profile_key(Some(&artist.id));
        save_json(self.local.as_ref(), &seeded, &ArtistProfile::blank(name, genre))?;

        let mut next = artists.clone();
        next.push(artist.clone());
        if let Err(e) = self.persist(&next) {
            if let Err(cleanup) = self.local.remove(&seeded) {
                tracing::warn!("Failed to remove orphaned artist profile: {}", cleanup);
            }
            return Err(e);
        }
        *artists = next;
        tracing::info!(artist = %artist.name, "Artist created");
        Ok(artist)
    }

    /// Delete an artist and its local profile.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut artists = self.artists.write().await;
        let index = artists
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("artist '{}'", id)))?;
        if artists.len() == 1 {
            return Err(Error::Validation(
                "cannot delete the only artist".to_string(),
            ));
        }

        let mut next = artists.clone();
        let removed = next.remove(index);
        if removed.is_active {
            if let Some(first) = next.first_mut() {
                first.is_active = true;
            }
        }
        self.persist(&next)?;
        *artists = next;
        if let Err(e) = self.local.remove(&profile_key(Some(id))) {
            tracing::warn!("Failed to remove profile of deleted artist: {}", e);
        }
        Ok(())
    }

    /// Make `id` the only active artist.
    pub async fn set_active(&self, id: &str) -> Result<ArtistSummary> {
        let mut artists = self.artists.write().await;
        if !artists.iter().any(|a| a.id == id) {
            return Err(Error::NotFound(format!("artist '{}'", id)));
        }
        let mut next = artists.clone();
        for artist in next.iter_mut() {
            artist.is_active = artist.id == id;
        }
        self.persist(&next)?;
        *artists = next;
        artists
            .iter()
            .find(|a| a.is_active)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("artist '{}'", id)))
    }

    fn persist(&self, artists: &[ArtistSummary]) -> Result<()> {
        save_json(self.local.as_ref(), ARTISTS_KEY, artists)
    }
}
