//! Artist profiles and the per-user artist roster

pub mod roster;
pub mod store;
pub mod types;

pub use roster::{ArtistRoster, ARTISTS_KEY, MAX_ARTISTS};
pub use store::{format_profile, profile_key, ProfileStore};
pub use types::{
    Achievement, ArtistProfile, ArtistSummary, Bio, Event, Release, ReleasePlatforms, Social,
};
