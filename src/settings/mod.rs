//! Settings module: provider selection, manual mode and credentials
//!
//! Settings persist in the local tier. API keys are masked whenever they are
//! displayed.

pub mod store;
pub mod types;

pub use store::{resolve_credential, SettingsStore, SettingsUpdate, SETTINGS_KEY};
pub use types::{mask_api_key, Credential, Settings, SettingsView};
