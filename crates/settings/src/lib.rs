pub mod preferences;

pub use preferences::{
    PreferencesError, PreferencesStore, SessionPreferences, TabPreferences, ViewPreferences,
    ViewerPreferences, DEFAULT_PERSIST_DELAY_MS, DEFAULT_STORAGE_KEY,
};
