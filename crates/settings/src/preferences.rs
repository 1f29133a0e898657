use rustic_viewer_core::{
    TabLimits, DEFAULT_HISTORY_LIMIT, MAX_COMPARISON_CHILDREN, MAX_ZOOM, MIN_ZOOM,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const PREFERENCES_VERSION: u32 = 1;

/// 預設工作階段儲存鍵。 / Default key under which the tab session is stored.
pub const DEFAULT_STORAGE_KEY: &str = "rustic-viewer:tabState:v1";
/// 預設的寫入延遲（毫秒）。 / Default debounce delay for session writes, in milliseconds.
pub const DEFAULT_PERSIST_DELAY_MS: u64 = 300;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 檢視器偏好設定。 / Viewer preferences persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerPreferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub view: ViewPreferences,
    #[serde(default)]
    pub tabs: TabPreferences,
    #[serde(default)]
    pub session: SessionPreferences,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

impl Default for ViewerPreferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            view: ViewPreferences::default(),
            tabs: TabPreferences::default(),
            session: SessionPreferences::default(),
        }
    }
}

impl ViewerPreferences {
    /// 修正不合法或舊版的值。 / Repairs invalid values and upgrades legacy versions.
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.view.sanitize();
        self.tabs.sanitize();
        self.session.sanitize();
    }

    /// 標籤引擎使用的限制。 / Limits handed to the tab engine.
    pub fn tab_limits(&self) -> TabLimits {
        TabLimits {
            min_zoom: self.view.min_zoom,
            max_zoom: self.view.max_zoom,
            max_comparison_children: self.tabs.max_comparison_children,
        }
    }

    pub fn persist_delay(&self) -> Duration {
        Duration::from_millis(self.session.persist_delay_ms)
    }
}

/// 縮放範圍。 / Zoom range applied to every single tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPreferences {
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
}

fn default_min_zoom() -> f64 {
    MIN_ZOOM
}

fn default_max_zoom() -> f64 {
    MAX_ZOOM
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
        }
    }
}

impl ViewPreferences {
    fn sanitize(&mut self) {
        let valid = self.min_zoom.is_finite()
            && self.max_zoom.is_finite()
            && self.min_zoom > 0.0
            && self.min_zoom <= self.max_zoom;
        if !valid {
            debug!(min = self.min_zoom, max = self.max_zoom, "resetting zoom range");
            *self = Self::default();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabPreferences {
    #[serde(default = "default_max_children")]
    pub max_comparison_children: usize,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_max_children() -> usize {
    MAX_COMPARISON_CHILDREN
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for TabPreferences {
    fn default() -> Self {
        Self {
            max_comparison_children: default_max_children(),
            history_limit: default_history_limit(),
        }
    }
}

impl TabPreferences {
    fn sanitize(&mut self) {
        self.max_comparison_children = self
            .max_comparison_children
            .clamp(2, MAX_COMPARISON_CHILDREN);
        if self.history_limit == 0 {
            self.history_limit = default_history_limit();
        }
        self.history_limit = self.history_limit.min(1_000);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPreferences {
    #[serde(default = "default_persist_delay")]
    pub persist_delay_ms: u64,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

fn default_persist_delay() -> u64 {
    DEFAULT_PERSIST_DELAY_MS
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for SessionPreferences {
    fn default() -> Self {
        Self {
            persist_delay_ms: default_persist_delay(),
            storage_key: default_storage_key(),
        }
    }
}

impl SessionPreferences {
    fn sanitize(&mut self) {
        if self.persist_delay_ms == 0 {
            self.persist_delay_ms = default_persist_delay();
        }
        self.persist_delay_ms = self.persist_delay_ms.min(10_000);
        if self.storage_key.trim().is_empty() {
            self.storage_key = default_storage_key();
        }
    }
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: ViewerPreferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: ViewerPreferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = ViewerPreferences::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| PreferencesError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: ViewerPreferences =
            serde_json::from_str(&contents).map_err(|source| PreferencesError::Parse {
                path: path.clone(),
                source,
            })?;
        if data.version < PREFERENCES_VERSION {
            info!(from = data.version, to = PREFERENCES_VERSION, "upgrading preferences");
        }
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn preferences(&self) -> &ViewerPreferences {
        &self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), PreferencesError>
    where
        F: FnMut(&mut ViewerPreferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn overwrite(&mut self, preferences: ViewerPreferences) -> Result<(), PreferencesError> {
        self.data = preferences;
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            PreferencesError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
