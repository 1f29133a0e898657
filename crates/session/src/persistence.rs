use std::sync::Arc;

use rustic_viewer_core::{DirectoryLister, TabLimits, TabState};
use tracing::{debug, error, info, warn};

use crate::error::SessionError;
use crate::migrate::migrate_v1_to_v2;
use crate::rehydrate::{reduce, rehydrate};
use crate::schema::{decode, encode, PersistedSession, StoredSession};
use crate::storage::SessionStorage;

/// Reads, migrates, restores and writes the tab session under a fixed key.
/// 以固定鍵讀取、遷移、還原與寫入標籤工作階段。
#[derive(Clone)]
pub struct SessionPersistence {
    storage: Arc<dyn SessionStorage>,
    lister: Arc<dyn DirectoryLister>,
    key: String,
    limits: TabLimits,
}

impl std::fmt::Debug for SessionPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPersistence")
            .field("key", &self.key)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl SessionPersistence {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        lister: Arc<dyn DirectoryLister>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            lister,
            key: key.into(),
            limits: TabLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: TabLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn lister(&self) -> &Arc<dyn DirectoryLister> {
        &self.lister
    }

    /// Reads and decodes the stored payload without migrating it.
    /// 讀取並解碼儲存內容（不進行遷移）。
    pub fn read_stored(&self) -> Result<Option<StoredSession>, SessionError> {
        match self.storage.read(&self.key)? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Loads the session in the current format, migrating and writing back legacy payloads.
    /// 載入目前格式的工作階段；舊版內容會先遷移並寫回。
    pub async fn try_parse_session(&self) -> Result<Option<PersistedSession>, SessionError> {
        match self.read_stored()? {
            None => Ok(None),
            Some(StoredSession::Current(session)) => Ok(Some(session)),
            Some(StoredSession::Legacy(legacy)) => {
                info!(key = %self.key, "migrating session from V1 to V2");
                let migrated = migrate_v1_to_v2(self.lister.as_ref(), legacy).await;
                let written = encode(&migrated).and_then(|raw| self.storage.write(&self.key, &raw));
                if let Err(err) = written {
                    warn!(key = %self.key, error = %err, "failed to write back migrated session");
                }
                Ok(Some(migrated))
            }
        }
    }

    /// Fail-soft variant of [`SessionPersistence::try_parse_session`]: every problem is
    /// logged and reported as "no session".
    pub async fn parse_session(&self) -> Option<PersistedSession> {
        match self.try_parse_session().await {
            Ok(session) => session,
            Err(err) => {
                error!(key = %self.key, error = %err, "failed to parse stored session");
                None
            }
        }
    }

    /// Restores the live tab state, or `None` when no usable session exists.
    /// 還原標籤狀態；若沒有可用的工作階段則回傳 `None`。
    pub async fn load_state(&self) -> Option<TabState> {
        let session = self.parse_session().await?;
        let (state, violations) = rehydrate(self.lister.as_ref(), session, self.limits).await;
        for violation in &violations {
            warn!(key = %self.key, %violation, "repaired inconsistent session");
        }
        debug!(tabs = state.len(), "session restored");
        Some(state)
    }

    /// Serializes and writes the state. An empty state writes nothing.
    /// 序列化並寫入狀態。
    pub fn try_save_session(&self, state: &TabState) -> Result<bool, SessionError> {
        let session = match reduce(state) {
            Some(session) => session,
            None => {
                debug!(key = %self.key, "skipping save of empty tab state");
                return Ok(false);
            }
        };
        self.storage.write(&self.key, &encode(&session)?)?;
        debug!(key = %self.key, tabs = session.tab_order.len(), "session saved");
        Ok(true)
    }

    /// Writes the state, logging and swallowing failures.
    /// 寫入狀態；失敗時僅記錄。
    pub fn save_session(&self, state: &TabState) {
        if let Err(err) = self.try_save_session(state) {
            error!(key = %self.key, error = %err, "failed to save session");
        }
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        self.storage.remove(&self.key)
    }
}
