use std::collections::BTreeMap;

use rustic_viewer_core::{PanOffset, TabId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;

/// Current session format version.
pub const SESSION_FORMAT_VERSION: u64 = 2;
/// Legacy format storing directory plus index instead of a path.
pub const LEGACY_FORMAT_VERSION: u64 = 1;

const REQUIRED_FIELDS: [&str; 4] = ["tabOrder", "activeTabId", "singleTabs", "comparisonTabs"];

/// Persisted session in the current (V2) format.
/// 目前格式（V2）的工作階段紀錄。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub version: u64,
    pub tab_order: Vec<TabId>,
    pub active_tab_id: TabId,
    pub comparison_tabs: BTreeMap<TabId, PersistedComparisonTab>,
    pub single_tabs: BTreeMap<TabId, ReducedSingleTab>,
}

/// Comparison tab as stored on disk.
/// 儲存於磁碟的比較標籤。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedComparisonTab {
    pub id: TabId,
    #[serde(default)]
    pub children: Vec<TabId>,
    #[serde(default)]
    pub active_slot_index: usize,
}

/// Single tab reduced to the path it shows; the listing is rebuilt on load.
/// 只保留影像路徑的單一標籤；影像清單於載入時重建。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducedSingleTab {
    #[serde(default)]
    pub parent_id: Option<TabId>,
    #[serde(default)]
    pub raw_path: String,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub pan_offset: PanOffset,
}

/// Persisted session in the legacy (V1) format.
/// 舊版（V1）格式的工作階段紀錄。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSessionV1 {
    pub version: u64,
    pub tab_order: Vec<TabId>,
    pub active_tab_id: TabId,
    pub comparison_tabs: BTreeMap<TabId, PersistedComparisonTab>,
    pub single_tabs: BTreeMap<TabId, LegacySingleTab>,
}

/// Legacy single tab addressed by directory and index.
/// 以目錄與索引描述的舊版單一標籤。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySingleTab {
    #[serde(default)]
    pub parent_id: Option<TabId>,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub current_index: i64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub pan_offset: PanOffset,
}

fn default_zoom() -> f64 {
    1.0
}

/// Stored payload after version detection.
/// 判斷版本後的儲存內容。
#[derive(Debug, Clone, PartialEq)]
pub enum StoredSession {
    Current(PersistedSession),
    Legacy(PersistedSessionV1),
}

impl StoredSession {
    pub fn version(&self) -> u64 {
        match self {
            StoredSession::Current(session) => session.version,
            StoredSession::Legacy(session) => session.version,
        }
    }
}

/// Parses a raw payload, detecting its schema version and required fields.
/// 解析原始內容並檢查版本與必要欄位。
pub fn decode(raw: &str) -> Result<StoredSession, SessionError> {
    let value: Value = serde_json::from_str(raw)?;
    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or(SessionError::MissingVersion)?;
    if version != LEGACY_FORMAT_VERSION && version != SESSION_FORMAT_VERSION {
        return Err(SessionError::UnsupportedVersion(version));
    }
    for field in REQUIRED_FIELDS {
        if value.get(field).map_or(true, Value::is_null) {
            return Err(SessionError::MissingField(field));
        }
    }

    if version == LEGACY_FORMAT_VERSION {
        Ok(StoredSession::Legacy(serde_json::from_value(value)?))
    } else {
        Ok(StoredSession::Current(serde_json::from_value(value)?))
    }
}

/// Serializes a session in the current format.
/// 以目前格式序列化工作階段。
pub fn encode(session: &PersistedSession) -> Result<String, SessionError> {
    Ok(serde_json::to_string(session)?)
}
