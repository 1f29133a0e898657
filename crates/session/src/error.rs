use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for session persistence.
/// 工作階段持久化時可能出現的錯誤。
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid session payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("invalid session format: missing version")]
    MissingVersion,
    #[error("unsupported session version {0}")]
    UnsupportedVersion(u64),
    #[error("invalid session format: missing required field `{0}`")]
    MissingField(&'static str),
}
