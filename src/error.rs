use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaskboardError>;

#[derive(Debug, Error)]
pub enum TaskboardError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} index {index} out of range (len {len})")]
    IndexOutOfRange {
        entity: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Edited card no longer exists at its original position")]
    StaleReference,

    #[error("Cannot delete the last remaining board")]
    LastBoard,

    #[error("No card edit session is open")]
    SessionClosed,

    #[error("Malformed backup: {0}")]
    MalformedBackup(String),

    #[error("Unsupported backup format version {found} (supported: 1..={supported})")]
    VersionMismatch { found: i64, supported: u32 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage quota exceeded: {needed} bytes needed, {quota} bytes allowed")]
    QuotaExceeded { needed: u64, quota: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TaskboardError {
    pub(crate) fn out_of_range(entity: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { entity, index, len }
    }

    pub(crate) fn malformed(path: &str, problem: impl std::fmt::Display) -> Self {
        Self::MalformedBackup(format!("{}: {}", path, problem))
    }
}
