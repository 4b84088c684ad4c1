/// Failure to read the persisted history store.
///
/// Never fatal: a missing or corrupt store is a cold-start condition.
/// Callers recover by warning and continuing with an empty history.
#[derive(Debug, thiserror::Error)]
pub enum StoreLoadError {
    #[error("could not read history store: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but is not a valid history document.
    #[error("history store is malformed: {0}")]
    Malformed(String),
}

/// Failure to write the history store back to disk.
///
/// Fatal for the run. Writes go through a temp file and an atomic
/// rename, so the previously persisted store is still intact.
#[derive(Debug, thiserror::Error)]
pub enum StorePersistError {
    #[error("could not write history store: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize history store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure to append an entry to the change log.
///
/// Surfaced as a warning. A broken log must not block persisting the
/// updated history store.
#[derive(Debug, thiserror::Error)]
pub enum LogWriteError {
    #[error("could not append to change log: {0}")]
    Io(#[from] std::io::Error),
}
