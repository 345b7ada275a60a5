use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup tool {0:?} not found on PATH")]
    BackupToolMissing(String),

    #[error("repository initialization failed: {0}")]
    BackupInitFailed(String),

    #[error("backup subprocess failed: {0}")]
    BackupFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BackupError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            return BackupError::BackupToolMissing(e.to_string());
        }
        BackupError::Io(e.to_string())
    }
}
