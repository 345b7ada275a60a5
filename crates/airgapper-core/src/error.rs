use thiserror::Error;

/// Error kinds shared across the core (spec.md §7).
///
/// Deepest component classifies; outer layers wrap with context but never
/// change kind — `airgapper-orchestrator::OrchestratorError` re-exports these
/// alongside its own downstream-error wrapping.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no configuration present")]
    NotInitialized,

    #[error("configuration already present")]
    AlreadyInitialized,

    #[error("operation requires the owner role")]
    NotOwner,

    #[error("operation requires the host role")]
    NotHost,

    #[error("no repository password available")]
    NoPassword,

    #[error("no private key available")]
    NoPrivateKey,

    #[error("no local share available")]
    NoShare,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("request not found: {0}")]
    RequestNotFound(String),

    #[error("request is not pending")]
    RequestNotPending,

    #[error("request expired")]
    RequestExpired,

    #[error("request has not been approved")]
    RequestNotApproved,

    #[error("key holder {0} has already approved this request")]
    AlreadyApproved(String),

    #[error("the external backup tool is not installed")]
    BackupToolMissing,

    #[error("failed to initialize the backup repository: {0}")]
    BackupInitFailed(String),

    #[error("backup subprocess failed: {0}")]
    BackupFailed(String),

    #[error("bad passphrase or corrupted ciphertext")]
    BadPassphraseOrCorrupted,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Io(e.to_string())
    }
}
