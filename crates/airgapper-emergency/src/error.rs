use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmergencyError {
    #[error("override feature is not enabled")]
    OverrideDisabled,

    #[error("invalid override key")]
    InvalidOverrideKey,

    #[error("override type {0:?} is not in the allowed list")]
    OverrideTypeNotAllowed(String),

    #[error("a non-empty reason is required for this override")]
    ReasonRequired,

    #[error("override is in cooldown for another {0} minute(s)")]
    CooldownActive(u32),

    #[error(transparent)]
    Consensus(#[from] airgapper_consensus::ConsensusError),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EmergencyError {
    fn from(e: std::io::Error) -> Self {
        EmergencyError::Io(e.to_string())
    }
}
