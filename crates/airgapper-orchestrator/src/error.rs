use thiserror::Error;

/// Aggregates every downstream error kind behind one type, per spec.md §7:
/// "deepest component classifies; outer layers wrap with context strings but
/// do not change kind." Role/precondition checks are classified by
/// `airgapper_core::CoreError` and forwarded unchanged here; every other
/// variant forwards a downstream crate's own error kind.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Core(#[from] airgapper_core::CoreError),

    #[error(transparent)]
    Config(#[from] airgapper_config::ConfigError),

    #[error(transparent)]
    Consensus(#[from] airgapper_consensus::ConsensusError),

    #[error(transparent)]
    Store(#[from] airgapper_store::error::StoreError),

    #[error(transparent)]
    Backup(#[from] airgapper_backup::BackupError),

    #[error(transparent)]
    Crypto(#[from] airgapper_crypto::CryptoError),

    #[error(transparent)]
    Sss(#[from] airgapper_sss::SssError),

    #[error(transparent)]
    Emergency(#[from] airgapper_emergency::EmergencyError),
}
