use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error(transparent)]
    Store(#[from] airgapper_store::StoreError),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
