use thiserror::Error;

#[derive(Debug, Error)]
pub enum SssError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
