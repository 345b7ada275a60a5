use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("node is not initialized: {0} does not exist")]
    NotInitialized(String),

    #[error("node is already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("config is not encrypted at rest")]
    NotEncrypted,

    #[error(transparent)]
    Crypto(#[from] airgapper_crypto::CryptoError),

    #[error("malformed config: {0}")]
    Serde(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Serde(e.to_string())
    }
}
