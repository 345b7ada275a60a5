use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid public key bytes")]
    InvalidPublicKey,

    #[error("invalid private key bytes")]
    InvalidPrivateKey,

    #[error("invalid signature bytes")]
    InvalidSignature,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("bad passphrase or corrupted ciphertext")]
    BadPassphraseOrCorrupted,

    #[error("unsupported encrypted-secrets version: {0}")]
    UnsupportedVersion(u8),

    #[error("malformed encrypted-secrets encoding: {0}")]
    MalformedEncoding(String),
}
