//! At-rest encryption for designated secret fields (spec.md §4.5):
//! `password`, `private_key`, `local_share`, `api_key`.
//!
//! Key derivation is Argon2id (time=3, memory=64 MiB, parallelism=4,
//! keylen=32) over a fresh 16-byte salt per encryption, following the same
//! parametrization idiom as `shield-messenger::crypto::backup`'s
//! password-backup module (time=4, 64 MiB, parallelism=2) — the cost
//! parameters differ only because spec.md fixes its own numbers. The cipher
//! is AES-256-GCM with a fresh 12-byte nonce per encryption and no
//! associated data.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use airgapper_core::EncryptedSecrets;

use crate::error::CryptoError;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const ENCRYPTED_SECRETS_VERSION: u8 = 1;

const ARGON2_TIME_COST: u32 = 3;
const ARGON2_MEM_COST_KIB: u32 = 64 * 1024; // 64 MiB
const ARGON2_PARALLELISM: u32 = 4;

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let params = Params::new(ARGON2_MEM_COST_KIB, ARGON2_TIME_COST, ARGON2_PARALLELISM, Some(KEY_LEN))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, key.as_mut())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Encrypt `plaintext` under `passphrase`, returning the versioned,
/// base64-encoded record persisted as `Config::encrypted_secrets`.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<EncryptedSecrets, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref()).expect("key is exactly 32 bytes");
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::BadPassphraseOrCorrupted)?;

    Ok(EncryptedSecrets {
        version: ENCRYPTED_SECRETS_VERSION,
        salt: B64.encode(salt),
        nonce: B64.encode(nonce_bytes),
        ciphertext: B64.encode(ciphertext),
    })
}

/// Decrypt a previously-encrypted record. Fails uniformly with
/// `BadPassphraseOrCorrupted` on any authentication failure — callers must
/// not reveal whether the passphrase or the ciphertext was at fault.
pub fn decrypt(record: &EncryptedSecrets, passphrase: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if record.version != ENCRYPTED_SECRETS_VERSION {
        return Err(CryptoError::UnsupportedVersion(record.version));
    }
    let salt = B64
        .decode(&record.salt)
        .map_err(|e| CryptoError::MalformedEncoding(e.to_string()))?;
    let nonce_bytes = B64
        .decode(&record.nonce)
        .map_err(|e| CryptoError::MalformedEncoding(e.to_string()))?;
    let ciphertext = B64
        .decode(&record.ciphertext)
        .map_err(|e| CryptoError::MalformedEncoding(e.to_string()))?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(CryptoError::MalformedEncoding("nonce must be 12 bytes".into()));
    }

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref()).expect("key is exactly 32 bytes");
    let nonce = Nonce::from_slice(&nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map_err(|_| CryptoError::BadPassphraseOrCorrupted)?;

    Ok(Zeroizing::new(plaintext))
}
