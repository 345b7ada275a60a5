//! The bundle of `Config` fields that get moved into `EncryptedSecrets`
//! when at-rest encryption is enabled (spec.md §4.5).

use airgapper_core::Config;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::ConfigError;

#[derive(Default, Serialize, Deserialize)]
struct SecretBundle {
    password: Option<String>,
    private_key: Option<Vec<u8>>,
    local_share: Option<Vec<u8>>,
    api_key: Option<String>,
}

impl Drop for SecretBundle {
    fn drop(&mut self) {
        if let Some(pw) = self.password.as_mut() {
            pw.zeroize();
        }
        if let Some(pk) = self.private_key.as_mut() {
            pk.zeroize();
        }
        if let Some(share) = self.local_share.as_mut() {
            share.zeroize();
        }
        if let Some(key) = self.api_key.as_mut() {
            key.zeroize();
        }
    }
}

/// Move `config`'s secret fields into `config.encrypted_secrets`, encrypted
/// under `passphrase`, clearing the plaintext copies.
pub fn encrypt_in_place(config: &mut Config, passphrase: &str) -> Result<(), ConfigError> {
    let bundle = SecretBundle {
        password: config.repository.password.take(),
        private_key: config.private_key.take(),
        local_share: config.local_share.take(),
        api_key: config.repository.api_key.take(),
    };
    let plaintext = serde_json::to_vec(&bundle)?;
    let record = airgapper_crypto::at_rest::encrypt(&plaintext, passphrase)?;
    config.encrypted_secrets = Some(record);
    Ok(())
}

/// Decrypt `config.encrypted_secrets` under `passphrase` and populate the
/// plaintext fields for in-memory use; the encrypted bundle is left intact
/// on disk so `save` keeps writing the encrypted form.
pub fn decrypt_in_place(config: &mut Config, passphrase: &str) -> Result<(), ConfigError> {
    let record = config
        .encrypted_secrets
        .as_ref()
        .ok_or(ConfigError::NotEncrypted)?;
    let plaintext = airgapper_crypto::at_rest::decrypt(record, passphrase)?;
    let bundle: SecretBundle = serde_json::from_slice(&plaintext)?;
    config.repository.password = bundle.password.clone();
    config.private_key = bundle.private_key.clone();
    config.local_share = bundle.local_share.clone();
    config.repository.api_key = bundle.api_key.clone();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips_secret_fields() {
        let mut config = Config {
            name: "node-a".into(),
            ..Default::default()
        };
        config.repository.password = Some("hunter2".into());
        config.private_key = Some(vec![1, 2, 3, 4]);
        config.local_share = Some(vec![9, 9]);
        config.repository.api_key = Some("ak_live_123".into());

        encrypt_in_place(&mut config, "passphrase").unwrap();
        assert!(config.repository.password.is_none());
        assert!(config.private_key.is_none());
        assert!(config.local_share.is_none());
        assert!(config.repository.api_key.is_none());
        assert!(config.encrypted_secrets.is_some());

        decrypt_in_place(&mut config, "passphrase").unwrap();
        assert_eq!(config.repository.password.as_deref(), Some("hunter2"));
        assert_eq!(config.private_key, Some(vec![1, 2, 3, 4]));
        assert_eq!(config.local_share, Some(vec![9, 9]));
        assert_eq!(config.repository.api_key.as_deref(), Some("ak_live_123"));
    }

    #[test]
    fn decrypt_without_encrypted_secrets_fails() {
        let mut config = Config::default();
        let err = decrypt_in_place(&mut config, "whatever").unwrap_err();
        assert!(matches!(err, ConfigError::NotEncrypted));
    }

    #[test]
    fn wrong_passphrase_fails_decryption() {
        let mut config = Config::default();
        config.repository.password = Some("secret".into());
        encrypt_in_place(&mut config, "right").unwrap();
        let err = decrypt_in_place(&mut config, "wrong").unwrap_err();
        assert!(matches!(err, ConfigError::Crypto(_)));
    }
}
