use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// An Ed25519 keypair (spec.md §4.4).
///
/// The signing (private) key is wrapped in `Zeroizing` so its bytes are
/// wiped on drop, mirroring how the teacher protocol wipes its Dilithium
/// secret keys (`chronx_crypto::KeyPair`).
pub struct KeyPair {
    signing_key: Zeroizing<[u8; 32]>,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a fresh Ed25519 keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key: Zeroizing::new(signing_key.to_bytes()),
            verifying_key,
        }
    }

    /// Restore a keypair from a raw 32-byte signing key (e.g. loaded from config).
    pub fn from_bytes(signing_key_bytes: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&signing_key_bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key: Zeroizing::new(signing_key_bytes),
            verifying_key,
        }
    }

    /// Raw 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Raw 32-byte private key. Callers must not persist this other than
    /// into the process-local, permission-restricted config store.
    pub fn private_key_bytes(&self) -> [u8; 32] {
        *self.signing_key
    }

    /// Sign `message` with this keypair's private key.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signing_key = SigningKey::from_bytes(&self.signing_key);
        signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ public_key: {} }}", hex::encode(self.public_key_bytes()))
    }
}

/// Verify a 64-byte Ed25519 signature of `message` under `public_key`.
///
/// Returns `false` (not an error) for malformed key/signature bytes, as well
/// as for a genuine verification failure — callers must reject unverified
/// signatures before accumulating them (spec.md §4.4).
pub fn verify(public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig_bytes: [u8; 64] = match signature.try_into() {
        Ok(b) => b,
        Err(_) => return false,
    };
    let signature = Signature::from_bytes(&sig_bytes);
    verifying_key.verify(message, &signature).is_ok()
}

/// Derive a `KeyHolder`'s stable ID: the first 16 hex characters of
/// SHA-256(public_key) (spec.md §4.4, §8 property 5).
pub fn key_id(public_key: &[u8; 32]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(digest)[..16].to_string()
}

/// Parse a 32-byte public key from a slice, rejecting any other length.
pub fn public_key_from_slice(bytes: &[u8]) -> Result<[u8; 32], CryptoError> {
    bytes.try_into().map_err(|_| CryptoError::InvalidPublicKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = KeyPair::generate();
        let msg = b"restore request transcript";
        let sig = kp.sign(msg);
        assert!(verify(&kp.public_key_bytes(), msg, &sig));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"original");
        assert!(!verify(&kp.public_key_bytes(), b"tampered", &sig));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let sig = a.sign(b"message");
        assert!(!verify(&b.public_key_bytes(), b"message", &sig));
    }

    #[test]
    fn verify_rejects_malformed_signature() {
        let kp = KeyPair::generate();
        assert!(!verify(&kp.public_key_bytes(), b"message", &[0u8; 10]));
    }

    #[test]
    fn key_id_is_pure_function_of_public_key() {
        let kp = KeyPair::generate();
        let id1 = key_id(&kp.public_key_bytes());
        let id2 = key_id(&kp.public_key_bytes());
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 16);
    }

    #[test]
    fn key_id_differs_across_distinct_keys() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(key_id(&a.public_key_bytes()), key_id(&b.public_key_bytes()));
    }

    #[test]
    fn restore_from_bytes_reproduces_same_public_key() {
        let kp = KeyPair::generate();
        let restored = KeyPair::from_bytes(kp.private_key_bytes());
        assert_eq!(kp.public_key_bytes(), restored.public_key_bytes());
    }
}
