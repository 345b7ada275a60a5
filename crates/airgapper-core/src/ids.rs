//! ID generation helpers shared by requests and deletions.

use rand::RngCore;

/// Generate a random 16-hex-character ID (8 random bytes, hex-encoded).
///
/// Used for `RestoreRequest::id` and `DeletionRequest::id` (spec.md §3).
pub fn random_id_hex() -> String {
    let mut bytes = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_id_is_16_hex_chars() {
        let id = random_id_hex();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn random_ids_are_distinct() {
        let a = random_id_hex();
        let b = random_id_hex();
        assert_ne!(a, b);
    }
}
