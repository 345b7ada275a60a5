use rand::RngCore;
use zeroize::Zeroizing;

/// Generate a fresh repository password: 32 bytes of CSPRNG output,
/// hex-encoded to 64 characters (spec.md §9). Callers must not attempt
/// entropy reduction (e.g. truncating or re-deriving from a shorter seed).
pub fn generate_repository_password() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; 32]);
    rand::rngs::OsRng.fill_bytes(bytes.as_mut());
    Zeroizing::new(hex::encode(bytes.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_64_hex_chars() {
        let pw = generate_repository_password();
        assert_eq!(pw.len(), 64);
        assert!(pw.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn passwords_are_distinct() {
        assert_ne!(
            generate_repository_password().as_str(),
            generate_repository_password().as_str()
        );
    }
}
