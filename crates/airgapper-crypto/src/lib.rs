pub mod at_rest;
pub mod error;
pub mod keypair;
pub mod password;
pub mod signing;

pub use error::CryptoError;
pub use keypair::{key_id, public_key_from_slice, verify, KeyPair};
pub use password::generate_repository_password;
pub use signing::canonical_restore_signing_input;
