pub mod error;
pub mod ids;
pub mod record;
pub mod types;

pub use error::CoreError;
pub use ids::random_id_hex;
pub use record::ApprovalRecord;
pub use types::*;
