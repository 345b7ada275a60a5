use crate::types::{Approval, RequestStatus, Timestamp};

/// Capability set shared by `RestoreRequest` and `DeletionRequest` (spec.md §4.2, §9).
///
/// `airgapper-store`'s generic request store is written against this trait
/// rather than against either concrete record type, so the same expiry,
/// approval-accumulation, and quorum-detection logic serves both.
pub trait ApprovalRecord {
    fn id(&self) -> &str;
    fn status(&self) -> RequestStatus;
    fn set_status(&mut self, status: RequestStatus);
    fn expires_at(&self) -> Timestamp;
    fn approvals(&self) -> &[Approval];
    fn push_approval(&mut self, approval: Approval);
    fn required_approvals(&self) -> usize;
}
