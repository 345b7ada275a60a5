//! Consent manager (spec.md §4.3): owns the `requests/` and `deletions/`
//! stores and layers request-creation and terminal-approval semantics on top
//! of `airgapper_store::RequestStore`'s generic expiry/quorum machinery.

pub mod error;

pub use error::ConsensusError;

use std::path::Path;

use airgapper_core::{DeletionRequest, DeletionType, RequestStatus, RestoreRequest, Timestamp};
use airgapper_store::RequestStore;
use tracing::info;

pub struct ConsentManager {
    restores: RequestStore<RestoreRequest>,
    deletions: RequestStore<DeletionRequest>,
}

impl ConsentManager {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, ConsensusError> {
        let data_dir = data_dir.as_ref();
        Ok(Self {
            restores: RequestStore::new(data_dir.join("requests"))?,
            deletions: RequestStore::new(data_dir.join("deletions"))?,
        })
    }

    // ── Restore requests ─────────────────────────────────────────────────────

    /// Legacy SSS mode: interpreted as 2-of-2 (spec.md §4.3).
    pub fn create_restore_request(
        &self,
        requester: String,
        snapshot_id: String,
        reason: String,
        paths: Vec<String>,
        now: Timestamp,
    ) -> Result<RestoreRequest, ConsensusError> {
        let req = RestoreRequest::new_legacy(requester, snapshot_id, reason, paths, now);
        self.restores.save(&req)?;
        info!(id = %req.id, "restore request created (legacy)");
        Ok(req)
    }

    pub fn create_restore_request_with_consensus(
        &self,
        requester: String,
        snapshot_id: String,
        reason: String,
        paths: Vec<String>,
        required_approvals: usize,
        now: Timestamp,
    ) -> Result<RestoreRequest, ConsensusError> {
        let req = RestoreRequest::new_consensus(requester, snapshot_id, reason, paths, required_approvals, now);
        self.restores.save(&req)?;
        info!(id = %req.id, required_approvals, "restore request created (consensus)");
        Ok(req)
    }

    pub fn get_restore_request(&self, id: &str, now: Timestamp) -> Result<RestoreRequest, ConsensusError> {
        Ok(self.restores.get(id, now)?)
    }

    pub fn list_restore_requests(&self) -> Result<Vec<RestoreRequest>, ConsensusError> {
        Ok(self.restores.list()?)
    }

    pub fn list_pending_restore_requests(&self) -> Result<Vec<RestoreRequest>, ConsensusError> {
        Ok(self.restores.list_pending()?)
    }

    /// Legacy SSS terminal approval: releases the peer's share into the
    /// request record (spec.md §4.3 "Approve").
    pub fn approve_restore(
        &self,
        id: &str,
        approver: &str,
        share_data: Vec<u8>,
        now: Timestamp,
    ) -> Result<RestoreRequest, ConsensusError> {
        let mut req = self.restores.get(id, now)?;
        if req.status != RequestStatus::Pending {
            return Err(airgapper_store::StoreError::NotPending.into());
        }
        if now > req.expires_at {
            return Err(airgapper_store::StoreError::Expired.into());
        }
        req.status = RequestStatus::Approved;
        req.approved_at = Some(now);
        req.approved_by = Some(approver.to_string());
        req.share_data = Some(share_data);
        self.restores.save(&req)?;
        info!(id, approver, "restore approved (legacy share release)");
        Ok(req)
    }

    /// Consensus terminal step: append a verified Ed25519 signature. The
    /// caller (the orchestrator) is responsible for verifying the signature
    /// before calling this — the store accepts any bytes (spec.md §4.4).
    pub fn add_restore_signature(
        &self,
        id: &str,
        key_holder_id: &str,
        key_holder_name: &str,
        signature: Vec<u8>,
        now: Timestamp,
    ) -> Result<RestoreRequest, ConsensusError> {
        Ok(self.restores.add_approval(id, key_holder_id, key_holder_name, signature, now)?)
    }

    pub fn deny_restore(&self, id: &str, now: Timestamp) -> Result<RestoreRequest, ConsensusError> {
        Ok(self.restores.deny(id, now)?)
    }

    // ── Deletion requests ────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn create_deletion_request(
        &self,
        requester: String,
        deletion_type: DeletionType,
        snapshot_id: Option<String>,
        paths: Vec<String>,
        reason: String,
        required_approvals: usize,
        now: Timestamp,
    ) -> Result<DeletionRequest, ConsensusError> {
        let req = DeletionRequest::new(requester, deletion_type, snapshot_id, paths, reason, required_approvals, now);
        self.deletions.save(&req)?;
        info!(id = %req.id, ?deletion_type, "deletion request created");
        Ok(req)
    }

    pub fn get_deletion_request(&self, id: &str, now: Timestamp) -> Result<DeletionRequest, ConsensusError> {
        Ok(self.deletions.get(id, now)?)
    }

    pub fn list_pending_deletion_requests(&self) -> Result<Vec<DeletionRequest>, ConsensusError> {
        Ok(self.deletions.list_pending()?)
    }

    pub fn add_deletion_approval(
        &self,
        id: &str,
        key_holder_id: &str,
        key_holder_name: &str,
        signature: Vec<u8>,
        now: Timestamp,
    ) -> Result<DeletionRequest, ConsensusError> {
        Ok(self.deletions.add_approval(id, key_holder_id, key_holder_name, signature, now)?)
    }

    /// Approve a deletion request as a named signer (e.g. a key holder, or
    /// the synthetic "emergency-policy" signer used by auto-approval).
    pub fn approve_deletion(
        &self,
        id: &str,
        approver: &str,
        now: Timestamp,
    ) -> Result<DeletionRequest, ConsensusError> {
        let mut req = self.deletions.get(id, now)?;
        if req.status != RequestStatus::Pending {
            return Err(airgapper_store::StoreError::NotPending.into());
        }
        req.status = RequestStatus::Approved;
        req.approved_at = Some(now);
        req.approved_by = Some(approver.to_string());
        self.deletions.save(&req)?;
        info!(id, approver, "deletion approved");
        Ok(req)
    }

    pub fn deny_deletion(&self, id: &str, now: Timestamp) -> Result<DeletionRequest, ConsensusError> {
        Ok(self.deletions.deny(id, now)?)
    }

    /// Mark a deletion as physically executed; requires `status = Approved`
    /// (spec.md §3 DeletionRequest invariant).
    pub fn mark_deletion_executed(&self, id: &str, now: Timestamp) -> Result<DeletionRequest, ConsensusError> {
        let mut req = self.deletions.get(id, now)?;
        req.mark_executed(now)
            .map_err(ConsensusError::InvalidParameter)?;
        self.deletions.save(&req)?;
        info!(id, "deletion marked executed");
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_manager() -> (tempfile::TempDir, ConsentManager) {
        let dir = tempdir().unwrap();
        let mgr = ConsentManager::open(dir.path()).unwrap();
        (dir, mgr)
    }

    #[test]
    fn legacy_sss_happy_path() {
        let (_dir, mgr) = new_manager();
        let req = mgr
            .create_restore_request("alice".into(), "latest".into(), "lost files".into(), vec![], 1000)
            .unwrap();
        assert_eq!(req.status, RequestStatus::Pending);
        assert_eq!(req.expires_at, req.created_at + airgapper_core::RESTORE_REQUEST_TTL_SECS);

        let approved = mgr.approve_restore(&req.id, "bob", vec![9, 9, 9], 1001).unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.share_data, Some(vec![9, 9, 9]));
    }

    #[test]
    fn consensus_quorum_then_third_signer_rejected() {
        let (_dir, mgr) = new_manager();
        let req = mgr
            .create_restore_request_with_consensus("alice".into(), "latest".into(), "r".into(), vec![], 2, 1000)
            .unwrap();

        let first = mgr.add_restore_signature(&req.id, "kid1", "Bob", vec![1], 1001).unwrap();
        assert_eq!(first.status, RequestStatus::Pending);

        let second = mgr.add_restore_signature(&req.id, "kid2", "Carol", vec![2], 1002).unwrap();
        assert_eq!(second.status, RequestStatus::Approved);

        let third = mgr.add_restore_signature(&req.id, "kid3", "Dave", vec![3], 1003);
        assert!(matches!(third, Err(ConsensusError::Store(airgapper_store::StoreError::NotPending))));
    }

    #[test]
    fn duplicate_signer_rejected() {
        let (_dir, mgr) = new_manager();
        let req = mgr
            .create_restore_request_with_consensus("alice".into(), "latest".into(), "r".into(), vec![], 2, 1000)
            .unwrap();
        mgr.add_restore_signature(&req.id, "kid1", "Bob", vec![1], 1001).unwrap();
        let err = mgr.add_restore_signature(&req.id, "kid1", "Bob", vec![9], 1002).unwrap_err();
        assert!(matches!(err, ConsensusError::Store(airgapper_store::StoreError::AlreadyApproved(_))));
    }

    #[test]
    fn deletion_lifecycle() {
        let (_dir, mgr) = new_manager();
        let req = mgr
            .create_deletion_request(
                "alice".into(),
                DeletionType::Snapshot,
                Some("snap1".into()),
                vec![],
                "cleanup".into(),
                1,
                1000,
            )
            .unwrap();
        assert_eq!(req.expires_at, req.created_at + airgapper_core::DELETION_REQUEST_TTL_SECS);

        let approved = mgr.approve_deletion(&req.id, "bob", 1001).unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);

        let executed = mgr.mark_deletion_executed(&req.id, 1002).unwrap();
        assert_eq!(executed.executed_at, Some(1002));
    }

    #[test]
    fn mark_executed_before_approval_fails() {
        let (_dir, mgr) = new_manager();
        let req = mgr
            .create_deletion_request(
                "alice".into(),
                DeletionType::Prune,
                None,
                vec![],
                "reason".into(),
                1,
                1000,
            )
            .unwrap();
        assert!(mgr.mark_deletion_executed(&req.id, 1001).is_err());
    }

    #[test]
    fn expiry_then_denial_attempt_fails() {
        let (_dir, mgr) = new_manager();
        let req = mgr
            .create_restore_request("alice".into(), "latest".into(), "r".into(), vec![], 1000)
            .unwrap();
        let past_expiry = req.expires_at + 1;
        let reloaded = mgr.get_restore_request(&req.id, past_expiry).unwrap();
        assert_eq!(reloaded.status, RequestStatus::Expired);
        assert!(mgr.deny_restore(&req.id, past_expiry).is_err());
    }
}
