use serde::{Deserialize, Serialize};

use crate::record::ApprovalRecord;

/// Unix timestamp, seconds, UTC.
pub type Timestamp = i64;

pub const RESTORE_REQUEST_TTL_SECS: i64 = 24 * 3600;
pub const DELETION_REQUEST_TTL_SECS: i64 = 7 * 24 * 3600;

// ── Role ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Host,
}

// ── Share ────────────────────────────────────────────────────────────────────

/// One piece of a Shamir-split secret (spec.md §3, §4.1).
///
/// Invariant: all shares produced by one `Split` call share `data.len()`;
/// indices within a set are distinct.
#[derive(Clone, Serialize, Deserialize)]
pub struct Share {
    /// x-coordinate, in `[1, 255]`.
    pub index: u8,
    /// One y-coordinate byte per plaintext byte.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Share {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Share {{ index: {}, data: {}b }}", self.index, self.data.len())
    }
}

impl Drop for Share {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.data.zeroize();
    }
}

// ── KeyHolder / ConsensusConfig ──────────────────────────────────────────────

/// A registered consensus participant (spec.md §3).
///
/// `id` is a pure function of `public_key` (16 hex chars of SHA-256); see
/// `airgapper_crypto::key_id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyHolder {
    pub id: String,
    pub name: String,
    pub public_key: [u8; 32],
    pub address: Option<String>,
    pub joined_at: Timestamp,
    pub is_owner: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// m — minimum signatures required.
    pub threshold: u32,
    /// n — total key holders expected.
    pub total_keys: u32,
    pub key_holders: Vec<KeyHolder>,
    pub require_approval: bool,
}

impl ConsensusConfig {
    /// `1 ≤ threshold ≤ total_keys`, `len(key_holders) ≤ total_keys`, unique ids.
    pub fn validate(&self) -> Result<(), String> {
        if self.threshold < 1 || self.threshold > self.total_keys {
            return Err(format!(
                "threshold must be between 1 and {}, got {}",
                self.total_keys, self.threshold
            ));
        }
        if self.key_holders.len() > self.total_keys as usize {
            return Err(format!(
                "too many key holders: {} > total_keys {}",
                self.key_holders.len(),
                self.total_keys
            ));
        }
        let mut ids: Vec<&str> = self.key_holders.iter().map(|k| k.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.key_holders.len() {
            return Err("duplicate key holder ids".to_string());
        }
        Ok(())
    }
}

// ── Approval / request status ───────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Approval {
    pub key_holder_id: String,
    pub key_holder_name: String,
    /// Raw Ed25519 signature bytes (64 bytes).
    pub signature: Vec<u8>,
    pub approved_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl RequestStatus {
    /// Pending is the only non-terminal status; transitions are monotone
    /// (spec.md §3 Invariants, §8 property 2).
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

// ── RestoreRequest ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestoreRequest {
    pub id: String,
    pub requester: String,
    pub snapshot_id: String,
    pub paths: Vec<String>,
    pub reason: String,
    pub status: RequestStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub approved_by: Option<String>,

    /// Legacy SSS mode: the peer share released on approval.
    pub share_data: Option<Vec<u8>>,

    /// Consensus mode: signatures accumulated toward quorum.
    pub required_approvals: usize,
    pub approvals: Vec<Approval>,
}

impl RestoreRequest {
    pub fn new_legacy(requester: String, snapshot_id: String, reason: String, paths: Vec<String>, now: Timestamp) -> Self {
        Self {
            id: crate::ids::random_id_hex(),
            requester,
            snapshot_id,
            paths,
            reason,
            status: RequestStatus::Pending,
            created_at: now,
            expires_at: now + RESTORE_REQUEST_TTL_SECS,
            approved_at: None,
            approved_by: None,
            share_data: None,
            // Legacy SSS mode is interpreted as 2-of-2 (spec.md §4.3).
            required_approvals: 2,
            approvals: Vec::new(),
        }
    }

    pub fn new_consensus(
        requester: String,
        snapshot_id: String,
        reason: String,
        paths: Vec<String>,
        required_approvals: usize,
        now: Timestamp,
    ) -> Self {
        Self {
            id: crate::ids::random_id_hex(),
            requester,
            snapshot_id,
            paths,
            reason,
            status: RequestStatus::Pending,
            created_at: now,
            expires_at: now + RESTORE_REQUEST_TTL_SECS,
            approved_at: None,
            approved_by: None,
            share_data: None,
            required_approvals,
            approvals: Vec::new(),
        }
    }
}

impl ApprovalRecord for RestoreRequest {
    fn id(&self) -> &str {
        &self.id
    }
    fn status(&self) -> RequestStatus {
        self.status
    }
    fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }
    fn expires_at(&self) -> Timestamp {
        self.expires_at
    }
    fn approvals(&self) -> &[Approval] {
        &self.approvals
    }
    fn push_approval(&mut self, approval: Approval) {
        self.approvals.push(approval);
    }
    fn required_approvals(&self) -> usize {
        self.required_approvals
    }
}

// ── DeletionRequest ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionType {
    Snapshot,
    Path,
    Prune,
    All,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub id: String,
    pub requester: String,
    pub deletion_type: DeletionType,
    pub snapshot_id: Option<String>,
    pub paths: Vec<String>,
    pub reason: String,
    pub status: RequestStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub approved_by: Option<String>,
    pub executed_at: Option<Timestamp>,

    pub required_approvals: usize,
    pub approvals: Vec<Approval>,
}

impl DeletionRequest {
    pub fn new(
        requester: String,
        deletion_type: DeletionType,
        snapshot_id: Option<String>,
        paths: Vec<String>,
        reason: String,
        required_approvals: usize,
        now: Timestamp,
    ) -> Self {
        Self {
            id: crate::ids::random_id_hex(),
            requester,
            deletion_type,
            snapshot_id,
            paths,
            reason,
            status: RequestStatus::Pending,
            created_at: now,
            expires_at: now + DELETION_REQUEST_TTL_SECS,
            approved_at: None,
            approved_by: None,
            executed_at: None,
            required_approvals,
            approvals: Vec::new(),
        }
    }

    /// `executed_at` settable only when `status == Approved` (spec.md §3 Invariant).
    pub fn mark_executed(&mut self, now: Timestamp) -> Result<(), String> {
        if self.status != RequestStatus::Approved {
            return Err("deletion must be approved before it can be marked executed".into());
        }
        self.executed_at = Some(now);
        Ok(())
    }
}

impl ApprovalRecord for DeletionRequest {
    fn id(&self) -> &str {
        &self.id
    }
    fn status(&self) -> RequestStatus {
        self.status
    }
    fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }
    fn expires_at(&self) -> Timestamp {
        self.expires_at
    }
    fn approvals(&self) -> &[Approval] {
        &self.approvals
    }
    fn push_approval(&mut self, approval: Approval) {
        self.approvals.push(approval);
    }
    fn required_approvals(&self) -> usize {
        self.required_approvals
    }
}

// ── Emergency policy configuration ──────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecoveryEmergencyConfig {
    pub enabled: bool,
    pub threshold: u8,
    pub total_shares: u8,
    pub custodians: Vec<String>,
    pub share_indexes: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadManTriggerAction {
    Notify,
    UnlockEscrow,
    AutoApprove,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeadManSwitchConfig {
    pub enabled: bool,
    pub inactivity_days: u32,
    pub warning_days: u32,
    pub last_activity: Timestamp,
    pub on_trigger: DeadManTriggerAction,
    pub notify_emails: Vec<String>,
    pub notify_webhook: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverrideConfig {
    pub enabled: bool,
    /// `SHA-256(token)` hex-encoded (hardened per spec.md §9 design note).
    pub key_hash: String,
    pub allowed_types: Vec<String>,
    pub require_reason: bool,
    pub cooldown_minutes: u32,
    pub notify_on_use: bool,
    pub last_used_at: Option<Timestamp>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub providers: std::collections::BTreeMap<String, String>,
    pub on_restore_request: bool,
    pub on_deletion_request: bool,
    pub on_dead_man_trigger: bool,
    pub on_override_use: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EmergencyConfig {
    pub recovery: Option<RecoveryEmergencyConfig>,
    pub dead_man_switch: Option<DeadManSwitchConfig>,
    pub r#override: Option<OverrideConfig>,
    pub notify: Option<NotifyConfig>,

    /// Auto-approve a pending restore request after this many days (0 = disabled).
    pub restore_auto_approve_after_days: u32,
    /// Auto-deny a pending restore request after this many days (0 = disabled).
    /// Strictly supersedes auto-approve (spec.md §4.6).
    pub restore_auto_deny_after_days: u32,
    /// Auto-approve a pending deletion request after this many days (0 = disabled).
    pub deletion_auto_approve_after_days: u32,
    /// Escalate a pending request after this many days (0 = disabled).
    pub escalation_after_days: u32,
    pub escalation_contacts: Vec<String>,
}

// ── Repository / Config ──────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub url: String,
    pub id: Option<String>,
    /// Present only on owner nodes; may be encrypted at rest (see `EncryptedSecrets`).
    pub password: Option<String>,
    /// Credential for the storage backend (e.g. an object-storage access
    /// key), when the backend needs one beyond the repository password.
    /// May be encrypted at rest (see `EncryptedSecrets`).
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub max_size_bytes: Option<u64>,
    pub retention_days: Option<u32>,
}

/// Encrypted bundle of designated secret fields (spec.md §4.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedSecrets {
    pub version: u8,
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
}

/// The root durable record (spec.md §3).
///
/// Invariant: exactly one of `{(local_share, share_index), consensus}` is
/// populated in a fully-initialized node.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    pub role: Option<Role>,
    pub public_key: Option<[u8; 32]>,
    pub private_key: Option<Vec<u8>>,

    pub repository: RepositoryConfig,

    pub local_share: Option<Vec<u8>>,
    pub share_index: Option<u8>,
    pub sss_threshold: Option<u8>,
    pub sss_total_shares: Option<u8>,

    pub consensus: Option<ConsensusConfig>,

    pub peer: Option<PeerConfig>,
    pub emergency: EmergencyConfig,
    pub storage: StorageConfig,

    pub encrypted_secrets: Option<EncryptedSecrets>,
}

impl Drop for Config {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        if let Some(pw) = self.repository.password.as_mut() {
            pw.zeroize();
        }
        if let Some(pk) = self.private_key.as_mut() {
            pk.zeroize();
        }
        if let Some(share) = self.local_share.as_mut() {
            share.zeroize();
        }
    }
}

impl Config {
    pub fn is_owner(&self) -> bool {
        matches!(self.role, Some(Role::Owner))
    }

    pub fn is_host(&self) -> bool {
        matches!(self.role, Some(Role::Host))
    }

    pub fn is_sss_mode(&self) -> bool {
        self.local_share.is_some() || self.share_index.is_some()
    }

    pub fn is_consensus_mode(&self) -> bool {
        self.consensus.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_status_terminality() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Denied.is_terminal());
        assert!(RequestStatus::Expired.is_terminal());
    }

    #[test]
    fn consensus_config_rejects_threshold_over_total() {
        let cfg = ConsensusConfig {
            threshold: 3,
            total_keys: 2,
            key_holders: vec![],
            require_approval: true,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn consensus_config_rejects_duplicate_ids() {
        let holder = |id: &str| KeyHolder {
            id: id.to_string(),
            name: "x".into(),
            public_key: [0u8; 32],
            address: None,
            joined_at: 0,
            is_owner: false,
        };
        let cfg = ConsensusConfig {
            threshold: 1,
            total_keys: 3,
            key_holders: vec![holder("a"), holder("a")],
            require_approval: true,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deletion_mark_executed_requires_approved_status() {
        let mut req = DeletionRequest::new(
            "alice".into(),
            DeletionType::Snapshot,
            Some("snap1".into()),
            vec![],
            "cleanup".into(),
            2,
            1_000,
        );
        assert!(req.mark_executed(2_000).is_err());
        req.status = RequestStatus::Approved;
        assert!(req.mark_executed(2_000).is_ok());
        assert_eq!(req.executed_at, Some(2_000));
    }

    #[test]
    fn restore_request_legacy_requires_two_approvals() {
        let req = RestoreRequest::new_legacy(
            "alice".into(),
            "latest".into(),
            "lost files".into(),
            vec![],
            1_000,
        );
        assert_eq!(req.required_approvals, 2);
        assert_eq!(req.expires_at, 1_000 + RESTORE_REQUEST_TTL_SECS);
    }
}
