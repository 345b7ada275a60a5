//! Escalation/auto-approve/auto-deny policy evaluation (spec.md §4.6).
//!
//! `evaluate_*` are pure functions over config + elapsed time; `apply_*`
//! carries out the one side effect the evaluator is allowed to trigger
//! directly. Restore auto-approval is deliberately `apply`-less: releasing a
//! share or counting a synthetic signature needs escrow material this crate
//! does not hold, so it surfaces only as a flag for the orchestrator to act
//! on (spec.md §4.6).

use airgapper_core::{EmergencyConfig, RestoreRequest, Timestamp};
use airgapper_consensus::ConsentManager;
use tracing::info;

use crate::error::EmergencyError;

const SECS_PER_DAY: i64 = 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyResult {
    pub days_pending: i64,
    pub auto_approve: bool,
    pub auto_deny: bool,
    pub escalate: bool,
}

fn days_pending(created_at: Timestamp, now: Timestamp) -> i64 {
    (now - created_at).max(0) / SECS_PER_DAY
}

fn past_threshold(days: i64, threshold_days: u32) -> bool {
    threshold_days > 0 && days >= threshold_days as i64
}

/// spec.md §4.6: escalate requires a non-empty contact list in addition to
/// the threshold having elapsed — a configured threshold with nobody to
/// notify escalates to nowhere.
fn should_escalate(days: i64, cfg: &EmergencyConfig) -> bool {
    past_threshold(days, cfg.escalation_after_days) && !cfg.escalation_contacts.is_empty()
}

/// Restore requests: auto-deny strictly supersedes auto-approve when both
/// thresholds have elapsed (spec.md §4.6, §8 "auto-deny supersedes").
pub fn evaluate_restore_policy(cfg: &EmergencyConfig, created_at: Timestamp, now: Timestamp) -> PolicyResult {
    let days = days_pending(created_at, now);
    let would_deny = past_threshold(days, cfg.restore_auto_deny_after_days);
    let would_approve = past_threshold(days, cfg.restore_auto_approve_after_days) && !would_deny;
    PolicyResult {
        days_pending: days,
        auto_approve: would_approve,
        auto_deny: would_deny,
        escalate: should_escalate(days, cfg),
    }
}

/// Deletion requests have no auto-deny path (spec.md §4.6): a stale deletion
/// request simply expires via its normal TTL, or is auto-approved.
pub fn evaluate_deletion_policy(cfg: &EmergencyConfig, created_at: Timestamp, now: Timestamp) -> PolicyResult {
    let days = days_pending(created_at, now);
    PolicyResult {
        days_pending: days,
        auto_approve: past_threshold(days, cfg.deletion_auto_approve_after_days),
        auto_deny: false,
        escalate: should_escalate(days, cfg),
    }
}

/// The synthetic signer name recorded against requests resolved by policy
/// rather than by a human key holder.
pub const POLICY_SIGNER: &str = "emergency-policy";

/// Apply a restore policy result. Only `auto_deny` is ever acted on here;
/// `auto_approve` is reported back to the caller as a flag, never applied.
pub fn apply_restore_policy(
    mgr: &ConsentManager,
    req: &RestoreRequest,
    result: PolicyResult,
    now: Timestamp,
) -> Result<Option<RestoreRequest>, EmergencyError> {
    if result.auto_deny {
        let denied = mgr.deny_restore(&req.id, now)?;
        info!(id = %req.id, days_pending = result.days_pending, "restore auto-denied by emergency policy");
        return Ok(Some(denied));
    }
    if result.auto_approve {
        info!(id = %req.id, days_pending = result.days_pending, "restore eligible for auto-approval (flag only, not applied)");
    }
    Ok(None)
}

/// Apply a deletion policy result: auto-approve is signed off as
/// [`POLICY_SIGNER`], matching the normal key-holder approval path.
pub fn apply_deletion_policy(
    mgr: &ConsentManager,
    id: &str,
    result: PolicyResult,
    now: Timestamp,
) -> Result<Option<airgapper_core::DeletionRequest>, EmergencyError> {
    if result.auto_approve {
        let approved = mgr.approve_deletion(id, POLICY_SIGNER, now)?;
        info!(id, days_pending = result.days_pending, "deletion auto-approved by emergency policy");
        return Ok(Some(approved));
    }
    Ok(None)
}
