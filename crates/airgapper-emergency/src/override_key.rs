//! Override key: an out-of-band bypass for the owner when the normal
//! consensus path is unavailable (spec.md §4.6, §9 design note).
//!
//! The token itself is never stored; only `SHA-256(token)` is persisted in
//! `OverrideConfig::key_hash`, and comparison against a presented token runs
//! through `subtle` to avoid timing side channels on the hash compare.

use airgapper_core::{OverrideConfig, Timestamp};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::EmergencyError;

const TOKEN_PREFIX: &str = "ov_";
const TOKEN_RANDOM_BYTES: usize = 32;

/// Generate a new override token. The caller must display it to the owner
/// once and persist only `hash_token(&token)` in `OverrideConfig::key_hash`;
/// the plaintext token is never written to disk.
pub fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_RANDOM_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    format!("{TOKEN_PREFIX}{}", hex::encode(buf))
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn token_matches(cfg: &OverrideConfig, token: &str) -> bool {
    let candidate = hash_token(token);
    let stored = cfg.key_hash.as_bytes();
    let candidate = candidate.as_bytes();
    if stored.len() != candidate.len() {
        return false;
    }
    stored.ct_eq(candidate).into()
}

/// Validate and "consume" an override attempt for a request of `type_name`
/// (e.g. `"restore"`, `"deletion"`), per spec.md §4.6:
///
/// 1. override must be enabled,
/// 2. the presented token must match `key_hash`,
/// 3. `type_name` must be in `allowed_types`,
/// 4. a non-empty `reason` is required when `require_reason` is set,
/// 5. at least `cooldown_minutes` must have elapsed since `last_used_at`.
///
/// On success, returns the `Timestamp` to record as the new `last_used_at`;
/// the caller is responsible for persisting it (and for writing an audit-log
/// entry — see `audit`).
pub fn attempt(
    cfg: &OverrideConfig,
    token: &str,
    type_name: &str,
    reason: Option<&str>,
    now: Timestamp,
) -> Result<Timestamp, EmergencyError> {
    if !cfg.enabled {
        return Err(EmergencyError::OverrideDisabled);
    }
    if !token_matches(cfg, token) {
        return Err(EmergencyError::InvalidOverrideKey);
    }
    if !cfg.allowed_types.iter().any(|t| t == type_name) {
        return Err(EmergencyError::OverrideTypeNotAllowed(type_name.to_string()));
    }
    if cfg.require_reason && reason.map(str::trim).unwrap_or("").is_empty() {
        return Err(EmergencyError::ReasonRequired);
    }
    if let Some(last_used) = cfg.last_used_at {
        let elapsed_minutes = (now - last_used).max(0) / 60;
        let cooldown = cfg.cooldown_minutes as i64;
        if elapsed_minutes < cooldown {
            return Err(EmergencyError::CooldownActive((cooldown - elapsed_minutes) as u32));
        }
    }
    Ok(now)
}

/// One line of the append-only override audit log (spec.md §4.6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuditEntry {
    pub timestamp: Timestamp,
    pub type_name: String,
    pub reason: Option<String>,
    pub request_id: Option<String>,
}

/// Append one JSON-lines entry to `path`, creating it if absent. The log
/// directory is expected to already carry the store's 0700/0600 hardening
/// (spec.md §4.2); this function only appends, never truncates.
pub fn audit(path: impl AsRef<std::path::Path>, entry: &AuditEntry) -> Result<(), EmergencyError> {
    use std::io::Write;
    let line = serde_json::to_string(entry).map_err(|e| EmergencyError::Io(e.to_string()))?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        file.set_permissions(perms)?;
    }
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(key_hash: String) -> OverrideConfig {
        OverrideConfig {
            enabled: true,
            key_hash,
            allowed_types: vec!["restore".into()],
            require_reason: true,
            cooldown_minutes: 60,
            notify_on_use: true,
            last_used_at: None,
        }
    }

    #[test]
    fn token_round_trips_through_hash() {
        let token = generate_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        let c = cfg(hash_token(&token));
        assert!(attempt(&c, &token, "restore", Some("emergency"), 1000).is_ok());
    }

    #[test]
    fn wrong_token_rejected() {
        let token = generate_token();
        let c = cfg(hash_token(&token));
        let err = attempt(&c, "ov_deadbeef", "restore", Some("r"), 1000).unwrap_err();
        assert!(matches!(err, EmergencyError::InvalidOverrideKey));
    }

    #[test]
    fn disallowed_type_rejected() {
        let token = generate_token();
        let c = cfg(hash_token(&token));
        let err = attempt(&c, &token, "deletion", Some("r"), 1000).unwrap_err();
        assert!(matches!(err, EmergencyError::OverrideTypeNotAllowed(t) if t == "deletion"));
    }

    #[test]
    fn missing_reason_rejected_when_required() {
        let token = generate_token();
        let c = cfg(hash_token(&token));
        let err = attempt(&c, &token, "restore", None, 1000).unwrap_err();
        assert!(matches!(err, EmergencyError::ReasonRequired));
    }

    #[test]
    fn blank_reason_rejected_when_required() {
        let token = generate_token();
        let c = cfg(hash_token(&token));
        let err = attempt(&c, &token, "restore", Some("   "), 1000).unwrap_err();
        assert!(matches!(err, EmergencyError::ReasonRequired));
    }

    #[test]
    fn cooldown_blocks_rapid_reuse() {
        let token = generate_token();
        let mut c = cfg(hash_token(&token));
        c.last_used_at = Some(1000);
        let err = attempt(&c, &token, "restore", Some("r"), 1000 + 30 * 60).unwrap_err();
        assert!(matches!(err, EmergencyError::CooldownActive(_)));
        assert!(attempt(&c, &token, "restore", Some("r"), 1000 + 61 * 60).is_ok());
    }

    #[test]
    fn disabled_override_always_rejected() {
        let token = generate_token();
        let mut c = cfg(hash_token(&token));
        c.enabled = false;
        let err = attempt(&c, &token, "restore", Some("r"), 1000).unwrap_err();
        assert!(matches!(err, EmergencyError::OverrideDisabled));
    }

    #[test]
    fn audit_log_appends_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override_audit.log");
        audit(&path, &AuditEntry { timestamp: 1, type_name: "restore".into(), reason: Some("r".into()), request_id: Some("abc".into()) }).unwrap();
        audit(&path, &AuditEntry { timestamp: 2, type_name: "deletion".into(), reason: None, request_id: None }).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
