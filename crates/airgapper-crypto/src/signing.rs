//! Canonical signing input for restore-request approvals (spec.md §4.4, §9).
//!
//! The reference `|`-joined format is vulnerable to field-injection: a
//! `reason` containing `|` can make two distinct requests canonicalize to
//! the same transcript. This implementation resolves the open question in
//! spec.md §9 by length-prefixing every field with its big-endian `u32`
//! byte length instead of joining on a separator — no input can ever be
//! crafted to collide with a differently-segmented one.

/// Build the canonical byte string signed (and verified) for a restore
/// request approval.
///
/// Field order is normative and matches spec.md §4.4: request_id, requester,
/// snapshot_id, reason, key_id, comma-joined paths, created_at (decimal).
pub fn canonical_restore_signing_input(
    request_id: &str,
    requester: &str,
    snapshot_id: &str,
    reason: &str,
    key_id: &str,
    paths: &[String],
    created_at_unix: i64,
) -> Vec<u8> {
    let joined_paths = paths.join(",");
    let created_at = created_at_unix.to_string();

    let fields: [&str; 7] = [
        request_id,
        requester,
        snapshot_id,
        reason,
        key_id,
        &joined_paths,
        &created_at,
    ];

    let mut out = Vec::new();
    for field in fields {
        let len = field.len() as u32;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(field.as_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_inputs() {
        let a = canonical_restore_signing_input("id1", "alice", "latest", "r", "kid", &["/a".into()], 1000);
        let b = canonical_restore_signing_input("id1", "alice", "latest", "r", "kid", &["/a".into()], 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn length_prefix_defeats_separator_injection() {
        // Without length-prefixing, "a" + "|" + "b|c" would collide with
        // "a|b" + "|" + "c". Length-prefixing distinguishes them.
        let x = canonical_restore_signing_input("a", "b|c", "s", "r", "k", &[], 1);
        let y = canonical_restore_signing_input("a|b", "c", "s", "r", "k", &[], 1);
        assert_ne!(x, y);
    }

    #[test]
    fn differs_when_any_field_changes() {
        let base = canonical_restore_signing_input("id1", "alice", "latest", "reason", "kid", &[], 1000);
        let changed_reason = canonical_restore_signing_input("id1", "alice", "latest", "other", "kid", &[], 1000);
        assert_ne!(base, changed_reason);

        let changed_time = canonical_restore_signing_input("id1", "alice", "latest", "reason", "kid", &[], 1001);
        assert_ne!(base, changed_time);
    }
}
