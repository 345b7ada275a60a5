//! Dead-man's switch (spec.md §4.6).

use airgapper_core::{DeadManSwitchConfig, Timestamp};

const SECS_PER_DAY: i64 = 24 * 3600;

fn days_since(last_activity: Timestamp, now: Timestamp) -> i64 {
    (now - last_activity).max(0) / SECS_PER_DAY
}

/// `true` once `inactivity_days` has elapsed since `last_activity`.
pub fn is_triggered(cfg: &DeadManSwitchConfig, now: Timestamp) -> bool {
    cfg.enabled && days_since(cfg.last_activity, now) >= cfg.inactivity_days as i64
}

/// `true` during the `warning_days` prelude before the switch triggers.
pub fn is_warning(cfg: &DeadManSwitchConfig, now: Timestamp) -> bool {
    if !cfg.enabled {
        return false;
    }
    let days = days_since(cfg.last_activity, now);
    let threshold = cfg.inactivity_days as i64;
    let warn_from = threshold - cfg.warning_days as i64;
    days >= warn_from && days < threshold
}

/// Reset `last_activity` to `now`. Called after each successful
/// owner-initiated command (backup, heartbeat, restore, schedule, override).
pub fn record_activity(cfg: &mut DeadManSwitchConfig, now: Timestamp) {
    cfg.last_activity = now;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(last_activity: Timestamp) -> DeadManSwitchConfig {
        DeadManSwitchConfig {
            enabled: true,
            inactivity_days: 30,
            warning_days: 7,
            last_activity,
            on_trigger: airgapper_core::DeadManTriggerAction::Notify,
            notify_emails: vec![],
            notify_webhook: None,
        }
    }

    const DAY: i64 = SECS_PER_DAY;

    #[test]
    fn warning_window_at_25_days() {
        let c = cfg(0);
        let now = 25 * DAY;
        assert!(is_warning(&c, now));
        assert!(!is_triggered(&c, now));
    }

    #[test]
    fn triggers_at_30_days() {
        let c = cfg(0);
        let now = 30 * DAY;
        assert!(is_triggered(&c, now));
        assert!(!is_warning(&c, now));
    }

    #[test]
    fn triggers_well_past_threshold() {
        let c = cfg(0);
        assert!(is_triggered(&c, 90 * DAY));
    }

    #[test]
    fn neither_flag_shortly_after_activity() {
        let c = cfg(0);
        assert!(!is_warning(&c, 1 * DAY));
        assert!(!is_triggered(&c, 1 * DAY));
    }

    #[test]
    fn heartbeat_resets_both_flags() {
        let mut c = cfg(0);
        let now = 35 * DAY;
        assert!(is_triggered(&c, now));
        record_activity(&mut c, now);
        assert!(!is_triggered(&c, now));
        assert!(!is_warning(&c, now));
    }

    #[test]
    fn disabled_switch_never_triggers() {
        let mut c = cfg(0);
        c.enabled = false;
        assert!(!is_triggered(&c, 1000 * DAY));
        assert!(!is_warning(&c, 1000 * DAY));
    }
}
