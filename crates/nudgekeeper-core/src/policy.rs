//! Delivery policy: may a due commitment fire right now?
//!
//! Pure evaluation against the owner's do-not-disturb window and daily
//! volume cap. The sweep is solely responsible for acting on the verdict;
//! nothing here touches storage.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Timelike, Utc};

use crate::commitment::{Commitment, NudgePreference};

/// Outcome of a delivery-policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// Inside the user's do-not-disturb window.
    SkipDnd,
    /// The user already received their daily allowance of nudges.
    SkipLimit,
}

/// Evaluate whether a due commitment may be delivered at `now`.
///
/// Rules, in order:
/// 1. DND applies only when both the commitment and the user opt in.
/// 2. The window `[dnd_start_hour, dnd_end_hour)` is evaluated against
///    the current hour in the user's timezone; when it wraps past
///    midnight (start > end), "inside" means `hour >= start || hour < end`.
/// 3. The daily cap compares `today_sent_count` against
///    `max_daily_nudges`.
pub fn may_deliver(
    commitment: &Commitment,
    prefs: &NudgePreference,
    now: DateTime<Utc>,
    today_sent_count: i64,
) -> Verdict {
    if commitment.dnd_respect && prefs.dnd_enabled {
        let hour = now.with_timezone(&prefs.utc_offset()).hour() as u8;
        let (start, end) = (prefs.dnd_start_hour, prefs.dnd_end_hour);
        let inside = if start > end {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        };
        if inside {
            return Verdict::SkipDnd;
        }
    }
    if today_sent_count >= prefs.max_daily_nudges {
        return Verdict::SkipLimit;
    }
    Verdict::Allow
}

/// UTC bounds of "today" as the user experiences it: the calendar day of
/// `now` in the given offset, `[local midnight, next local midnight)`.
pub fn today_bounds(now: DateTime<Utc>, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = now
        .with_timezone(&offset)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid");
    let start = offset
        .from_local_datetime(&local_midnight)
        .single()
        .expect("fixed offsets are unambiguous")
        .with_timezone(&Utc);
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{CommitmentStatus, IntentType};
    use chrono::TimeZone;

    fn commitment(dnd_respect: bool) -> Commitment {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Commitment {
            id: "c1".to_string(),
            user_id: "u1".to_string(),
            intent_type: IntentType::Reminder,
            title: "Reminder: stretch".to_string(),
            what_action: "stretch".to_string(),
            description: None,
            where_location: None,
            notes: None,
            when_time: Some(at),
            when_rrule: None,
            status: CommitmentStatus::Scheduled,
            version: 1,
            priority: 1,
            dnd_respect,
            source_message: None,
            parent_id: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn prefs_with_dnd(start: u8, end: u8) -> NudgePreference {
        let mut prefs = NudgePreference::defaults("u1");
        prefs.dnd_enabled = true;
        prefs.dnd_start_hour = start;
        prefs.dnd_end_hour = end;
        prefs
    }

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 30, 0).unwrap()
    }

    #[test]
    fn dnd_window_wraps_past_midnight() {
        let prefs = prefs_with_dnd(22, 8);
        let c = commitment(true);
        assert_eq!(may_deliver(&c, &prefs, at_hour(23), 0), Verdict::SkipDnd);
        assert_eq!(may_deliver(&c, &prefs, at_hour(3), 0), Verdict::SkipDnd);
        assert_eq!(may_deliver(&c, &prefs, at_hour(12), 0), Verdict::Allow);
        // Half-open: the end hour itself is outside the window.
        assert_eq!(may_deliver(&c, &prefs, at_hour(8), 0), Verdict::Allow);
        assert_eq!(may_deliver(&c, &prefs, at_hour(22), 0), Verdict::SkipDnd);
    }

    #[test]
    fn dnd_window_without_wrap() {
        let prefs = prefs_with_dnd(13, 15);
        let c = commitment(true);
        assert_eq!(may_deliver(&c, &prefs, at_hour(12), 0), Verdict::Allow);
        assert_eq!(may_deliver(&c, &prefs, at_hour(13), 0), Verdict::SkipDnd);
        assert_eq!(may_deliver(&c, &prefs, at_hour(14), 0), Verdict::SkipDnd);
        assert_eq!(may_deliver(&c, &prefs, at_hour(15), 0), Verdict::Allow);
    }

    #[test]
    fn dnd_hour_is_evaluated_in_user_timezone() {
        let mut prefs = prefs_with_dnd(22, 8);
        prefs.timezone = "+08:00".to_string();
        let c = commitment(true);
        // 16:00 UTC is 00:00 in +08:00 -- inside the window.
        assert_eq!(may_deliver(&c, &prefs, at_hour(16), 0), Verdict::SkipDnd);
        // 04:00 UTC is 12:00 local -- outside.
        assert_eq!(may_deliver(&c, &prefs, at_hour(4), 0), Verdict::Allow);
    }

    #[test]
    fn dnd_opt_outs_bypass_the_window() {
        let prefs = prefs_with_dnd(22, 8);
        // Commitment opts out of DND.
        assert_eq!(
            may_deliver(&commitment(false), &prefs, at_hour(23), 0),
            Verdict::Allow
        );
        // User has DND disabled entirely.
        let mut disabled = prefs.clone();
        disabled.dnd_enabled = false;
        assert_eq!(
            may_deliver(&commitment(true), &disabled, at_hour(23), 0),
            Verdict::Allow
        );
    }

    #[test]
    fn daily_cap_applies_after_dnd() {
        let prefs = NudgePreference::defaults("u1");
        let c = commitment(true);
        assert_eq!(may_deliver(&c, &prefs, at_hour(12), 2), Verdict::Allow);
        assert_eq!(may_deliver(&c, &prefs, at_hour(12), 3), Verdict::SkipLimit);
        assert_eq!(may_deliver(&c, &prefs, at_hour(12), 7), Verdict::SkipLimit);
    }

    #[test]
    fn today_bounds_follow_the_offset() {
        let off = FixedOffset::east_opt(8 * 3600).unwrap();
        // 2024-01-01 18:00 UTC is 2024-01-02 02:00 local (+08:00), so the
        // local day runs from 2024-01-01 16:00 UTC to 2024-01-02 16:00 UTC.
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap();
        let (start, end) = today_bounds(now, off);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 16, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 2, 16, 0, 0).unwrap());
    }
}
