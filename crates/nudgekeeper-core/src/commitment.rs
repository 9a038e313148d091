//! Commitment entity, lifecycle state machine, and per-user nudge
//! preferences.
//!
//! A commitment is a user's scheduled obligation. Its status follows
//! strict transitions:
//!
//!   DRAFT ──────> SCHEDULED ──────> COMPLETED
//!                     ^    \
//!                     |     `─────> CANCELLED
//!                     |                  |
//!                     +── reactivate ────+
//!                     +── reactivate ── COMPLETED
//!
//! Valid transitions:
//! - DRAFT → SCHEDULED (clarified; requires a due time)
//! - SCHEDULED → COMPLETED (fired by the sweep)
//! - SCHEDULED → CANCELLED (user cancel)
//! - COMPLETED → SCHEDULED (manual reactivation)
//! - CANCELLED → SCHEDULED (manual reactivation)
//!
//! Deletion is a hard delete, not a status.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::recurrence::Frequency;

/// Commitment lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentStatus {
    /// Extracted but missing a resolvable time; not eligible for delivery.
    Draft,
    /// Armed; the sweep will deliver it once `when_time` passes.
    Scheduled,
    /// Fired exactly once by the sweep.
    Completed,
    /// Manually cancelled by the user.
    Cancelled,
}

impl CommitmentStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &CommitmentStatus) -> bool {
        match self {
            CommitmentStatus::Draft => matches!(to, CommitmentStatus::Scheduled),
            CommitmentStatus::Scheduled => matches!(
                to,
                CommitmentStatus::Completed | CommitmentStatus::Cancelled
            ),
            // Both terminal states can be manually reactivated.
            CommitmentStatus::Completed => matches!(to, CommitmentStatus::Scheduled),
            CommitmentStatus::Cancelled => matches!(to, CommitmentStatus::Scheduled),
        }
    }

    /// Get valid next states for this state.
    pub fn valid_transitions(&self) -> &[CommitmentStatus] {
        match self {
            CommitmentStatus::Draft => &[CommitmentStatus::Scheduled],
            CommitmentStatus::Scheduled => {
                &[CommitmentStatus::Completed, CommitmentStatus::Cancelled]
            }
            CommitmentStatus::Completed => &[CommitmentStatus::Scheduled],
            CommitmentStatus::Cancelled => &[CommitmentStatus::Scheduled],
        }
    }

    /// Database/display representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitmentStatus::Draft => "draft",
            CommitmentStatus::Scheduled => "scheduled",
            CommitmentStatus::Completed => "completed",
            CommitmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the commitment was stated by the user.
///
/// The extractor only ever produces the first three; `Meeting` and `Task`
/// can be chosen at direct creation. The type classifies the originating
/// utterance and sizes the calendar-export duration hint; it does not
/// change delivery behavior. A reminder that carries a recurrence rule
/// still regenerates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentType {
    /// "remind me to ..." class
    Reminder,
    /// relative-date class ("tomorrow ...", "next week ...")
    Scheduled,
    /// frequency class ("every day ...")
    Recurring,
    /// explicitly created meeting
    Meeting,
    /// explicitly created work item
    Task,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::Reminder => "reminder",
            IntentType::Scheduled => "scheduled",
            IntentType::Recurring => "recurring",
            IntentType::Meeting => "meeting",
            IntentType::Task => "task",
        }
    }

    /// Duration hint, in minutes, for the calendar-export collaborator.
    pub fn default_duration_minutes(&self) -> u32 {
        match self {
            IntentType::Reminder => 15,
            IntentType::Scheduled => 60,
            IntentType::Recurring => 30,
            IntentType::Meeting => 90,
            IntentType::Task => 120,
        }
    }
}

impl std::str::FromStr for IntentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reminder" => Ok(IntentType::Reminder),
            "scheduled" => Ok(IntentType::Scheduled),
            "recurring" => Ok(IntentType::Recurring),
            "meeting" => Ok(IntentType::Meeting),
            "task" => Ok(IntentType::Task),
            other => Err(format!(
                "unknown intent type '{other}' (expected reminder|scheduled|recurring|meeting|task)"
            )),
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's scheduled obligation.
///
/// Field stability matters beyond this crate: the calendar export
/// collaborator reads `when_time`, `when_rrule`, `title`, `what_action`,
/// `where_location`, `notes`, `priority`, and `version` as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    pub intent_type: IntentType,
    /// Short human-readable label
    pub title: String,
    /// The literal action phrase captured from the user
    pub what_action: String,
    pub description: Option<String>,
    pub where_location: Option<String>,
    pub notes: Option<String>,
    /// Absolute due instant. `None` only while in `draft`.
    pub when_time: Option<DateTime<Utc>>,
    /// Presence implies the commitment regenerates after firing.
    pub when_rrule: Option<Frequency>,
    pub status: CommitmentStatus,
    /// Monotonically incrementing; every mutation bumps it.
    pub version: i64,
    /// Higher = more important. Display/ordering only.
    pub priority: i64,
    /// Whether do-not-disturb windows apply to this commitment.
    pub dnd_respect: bool,
    /// The utterance this commitment was parsed from, if any.
    pub source_message: Option<String>,
    /// For spawned recurrence instances, the instance that spawned this one.
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to [`CommitmentStore::create`](crate::store::CommitmentStore::create).
///
/// Status is derived, not supplied: a due time (present for every fully
/// resolved draft, including recurring ones) yields `scheduled`; a missing
/// due time yields `draft` pending user clarification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommitment {
    pub user_id: String,
    pub intent_type: IntentType,
    pub title: String,
    pub what_action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub where_location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub when_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub when_rrule: Option<Frequency>,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_true")]
    pub dnd_respect: bool,
    #[serde(default)]
    pub source_message: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

fn default_priority() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

/// Partial update for a commitment. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitmentPatch {
    pub title: Option<String>,
    pub what_action: Option<String>,
    pub description: Option<String>,
    pub where_location: Option<String>,
    pub notes: Option<String>,
    pub when_time: Option<DateTime<Utc>>,
    pub status: Option<CommitmentStatus>,
    pub priority: Option<i64>,
    pub dnd_respect: Option<bool>,
    /// When set, the update fails with a conflict unless the stored
    /// version still matches.
    pub expected_version: Option<i64>,
}

/// Per-user delivery preferences, created once at onboarding and
/// read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NudgePreference {
    pub user_id: String,
    pub dnd_enabled: bool,
    /// Hour-level window start (0-23). The window may wrap past midnight.
    pub dnd_start_hour: u8,
    /// Hour-level window end (0-23), exclusive.
    pub dnd_end_hour: u8,
    pub max_daily_nudges: i64,
    /// Fixed UTC offset for this user, e.g. `"+08:00"`. Named zones and
    /// DST are not supported.
    pub timezone: String,
}

impl NudgePreference {
    /// Engine defaults for a user with no stored preferences.
    pub fn defaults(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            dnd_enabled: false,
            dnd_start_hour: 22,
            dnd_end_hour: 8,
            max_daily_nudges: 3,
            timezone: "+00:00".to_string(),
        }
    }

    /// The user's offset, falling back to UTC when the stored string does
    /// not parse. Delivery policy is advisory rate control, so a bad zone
    /// string degrades to UTC rather than blocking the sweep.
    pub fn utc_offset(&self) -> FixedOffset {
        let tz = self.timezone.trim();
        if tz.is_empty() || tz.eq_ignore_ascii_case("z") || tz == "utc" || tz == "UTC" {
            return FixedOffset::east_opt(0).unwrap();
        }
        tz.parse::<FixedOffset>()
            .unwrap_or_else(|_| FixedOffset::east_opt(0).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        use CommitmentStatus::*;
        assert!(Draft.can_transition_to(&Scheduled));
        assert!(!Draft.can_transition_to(&Completed));
        assert!(Scheduled.can_transition_to(&Completed));
        assert!(Scheduled.can_transition_to(&Cancelled));
        assert!(!Scheduled.can_transition_to(&Draft));
        // Reactivation from both terminal states.
        assert!(Completed.can_transition_to(&Scheduled));
        assert!(Cancelled.can_transition_to(&Scheduled));
        assert!(!Completed.can_transition_to(&Cancelled));
    }

    #[test]
    fn offset_parsing_with_fallback() {
        let mut prefs = NudgePreference::defaults("u1");
        prefs.timezone = "+08:00".to_string();
        assert_eq!(prefs.utc_offset().local_minus_utc(), 8 * 3600);

        prefs.timezone = "-05:30".to_string();
        assert_eq!(prefs.utc_offset().local_minus_utc(), -(5 * 3600 + 1800));

        prefs.timezone = "Z".to_string();
        assert_eq!(prefs.utc_offset().local_minus_utc(), 0);

        prefs.timezone = "Mars/Olympus".to_string();
        assert_eq!(prefs.utc_offset().local_minus_utc(), 0);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&CommitmentStatus::Scheduled).unwrap();
        assert_eq!(json, r#""scheduled""#);
    }

    #[test]
    fn intent_kinds_parse_and_carry_duration_hints() {
        let meeting: IntentType = "meeting".parse().unwrap();
        assert_eq!(meeting, IntentType::Meeting);
        assert_eq!(meeting.default_duration_minutes(), 90);
        assert_eq!(IntentType::Reminder.default_duration_minutes(), 15);
        assert_eq!(IntentType::Task.default_duration_minutes(), 120);
        assert!("appointment".parse::<IntentType>().is_err());
    }
}
