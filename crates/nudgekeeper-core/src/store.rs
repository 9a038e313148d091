//! Persistence contracts for commitments, the nudge log, and user
//! preferences.
//!
//! The engine depends on these traits, not on a storage technology; the
//! bundled SQLite [`Database`](crate::storage::Database) implements all
//! three, and any relational, embedded, or document backend can stand in.
//! Every commitment operation is scoped to the owning user, and the
//! ownership check happens before any write.

use chrono::{DateTime, Utc};
use std::str::FromStr;

use crate::commitment::{Commitment, CommitmentPatch, CommitmentStatus, NewCommitment, NudgePreference};
use crate::error::Result;
use crate::events::NudgeEvent;

/// Status filter for [`CommitmentStore::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(CommitmentStatus),
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "draft" => Ok(StatusFilter::Only(CommitmentStatus::Draft)),
            "scheduled" => Ok(StatusFilter::Only(CommitmentStatus::Scheduled)),
            "completed" => Ok(StatusFilter::Only(CommitmentStatus::Completed)),
            "cancelled" => Ok(StatusFilter::Only(CommitmentStatus::Cancelled)),
            other => Err(format!(
                "unknown status filter '{other}' (expected all|draft|scheduled|completed|cancelled)"
            )),
        }
    }
}

/// Persistence contract for commitments.
pub trait CommitmentStore {
    /// Persist a new commitment with `version = 1`. Status is derived:
    /// `scheduled` when a due time is present, `draft` otherwise.
    fn create(&self, new: &NewCommitment) -> Result<Commitment>;

    /// Fetch one commitment owned by `user_id`.
    fn get(&self, user_id: &str, id: &str) -> Result<Option<Commitment>>;

    /// List commitments owned by `user_id`, newest-created-first.
    fn list(&self, user_id: &str, filter: StatusFilter, limit: usize) -> Result<Vec<Commitment>>;

    /// Apply a partial update, bumping `version`. Fails with `NotFound`
    /// when the id is absent or owned by someone else, and with
    /// `Conflict` on an optimistic version mismatch.
    fn update(&self, user_id: &str, id: &str, patch: &CommitmentPatch) -> Result<Commitment>;

    /// Hard delete. Stops the row and any future recurrence chain.
    fn delete(&self, user_id: &str, id: &str) -> Result<()>;

    /// All `scheduled` commitments due at or before `now`, ascending by
    /// due time, capped at `batch` rows.
    fn due(&self, now: DateTime<Utc>, batch: usize) -> Result<Vec<Commitment>>;

    /// Guarded status transition: complete the commitment only if it is
    /// still `scheduled` at write time. Returns whether a row changed --
    /// `false` means a concurrent sweep already handled it, which is not
    /// an error.
    fn complete_if_scheduled(&self, id: &str, now: DateTime<Utc>) -> Result<bool>;
}

/// Append-only nudge event log.
pub trait NudgeLog {
    /// Append one event. Events are never mutated afterwards.
    fn append(&self, event: &NudgeEvent) -> Result<()>;

    /// Count `sent` events for a user within `[start, end)`.
    fn sent_count_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64>;

    /// Most recent events for a user, newest first.
    fn list_events(&self, user_id: &str, limit: usize) -> Result<Vec<NudgeEvent>>;
}

/// Per-user nudge preference lookup.
pub trait PreferenceStore {
    fn get_prefs(&self, user_id: &str) -> Result<Option<NudgePreference>>;
    fn put_prefs(&self, prefs: &NudgePreference) -> Result<()>;
}
