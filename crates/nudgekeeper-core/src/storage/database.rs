//! SQLite-based storage for commitments, the nudge log, and preferences.
//!
//! Implements the three persistence contracts in [`crate::store`]. All
//! timestamps are stored as RFC3339 text in UTC, which makes lexicographic
//! comparison in SQL agree with chronological order.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{data_dir, migrations};
use crate::commitment::{
    Commitment, CommitmentPatch, CommitmentStatus, IntentType, NewCommitment, NudgePreference,
};
use crate::error::{Result, StoreError, ValidationError};
use crate::events::{DeliveryStatus, NudgeEvent};
use crate::recurrence::Frequency;
use crate::store::{CommitmentStore, NudgeLog, PreferenceStore, StatusFilter};

// === Helper Functions ===

/// Parse commitment status from database string
fn parse_status(status_str: &str) -> CommitmentStatus {
    match status_str {
        "draft" => CommitmentStatus::Draft,
        "completed" => CommitmentStatus::Completed,
        "cancelled" => CommitmentStatus::Cancelled,
        _ => CommitmentStatus::Scheduled,
    }
}

/// Parse intent type from database string
fn parse_intent(intent_str: &str) -> IntentType {
    match intent_str {
        "scheduled" => IntentType::Scheduled,
        "recurring" => IntentType::Recurring,
        "meeting" => IntentType::Meeting,
        "task" => IntentType::Task,
        _ => IntentType::Reminder,
    }
}

/// Parse delivery status from database string
fn parse_delivery_status(status_str: &str) -> DeliveryStatus {
    match status_str {
        "sent" => DeliveryStatus::Sent,
        "skipped_dnd" => DeliveryStatus::SkippedDnd,
        "skipped_limit" => DeliveryStatus::SkippedLimit,
        _ => DeliveryStatus::Error,
    }
}

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Build a Commitment from a database row (fixed column order, see
/// `COMMITMENT_COLUMNS`).
fn row_to_commitment(row: &rusqlite::Row) -> Result<Commitment, rusqlite::Error> {
    let intent_str: String = row.get(2)?;
    let when_time_str: Option<String> = row.get(8)?;
    let when_time = when_time_str
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let when_rrule_str: Option<String> = row.get(9)?;
    let when_rrule = when_rrule_str.and_then(|s| s.parse::<Frequency>().ok());
    let status_str: String = row.get(10)?;
    let created_at_str: String = row.get(16)?;
    let updated_at_str: String = row.get(17)?;

    Ok(Commitment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        intent_type: parse_intent(&intent_str),
        title: row.get(3)?,
        what_action: row.get(4)?,
        description: row.get(5)?,
        where_location: row.get(6)?,
        notes: row.get(7)?,
        when_time,
        when_rrule,
        status: parse_status(&status_str),
        version: row.get(11)?,
        priority: row.get(12)?,
        dnd_respect: row.get::<_, i64>(13)? != 0,
        source_message: row.get(14)?,
        parent_id: row.get(15)?,
        created_at: parse_datetime_fallback(&created_at_str),
        updated_at: parse_datetime_fallback(&updated_at_str),
    })
}

const COMMITMENT_COLUMNS: &str = "id, user_id, intent_type, title, what_action, description, \
     where_location, notes, when_time, when_rrule, status, version, priority, dnd_respect, \
     source_message, parent_id, created_at, updated_at";

/// SQLite database backing the engine.
///
/// One connection, no pool: the engine is a batch job, not a server.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/nudgekeeper/nudgekeeper.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()
            .map_err(|e| crate::error::CoreError::Custom(e.to_string()))?
            .join("nudgekeeper.db");
        let conn = Connection::open(&path)
            .map_err(|source| StoreError::OpenFailed { path, source })?;
        let db = Self { conn };
        db.migrate().map_err(StoreError::from)?;
        Ok(db)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate().map_err(StoreError::from)?;
        Ok(db)
    }

    /// Open an in-memory database (tests, ephemeral runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        let db = Self { conn };
        db.migrate().map_err(StoreError::from)?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS commitments (
                id             TEXT PRIMARY KEY,
                user_id        TEXT NOT NULL,
                intent_type    TEXT NOT NULL,
                title          TEXT NOT NULL,
                what_action    TEXT NOT NULL,
                description    TEXT,
                where_location TEXT,
                notes          TEXT,
                when_time      TEXT,
                when_rrule     TEXT,
                status         TEXT NOT NULL,
                version        INTEGER NOT NULL DEFAULT 1,
                priority       INTEGER NOT NULL DEFAULT 1,
                dnd_respect    INTEGER NOT NULL DEFAULT 1,
                source_message TEXT,
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS nudge_events (
                id              TEXT PRIMARY KEY,
                commitment_id   TEXT NOT NULL,
                user_id         TEXT NOT NULL,
                delivery_status TEXT NOT NULL,
                channel         TEXT NOT NULL DEFAULT 'local',
                error           TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS nudge_prefs (
                user_id          TEXT PRIMARY KEY,
                dnd_enabled      INTEGER NOT NULL DEFAULT 0,
                dnd_start_hour   INTEGER NOT NULL DEFAULT 22,
                dnd_end_hour     INTEGER NOT NULL DEFAULT 8,
                max_daily_nudges INTEGER NOT NULL DEFAULT 3,
                timezone         TEXT NOT NULL DEFAULT '+00:00'
            );

            -- Covers the per-user listing and the due-set fetch.
            CREATE INDEX IF NOT EXISTS idx_commitments_user_created
                ON commitments(user_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_commitments_due
                ON commitments(status, when_time);
            CREATE INDEX IF NOT EXISTS idx_nudge_events_user_day
                ON nudge_events(user_id, delivery_status, created_at);",
        )?;

        // Incremental migrations (v1 -> v2, etc.)
        migrations::migrate(&self.conn)?;

        Ok(())
    }
}

impl CommitmentStore for Database {
    fn create(&self, new: &NewCommitment) -> Result<Commitment> {
        if new.what_action.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "what_action".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }
        if new.title.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "title".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }

        // A resolvable due time arms the commitment immediately; without
        // one it stays a draft pending clarification.
        let status = if new.when_time.is_some() {
            CommitmentStatus::Scheduled
        } else {
            CommitmentStatus::Draft
        };

        let now = Utc::now();
        let commitment = Commitment {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id.clone(),
            intent_type: new.intent_type,
            title: new.title.clone(),
            what_action: new.what_action.clone(),
            description: new.description.clone(),
            where_location: new.where_location.clone(),
            notes: new.notes.clone(),
            when_time: new.when_time,
            when_rrule: new.when_rrule,
            status,
            version: 1,
            priority: new.priority,
            dnd_respect: new.dnd_respect,
            source_message: new.source_message.clone(),
            parent_id: new.parent_id.clone(),
            created_at: now,
            updated_at: now,
        };

        self.conn
            .execute(
                "INSERT INTO commitments (
                    id, user_id, intent_type, title, what_action, description,
                    where_location, notes, when_time, when_rrule, status, version,
                    priority, dnd_respect, source_message, parent_id, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    commitment.id,
                    commitment.user_id,
                    commitment.intent_type.as_str(),
                    commitment.title,
                    commitment.what_action,
                    commitment.description,
                    commitment.where_location,
                    commitment.notes,
                    commitment.when_time.map(|dt| dt.to_rfc3339()),
                    commitment.when_rrule.map(|f| f.as_rrule()),
                    commitment.status.as_str(),
                    commitment.version,
                    commitment.priority,
                    commitment.dnd_respect,
                    commitment.source_message,
                    commitment.parent_id,
                    commitment.created_at.to_rfc3339(),
                    commitment.updated_at.to_rfc3339(),
                ],
            )
            .map_err(StoreError::from)?;

        Ok(commitment)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<Commitment>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {COMMITMENT_COLUMNS} FROM commitments WHERE id = ?1 AND user_id = ?2"
            ))
            .map_err(StoreError::from)?;
        let result = stmt
            .query_row(params![id, user_id], |row| row_to_commitment(row))
            .optional()
            .map_err(StoreError::from)?;
        Ok(result)
    }

    fn list(&self, user_id: &str, filter: StatusFilter, limit: usize) -> Result<Vec<Commitment>> {
        let rows = match filter {
            StatusFilter::All => {
                let mut stmt = self
                    .conn
                    .prepare(&format!(
                        "SELECT {COMMITMENT_COLUMNS} FROM commitments
                         WHERE user_id = ?1
                         ORDER BY created_at DESC, rowid DESC
                         LIMIT ?2"
                    ))
                    .map_err(StoreError::from)?;
                let rows = stmt
                    .query_map(params![user_id, limit as i64], |row| row_to_commitment(row))
                    .map_err(StoreError::from)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)?
            }
            StatusFilter::Only(status) => {
                let mut stmt = self
                    .conn
                    .prepare(&format!(
                        "SELECT {COMMITMENT_COLUMNS} FROM commitments
                         WHERE user_id = ?1 AND status = ?2
                         ORDER BY created_at DESC, rowid DESC
                         LIMIT ?3"
                    ))
                    .map_err(StoreError::from)?;
                let rows = stmt
                    .query_map(params![user_id, status.as_str(), limit as i64], |row| row_to_commitment(row))
                    .map_err(StoreError::from)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)?
            }
        };
        Ok(rows)
    }

    fn update(&self, user_id: &str, id: &str, patch: &CommitmentPatch) -> Result<Commitment> {
        let current = self
            .get(user_id, id)?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if let Some(expected) = patch.expected_version {
            if expected != current.version {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual: current.version,
                }
                .into());
            }
        }

        let mut next = current.clone();
        if let Some(title) = &patch.title {
            next.title = title.clone();
        }
        if let Some(what_action) = &patch.what_action {
            next.what_action = what_action.clone();
        }
        if let Some(description) = &patch.description {
            next.description = Some(description.clone());
        }
        if let Some(where_location) = &patch.where_location {
            next.where_location = Some(where_location.clone());
        }
        if let Some(notes) = &patch.notes {
            next.notes = Some(notes.clone());
        }
        if let Some(when_time) = patch.when_time {
            next.when_time = Some(when_time);
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(dnd_respect) = patch.dnd_respect {
            next.dnd_respect = dnd_respect;
        }
        if let Some(status) = patch.status {
            if status != current.status {
                if !current.status.can_transition_to(&status) {
                    return Err(ValidationError::InvalidTransition {
                        from: current.status,
                        to: status,
                    }
                    .into());
                }
                next.status = status;
            }
        }

        if next.status != CommitmentStatus::Draft && next.when_time.is_none() {
            return Err(ValidationError::MissingWhenTime {
                status: next.status,
            }
            .into());
        }

        next.version = current.version + 1;
        next.updated_at = Utc::now();

        // Version-checked write: a concurrent mutation between our read
        // and this update leaves zero rows changed.
        let changed = self
            .conn
            .execute(
                "UPDATE commitments
                 SET title = ?1, what_action = ?2, description = ?3, where_location = ?4,
                     notes = ?5, when_time = ?6, status = ?7, priority = ?8,
                     dnd_respect = ?9, version = ?10, updated_at = ?11
                 WHERE id = ?12 AND user_id = ?13 AND version = ?14",
                params![
                    next.title,
                    next.what_action,
                    next.description,
                    next.where_location,
                    next.notes,
                    next.when_time.map(|dt| dt.to_rfc3339()),
                    next.status.as_str(),
                    next.priority,
                    next.dnd_respect,
                    next.version,
                    next.updated_at.to_rfc3339(),
                    id,
                    user_id,
                    current.version,
                ],
            )
            .map_err(StoreError::from)?;

        if changed == 0 {
            let actual = self
                .get(user_id, id)?
                .map(|c| c.version)
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: current.version,
                actual,
            }
            .into());
        }

        Ok(next)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM commitments WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(StoreError::from)?;
        if deleted == 0 {
            return Err(StoreError::NotFound { id: id.to_string() }.into());
        }
        Ok(())
    }

    fn due(&self, now: DateTime<Utc>, batch: usize) -> Result<Vec<Commitment>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {COMMITMENT_COLUMNS} FROM commitments
                 WHERE status = 'scheduled' AND when_time IS NOT NULL AND when_time <= ?1
                 ORDER BY when_time ASC
                 LIMIT ?2"
            ))
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![now.to_rfc3339(), batch as i64], |row| row_to_commitment(row))
            .map_err(StoreError::from)?;
        Ok(rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?)
    }

    fn complete_if_scheduled(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        // Compare-and-swap on status. A concurrent sweep that got here
        // first leaves nothing for us to update.
        let changed = self
            .conn
            .execute(
                "UPDATE commitments
                 SET status = 'completed', version = version + 1, updated_at = ?2
                 WHERE id = ?1 AND status = 'scheduled'",
                params![id, now.to_rfc3339()],
            )
            .map_err(StoreError::from)?;
        Ok(changed > 0)
    }
}

impl NudgeLog for Database {
    fn append(&self, event: &NudgeEvent) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO nudge_events (
                    id, commitment_id, user_id, delivery_status, channel, error, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.id,
                    event.commitment_id,
                    event.user_id,
                    event.delivery_status.as_str(),
                    event.channel,
                    event.error,
                    event.created_at.to_rfc3339(),
                ],
            )
            .map_err(StoreError::from)?;
        Ok(())
    }

    fn sent_count_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64> {
        let count = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM nudge_events
                 WHERE user_id = ?1 AND delivery_status = 'sent'
                   AND created_at >= ?2 AND created_at < ?3",
                params![user_id, start.to_rfc3339(), end.to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(StoreError::from)?;
        Ok(count)
    }

    fn list_events(&self, user_id: &str, limit: usize) -> Result<Vec<NudgeEvent>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, commitment_id, user_id, delivery_status, channel, error, created_at
                 FROM nudge_events
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                let status_str: String = row.get(3)?;
                let created_at_str: String = row.get(6)?;
                Ok(NudgeEvent {
                    id: row.get(0)?,
                    commitment_id: row.get(1)?,
                    user_id: row.get(2)?,
                    delivery_status: parse_delivery_status(&status_str),
                    channel: row.get(4)?,
                    error: row.get(5)?,
                    created_at: parse_datetime_fallback(&created_at_str),
                })
            })
            .map_err(StoreError::from)?;
        Ok(rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?)
    }
}

impl PreferenceStore for Database {
    fn get_prefs(&self, user_id: &str) -> Result<Option<NudgePreference>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT user_id, dnd_enabled, dnd_start_hour, dnd_end_hour,
                        max_daily_nudges, timezone
                 FROM nudge_prefs WHERE user_id = ?1",
            )
            .map_err(StoreError::from)?;
        let result = stmt
            .query_row(params![user_id], |row| {
                Ok(NudgePreference {
                    user_id: row.get(0)?,
                    dnd_enabled: row.get::<_, i64>(1)? != 0,
                    dnd_start_hour: row.get::<_, i64>(2)? as u8,
                    dnd_end_hour: row.get::<_, i64>(3)? as u8,
                    max_daily_nudges: row.get(4)?,
                    timezone: row.get(5)?,
                })
            })
            .optional()
            .map_err(StoreError::from)?;
        Ok(result)
    }

    fn put_prefs(&self, prefs: &NudgePreference) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO nudge_prefs (
                    user_id, dnd_enabled, dnd_start_hour, dnd_end_hour,
                    max_daily_nudges, timezone
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    prefs.user_id,
                    prefs.dnd_enabled,
                    prefs.dnd_start_hour as i64,
                    prefs.dnd_end_hour as i64,
                    prefs.max_daily_nudges,
                    prefs.timezone,
                ],
            )
            .map_err(StoreError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use chrono::{Duration, TimeZone};

    fn make_new(user_id: &str, when_time: Option<DateTime<Utc>>) -> NewCommitment {
        NewCommitment {
            user_id: user_id.to_string(),
            intent_type: IntentType::Reminder,
            title: "Reminder: stretch".to_string(),
            what_action: "stretch".to_string(),
            description: None,
            where_location: None,
            notes: None,
            when_time,
            when_rrule: None,
            priority: 1,
            dnd_respect: true,
            source_message: None,
            parent_id: None,
        }
    }

    fn due_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn create_derives_status_from_when_time() {
        let db = Database::open_memory().unwrap();

        let scheduled = db.create(&make_new("u1", Some(due_at()))).unwrap();
        assert_eq!(scheduled.status, CommitmentStatus::Scheduled);
        assert_eq!(scheduled.version, 1);

        let draft = db.create(&make_new("u1", None)).unwrap();
        assert_eq!(draft.status, CommitmentStatus::Draft);
        assert!(draft.when_time.is_none());
    }

    #[test]
    fn create_rejects_empty_action() {
        let db = Database::open_memory().unwrap();
        let mut new = make_new("u1", Some(due_at()));
        new.what_action = "   ".to_string();
        let err = db.create(&new).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn get_and_delete_enforce_ownership() {
        let db = Database::open_memory().unwrap();
        let created = db.create(&make_new("u1", Some(due_at()))).unwrap();

        assert!(db.get("u1", &created.id).unwrap().is_some());
        assert!(db.get("u2", &created.id).unwrap().is_none());

        let err = db.delete("u2", &created.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store(StoreError::NotFound { .. })
        ));
        // Still present after the rejected delete.
        assert!(db.get("u1", &created.id).unwrap().is_some());

        db.delete("u1", &created.id).unwrap();
        assert!(db.get("u1", &created.id).unwrap().is_none());
    }

    #[test]
    fn update_bumps_version_and_checks_expected() {
        let db = Database::open_memory().unwrap();
        let created = db.create(&make_new("u1", Some(due_at()))).unwrap();

        let patch = CommitmentPatch {
            title: Some("Reminder: stretch properly".to_string()),
            ..Default::default()
        };
        let updated = db.update("u1", &created.id, &patch).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.title, "Reminder: stretch properly");

        // Stale expected version is rejected.
        let stale = CommitmentPatch {
            notes: Some("late note".to_string()),
            expected_version: Some(1),
            ..Default::default()
        };
        let err = db.update("u1", &created.id, &stale).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store(StoreError::Conflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));

        // Other users cannot update at all.
        let err = db.update("u2", &created.id, &patch).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn update_enforces_status_machine() {
        let db = Database::open_memory().unwrap();
        let created = db.create(&make_new("u1", Some(due_at()))).unwrap();

        // scheduled -> draft is not a legal transition.
        let bad = CommitmentPatch {
            status: Some(CommitmentStatus::Draft),
            ..Default::default()
        };
        assert!(matches!(
            db.update("u1", &created.id, &bad).unwrap_err(),
            CoreError::Validation(ValidationError::InvalidTransition { .. })
        ));

        let cancel = CommitmentPatch {
            status: Some(CommitmentStatus::Cancelled),
            ..Default::default()
        };
        let cancelled = db.update("u1", &created.id, &cancel).unwrap();
        assert_eq!(cancelled.status, CommitmentStatus::Cancelled);

        // Reactivation back to scheduled.
        let reactivate = CommitmentPatch {
            status: Some(CommitmentStatus::Scheduled),
            ..Default::default()
        };
        let back = db.update("u1", &created.id, &reactivate).unwrap();
        assert_eq!(back.status, CommitmentStatus::Scheduled);
        assert_eq!(back.version, 3);
    }

    #[test]
    fn draft_cannot_be_scheduled_without_time() {
        let db = Database::open_memory().unwrap();
        let draft = db.create(&make_new("u1", None)).unwrap();

        let promote = CommitmentPatch {
            status: Some(CommitmentStatus::Scheduled),
            ..Default::default()
        };
        assert!(matches!(
            db.update("u1", &draft.id, &promote).unwrap_err(),
            CoreError::Validation(ValidationError::MissingWhenTime { .. })
        ));

        // Supplying a time in the same patch succeeds.
        let promote_with_time = CommitmentPatch {
            status: Some(CommitmentStatus::Scheduled),
            when_time: Some(due_at()),
            ..Default::default()
        };
        let scheduled = db.update("u1", &draft.id, &promote_with_time).unwrap();
        assert_eq!(scheduled.status, CommitmentStatus::Scheduled);
    }

    #[test]
    fn list_filters_and_orders_newest_first() {
        let db = Database::open_memory().unwrap();
        let first = db.create(&make_new("u1", Some(due_at()))).unwrap();
        let second = db.create(&make_new("u1", Some(due_at()))).unwrap();
        db.create(&make_new("u2", Some(due_at()))).unwrap();
        db.create(&make_new("u1", None)).unwrap();

        let all = db.list("u1", StatusFilter::All, 50).unwrap();
        assert_eq!(all.len(), 3);

        let scheduled = db
            .list("u1", StatusFilter::Only(CommitmentStatus::Scheduled), 50)
            .unwrap();
        assert_eq!(scheduled.len(), 2);
        assert_eq!(scheduled[0].id, second.id);
        assert_eq!(scheduled[1].id, first.id);

        let drafts = db
            .list("u1", StatusFilter::Only(CommitmentStatus::Draft), 50)
            .unwrap();
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn due_returns_only_ripe_scheduled_rows_in_order() {
        let db = Database::open_memory().unwrap();
        let now = due_at();

        let late = db
            .create(&make_new("u1", Some(now - Duration::hours(2))))
            .unwrap();
        let later = db
            .create(&make_new("u1", Some(now - Duration::hours(1))))
            .unwrap();
        db.create(&make_new("u1", Some(now + Duration::hours(1))))
            .unwrap();
        db.create(&make_new("u1", None)).unwrap();

        let due = db.due(now, 50).unwrap();
        assert_eq!(
            due.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec![late.id.as_str(), later.id.as_str()]
        );

        // The batch cap limits the result.
        let capped = db.due(now, 1).unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, late.id);
    }

    #[test]
    fn complete_if_scheduled_is_a_one_shot() {
        let db = Database::open_memory().unwrap();
        let created = db.create(&make_new("u1", Some(due_at()))).unwrap();

        assert!(db.complete_if_scheduled(&created.id, due_at()).unwrap());
        // Second attempt finds nothing scheduled -- not an error.
        assert!(!db.complete_if_scheduled(&created.id, due_at()).unwrap());

        let after = db.get("u1", &created.id).unwrap().unwrap();
        assert_eq!(after.status, CommitmentStatus::Completed);
        assert_eq!(after.version, 2);
    }

    #[test]
    fn event_log_counts_sent_within_window() {
        let db = Database::open_memory().unwrap();
        let c = db.create(&make_new("u1", Some(due_at()))).unwrap();
        let now = due_at();

        db.append(&NudgeEvent::outcome(&c, DeliveryStatus::Sent, now))
            .unwrap();
        db.append(&NudgeEvent::outcome(&c, DeliveryStatus::SkippedDnd, now))
            .unwrap();
        db.append(&NudgeEvent::outcome(
            &c,
            DeliveryStatus::Sent,
            now - Duration::days(1),
        ))
        .unwrap();

        let count = db
            .sent_count_between("u1", now - Duration::hours(1), now + Duration::hours(1))
            .unwrap();
        assert_eq!(count, 1);

        let events = db.list_events("u1", 10).unwrap();
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn prefs_round_trip() {
        let db = Database::open_memory().unwrap();
        assert!(db.get_prefs("u1").unwrap().is_none());

        let mut prefs = NudgePreference::defaults("u1");
        prefs.dnd_enabled = true;
        prefs.dnd_start_hour = 23;
        prefs.dnd_end_hour = 7;
        prefs.max_daily_nudges = 5;
        prefs.timezone = "+08:00".to_string();
        db.put_prefs(&prefs).unwrap();

        let loaded = db.get_prefs("u1").unwrap().unwrap();
        assert_eq!(loaded, prefs);

        // Upsert replaces.
        prefs.max_daily_nudges = 2;
        db.put_prefs(&prefs).unwrap();
        assert_eq!(db.get_prefs("u1").unwrap().unwrap().max_daily_nudges, 2);
    }
}
