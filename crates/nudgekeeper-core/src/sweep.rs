//! Scheduler sweep over due commitments.
//!
//! One sweep is a stateless batch pass: fetch due commitments, consult
//! the delivery policy, complete the ones that fire, log every outcome,
//! and spawn the next occurrence for recurring rules. No internal thread
//! and no global state -- an external trigger invokes `run_sweep(now)` on
//! a cadence, and correctness holds even when two sweeps overlap because
//! the completion write is guarded (see `CommitmentStore::complete_if_scheduled`).

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::commitment::{Commitment, NewCommitment, NudgePreference};
use crate::error::Result;
use crate::events::{DeliveryStatus, NudgeEvent};
use crate::policy::{self, Verdict};
use crate::store::{CommitmentStore, NudgeLog, PreferenceStore};

/// Upper bound on commitments examined by a single sweep.
pub const DEFAULT_BATCH: usize = 50;

/// Aggregate counts for one sweep invocation. Skips are not errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepOutcome {
    /// Due commitments examined.
    pub processed: usize,
    /// Commitments delivered and completed.
    pub sent: usize,
    /// Commitments whose processing failed (retried next sweep).
    pub errors: usize,
}

/// How a single commitment was handled within a sweep.
enum Handled {
    Sent,
    Skipped,
    /// The guarded transition found the row no longer `scheduled`; a
    /// concurrent or earlier sweep already fired it.
    AlreadyHandled,
}

/// Run one sweep at `now`.
///
/// Each due commitment is processed independently; one bad row cannot
/// abort the batch. Failures append an `error` event and leave the row
/// `scheduled`, so the next sweep naturally retries it.
pub fn run_sweep<S>(store: &S, now: DateTime<Utc>, batch: usize) -> Result<SweepOutcome>
where
    S: CommitmentStore + NudgeLog + PreferenceStore + ?Sized,
{
    let due = store.due(now, batch)?;
    let mut outcome = SweepOutcome {
        processed: due.len(),
        ..Default::default()
    };

    for commitment in &due {
        match process_one(store, commitment, now) {
            Ok(Handled::Sent) => outcome.sent += 1,
            Ok(Handled::Skipped) | Ok(Handled::AlreadyHandled) => {}
            Err(err) => {
                warn!(id = %commitment.id, error = %err, "sweep failed to process commitment");
                let event = NudgeEvent::failure(commitment, err.to_string(), now);
                if let Err(log_err) = store.append(&event) {
                    warn!(id = %commitment.id, error = %log_err, "failed to append error event");
                }
                outcome.errors += 1;
            }
        }
    }

    info!(
        processed = outcome.processed,
        sent = outcome.sent,
        errors = outcome.errors,
        "sweep complete"
    );
    Ok(outcome)
}

fn process_one<S>(store: &S, commitment: &Commitment, now: DateTime<Utc>) -> Result<Handled>
where
    S: CommitmentStore + NudgeLog + PreferenceStore + ?Sized,
{
    let prefs = store
        .get_prefs(&commitment.user_id)?
        .unwrap_or_else(|| NudgePreference::defaults(&commitment.user_id));

    let (day_start, day_end) = policy::today_bounds(now, prefs.utc_offset());
    let today_sent = store.sent_count_between(&commitment.user_id, day_start, day_end)?;

    match policy::may_deliver(commitment, &prefs, now, today_sent) {
        Verdict::SkipDnd => {
            debug!(id = %commitment.id, "skipped: do-not-disturb window");
            store.append(&NudgeEvent::outcome(
                commitment,
                DeliveryStatus::SkippedDnd,
                now,
            ))?;
            Ok(Handled::Skipped)
        }
        Verdict::SkipLimit => {
            debug!(id = %commitment.id, today_sent, "skipped: daily cap reached");
            store.append(&NudgeEvent::outcome(
                commitment,
                DeliveryStatus::SkippedLimit,
                now,
            ))?;
            Ok(Handled::Skipped)
        }
        Verdict::Allow => {
            // The guard must happen before the sent event and before any
            // recurrence spawn; losing the race means another sweep owns
            // this firing.
            if !store.complete_if_scheduled(&commitment.id, now)? {
                debug!(id = %commitment.id, "already handled by a concurrent sweep");
                return Ok(Handled::AlreadyHandled);
            }
            store.append(&NudgeEvent::outcome(commitment, DeliveryStatus::Sent, now))?;

            if let (Some(rule), Some(when)) = (commitment.when_rrule, commitment.when_time) {
                let next_time = rule.advance(when);
                let sibling = NewCommitment {
                    user_id: commitment.user_id.clone(),
                    intent_type: commitment.intent_type,
                    title: commitment.title.clone(),
                    what_action: commitment.what_action.clone(),
                    description: commitment.description.clone(),
                    where_location: commitment.where_location.clone(),
                    notes: commitment.notes.clone(),
                    when_time: Some(next_time),
                    when_rrule: Some(rule),
                    priority: commitment.priority,
                    dnd_respect: commitment.dnd_respect,
                    source_message: commitment.source_message.clone(),
                    parent_id: Some(commitment.id.clone()),
                };
                let spawned = store.create(&sibling)?;
                debug!(
                    id = %commitment.id,
                    next = %spawned.id,
                    due = %next_time,
                    "spawned next recurrence occurrence"
                );
            }

            Ok(Handled::Sent)
        }
    }
}
