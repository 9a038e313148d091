//! Append-only nudge event log types.
//!
//! Every delivery attempt produces exactly one event. Events are never
//! updated or deleted by the engine; the sweep reads them back only to
//! compute "today's sent count" for the daily cap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commitment::Commitment;

/// Delivery channel recorded on events produced by this engine.
pub const DEFAULT_CHANNEL: &str = "local";

/// What happened to one delivery attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// The nudge fired and the commitment was completed.
    Sent,
    /// Suppressed by the user's do-not-disturb window; retried next sweep.
    SkippedDnd,
    /// Suppressed by the daily volume cap; retried next sweep.
    SkippedLimit,
    /// Processing failed; the commitment stays scheduled for retry.
    Error,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::SkippedDnd => "skipped_dnd",
            DeliveryStatus::SkippedLimit => "skipped_limit",
            DeliveryStatus::Error => "error",
        }
    }
}

/// One row in the append-only nudge log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeEvent {
    pub id: String,
    pub commitment_id: String,
    pub user_id: String,
    pub delivery_status: DeliveryStatus,
    pub channel: String,
    /// Failure detail, present only for `Error` events.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NudgeEvent {
    /// Event for a successful or skipped delivery attempt.
    pub fn outcome(
        commitment: &Commitment,
        delivery_status: DeliveryStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            commitment_id: commitment.id.clone(),
            user_id: commitment.user_id.clone(),
            delivery_status,
            channel: DEFAULT_CHANNEL.to_string(),
            error: None,
            created_at: at,
        }
    }

    /// Event for a failed processing attempt, carrying the failure detail.
    pub fn failure(commitment: &Commitment, detail: String, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            commitment_id: commitment.id.clone(),
            user_id: commitment.user_id.clone(),
            delivery_status: DeliveryStatus::Error,
            channel: DEFAULT_CHANNEL.to_string(),
            error: Some(detail),
            created_at: at,
        }
    }
}
