//! # Nudgekeeper Core Library
//!
//! This library turns free-form natural language ("remind me tomorrow
//! morning", "every day at 8, walk") into durable, time-triggered
//! commitments and delivers them when appropriate -- respecting each
//! user's do-not-disturb window and daily volume cap, and regenerating
//! recurring commitments after they fire.
//!
//! ## Architecture
//!
//! - **Intent Extractor**: a deterministic keyword extractor producing a
//!   draft commitment (possibly needing clarification) from one message
//! - **Commitment Store**: a persistence contract with optimistic
//!   versioning and a guarded status transition, backed by SQLite
//! - **Delivery Policy**: pure evaluation of DND windows and daily caps
//! - **Scheduler Sweep**: the periodic batch pass that fires due
//!   commitments exactly once and spawns recurrence successors
//! - **Event Log**: append-only record of every delivery attempt
//!
//! The sweep is caller-driven: nothing here spawns threads or reads the
//! wall clock on its own. `run_sweep(now)` and `extract(message, now)`
//! take the clock explicitly, so both are deterministic under test.
//!
//! ## Key Components
//!
//! - [`intent::extract`]: message -> draft commitment
//! - [`sweep::run_sweep`]: one scheduler pass
//! - [`policy::may_deliver`]: delivery verdict for one due commitment
//! - [`storage::Database`]: SQLite implementation of the store traits

pub mod commitment;
pub mod error;
pub mod events;
pub mod intent;
pub mod policy;
pub mod recurrence;
pub mod storage;
pub mod store;
pub mod sweep;
pub mod timewords;

pub use commitment::{
    Commitment, CommitmentPatch, CommitmentStatus, IntentType, NewCommitment, NudgePreference,
};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use events::{DeliveryStatus, NudgeEvent};
pub use intent::{extract, DraftCommitment, Suggestions};
pub use policy::{may_deliver, Verdict};
pub use recurrence::Frequency;
pub use storage::{Config, Database};
pub use store::{CommitmentStore, NudgeLog, PreferenceStore, StatusFilter};
pub use sweep::{run_sweep, SweepOutcome, DEFAULT_BATCH};
