//! Simple recurrence rules and due-time advancement.
//!
//! Only single-rule `FREQ=DAILY|WEEKLY|MONTHLY` recurrence is supported.
//! Completing a recurring commitment advances its due time by exactly one
//! period and spawns the next occurrence; there is no COUNT/UNTIL/BYDAY.

use chrono::{DateTime, Duration, Months, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Recurrence frequency for a commitment.
///
/// Serialized everywhere (JSON, database) in its wire form,
/// e.g. `"FREQ=DAILY"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Wire/database representation.
    pub fn as_rrule(&self) -> &'static str {
        match self {
            Frequency::Daily => "FREQ=DAILY",
            Frequency::Weekly => "FREQ=WEEKLY",
            Frequency::Monthly => "FREQ=MONTHLY",
        }
    }

    /// Advance a due time by one period of this rule.
    ///
    /// `Monthly` adds one calendar month and clamps to the last valid day
    /// of the target month, so `2024-01-31` advances to `2024-02-29`
    /// rather than skipping into March.
    pub fn advance(&self, when: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Frequency::Daily => when + Duration::days(1),
            Frequency::Weekly => when + Duration::days(7),
            Frequency::Monthly => when
                .checked_add_months(Months::new(1))
                // Only reachable at the far end of the representable range.
                .unwrap_or(when),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_rrule())
    }
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    /// Accepts the wire form (`FREQ=DAILY`) and the bare keyword (`DAILY`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase();
        let token = token.strip_prefix("FREQ=").unwrap_or(&token);
        match token {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

/// Error returned when a recurrence rule string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFrequencyError(pub String);

impl fmt::Display for ParseFrequencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized recurrence rule: {}", self.0)
    }
}

impl std::error::Error for ParseFrequencyError {}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_rrule())
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RruleVisitor;

        impl Visitor<'_> for RruleVisitor {
            type Value = Frequency;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a recurrence rule like FREQ=DAILY")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Frequency, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(RruleVisitor)
    }
}
