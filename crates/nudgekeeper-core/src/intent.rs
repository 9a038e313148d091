//! Natural-language commitment extraction.
//!
//! `extract` turns one free-text utterance into a [`DraftCommitment`], or
//! `None` when no commitment intent is present. It is a deterministic
//! keyword extractor: three intent patterns tested in order, plus the
//! lookup tables in [`crate::timewords`]. No storage is consulted and the
//! clock is a parameter, so the whole thing is a pure function of its
//! inputs.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commitment::{IntentType, NewCommitment};
use crate::recurrence::Frequency;
use crate::timewords::{
    self, clock_match, date_match, frequency_match, reminder_match, time_of_day_match,
};

/// A commitment extracted from text but not yet confirmed or persisted.
///
/// Guaranteed by `extract`: `what_action` and `title` are non-empty, and
/// either `when_time` is resolved or `needs_clarification` is true with
/// suggestions attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftCommitment {
    pub intent_type: IntentType,
    pub title: String,
    pub what_action: String,
    pub when_time: Option<DateTime<Utc>>,
    pub when_rrule: Option<Frequency>,
    pub needs_clarification: bool,
    pub suggestions: Suggestions,
    pub source_message: String,
}

impl DraftCommitment {
    /// Convert into store input for the given owner.
    pub fn into_new(self, user_id: &str) -> NewCommitment {
        NewCommitment {
            user_id: user_id.to_string(),
            intent_type: self.intent_type,
            title: self.title,
            what_action: self.what_action,
            description: None,
            where_location: None,
            notes: None,
            when_time: self.when_time,
            when_rrule: self.when_rrule,
            priority: 1,
            dnd_respect: true,
            source_message: Some(self.source_message),
            parent_id: None,
        }
    }
}

/// Deterministic clarification candidates shown back to the user when a
/// draft could not be fully resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Suggestions {
    pub time_options: Vec<String>,
    pub frequency_options: Vec<String>,
    pub action_options: Vec<String>,
}

/// Extract a commitment from one user utterance.
///
/// The three intent patterns are tested in order -- reminder, scheduled,
/// recurring -- and the first match fixes `intent_type`. A frequency
/// keyword anywhere in the message resolves the recurrence rule regardless
/// of which pattern matched, so "every day remind me to drink water" is a
/// reminder that regenerates daily.
///
/// `when_time` resolves when the message carries a relative-date keyword,
/// an explicit clock time, or a recurrence rule (first occurrence lands on
/// `now`'s date). A time-of-day keyword alone is not confident enough; the
/// draft comes back with `needs_clarification` instead.
pub fn extract<Tz: TimeZone>(message: &str, now: DateTime<Tz>) -> Option<DraftCommitment> {
    let message = message.trim();
    if message.is_empty() {
        return None;
    }

    let reminder = reminder_match(message);
    let date = date_match(message);
    let clock = clock_match(message);
    let time_of_day = time_of_day_match(message);
    let frequency = frequency_match(message);

    // First matching pattern wins.
    let (intent_type, action_from) = if let Some(range) = &reminder {
        (IntentType::Reminder, range.end)
    } else if let Some((_, range)) = &date {
        (IntentType::Scheduled, range.end)
    } else if let Some((_, range)) = &frequency {
        (IntentType::Recurring, range.end)
    } else {
        return None;
    };

    let what_action = clean_action(&message[action_from..], message);
    let when_rrule = frequency.as_ref().map(|(f, _)| *f);

    let (hour, minute) = match (&clock, &time_of_day) {
        (Some(((h, m), _)), _) => (*h, *m),
        (None, Some((h, _))) => (*h, 0),
        (None, None) => (timewords::DEFAULT_HOUR, 0),
    };
    let when_time = if let Some((days, _)) = &date {
        timewords::resolve_at(&now, *days, hour, minute)
    } else if clock.is_some() || when_rrule.is_some() {
        // Explicit clock or a recurrence rule anchors the date to today.
        timewords::resolve_at(&now, 0, hour, minute)
    } else {
        None
    };

    let needs_clarification = when_time.is_none();
    let title = derive_title(intent_type, when_rrule, &what_action);
    let suggestions = suggestions_for(intent_type, &what_action);

    debug!(
        intent = %intent_type,
        clarify = needs_clarification,
        recurring = when_rrule.is_some(),
        "commitment intent detected"
    );

    Some(DraftCommitment {
        intent_type,
        title,
        what_action,
        when_time,
        when_rrule,
        needs_clarification,
        suggestions,
        source_message: message.to_string(),
    })
}

/// Strip structural keywords and leading particles from the captured
/// action phrase. Falls back to the whole message when nothing survives.
fn clean_action(captured: &str, whole_message: &str) -> String {
    let stripped = timewords::strip_time_words(captured);
    let trimmed = trim_particles(&stripped);
    if trimmed.is_empty() {
        let fallback = trim_particles(&timewords::strip_time_words(whole_message));
        if fallback.is_empty() {
            whole_message.trim().to_string()
        } else {
            fallback
        }
    } else {
        trimmed
    }
}

/// Leading connective words between an intent keyword and the action.
const LEADING_PARTICLES: &[&str] = &[
    "to", "that", "about", "at", "in", "on", "the", "我", "要", "去",
];

const EDGE_PUNCT: &[char] = &[
    ',', '.', ';', ':', '!', '?', '，', '。', '：', '！', '？', '、',
];

fn trim_particles(s: &str) -> String {
    let mut rest = s.trim().trim_matches(EDGE_PUNCT).trim();
    loop {
        let mut progressed = false;
        for p in LEADING_PARTICLES {
            if let Some(after) = rest.strip_prefix(p) {
                // ASCII particles must be whole words.
                if p.is_ascii() && !after.starts_with(char::is_whitespace) {
                    continue;
                }
                rest = after.trim_start().trim_start_matches(EDGE_PUNCT).trim_start();
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    rest.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn derive_title(intent: IntentType, rrule: Option<Frequency>, action: &str) -> String {
    match intent {
        IntentType::Reminder => format!("Reminder: {action}"),
        IntentType::Recurring => match rrule {
            Some(Frequency::Daily) => format!("Every day: {action}"),
            Some(Frequency::Weekly) => format!("Every week: {action}"),
            Some(Frequency::Monthly) => format!("Every month: {action}"),
            None => action.to_string(),
        },
        // The extractor never produces Meeting/Task; title is the action.
        IntentType::Scheduled | IntentType::Meeting | IntentType::Task => action.to_string(),
    }
}

/// Candidate options mirroring the intent type, used by callers to prompt
/// the user when clarification is needed.
fn suggestions_for(intent: IntentType, action: &str) -> Suggestions {
    match intent {
        IntentType::Reminder => Suggestions {
            time_options: vec![
                "later today".to_string(),
                "tomorrow 09:00".to_string(),
                "tomorrow 15:00".to_string(),
            ],
            frequency_options: Vec::new(),
            action_options: vec![action.to_string(), format!("finish {action}")],
        },
        IntentType::Scheduled | IntentType::Meeting | IntentType::Task => Suggestions {
            time_options: vec![
                "08:00".to_string(),
                "09:00".to_string(),
                "10:00".to_string(),
            ],
            frequency_options: vec![
                "none".to_string(),
                "FREQ=DAILY".to_string(),
                "FREQ=WEEKLY".to_string(),
            ],
            action_options: Vec::new(),
        },
        IntentType::Recurring => Suggestions {
            time_options: vec![
                "08:00".to_string(),
                "12:00".to_string(),
                "18:00".to_string(),
            ],
            frequency_options: vec![
                "FREQ=DAILY".to_string(),
                "FREQ=WEEKLY".to_string(),
                "FREQ=MONTHLY".to_string(),
            ],
            action_options: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn noon_jan_1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn no_intent_yields_none() {
        assert!(extract("the weather is nice", noon_jan_1()).is_none());
        assert!(extract("", noon_jan_1()).is_none());
        assert!(extract("   ", noon_jan_1()).is_none());
    }

    #[test]
    fn bare_reminder_needs_clarification() {
        let draft = extract("remind me to call mom", noon_jan_1()).unwrap();
        assert_eq!(draft.intent_type, IntentType::Reminder);
        assert_eq!(draft.what_action, "call mom");
        assert_eq!(draft.title, "Reminder: call mom");
        assert!(draft.when_time.is_none());
        assert!(draft.needs_clarification);
        assert!(!draft.suggestions.time_options.is_empty());
    }

    #[test]
    fn tomorrow_morning_reminder_resolves_to_nine() {
        // "明天早上 提醒我 運動" -- tomorrow + morning + reminder keyword.
        let draft = extract("明天早上 提醒我 運動", noon_jan_1()).unwrap();
        assert_eq!(draft.intent_type, IntentType::Reminder);
        assert!(!draft.needs_clarification);
        assert_eq!(
            draft.when_time.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
        );
        assert_eq!(draft.what_action, "運動");
    }

    #[test]
    fn english_tomorrow_morning_equivalent() {
        let draft = extract("tomorrow morning remind me to work out", noon_jan_1()).unwrap();
        assert_eq!(draft.intent_type, IntentType::Reminder);
        assert!(!draft.needs_clarification);
        assert_eq!(
            draft.when_time.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
        );
        assert_eq!(draft.what_action, "work out");
    }

    #[test]
    fn daily_keyword_resolves_rrule() {
        // "每天 提醒我 喝水" -- reminder keyword wins the intent, the
        // frequency keyword still resolves the rule.
        let draft = extract("每天 提醒我 喝水", noon_jan_1()).unwrap();
        assert_eq!(draft.when_rrule, Some(Frequency::Daily));
        assert!(!draft.needs_clarification);
        // First occurrence lands today at the default clock time.
        assert_eq!(
            draft.when_time.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(draft.what_action, "喝水");
    }

    #[test]
    fn pure_recurring_intent() {
        let draft = extract("every week water the plants", noon_jan_1()).unwrap();
        assert_eq!(draft.intent_type, IntentType::Recurring);
        assert_eq!(draft.when_rrule, Some(Frequency::Weekly));
        assert_eq!(draft.what_action, "water the plants");
        assert_eq!(draft.title, "Every week: water the plants");
        assert!(!draft.needs_clarification);
    }

    #[test]
    fn scheduled_with_explicit_clock() {
        let draft = extract("tomorrow 8:30 dentist appointment", noon_jan_1()).unwrap();
        assert_eq!(draft.intent_type, IntentType::Scheduled);
        assert_eq!(
            draft.when_time.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 8, 30, 0).unwrap()
        );
        assert_eq!(draft.what_action, "dentist appointment");
    }

    #[test]
    fn explicit_clock_alone_anchors_today() {
        let draft = extract("remind me at 18:45 to stretch", noon_jan_1()).unwrap();
        assert!(!draft.needs_clarification);
        assert_eq!(
            draft.when_time.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 18, 45, 0).unwrap()
        );
    }

    #[test]
    fn time_of_day_alone_is_not_confident() {
        let draft = extract("remind me in the evening to stretch", noon_jan_1()).unwrap();
        assert!(draft.when_time.is_none());
        assert!(draft.needs_clarification);
    }

    #[test]
    fn date_keyword_without_time_defaults_to_nine() {
        let draft = extract("next week submit the expense report", noon_jan_1()).unwrap();
        assert_eq!(draft.intent_type, IntentType::Scheduled);
        assert_eq!(
            draft.when_time.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn resolution_happens_in_the_callers_timezone() {
        let off = chrono::FixedOffset::east_opt(8 * 3600).unwrap();
        let now = off.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        let draft = extract("tomorrow morning remind me to run", now).unwrap();
        // Tomorrow 09:00 in +08:00 is 01:00 UTC.
        assert_eq!(
            draft.when_time.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap()
        );
    }

    proptest! {
        /// The extractor never panics, and any draft honors the output
        /// guarantee: a non-empty action plus either a resolved time or a
        /// clarification request with suggestions.
        #[test]
        fn extract_output_guarantee(message in "\\PC{0,60}") {
            if let Some(draft) = extract(&message, noon_jan_1()) {
                prop_assert!(!draft.what_action.trim().is_empty());
                prop_assert!(!draft.title.trim().is_empty());
                prop_assert!(
                    draft.when_time.is_some()
                        || (draft.needs_clarification
                            && !draft.suggestions.time_options.is_empty())
                );
            }
        }
    }
}
