//! Keyword tables mapping relative-date, time-of-day, and frequency words
//! to concrete values, plus explicit clock-time scanning.
//!
//! These are pure lookup tables, not a grammar. Every resolution function
//! takes the clock as a parameter so callers stay deterministic under test.
//! English keywords are matched with word boundaries; the CJK forms carried
//! over from the original product cannot use `\b` (CJK codepoints are word
//! characters, so boundaries never fall between them) and are matched bare.

use chrono::{DateTime, Days, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::recurrence::Frequency;

/// Default clock time (09:00) when an intent needs one and the message
/// carries no time information.
pub const DEFAULT_HOUR: u32 = 9;

/// "remind/remember/don't forget" class keywords.
const REMINDER_KEYWORDS: &[&str] = &[
    "remind me",
    "remind",
    "remember to",
    "don't forget",
    "dont forget",
    "提醒",
    "記得",
    "记得",
    "別忘",
    "别忘",
];

/// Relative-date keywords and their offset in days from "now".
/// Longer keywords precede their substrings so "day after tomorrow"
/// wins over "tomorrow".
const RELATIVE_DATES: &[(&str, i64)] = &[
    ("day after tomorrow", 2),
    ("後天", 2),
    ("后天", 2),
    ("tomorrow", 1),
    ("明天", 1),
    ("next week", 7),
    ("下週", 7),
    ("下周", 7),
    ("next month", 30),
    ("下個月", 30),
    ("下个月", 30),
];

/// Time-of-day keywords and the hour they resolve to.
const TIMES_OF_DAY: &[(&str, u32)] = &[
    ("morning", 9),
    ("早上", 9),
    ("上午", 9),
    ("noon", 12),
    ("中午", 12),
    ("afternoon", 15),
    ("下午", 15),
    ("evening", 20),
    ("tonight", 20),
    ("晚上", 20),
];

/// Frequency keywords.
const FREQUENCIES: &[(&str, Frequency)] = &[
    ("every day", Frequency::Daily),
    ("daily", Frequency::Daily),
    ("每天", Frequency::Daily),
    ("every week", Frequency::Weekly),
    ("weekly", Frequency::Weekly),
    ("每週", Frequency::Weekly),
    ("每周", Frequency::Weekly),
    ("every month", Frequency::Monthly),
    ("monthly", Frequency::Monthly),
    ("每月", Frequency::Monthly),
];

/// Build a case-insensitive alternation over a keyword list, bounding
/// ASCII keywords with `\b` and leaving CJK keywords bare.
fn keyword_pattern(words: &[&str]) -> String {
    let alts = words
        .iter()
        .map(|w| {
            let escaped = regex::escape(w);
            if w.is_ascii() {
                format!(r"\b{escaped}\b")
            } else {
                escaped
            }
        })
        .collect::<Vec<_>>()
        .join("|");
    format!("(?i)(?:{alts})")
}

static REMINDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&keyword_pattern(REMINDER_KEYWORDS)).unwrap());

static RELATIVE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    let words: Vec<&str> = RELATIVE_DATES.iter().map(|(w, _)| *w).collect();
    Regex::new(&keyword_pattern(&words)).unwrap()
});

static TIME_OF_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    let words: Vec<&str> = TIMES_OF_DAY.iter().map(|(w, _)| *w).collect();
    Regex::new(&keyword_pattern(&words)).unwrap()
});

static FREQUENCY_RE: Lazy<Regex> = Lazy::new(|| {
    let words: Vec<&str> = FREQUENCIES.iter().map(|(w, _)| *w).collect();
    Regex::new(&keyword_pattern(&words)).unwrap()
});

/// Explicit clock time, ASCII or fullwidth colon. Digit-adjacency is
/// checked manually because the regex crate has no lookaround.
static CLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})[:：](\d{2})").unwrap());

/// Find a "remind"-class keyword; returns the byte range of the match.
pub(crate) fn reminder_match(message: &str) -> Option<Range<usize>> {
    REMINDER_RE.find(message).map(|m| m.range())
}

/// Find a relative-date keyword; returns its day offset and byte range.
pub(crate) fn date_match(message: &str) -> Option<(i64, Range<usize>)> {
    let m = RELATIVE_DATE_RE.find(message)?;
    let days = lookup(RELATIVE_DATES, m.as_str())?;
    Some((days, m.range()))
}

/// Find a time-of-day keyword; returns its hour and byte range.
pub(crate) fn time_of_day_match(message: &str) -> Option<(u32, Range<usize>)> {
    let m = TIME_OF_DAY_RE.find(message)?;
    let hour = lookup(TIMES_OF_DAY, m.as_str())?;
    Some((hour, m.range()))
}

/// Find a frequency keyword; returns the rule and byte range.
pub(crate) fn frequency_match(message: &str) -> Option<(Frequency, Range<usize>)> {
    let m = FREQUENCY_RE.find(message)?;
    let freq = lookup(FREQUENCIES, m.as_str())?;
    Some((freq, m.range()))
}

fn lookup<T: Copy>(table: &[(&str, T)], matched: &str) -> Option<T> {
    let key = matched.to_lowercase();
    table.iter().find(|(w, _)| *w == key).map(|(_, v)| *v)
}

/// Find the first valid explicit `H:MM`/`HH:MM` clock time.
///
/// Rejects candidates glued to surrounding digits (so "123:456" yields
/// nothing) and out-of-range values.
pub(crate) fn clock_match(message: &str) -> Option<((u32, u32), Range<usize>)> {
    for cap in CLOCK_RE.captures_iter(message) {
        let whole = cap.get(0).expect("capture 0 always present");
        let before = message[..whole.start()].chars().next_back();
        let after = message[whole.end()..].chars().next();
        if matches!(before, Some(c) if c.is_ascii_digit()) {
            continue;
        }
        if matches!(after, Some(c) if c.is_ascii_digit()) {
            continue;
        }
        let hour: u32 = match cap[1].parse() {
            Ok(h) => h,
            Err(_) => continue,
        };
        let minute: u32 = match cap[2].parse() {
            Ok(m) => m,
            Err(_) => continue,
        };
        if hour < 24 && minute < 60 {
            return Some(((hour, minute), whole.range()));
        }
    }
    None
}

/// Strip every structural keyword (dates, times of day, frequencies,
/// explicit clock times) out of a phrase, leaving the action text.
pub(crate) fn strip_time_words(phrase: &str) -> String {
    let s = CLOCK_RE.replace_all(phrase, " ");
    let s = RELATIVE_DATE_RE.replace_all(&s, " ");
    let s = TIME_OF_DAY_RE.replace_all(&s, " ");
    let s = FREQUENCY_RE.replace_all(&s, " ");
    s.into_owned()
}

/// Map a day offset and clock time to an absolute UTC instant, resolved
/// in the calendar frame of `now`'s timezone.
///
/// Returns `None` only for unrepresentable dates at the edge of chrono's
/// range.
pub fn resolve_at<Tz: TimeZone>(
    now: &DateTime<Tz>,
    days_offset: i64,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Utc>> {
    let date = now
        .date_naive()
        .checked_add_days(Days::new(u64::try_from(days_offset).ok()?))?;
    let naive = date.and_hms_opt(hour, minute, 0)?;
    now.timezone()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
