//! Best-effort extraction of structured event drafts from free-form text.
//!
//! This is the pure fallback half of the extraction pipeline. Date and
//! time recognition are ordered matcher tables where the first match wins,
//! so each format is testable on its own and new formats slot in without
//! touching the others. The primary language-model half lives in `tl-nlu`
//! and produces the same [`ExtractedFields`] shape.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::AreaClassifier;
use crate::event::LifeArea;
use crate::types::{AreaId, Confidence, EventSource};

/// Confidence assigned to every extracted draft.
pub const EXTRACTION_CONFIDENCE: f32 = 0.7;

/// Default event length when no end time was found.
const DEFAULT_DURATION_MINUTES: i64 = 60;

/// How far around an event keyword to look for dates and times.
const CONTEXT_RADIUS_BYTES: usize = 50;

/// Raw text fields for one candidate event, before resolution.
///
/// Produced by either the language-model analysis or the regex fallback.
/// All fields except the title are optional free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub title: String,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub participants: Vec<String>,
}

/// A fully resolved draft event ready for user confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftEvent {
    pub title: String,
    pub start: chrono::DateTime<Utc>,
    pub end: chrono::DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub participants: Vec<String>,
    pub area: Option<AreaId>,
    pub source: EventSource,
    pub confidence: Confidence,
}

/// Ordered date matchers. Each pairs a locating regex with the chrono
/// formats to try on the matched substring; ambiguous formats list both
/// readings and the first successful parse wins.
static DATE_MATCHERS: LazyLock<Vec<(Regex, &[&str])>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap(),
            &["%Y-%m-%d"] as &[&str],
        ),
        (
            Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").unwrap(),
            &["%m/%d/%Y", "%d/%m/%Y"],
        ),
        (
            Regex::new(r"(?i)\b[a-z]{3,9} \d{1,2}, \d{4}").unwrap(),
            &["%B %d, %Y", "%b %d, %Y"],
        ),
        (
            Regex::new(r"(?i)\b\d{1,2} [a-z]{3,9} \d{4}\b").unwrap(),
            &["%d %B %Y", "%d %b %Y"],
        ),
    ]
});

/// Hour with meridiem, minutes optional: "2pm", "2:30 PM".
static MERIDIEM_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(?::([0-5]\d))?\s*(am|pm)\b").unwrap());

/// 24-hour clock: "14:30".
static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").unwrap());

/// Words that mark a probable event mention in free text.
static EVENT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(meeting|appointment|call|conference|lunch|dinner|workshop|training|interview)\b",
    )
    .unwrap()
});

/// The first calendar date found in `text`, if any.
fn find_calendar_date(text: &str) -> Option<(String, NaiveDate)> {
    for (pattern, formats) in DATE_MATCHERS.iter() {
        let Some(found) = pattern.find(text) else {
            continue;
        };
        for format in *formats {
            if let Ok(date) = NaiveDate::parse_from_str(found.as_str(), format) {
                return Some((found.as_str().to_string(), date));
            }
        }
    }
    None
}

/// Resolve a date mention to a calendar date. Never fails.
///
/// Calendar formats are tried first, then relative words; anything
/// unrecognized falls back to `today`.
#[must_use]
pub fn resolve_date(text: &str, today: NaiveDate) -> NaiveDate {
    if let Some((_, date)) = find_calendar_date(text) {
        return date;
    }
    let lower = text.to_lowercase();
    if lower.contains("tomorrow") {
        return today + Duration::days(1);
    }
    if lower.contains("today") {
        return today;
    }
    today
}

/// Resolve a time mention to a time of day, or `None` when nothing in the
/// text looks like a time. Never errors.
#[must_use]
pub fn resolve_time(text: &str) -> Option<NaiveTime> {
    let lower = text.to_lowercase();
    if lower.contains("noon") {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }
    if lower.contains("midnight") {
        return NaiveTime::from_hms_opt(0, 0, 0);
    }

    if let Some(caps) = MERIDIEM_TIME.captures(text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps
            .get(2)
            .map_or(Ok(0), |m| m.as_str().parse())
            .ok()?;
        if (1..=12).contains(&hour) {
            let pm = caps.get(3)?.as_str().eq_ignore_ascii_case("pm");
            // 12-hour fold: 12am is midnight, 12pm is noon.
            let hour = hour % 12 + if pm { 12 } else { 0 };
            return NaiveTime::from_hms_opt(hour, minute, 0);
        }
    }

    if let Some(caps) = CLOCK_TIME.captures(text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    None
}

/// Nearest char boundary at or below `index`.
fn floor_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Nearest char boundary at or above `index`.
fn ceil_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn capitalize(word: &str) -> String {
    let mut out = word.to_lowercase();
    if let Some(first) = out.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    out
}

/// Scan free text for event keywords and collect nearby date and time
/// mentions into candidate fields.
///
/// Each keyword occurrence yields one candidate; the surrounding context
/// window is searched with the same matcher tables the resolvers use.
#[must_use]
pub fn fallback_extract(text: &str) -> Vec<ExtractedFields> {
    let mut candidates = Vec::new();
    for found in EVENT_KEYWORD.find_iter(text) {
        let start = floor_boundary(text, found.start().saturating_sub(CONTEXT_RADIUS_BYTES));
        let end = ceil_boundary(text, found.end() + CONTEXT_RADIUS_BYTES);
        let context = &text[start..end];

        let date = find_calendar_date(context).map(|(raw, _)| raw).or_else(|| {
            let lower = context.to_lowercase();
            if lower.contains("tomorrow") {
                Some("tomorrow".to_string())
            } else if lower.contains("today") {
                Some("today".to_string())
            } else {
                None
            }
        });
        let start_time = resolve_time(context).map(|t| t.format("%H:%M").to_string());

        candidates.push(ExtractedFields {
            title: capitalize(found.as_str()),
            date,
            start_time,
            ..ExtractedFields::default()
        });
    }
    tracing::debug!(candidates = candidates.len(), "fallback extraction");
    candidates
}

/// Resolve raw fields into a draft event.
///
/// A candidate with an empty title or no recognizable start time is
/// dropped, never an error. A missing or inverted end time defaults to one
/// hour after the start.
#[must_use]
pub fn resolve_draft(
    fields: &ExtractedFields,
    today: NaiveDate,
    classifier: &AreaClassifier,
    areas: &[LifeArea],
) -> Option<DraftEvent> {
    let title = fields.title.trim();
    if title.is_empty() {
        return None;
    }

    let date = fields
        .date
        .as_deref()
        .map_or(today, |d| resolve_date(d, today));
    let start_time = fields.start_time.as_deref().and_then(resolve_time)?;
    let start = date.and_time(start_time).and_utc();

    let end = fields
        .end_time
        .as_deref()
        .and_then(resolve_time)
        .map(|t| date.and_time(t).and_utc())
        .filter(|&e| e > start)
        .unwrap_or(start + Duration::minutes(DEFAULT_DURATION_MINUTES));

    Some(DraftEvent {
        title: title.to_string(),
        start,
        end,
        location: fields.location.clone(),
        description: fields.description.clone(),
        participants: fields.participants.clone(),
        area: classifier.classify(title, areas),
        source: EventSource::Extracted,
        confidence: Confidence::clamped(EXTRACTION_CONFIDENCE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    #[test]
    fn resolve_date_iso() {
        assert_eq!(
            resolve_date("on 2025-04-01 at noon", today()),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
        );
    }

    #[test]
    fn resolve_date_us_slash_first() {
        // 3/5/2025 reads month-first.
        assert_eq!(
            resolve_date("3/5/2025", today()),
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
        );
    }

    #[test]
    fn resolve_date_day_first_when_month_invalid() {
        // 25/03/2025 cannot be month-first, so day-first applies.
        assert_eq!(
            resolve_date("25/03/2025", today()),
            NaiveDate::from_ymd_opt(2025, 3, 25).unwrap()
        );
    }

    #[test]
    fn resolve_date_month_name() {
        assert_eq!(
            resolve_date("March 5, 2025", today()),
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
        );
        assert_eq!(
            resolve_date("Mar 5, 2025", today()),
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
        );
        assert_eq!(
            resolve_date("5 March 2025", today()),
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
        );
    }

    #[test]
    fn resolve_date_relative() {
        assert_eq!(
            resolve_date("tomorrow", today()),
            NaiveDate::from_ymd_opt(2025, 3, 13).unwrap()
        );
        assert_eq!(resolve_date("today", today()), today());
    }

    #[test]
    fn resolve_date_defaults_to_today() {
        assert_eq!(resolve_date("sometime next epoch", today()), today());
    }

    #[test]
    fn resolve_time_meridiem() {
        assert_eq!(
            resolve_time("2:30pm"),
            NaiveTime::from_hms_opt(14, 30, 0)
        );
        assert_eq!(resolve_time("2 PM"), NaiveTime::from_hms_opt(14, 0, 0));
        assert_eq!(resolve_time("9am"), NaiveTime::from_hms_opt(9, 0, 0));
    }

    #[test]
    fn resolve_time_twelve_fold() {
        assert_eq!(resolve_time("12am"), NaiveTime::from_hms_opt(0, 0, 0));
        assert_eq!(resolve_time("12pm"), NaiveTime::from_hms_opt(12, 0, 0));
    }

    #[test]
    fn resolve_time_clock() {
        assert_eq!(resolve_time("at 14:30"), NaiveTime::from_hms_opt(14, 30, 0));
    }

    #[test]
    fn resolve_time_words() {
        assert_eq!(resolve_time("at noon"), NaiveTime::from_hms_opt(12, 0, 0));
        assert_eq!(
            resolve_time("until midnight"),
            NaiveTime::from_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn resolve_time_none_when_absent() {
        assert_eq!(resolve_time("sometime soon"), None);
    }

    #[test]
    fn fallback_finds_keyword_with_nearby_date_and_time() {
        let text = "Team meeting on 2025-04-01 at 2:30pm in room 4";
        let candidates = fallback_extract(text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Meeting");
        assert_eq!(candidates[0].date.as_deref(), Some("2025-04-01"));
        assert_eq!(candidates[0].start_time.as_deref(), Some("14:30"));
    }

    #[test]
    fn fallback_finds_multiple_keywords() {
        let text = "Lunch at noon, then an interview at 3pm";
        let candidates = fallback_extract(text);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Lunch");
        assert_eq!(candidates[1].title, "Interview");
    }

    #[test]
    fn fallback_handles_multibyte_context() {
        // Keyword near non-ASCII text must not split a char boundary.
        let text = "café détente, lunch tomorrow at noon with Zoë";
        let candidates = fallback_extract(text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].date.as_deref(), Some("tomorrow"));
    }

    #[test]
    fn fallback_ignores_text_without_keywords() {
        assert!(fallback_extract("quarterly numbers look fine").is_empty());
    }

    fn areas() -> Vec<LifeArea> {
        vec![
            LifeArea::new(
                AreaId::new("a-work").unwrap(),
                UserId::new("user-1").unwrap(),
                "Work",
                35.0,
            )
            .unwrap(),
            LifeArea::new(
                AreaId::new("a-personal").unwrap(),
                UserId::new("user-1").unwrap(),
                "Personal",
                25.0,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn resolve_draft_fills_defaults() {
        let fields = ExtractedFields {
            title: "Meeting".to_string(),
            date: Some("tomorrow".to_string()),
            start_time: Some("2:30pm".to_string()),
            ..ExtractedFields::default()
        };
        let areas = areas();
        let draft = resolve_draft(&fields, today(), &AreaClassifier::default(), &areas).unwrap();
        assert_eq!(
            draft.start,
            NaiveDate::from_ymd_opt(2025, 3, 13)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap()
                .and_utc()
        );
        // End defaults to one hour after start.
        assert_eq!(draft.end - draft.start, Duration::minutes(60));
        assert_eq!(draft.source, EventSource::Extracted);
        assert!((draft.confidence.value() - EXTRACTION_CONFIDENCE).abs() < f32::EPSILON);
        // "Meeting" classifies into the Work area.
        assert_eq!(draft.area.as_ref().map(AreaId::as_str), Some("a-work"));
    }

    #[test]
    fn resolve_draft_drops_missing_start_time() {
        let fields = ExtractedFields {
            title: "Meeting".to_string(),
            date: Some("2025-04-01".to_string()),
            ..ExtractedFields::default()
        };
        assert!(
            resolve_draft(&fields, today(), &AreaClassifier::default(), &areas()).is_none()
        );
    }

    #[test]
    fn resolve_draft_drops_empty_title() {
        let fields = ExtractedFields {
            title: "  ".to_string(),
            start_time: Some("9am".to_string()),
            ..ExtractedFields::default()
        };
        assert!(
            resolve_draft(&fields, today(), &AreaClassifier::default(), &areas()).is_none()
        );
    }

    #[test]
    fn resolve_draft_keeps_explicit_end() {
        let fields = ExtractedFields {
            title: "Workshop".to_string(),
            date: Some("2025-04-01".to_string()),
            start_time: Some("9am".to_string()),
            end_time: Some("11am".to_string()),
            ..ExtractedFields::default()
        };
        let draft =
            resolve_draft(&fields, today(), &AreaClassifier::default(), &areas()).unwrap();
        assert_eq!(draft.end - draft.start, Duration::minutes(120));
    }

    #[test]
    fn resolve_draft_rejects_inverted_end() {
        let fields = ExtractedFields {
            title: "Call".to_string(),
            date: Some("2025-04-01".to_string()),
            start_time: Some("3pm".to_string()),
            end_time: Some("2pm".to_string()),
            ..ExtractedFields::default()
        };
        let draft =
            resolve_draft(&fields, today(), &AreaClassifier::default(), &areas()).unwrap();
        // Inverted end falls back to the default duration.
        assert_eq!(draft.end - draft.start, Duration::minutes(60));
    }

    #[test]
    fn resolve_draft_defaults_date_to_today() {
        let fields = ExtractedFields {
            title: "Call".to_string(),
            start_time: Some("9am".to_string()),
            ..ExtractedFields::default()
        };
        let draft =
            resolve_draft(&fields, today(), &AreaClassifier::default(), &areas()).unwrap();
        assert_eq!(draft.start.date_naive(), today());
    }
}
