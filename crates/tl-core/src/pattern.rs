//! Recurring-pattern mining over a historical event window.
//!
//! Five independent analyses run over the same snapshot and their outputs
//! are concatenated: recurring titles, time-of-day preference, life-area
//! focus, weekday busyness / weekend ratio, and meeting-duration
//! preference. Each analysis flags its conditions with a fixed confidence
//! constant; the constants are tunable heuristics, not learned values.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::event::{Event, LifeArea};
use crate::interval::TimeSlot;
use crate::types::Confidence;

/// Confidence assigned to recurring-title patterns.
pub const RECURRING_TITLE_CONFIDENCE: f32 = 0.8;
/// Confidence assigned to time-of-day preference patterns.
pub const TIME_OF_DAY_CONFIDENCE: f32 = 0.7;
/// Confidence assigned to life-area focus patterns.
pub const AREA_FOCUS_CONFIDENCE: f32 = 0.9;
/// Confidence assigned to busy-weekday patterns.
pub const BUSY_WEEKDAY_CONFIDENCE: f32 = 0.75;
/// Confidence assigned to weekend-ratio patterns.
pub const WEEKEND_RATIO_CONFIDENCE: f32 = 0.8;
/// Confidence assigned to duration-preference patterns.
pub const DURATION_CONFIDENCE: f32 = 0.85;

/// A normalized title needs at least this many occurrences.
const MIN_TITLE_OCCURRENCES: usize = 3;
/// ...and at least this many on the same weekday.
const MIN_SAME_WEEKDAY: usize = 2;
/// Share of all events a time-of-day bucket must exceed.
const TIME_OF_DAY_SHARE: f64 = 0.4;
/// Share of categorized events an area must exceed.
const AREA_FOCUS_SHARE: f64 = 0.3;
/// A weekday within this fraction of the busiest day's count is "busy".
const BUSY_WEEKDAY_FRACTION: f64 = 0.8;
/// Weekend share below this marks a weekday-focused schedule.
const WEEKEND_LOW_SHARE: f64 = 0.1;
/// Weekend share above this marks an active-weekends schedule.
const WEEKEND_HIGH_SHARE: f64 = 0.3;
/// Durations outside (0, 480] minutes are ignored as data noise.
const MAX_VALID_DURATION_MINUTES: i64 = 480;

/// A statistically flagged regularity in historical events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Short pattern name, e.g. "Recurring: standup".
    pub name: String,
    /// Human-readable description of the regularity.
    pub description: String,
    /// How often the flagged condition holds, 0-1.
    pub frequency: f64,
    /// Fixed per-analysis confidence constant.
    pub confidence: Confidence,
    /// Suggested or representative time slots, possibly empty.
    pub slots: Vec<TimeSlot>,
}

/// Mine all pattern types from a historical event window.
///
/// `now` anchors the suggested slots of recurring-title and busy-weekday
/// patterns to the current week; it is never read from ambient state. The
/// sub-analyses are independent and their outputs are concatenated without
/// cross-analysis deduplication.
pub fn mine_patterns(events: &[Event], areas: &[LifeArea], now: DateTime<Utc>) -> Vec<Pattern> {
    if events.is_empty() {
        return Vec::new();
    }

    tracing::debug!(events = events.len(), "mining patterns");

    let mut patterns = Vec::new();
    patterns.extend(recurring_titles(events, now));
    patterns.extend(time_of_day_preference(events));
    patterns.extend(area_focus(events, areas));
    patterns.extend(weekday_patterns(events, now));
    patterns.extend(duration_preference(events));
    patterns
}

/// Lowercase, trim, and collapse inner whitespace.
fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Midnight of the Monday of the week containing `now`.
fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    Utc.from_utc_datetime(&monday.and_time(chrono::NaiveTime::MIN))
}

/// A 1-hour slot on the given weekday of the `now` week at hour:minute.
fn weekday_slot(
    now: DateTime<Utc>,
    weekday: Weekday,
    hour: i64,
    minute: i64,
    length: Duration,
    available: bool,
) -> TimeSlot {
    let start = start_of_week(now)
        + Duration::days(i64::from(weekday.num_days_from_monday()))
        + Duration::hours(hour)
        + Duration::minutes(minute);
    TimeSlot {
        start,
        end: start + length,
        available,
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Flag titles that recur on the same weekday.
///
/// Titles are normalized case/whitespace-insensitively; a title needs at
/// least three occurrences overall and two on the same weekday. The
/// suggested slot uses the mean time-of-day of the weekday subgroup.
fn recurring_titles(events: &[Event], now: DateTime<Utc>) -> Vec<Pattern> {
    let mut by_title: BTreeMap<String, Vec<&Event>> = BTreeMap::new();
    for event in events {
        let normalized = normalize_title(&event.title);
        if normalized.is_empty() {
            continue;
        }
        by_title.entry(normalized).or_default().push(event);
    }

    let mut patterns = Vec::new();
    for (title, group) in &by_title {
        if group.len() < MIN_TITLE_OCCURRENCES {
            continue;
        }

        let mut by_weekday: BTreeMap<u32, Vec<&Event>> = BTreeMap::new();
        for &event in group {
            by_weekday
                .entry(event.start.weekday().num_days_from_monday())
                .or_default()
                .push(event);
        }

        for (weekday_index, day_group) in &by_weekday {
            if day_group.len() < MIN_SAME_WEEKDAY {
                continue;
            }

            // Mean minutes since midnight, converted back to hour:minute.
            let total: i64 = day_group
                .iter()
                .map(|e| i64::from(e.start.hour()) * 60 + i64::from(e.start.minute()))
                .sum();
            let mean = total / day_group.len() as i64;
            let (hour, minute) = (mean / 60, mean % 60);

            let weekday = Weekday::try_from(u8::try_from(*weekday_index).unwrap_or(0))
                .unwrap_or(Weekday::Mon);

            #[expect(clippy::cast_precision_loss, reason = "group sizes are small")]
            let frequency = day_group.len() as f64 / group.len() as f64;

            patterns.push(Pattern {
                name: format!("Recurring: {title}"),
                description: format!(
                    "You often have '{title}' on {} around {hour:02}:{minute:02}",
                    weekday_name(weekday)
                ),
                frequency,
                confidence: Confidence::clamped(RECURRING_TITLE_CONFIDENCE),
                slots: vec![weekday_slot(
                    now,
                    weekday,
                    hour,
                    minute,
                    Duration::hours(1),
                    false,
                )],
            });
        }
    }
    patterns
}

/// Flag a time-of-day bucket holding more than 40% of all events.
fn time_of_day_preference(events: &[Event]) -> Vec<Pattern> {
    let buckets: [(&str, std::ops::Range<u32>); 3] = [
        ("morning", 6..12),
        ("afternoon", 12..17),
        ("evening", 17..22),
    ];

    #[expect(clippy::cast_precision_loss, reason = "event counts are small")]
    let total = events.len() as f64;

    let mut patterns = Vec::new();
    for (label, range) in buckets {
        let count = events
            .iter()
            .filter(|e| range.contains(&e.start.hour()))
            .count();
        #[expect(clippy::cast_precision_loss, reason = "event counts are small")]
        let share = count as f64 / total;
        if share > TIME_OF_DAY_SHARE {
            let mut name = label.to_string();
            if let Some(first) = name.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            patterns.push(Pattern {
                name: format!("{name} Person"),
                description: format!("You tend to schedule most activities in the {label}"),
                frequency: share,
                confidence: Confidence::clamped(TIME_OF_DAY_CONFIDENCE),
                slots: Vec::new(),
            });
        }
    }
    patterns
}

/// Flag life areas holding more than 30% of categorized events.
fn area_focus(events: &[Event], areas: &[LifeArea]) -> Vec<Pattern> {
    let mut by_area: BTreeMap<&str, usize> = BTreeMap::new();
    let mut total = 0usize;
    for event in events {
        let Some(area_id) = &event.area else { continue };
        let Some(area) = areas.iter().find(|a| &a.id == area_id) else {
            continue;
        };
        *by_area.entry(area.name.as_str()).or_insert(0) += 1;
        total += 1;
    }

    if total == 0 {
        return Vec::new();
    }

    let mut patterns = Vec::new();
    for (name, count) in by_area {
        #[expect(clippy::cast_precision_loss, reason = "event counts are small")]
        let share = count as f64 / total as f64;
        if share > AREA_FOCUS_SHARE {
            patterns.push(Pattern {
                name: format!("{name} Focus"),
                description: format!(
                    "{:.0}% of your time is spent on {name} activities",
                    share * 100.0
                ),
                frequency: share,
                confidence: Confidence::clamped(AREA_FOCUS_CONFIDENCE),
                slots: Vec::new(),
            });
        }
    }
    patterns
}

/// Flag busiest weekdays and the overall weekday/weekend balance.
fn weekday_patterns(events: &[Event], now: DateTime<Utc>) -> Vec<Pattern> {
    let mut day_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for event in events {
        *day_counts
            .entry(event.start.weekday().num_days_from_monday())
            .or_insert(0) += 1;
    }

    let max_count = day_counts.values().copied().max().unwrap_or(0);
    #[expect(clippy::cast_precision_loss, reason = "event counts are small")]
    let total = events.len() as f64;

    let mut patterns = Vec::new();
    for (weekday_index, count) in &day_counts {
        #[expect(clippy::cast_precision_loss, reason = "event counts are small")]
        let within_max = *count as f64 >= max_count as f64 * BUSY_WEEKDAY_FRACTION;
        if within_max {
            let weekday = Weekday::try_from(u8::try_from(*weekday_index).unwrap_or(0))
                .unwrap_or(Weekday::Mon);
            #[expect(clippy::cast_precision_loss, reason = "event counts are small")]
            let frequency = *count as f64 / total;
            patterns.push(Pattern {
                name: format!("Busy {}", weekday_name(weekday)),
                description: format!(
                    "{} is typically your busiest day",
                    weekday_name(weekday)
                ),
                frequency,
                confidence: Confidence::clamped(BUSY_WEEKDAY_CONFIDENCE),
                slots: vec![weekday_slot(now, weekday, 9, 0, Duration::hours(9), true)],
            });
        }
    }

    // Weekday/weekend split, only meaningful when both sides have events.
    let weekend_count = events
        .iter()
        .filter(|e| {
            matches!(e.start.weekday(), Weekday::Sat | Weekday::Sun)
        })
        .count();
    let weekday_count = events.len() - weekend_count;

    if weekend_count > 0 && weekday_count > 0 {
        #[expect(clippy::cast_precision_loss, reason = "event counts are small")]
        let weekend_ratio = weekend_count as f64 / total;
        if weekend_ratio < WEEKEND_LOW_SHARE {
            patterns.push(Pattern {
                name: "Weekday Focused".to_string(),
                description: "You rarely schedule activities on weekends".to_string(),
                frequency: 1.0 - weekend_ratio,
                confidence: Confidence::clamped(WEEKEND_RATIO_CONFIDENCE),
                slots: Vec::new(),
            });
        } else if weekend_ratio > WEEKEND_HIGH_SHARE {
            patterns.push(Pattern {
                name: "Active Weekends".to_string(),
                description: "You maintain an active schedule even on weekends".to_string(),
                frequency: weekend_ratio,
                confidence: Confidence::clamped(WEEKEND_RATIO_CONFIDENCE),
                slots: Vec::new(),
            });
        }
    }

    patterns
}

/// Flag the dominant meeting-duration bucket.
///
/// Durations outside (0, 8h] are discarded; the remaining ones are
/// bucketed into short (<=30m), medium (31-60m), and long (>60m). Ties
/// between buckets keep the first in that order.
fn duration_preference(events: &[Event]) -> Vec<Pattern> {
    let durations: Vec<i64> = events
        .iter()
        .map(Event::duration_minutes)
        .filter(|&d| d > 0 && d <= MAX_VALID_DURATION_MINUTES)
        .collect();

    if durations.is_empty() {
        return Vec::new();
    }

    let short = durations.iter().filter(|&&d| d <= 30).count();
    let medium = durations.iter().filter(|&&d| d > 30 && d <= 60).count();
    let long = durations.iter().filter(|&&d| d > 60).count();

    let buckets = [
        (short, "You prefer quick, focused meetings (usually under 30 minutes)"),
        (medium, "Your meetings typically last 30-60 minutes"),
        (long, "You tend to have longer, in-depth meetings (over 1 hour)"),
    ];

    let mut dominant = buckets[0];
    for bucket in &buckets[1..] {
        if bucket.0 > dominant.0 {
            dominant = *bucket;
        }
    }

    #[expect(clippy::cast_precision_loss, reason = "event counts are small")]
    let frequency = dominant.0 as f64 / durations.len() as f64;

    vec![Pattern {
        name: "Meeting Duration Preference".to_string(),
        description: dominant.1.to_string(),
        frequency,
        confidence: Confidence::clamped(DURATION_CONFIDENCE),
        slots: Vec::new(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AreaId, EventId, EventSource, UserId};

    fn now() -> DateTime<Utc> {
        // A Wednesday.
        Utc.with_ymd_and_hms(2025, 3, 12, 12, 0, 0).unwrap()
    }

    fn event_titled(
        id: &str,
        title: &str,
        day: u32,
        hour: u32,
        minute: u32,
        duration_minutes: i64,
        area_id: Option<&str>,
    ) -> Event {
        let start = Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap();
        Event::new(
            EventId::new(id).unwrap(),
            UserId::new("user-1").unwrap(),
            title,
            start,
            start + Duration::minutes(duration_minutes),
            false,
            area_id.map(|a| AreaId::new(a).unwrap()),
            EventSource::Import,
            Confidence::MAX,
        )
        .unwrap()
    }

    #[test]
    fn no_events_no_patterns() {
        assert!(mine_patterns(&[], &[], now()).is_empty());
    }

    #[test]
    fn two_occurrences_never_recur() {
        // Same title twice, same weekday: below the 3-occurrence threshold.
        let events = vec![
            event_titled("e1", "Standup", 3, 9, 0, 30, None),  // Monday
            event_titled("e2", "Standup", 10, 9, 0, 30, None), // Monday
        ];
        assert!(recurring_titles(&events, now()).is_empty());
    }

    #[test]
    fn three_same_weekday_occurrences_recur() {
        // Mondays 2025-03-03, -10, -17.
        let events = vec![
            event_titled("e1", "Standup", 3, 9, 0, 30, None),
            event_titled("e2", "standup ", 10, 9, 30, 30, None),
            event_titled("e3", " STANDUP", 17, 10, 0, 30, None),
        ];
        let patterns = recurring_titles(&events, now());
        assert_eq!(patterns.len(), 1);
        let pattern = &patterns[0];
        assert_eq!(pattern.name, "Recurring: standup");
        assert!((pattern.frequency - 1.0).abs() < f64::EPSILON);
        assert!((pattern.confidence.value() - RECURRING_TITLE_CONFIDENCE).abs() < f32::EPSILON);
        // Mean of 9:00, 9:30, 10:00 is 9:30.
        assert!(pattern.description.contains("09:30"));
        assert!(pattern.description.contains("Monday"));
        assert_eq!(pattern.slots.len(), 1);
        // Slot lands on the Monday of the `now` week.
        assert_eq!(
            pattern.slots[0].start,
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn split_weekdays_need_two_per_day() {
        // Three occurrences spread over three different weekdays.
        let events = vec![
            event_titled("e1", "1:1", 3, 9, 0, 30, None),  // Monday
            event_titled("e2", "1:1", 4, 9, 0, 30, None),  // Tuesday
            event_titled("e3", "1:1", 5, 9, 0, 30, None),  // Wednesday
        ];
        assert!(recurring_titles(&events, now()).is_empty());
    }

    #[test]
    fn frequency_is_weekday_share_of_title() {
        let events = vec![
            event_titled("e1", "Sync", 3, 9, 0, 30, None),  // Monday
            event_titled("e2", "Sync", 10, 9, 0, 30, None), // Monday
            event_titled("e3", "Sync", 4, 9, 0, 30, None),  // Tuesday
        ];
        let patterns = recurring_titles(&events, now());
        assert_eq!(patterns.len(), 1);
        assert!((patterns[0].frequency - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn morning_heavy_schedule_is_flagged() {
        let events = vec![
            event_titled("e1", "a", 10, 9, 0, 30, None),
            event_titled("e2", "b", 10, 10, 0, 30, None),
            event_titled("e3", "c", 10, 11, 0, 30, None),
            event_titled("e4", "d", 10, 15, 0, 30, None),
        ];
        let patterns = time_of_day_preference(&events);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].name, "Morning Person");
        assert!((patterns[0].frequency - 0.75).abs() < 1e-9);
    }

    #[test]
    fn exactly_forty_percent_is_not_flagged() {
        // 2 of 5 morning events is exactly 40%, threshold is strict.
        let events = vec![
            event_titled("e1", "a", 10, 9, 0, 30, None),
            event_titled("e2", "b", 10, 10, 0, 30, None),
            event_titled("e3", "c", 10, 13, 0, 30, None),
            event_titled("e4", "d", 10, 18, 0, 30, None),
            event_titled("e5", "e", 10, 23, 0, 30, None),
        ];
        assert!(time_of_day_preference(&events).is_empty());
    }

    #[test]
    fn dominant_area_is_flagged() {
        let areas = vec![
            LifeArea::new(
                AreaId::new("a1").unwrap(),
                UserId::new("user-1").unwrap(),
                "Work",
                35.0,
            )
            .unwrap(),
            LifeArea::new(
                AreaId::new("a2").unwrap(),
                UserId::new("user-1").unwrap(),
                "Health",
                20.0,
            )
            .unwrap(),
        ];
        let events = vec![
            event_titled("e1", "a", 10, 9, 0, 30, Some("a1")),
            event_titled("e2", "b", 10, 10, 0, 30, Some("a1")),
            event_titled("e3", "c", 10, 11, 0, 30, Some("a2")),
        ];
        let patterns = area_focus(&events, &areas);
        // Work at 67% and Health at 33% both exceed 30%.
        assert_eq!(patterns.len(), 2);
        assert!(patterns.iter().any(|p| p.name == "Work Focus"));
    }

    #[test]
    fn uncategorized_events_are_ignored_by_area_focus() {
        let events = vec![event_titled("e1", "a", 10, 9, 0, 30, None)];
        assert!(area_focus(&events, &[]).is_empty());
    }

    #[test]
    fn busiest_weekday_is_flagged() {
        // Three events Monday, one Tuesday.
        let events = vec![
            event_titled("e1", "a", 10, 9, 0, 30, None),
            event_titled("e2", "b", 10, 11, 0, 30, None),
            event_titled("e3", "c", 10, 14, 0, 30, None),
            event_titled("e4", "d", 11, 9, 0, 30, None),
        ];
        let patterns = weekday_patterns(&events, now());
        let busy: Vec<_> = patterns
            .iter()
            .filter(|p| p.name.starts_with("Busy"))
            .collect();
        assert_eq!(busy.len(), 1);
        assert_eq!(busy[0].name, "Busy Monday");
        assert_eq!(busy[0].slots.len(), 1);
    }

    #[test]
    fn weekday_focused_schedule_is_flagged() {
        // 10 weekday events, 1 weekend event: ratio < 0.1 needs 1/11 ≈ 0.09.
        let mut events: Vec<Event> = (0..10)
            .map(|i| event_titled(&format!("e{i}"), &format!("t{i}"), 10 + (i % 5), 9, 0, 30, None))
            .collect();
        events.push(event_titled("w1", "hike", 15, 9, 0, 30, None)); // Saturday
        let patterns = weekday_patterns(&events, now());
        assert!(patterns.iter().any(|p| p.name == "Weekday Focused"));
    }

    #[test]
    fn active_weekends_schedule_is_flagged() {
        let events = vec![
            event_titled("e1", "a", 10, 9, 0, 30, None),  // Monday
            event_titled("e2", "b", 15, 9, 0, 30, None),  // Saturday
            event_titled("e3", "c", 16, 9, 0, 30, None),  // Sunday
        ];
        let patterns = weekday_patterns(&events, now());
        assert!(patterns.iter().any(|p| p.name == "Active Weekends"));
    }

    #[test]
    fn weekend_split_needs_both_sides() {
        let events = vec![event_titled("e1", "a", 15, 9, 0, 30, None)]; // Saturday only
        let patterns = weekday_patterns(&events, now());
        assert!(!patterns.iter().any(|p| p.name == "Active Weekends"));
        assert!(!patterns.iter().any(|p| p.name == "Weekday Focused"));
    }

    #[test]
    fn dominant_duration_bucket_wins() {
        let events = vec![
            event_titled("e1", "a", 10, 9, 0, 20, None),
            event_titled("e2", "b", 10, 10, 0, 25, None),
            event_titled("e3", "c", 10, 11, 0, 90, None),
        ];
        let patterns = duration_preference(&events);
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].description.contains("under 30 minutes"));
        assert!((patterns[0].frequency - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn overlong_durations_are_ignored() {
        // 10-hour block exceeds the 8-hour validity cap.
        let events = vec![event_titled("e1", "a", 10, 8, 0, 600, None)];
        assert!(duration_preference(&events).is_empty());
    }

    #[test]
    fn mine_patterns_concatenates_analyses() {
        let events = vec![
            event_titled("e1", "Standup", 3, 9, 0, 30, None),
            event_titled("e2", "Standup", 10, 9, 0, 30, None),
            event_titled("e3", "Standup", 17, 9, 0, 30, None),
        ];
        let patterns = mine_patterns(&events, &[], now());
        // Recurring title + morning person + busy Monday + duration preference.
        assert!(patterns.iter().any(|p| p.name.starts_with("Recurring:")));
        assert!(patterns.iter().any(|p| p.name == "Morning Person"));
        assert!(patterns.iter().any(|p| p.name == "Busy Monday"));
        assert!(patterns.iter().any(|p| p.name == "Meeting Duration Preference"));
    }
}
