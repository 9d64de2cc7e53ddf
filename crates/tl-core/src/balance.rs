//! Life-area time-balance scoring and periodic report aggregates.
//!
//! Compares how a user's tracked time is actually distributed across life
//! areas against their target percentages, producing a 0-100 balance score,
//! plus weekly/monthly report aggregates (busiest day, most active hour,
//! week-over-week deltas, workload trend).

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::event::{Event, LifeArea};
use crate::types::AreaId;

/// The aggregate key inserted into the deviation map. Deviation iteration
/// must skip it.
pub const AVERAGE_KEY: &str = "average";

/// Score returned when no area has a positive target.
const NEUTRAL_SCORE: u8 = 50;

/// The analysis period a balance or report is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsPeriod {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl AnalyticsPeriod {
    /// The `[start, end)` range this period spans, anchored at `now`.
    ///
    /// Weeks start on the previous-or-same Monday; quarters on the first day
    /// of the current quarter. All boundaries are at midnight UTC.
    #[must_use]
    pub fn date_range(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.date_naive();
        let start_day = match self {
            Self::Day => today,
            Self::Week => {
                let back = today.weekday().num_days_from_monday();
                today - Duration::days(i64::from(back))
            }
            Self::Month => today.with_day(1).unwrap_or(today),
            Self::Quarter => {
                let quarter_month = ((today.month() - 1) / 3) * 3 + 1;
                today
                    .with_day(1)
                    .and_then(|d| d.with_month(quarter_month))
                    .unwrap_or(today)
            }
            Self::Year => today.with_ordinal(1).unwrap_or(today),
        };
        let start = Utc.from_utc_datetime(&start_day.and_time(chrono::NaiveTime::MIN));
        let end = match self {
            Self::Day => start + Duration::days(1),
            Self::Week => start + Duration::weeks(1),
            Self::Month => start + Duration::days(days_in_month(start_day.year(), start_day.month())),
            Self::Quarter => {
                let mut days = 0;
                for offset in 0..3 {
                    let month = (start_day.month() - 1 + offset) % 12 + 1;
                    let year = start_day.year() + i32::try_from((start_day.month() - 1 + offset) / 12).unwrap_or(0);
                    days += days_in_month(year, month);
                }
                start + Duration::days(days)
            }
            Self::Year => {
                let days = if is_leap_year(start_day.year()) { 366 } else { 365 };
                start + Duration::days(days)
            }
        };
        (start, end)
    }
}

const fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

const fn days_in_month(year: i32, month: u32) -> i64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

/// Actual vs. target time distribution over a period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBalance {
    /// The period this balance was computed over.
    pub period: AnalyticsPeriod,
    /// Actual share of categorized time per area name, in percent.
    pub actual: BTreeMap<String, f64>,
    /// Target share per area name, in percent.
    pub ideal: BTreeMap<String, f64>,
    /// actual − target per area name, plus the [`AVERAGE_KEY`] aggregate.
    pub deviation: BTreeMap<String, f64>,
    /// 0-100 summary of how close actual tracks target.
    pub score: u8,
    /// Total categorized plus uncategorized event hours in the period.
    pub total_hours: f64,
    /// Number of events in the period.
    pub event_count: usize,
}

impl TimeBalance {
    /// Deviations per area, skipping aggregate keys.
    pub fn deviations(&self) -> impl Iterator<Item = (&str, f64)> {
        self.deviation
            .iter()
            .filter(|(name, _)| name.as_str() != AVERAGE_KEY)
            .map(|(name, value)| (name.as_str(), *value))
    }
}

/// The original fallback target distribution for users with no configured
/// areas.
#[must_use]
pub fn default_targets() -> Vec<(String, f64)> {
    vec![
        ("Work".to_string(), 35.0),
        ("Personal".to_string(), 25.0),
        ("Health".to_string(), 20.0),
        ("Social".to_string(), 10.0),
        ("Learning".to_string(), 10.0),
    ]
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn area_name<'a>(areas: &'a [LifeArea], id: &AreaId) -> Option<&'a str> {
    areas.iter().find(|a| &a.id == id).map(|a| a.name.as_str())
}

/// Minutes of categorized time per area name.
fn minutes_by_area(events: &[Event], areas: &[LifeArea]) -> (BTreeMap<String, f64>, f64) {
    let mut by_area: BTreeMap<String, f64> = BTreeMap::new();
    let mut total = 0.0;
    for event in events {
        let Some(area_id) = &event.area else { continue };
        let Some(name) = area_name(areas, area_id) else {
            continue;
        };
        #[expect(clippy::cast_precision_loss, reason = "minute totals are small")]
        let minutes = event.duration_minutes() as f64;
        *by_area.entry(name.to_string()).or_insert(0.0) += minutes;
        total += minutes;
    }
    (by_area, total)
}

fn total_hours(events: &[Event]) -> f64 {
    #[expect(clippy::cast_precision_loss, reason = "minute totals are small")]
    let minutes = events.iter().map(Event::duration_minutes).sum::<i64>() as f64;
    round1(minutes / 60.0)
}

/// Compute the time balance for a set of events already scoped to a period.
///
/// Total over well-typed input: empty events, zero-target areas, and
/// unknown area references all produce defined results, never an error.
pub fn time_balance(events: &[Event], areas: &[LifeArea], period: AnalyticsPeriod) -> TimeBalance {
    tracing::debug!(
        events = events.len(),
        areas = areas.len(),
        ?period,
        "computing time balance"
    );

    let (minutes, total_minutes) = minutes_by_area(events, areas);

    let mut actual: BTreeMap<String, f64> = BTreeMap::new();
    if total_minutes > 0.0 {
        for (name, mins) in &minutes {
            actual.insert(name.clone(), round1(mins / total_minutes * 100.0));
        }
    }

    let ideal: BTreeMap<String, f64> = areas
        .iter()
        .map(|a| (a.name.clone(), a.target_percentage))
        .collect();

    let mut deviation: BTreeMap<String, f64> = BTreeMap::new();
    for (name, target) in &ideal {
        let actual_pct = actual.get(name).copied().unwrap_or(0.0);
        deviation.insert(name.clone(), round1(actual_pct - target));
    }
    if !deviation.is_empty() {
        #[expect(clippy::cast_precision_loss, reason = "area counts are small")]
        let avg = deviation.values().map(|d| d.abs()).sum::<f64>() / deviation.len() as f64;
        deviation.insert(AVERAGE_KEY.to_string(), round1(avg));
    }

    let score = balance_score(&actual, &ideal);

    TimeBalance {
        period,
        actual,
        ideal,
        deviation,
        score,
        total_hours: total_hours(events),
        event_count: events.len(),
    }
}

/// 0-100 score from average relative deviation across areas with a positive
/// target. Returns the neutral score when no such area exists.
fn balance_score(actual: &BTreeMap<String, f64>, ideal: &BTreeMap<String, f64>) -> u8 {
    let mut total_relative = 0.0;
    let mut count = 0u32;

    for (name, target) in ideal {
        if *target > 0.0 {
            let actual_pct = actual.get(name).copied().unwrap_or(0.0);
            total_relative += (actual_pct - target).abs() / target;
            count += 1;
        }
    }

    if count == 0 {
        return NEUTRAL_SCORE;
    }

    let average = total_relative / f64::from(count);
    let score = (100.0 * (1.0 - average)).max(0.0);
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "score is clamped to [0, 100] before rounding"
    )]
    let rounded = score.round().min(100.0) as u8;
    rounded
}

/// Aggregates for one week of events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub total_events: usize,
    pub total_hours: f64,
    /// Weekday with the most events; ties keep the first encountered.
    pub busiest_day: Option<Weekday>,
    /// Hour of day (0-23) with the most event starts.
    pub most_active_hour: Option<u32>,
    /// Actual share of categorized time per area name.
    pub area_distribution: BTreeMap<String, f64>,
    /// Event-count delta versus the previous week.
    pub events_delta: i64,
    /// Hours delta versus the previous week.
    pub hours_delta: f64,
}

/// Whether the workload across recent weekly buckets is rising or falling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// One week-of-month bucket in a monthly report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekBucket {
    /// Week of month, 1-4.
    pub week: u32,
    pub events: usize,
    pub hours: f64,
}

/// Per-area goal progress in a monthly report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalAchievement {
    pub area: String,
    pub target: f64,
    pub actual: f64,
    /// actual / target × 100, rounded; 0 when the target is 0.
    pub achievement: f64,
}

/// Aggregates for one month of events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub total_events: usize,
    pub total_hours: f64,
    pub average_events_per_day: f64,
    pub weekly_breakdown: Vec<WeekBucket>,
    pub goal_achievement: Vec<GoalAchievement>,
    pub trend: Trend,
}

/// Pick the maximum-count key, breaking ties by first encounter order.
fn max_by_first_encountered<K: PartialEq + Copy>(events: &[Event], key: impl Fn(&Event) -> K) -> Option<K> {
    let mut counts: Vec<(K, usize)> = Vec::new();
    for event in events {
        let k = key(event);
        match counts.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, count)) => *count += 1,
            None => counts.push((k, 1)),
        }
    }
    // std max_by_key keeps the last maximum; ties must keep the first.
    let mut best: Option<(K, usize)> = None;
    for (k, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((k, count));
        }
    }
    best.map(|(k, _)| k)
}

/// Build the weekly report from this week's and the previous week's events.
pub fn weekly_report(current: &[Event], previous: &[Event], areas: &[LifeArea]) -> WeeklyReport {
    let hours = total_hours(current);
    let prev_hours = total_hours(previous);

    let (minutes, total_minutes) = minutes_by_area(current, areas);
    let mut area_distribution = BTreeMap::new();
    if total_minutes > 0.0 {
        for (name, mins) in &minutes {
            area_distribution.insert(name.clone(), round1(mins / total_minutes * 100.0));
        }
    }

    WeeklyReport {
        total_events: current.len(),
        total_hours: hours,
        busiest_day: max_by_first_encountered(current, |e| e.start.weekday()),
        most_active_hour: max_by_first_encountered(current, |e| e.start.hour()),
        area_distribution,
        events_delta: current.len() as i64 - previous.len() as i64,
        hours_delta: round1(hours - prev_hours),
    }
}

/// Week-of-month bucket for a day of month, clamped to 1-4.
const fn week_of_month(day: u32) -> u32 {
    let week = (day - 1) / 7 + 1;
    if week > 4 { 4 } else { week }
}

/// Classify the workload trend over the four weekly buckets of a month.
fn classify_trend(weekly_counts: &[usize; 4]) -> Trend {
    let mut increasing = true;
    let mut decreasing = true;
    for pair in weekly_counts.windows(2) {
        if pair[1] < pair[0] {
            increasing = false;
        }
        if pair[1] > pair[0] {
            decreasing = false;
        }
    }
    if increasing {
        Trend::Increasing
    } else if decreasing {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Build the monthly report from one month's events.
pub fn monthly_report(events: &[Event], areas: &[LifeArea]) -> MonthlyReport {
    let mut buckets: [(usize, f64); 4] = [(0, 0.0); 4];
    for event in events {
        let week = week_of_month(event.start.day()) as usize - 1;
        buckets[week].0 += 1;
        #[expect(clippy::cast_precision_loss, reason = "minute totals are small")]
        let hours = event.duration_minutes() as f64 / 60.0;
        buckets[week].1 += hours;
    }

    let weekly_breakdown: Vec<WeekBucket> = buckets
        .iter()
        .enumerate()
        .map(|(i, &(count, hours))| WeekBucket {
            week: u32::try_from(i).unwrap_or(0) + 1,
            events: count,
            hours: round1(hours),
        })
        .collect();

    let counts = [buckets[0].0, buckets[1].0, buckets[2].0, buckets[3].0];

    let (minutes, total_minutes) = minutes_by_area(events, areas);
    let goal_achievement = areas
        .iter()
        .map(|area| {
            let actual = if total_minutes > 0.0 {
                minutes
                    .get(&area.name)
                    .map_or(0.0, |m| round1(m / total_minutes * 100.0))
            } else {
                0.0
            };
            let achievement = if area.target_percentage > 0.0 {
                (actual / area.target_percentage * 100.0).round()
            } else {
                0.0
            };
            GoalAchievement {
                area: area.name.clone(),
                target: area.target_percentage,
                actual,
                achievement,
            }
        })
        .collect();

    #[expect(clippy::cast_precision_loss, reason = "event counts are small")]
    let average_events_per_day = round1(events.len() as f64 / 30.0);

    MonthlyReport {
        total_events: events.len(),
        total_hours: total_hours(events),
        average_events_per_day,
        weekly_breakdown,
        goal_achievement,
        trend: classify_trend(&counts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, EventId, EventSource, UserId};

    fn area(id: &str, name: &str, target: f64) -> LifeArea {
        LifeArea::new(
            AreaId::new(id).unwrap(),
            UserId::new("user-1").unwrap(),
            name,
            target,
        )
        .unwrap()
    }

    fn event(id: &str, day: u32, hour: u32, minutes: i64, area_id: Option<&str>) -> Event {
        let start = Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap();
        Event::new(
            EventId::new(id).unwrap(),
            UserId::new("user-1").unwrap(),
            format!("event {id}"),
            start,
            start + Duration::minutes(minutes),
            false,
            area_id.map(|a| AreaId::new(a).unwrap()),
            EventSource::Manual,
            Confidence::MAX,
        )
        .unwrap()
    }

    #[test]
    fn week_range_anchors_previous_or_same_monday() {
        // 2025-03-12 is a Wednesday; the week starts Monday 2025-03-10.
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 15, 30, 0).unwrap();
        let (start, end) = AnalyticsPeriod::Week.date_range(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 17, 0, 0, 0).unwrap());
    }

    #[test]
    fn week_range_on_monday_starts_same_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        let (start, _) = AnalyticsPeriod::Week.date_range(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_range_spans_calendar_month() {
        let now = Utc.with_ymd_and_hms(2025, 2, 14, 9, 0, 0).unwrap();
        let (start, end) = AnalyticsPeriod::Month.date_range(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn quarter_range_starts_at_quarter_month() {
        let now = Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap();
        let (start, end) = AnalyticsPeriod::Quarter.date_range(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn perfect_balance_scores_hundred() {
        let areas = vec![area("a1", "Work", 50.0), area("a2", "Health", 50.0)];
        let events = vec![
            event("e1", 10, 9, 60, Some("a1")),
            event("e2", 10, 11, 60, Some("a2")),
        ];
        let balance = time_balance(&events, &areas, AnalyticsPeriod::Week);
        assert_eq!(balance.score, 100);
        assert!((balance.actual["Work"] - 50.0).abs() < 0.1);
    }

    #[test]
    fn empty_events_score_is_zero_with_targets() {
        // No actual time at all: every area is 100% off its target.
        let areas = vec![area("a1", "Work", 50.0)];
        let balance = time_balance(&[], &areas, AnalyticsPeriod::Week);
        assert_eq!(balance.score, 0);
        assert!(balance.actual.is_empty());
        assert_eq!(balance.event_count, 0);
    }

    #[test]
    fn no_positive_targets_is_neutral() {
        let areas = vec![area("a1", "Work", 0.0)];
        let events = vec![event("e1", 10, 9, 60, Some("a1"))];
        let balance = time_balance(&events, &areas, AnalyticsPeriod::Week);
        assert_eq!(balance.score, 50);

        let balance = time_balance(&events, &[], AnalyticsPeriod::Week);
        assert_eq!(balance.score, 50);
    }

    #[test]
    fn score_decreases_as_deviation_grows() {
        let areas = vec![area("a1", "Work", 50.0), area("a2", "Health", 50.0)];
        // Slightly off: 75/25.
        let mild = vec![
            event("e1", 10, 9, 90, Some("a1")),
            event("e2", 10, 11, 30, Some("a2")),
        ];
        // Fully off: 100/0.
        let severe = vec![event("e3", 10, 9, 120, Some("a1"))];
        let mild_score = time_balance(&mild, &areas, AnalyticsPeriod::Week).score;
        let severe_score = time_balance(&severe, &areas, AnalyticsPeriod::Week).score;
        assert!(mild_score > severe_score);
        assert!(mild_score <= 100);
    }

    #[test]
    fn actual_percentages_sum_to_hundred_when_fully_categorized() {
        let areas = vec![area("a1", "Work", 60.0), area("a2", "Health", 40.0)];
        let events = vec![
            event("e1", 10, 9, 45, Some("a1")),
            event("e2", 10, 11, 75, Some("a2")),
        ];
        let balance = time_balance(&events, &areas, AnalyticsPeriod::Week);
        let sum: f64 = balance.actual.values().sum();
        assert!((sum - 100.0).abs() < 0.2);
    }

    #[test]
    fn uncategorized_events_are_excluded_from_distribution() {
        let areas = vec![area("a1", "Work", 50.0)];
        let events = vec![
            event("e1", 10, 9, 60, Some("a1")),
            event("e2", 10, 11, 60, None),
        ];
        let balance = time_balance(&events, &areas, AnalyticsPeriod::Week);
        // All categorized time is Work.
        assert!((balance.actual["Work"] - 100.0).abs() < 0.1);
        // But total hours count every event.
        assert!((balance.total_hours - 2.0).abs() < 0.01);
    }

    #[test]
    fn deviation_map_carries_average_aggregate() {
        let areas = vec![area("a1", "Work", 50.0), area("a2", "Health", 50.0)];
        let events = vec![event("e1", 10, 9, 60, Some("a1"))];
        let balance = time_balance(&events, &areas, AnalyticsPeriod::Week);
        assert!(balance.deviation.contains_key(AVERAGE_KEY));
        // deviations() must skip the aggregate.
        assert!(balance.deviations().all(|(name, _)| name != AVERAGE_KEY));
        assert_eq!(balance.deviations().count(), 2);
    }

    #[test]
    fn unknown_area_reference_is_ignored() {
        let areas = vec![area("a1", "Work", 100.0)];
        let events = vec![event("e1", 10, 9, 60, Some("ghost"))];
        let balance = time_balance(&events, &areas, AnalyticsPeriod::Week);
        assert!(balance.actual.is_empty());
    }

    #[test]
    fn weekly_report_basic_aggregates() {
        let areas = vec![area("a1", "Work", 50.0)];
        // 2025-03-10 is a Monday, 2025-03-11 a Tuesday.
        let current = vec![
            event("e1", 10, 9, 60, Some("a1")),
            event("e2", 10, 14, 60, None),
            event("e3", 11, 9, 120, None),
        ];
        let previous = vec![event("p1", 3, 9, 60, None)];
        let report = weekly_report(&current, &previous, &areas);
        assert_eq!(report.total_events, 3);
        assert_eq!(report.busiest_day, Some(Weekday::Mon));
        assert_eq!(report.most_active_hour, Some(9));
        assert_eq!(report.events_delta, 2);
        assert!((report.hours_delta - 3.0).abs() < 0.01);
    }

    #[test]
    fn busiest_day_tie_keeps_first_encountered() {
        let current = vec![
            event("e1", 11, 9, 60, None),  // Tuesday
            event("e2", 10, 9, 60, None),  // Monday
        ];
        let report = weekly_report(&current, &[], &[]);
        assert_eq!(report.busiest_day, Some(Weekday::Tue));
    }

    #[test]
    fn empty_weekly_report_has_no_aggregates() {
        let report = weekly_report(&[], &[], &[]);
        assert_eq!(report.busiest_day, None);
        assert_eq!(report.most_active_hour, None);
        assert_eq!(report.total_events, 0);
    }

    #[test]
    fn trend_increasing_when_counts_never_drop() {
        assert_eq!(classify_trend(&[1, 2, 2, 3]), Trend::Increasing);
        assert_eq!(classify_trend(&[3, 2, 2, 1]), Trend::Decreasing);
        assert_eq!(classify_trend(&[1, 3, 2, 4]), Trend::Stable);
        // Flat counts are both non-decreasing and non-increasing.
        assert_eq!(classify_trend(&[2, 2, 2, 2]), Trend::Increasing);
    }

    #[test]
    fn monthly_report_buckets_by_week_of_month() {
        let areas = vec![area("a1", "Work", 50.0)];
        let events = vec![
            event("e1", 3, 9, 60, Some("a1")),   // week 1
            event("e2", 10, 9, 60, Some("a1")),  // week 2
            event("e3", 18, 9, 60, Some("a1")),  // week 3
            event("e4", 25, 9, 60, Some("a1")),  // week 4
            event("e5", 31, 9, 60, Some("a1")),  // day 31 clamps into week 4
        ];
        let report = monthly_report(&events, &areas);
        assert_eq!(report.weekly_breakdown.len(), 4);
        assert_eq!(report.weekly_breakdown[0].events, 1);
        assert_eq!(report.weekly_breakdown[3].events, 2);
        assert_eq!(report.trend, Trend::Increasing);
        assert_eq!(report.goal_achievement.len(), 1);
        assert!((report.goal_achievement[0].achievement - 200.0).abs() < 0.5);
    }
}
