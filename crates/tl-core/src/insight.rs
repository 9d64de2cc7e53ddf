//! Insight synthesis from balance, interval, and pattern outputs.
//!
//! A fixed sequence of independent checks runs over one input snapshot.
//! Each check is a total function returning `Option<Insight>`; a check that
//! does not fire, or whose preconditions are absent, never prevents the
//! rest from running.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::balance::{self, AnalyticsPeriod};
use crate::event::{Event, LifeArea};
use crate::pattern::Pattern;
use crate::types::{AreaId, Confidence};

/// The category of a synthesized insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Imbalance,
    BurnoutRisk,
    OptimizationOpportunity,
    PatternDetected,
    GoalDeviation,
}

/// What kind of action a suggestion proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    NewEvent,
    ScheduleOptimization,
}

/// How urgent a suggestion is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// A concrete action attached to an insight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionType,
    pub title: String,
    pub description: String,
    pub reasoning: String,
    pub priority: Priority,
}

/// A synthesized observation about the user's schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: Uuid,
    pub kind: InsightType,
    pub content: String,
    /// How much acting on this insight would matter, 0-1.
    pub impact_score: Confidence,
    /// Whether the insight carries suggestions worth acting on.
    pub actionable: bool,
    pub suggested_actions: Vec<Suggestion>,
}

/// A previously persisted insight, fed back in for deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedInsight {
    pub kind: InsightType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the synthesizer reads. No ambient clock or storage access.
#[derive(Debug, Clone, Copy)]
pub struct InsightInput<'a> {
    /// The current time, supplied by the caller.
    pub now: DateTime<Utc>,
    /// Events of the current week.
    pub week_events: &'a [Event],
    /// Events of the trailing two weeks.
    pub two_week_events: &'a [Event],
    /// Events of the current month.
    pub month_events: &'a [Event],
    pub areas: &'a [LifeArea],
    /// Patterns already mined from the historical window.
    pub patterns: &'a [Pattern],
    /// Recently persisted insights, newest or oldest first.
    pub recent: &'a [RecordedInsight],
}

/// Weekly balance score below which the imbalance check may fire.
const IMBALANCE_SCORE_THRESHOLD: u8 = 60;
/// Absolute deviation (percentage points) the worst area must exceed.
const IMBALANCE_DEVIATION_THRESHOLD: f64 = 15.0;
/// Hours per day above which a day counts as overworked.
const BURNOUT_DAILY_HOURS: f64 = 8.0;
/// Overworked days needed over two weeks.
const BURNOUT_DAYS_OVER: usize = 5;
/// Weekend work sessions needed over two weeks.
const BURNOUT_WEEKEND_SESSIONS: usize = 2;
/// Average daily work hours needed, over days that have any work.
const BURNOUT_AVG_HOURS: f64 = 9.0;
/// Fragmented gaps must each be strictly shorter than this.
const FRAGMENT_GAP_MAX_MINUTES: i64 = 60;
/// ...and together sum past this.
const FRAGMENT_TOTAL_MINUTES: i64 = 60;
/// Minimum pattern confidence worth surfacing.
const PATTERN_CONFIDENCE_THRESHOLD: f32 = 0.7;
/// How far back a recorded pattern insight suppresses a new one.
const PATTERN_DEDUP_DAYS: i64 = 7;
/// Goal achievement (percent of target) below which an area lags.
const GOAL_LAG_THRESHOLD: f64 = 50.0;

/// Run every check against one input snapshot.
///
/// Checks run in a fixed order and their firing insights are returned in
/// that order. Per-check outcomes are logged at debug level.
#[must_use]
pub fn synthesize_insights(input: &InsightInput<'_>) -> Vec<Insight> {
    let checks: [(&str, Option<Insight>); 5] = [
        ("imbalance", check_imbalance(input)),
        ("burnout", check_burnout(input)),
        ("optimization", check_optimization(input)),
        ("pattern", check_pattern(input)),
        ("goal_deviation", check_goal_deviation(input)),
    ];

    let mut insights = Vec::new();
    for (name, outcome) in checks {
        tracing::debug!(check = name, fired = outcome.is_some(), "insight check");
        if let Some(insight) = outcome {
            insights.push(insight);
        }
    }
    insights
}

fn insight(
    kind: InsightType,
    content: String,
    impact: f32,
    suggested_actions: Vec<Suggestion>,
) -> Insight {
    Insight {
        id: Uuid::new_v4(),
        kind,
        content,
        impact_score: Confidence::clamped(impact),
        actionable: !suggested_actions.is_empty(),
        suggested_actions,
    }
}

/// Weekly balance score low and one area far off target.
fn check_imbalance(input: &InsightInput<'_>) -> Option<Insight> {
    let bal = balance::time_balance(input.week_events, input.areas, AnalyticsPeriod::Week);
    if bal.score >= IMBALANCE_SCORE_THRESHOLD {
        return None;
    }

    let (worst_area, worst_dev) = bal
        .deviations()
        .map(|(name, dev)| (name.to_string(), dev))
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))?;
    if worst_dev.abs() <= IMBALANCE_DEVIATION_THRESHOLD {
        return None;
    }

    let impact = if bal.score < 40 { 0.7 } else { 0.5 };

    let mut actions = Vec::new();
    if worst_dev < -10.0 {
        actions.push(Suggestion {
            kind: SuggestionType::NewEvent,
            title: format!("Schedule more {worst_area} time"),
            description: format!(
                "Block out dedicated {worst_area} time this week to close the gap"
            ),
            reasoning: format!(
                "{worst_area} is {:.1} percentage points below its target",
                worst_dev.abs()
            ),
            priority: Priority::High,
        });
    } else if worst_dev > 10.0 {
        actions.push(Suggestion {
            kind: SuggestionType::ScheduleOptimization,
            title: format!("Reduce {worst_area} commitments"),
            description: format!(
                "Decline or delegate some {worst_area} activities to rebalance"
            ),
            reasoning: format!(
                "{worst_area} is {worst_dev:.1} percentage points over its target"
            ),
            priority: Priority::Medium,
        });
    }

    Some(insight(
        InsightType::Imbalance,
        format!(
            "Your time balance score is {} this week. {worst_area} deviates {worst_dev:+.1}% from its target.",
            bal.score
        ),
        impact,
        actions,
    ))
}

fn work_area_id(areas: &[LifeArea]) -> Option<&AreaId> {
    areas
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case("work"))
        .map(|a| &a.id)
}

/// Sustained overwork across the trailing two weeks.
fn check_burnout(input: &InsightInput<'_>) -> Option<Insight> {
    let work_id = work_area_id(input.areas)?;
    let work_events: Vec<&Event> = input
        .two_week_events
        .iter()
        .filter(|e| e.area.as_ref() == Some(work_id))
        .collect();
    if work_events.is_empty() {
        return None;
    }

    let mut daily_minutes: std::collections::BTreeMap<chrono::NaiveDate, i64> =
        std::collections::BTreeMap::new();
    let mut weekend_sessions = 0usize;
    for event in &work_events {
        *daily_minutes.entry(event.start.date_naive()).or_insert(0) +=
            event.duration_minutes();
        if matches!(event.start.weekday(), Weekday::Sat | Weekday::Sun) {
            weekend_sessions += 1;
        }
    }

    let days_over = daily_minutes
        .values()
        .filter(|&&m| minutes_to_hours(m) > BURNOUT_DAILY_HOURS)
        .count();
    let total_minutes: i64 = daily_minutes.values().sum();
    #[expect(clippy::cast_precision_loss, reason = "day counts are small")]
    let avg_daily = minutes_to_hours(total_minutes) / daily_minutes.len() as f64;

    let at_risk = days_over > BURNOUT_DAYS_OVER
        || weekend_sessions > BURNOUT_WEEKEND_SESSIONS
        || avg_daily > BURNOUT_AVG_HOURS;
    if !at_risk {
        return None;
    }

    let impact = if avg_daily > 10.0 { 0.9 } else { 0.7 };

    let actions = vec![
        Suggestion {
            kind: SuggestionType::NewEvent,
            title: "Schedule a recovery block".to_string(),
            description: "Reserve a half day with no work commitments".to_string(),
            reasoning: format!(
                "You averaged {avg_daily:.1} work hours per working day over the last two weeks"
            ),
            priority: Priority::Critical,
        },
        Suggestion {
            kind: SuggestionType::ScheduleOptimization,
            title: "Set work-hour boundaries".to_string(),
            description: "Cap work events at 8 hours per day and keep weekends clear".to_string(),
            reasoning: format!(
                "{days_over} days exceeded 8 work hours and {weekend_sessions} work sessions fell on weekends"
            ),
            priority: Priority::High,
        },
    ];

    Some(insight(
        InsightType::BurnoutRisk,
        format!(
            "Your work load shows burnout warning signs: {days_over} days over 8 hours, \
             {weekend_sessions} weekend work sessions, {avg_daily:.1}h average per working day."
        ),
        impact,
        actions,
    ))
}

fn minutes_to_hours(minutes: i64) -> f64 {
    #[expect(clippy::cast_precision_loss, reason = "minute totals are small")]
    let m = minutes as f64;
    m / 60.0
}

/// Fragmented short gaps between meetings on a single day.
fn check_optimization(input: &InsightInput<'_>) -> Option<Insight> {
    let mut by_day: std::collections::BTreeMap<chrono::NaiveDate, Vec<&Event>> =
        std::collections::BTreeMap::new();
    for event in input.week_events {
        by_day.entry(event.start.date_naive()).or_default().push(event);
    }

    // BTreeMap iteration gives days in chronological order; the first
    // qualifying day wins and the scan stops.
    for (date, mut day_events) in by_day {
        if day_events.len() < 3 {
            continue;
        }
        day_events.sort_by_key(|e| e.start);

        let mut gap_count = 0usize;
        let mut gap_total = 0i64;
        for pair in day_events.windows(2) {
            let gap = (pair[1].start - pair[0].end).num_minutes();
            if gap > 0 && gap < FRAGMENT_GAP_MAX_MINUTES {
                gap_count += 1;
                gap_total += gap;
            }
        }

        if gap_count >= 2 && gap_total > FRAGMENT_TOTAL_MINUTES {
            let actions = vec![Suggestion {
                kind: SuggestionType::ScheduleOptimization,
                title: "Consolidate your meetings".to_string(),
                description: format!(
                    "Group the meetings on {date} back to back to reclaim a continuous block"
                ),
                reasoning: format!(
                    "{gap_count} short gaps totalling {gap_total} minutes are too brief for deep work"
                ),
                priority: Priority::Medium,
            }];
            return Some(insight(
                InsightType::OptimizationOpportunity,
                format!(
                    "On {date} your schedule has {gap_count} gaps under an hour totalling \
                     {gap_total} minutes. Consolidating them would free a usable block."
                ),
                0.6,
                actions,
            ));
        }
    }
    None
}

/// Surface the strongest freshly mined pattern, at most once a week.
fn check_pattern(input: &InsightInput<'_>) -> Option<Insight> {
    let best = input
        .patterns
        .iter()
        .filter(|p| p.confidence.value() > PATTERN_CONFIDENCE_THRESHOLD)
        .max_by(|a, b| a.confidence.value().total_cmp(&b.confidence.value()))?;

    let cutoff = input.now - Duration::days(PATTERN_DEDUP_DAYS);
    let already_surfaced = input.recent.iter().any(|r| {
        r.kind == InsightType::PatternDetected
            && r.created_at > cutoff
            && r.content.contains(&best.name)
    });
    if already_surfaced {
        return None;
    }

    Some(insight(
        InsightType::PatternDetected,
        format!("New pattern detected: {}. {}", best.name, best.description),
        0.5,
        Vec::new(),
    ))
}

/// Areas whose monthly time lags far behind their target.
fn check_goal_deviation(input: &InsightInput<'_>) -> Option<Insight> {
    if input.month_events.is_empty() {
        return None;
    }
    let report = balance::monthly_report(input.month_events, input.areas);
    let lagging: Vec<&balance::GoalAchievement> = report
        .goal_achievement
        .iter()
        .filter(|g| g.target > 0.0 && g.achievement < GOAL_LAG_THRESHOLD)
        .collect();
    if lagging.is_empty() {
        return None;
    }

    let impact = if lagging.len() > 2 { 0.7 } else { 0.5 };
    let names: Vec<&str> = lagging.iter().map(|g| g.area.as_str()).collect();

    let actions = vec![Suggestion {
        kind: SuggestionType::NewEvent,
        title: format!("Schedule time for {}", names.join(", ")),
        description: "Add recurring blocks for the areas falling behind their targets"
            .to_string(),
        reasoning: format!(
            "{} area(s) received less than half of their target time this month",
            lagging.len()
        ),
        priority: Priority::Medium,
    }];

    Some(insight(
        InsightType::GoalDeviation,
        format!(
            "These areas are getting less than half their target time this month: {}.",
            names.join(", ")
        ),
        impact,
        actions,
    ))
}
