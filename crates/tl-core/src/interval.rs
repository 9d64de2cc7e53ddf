//! Free/busy interval analysis.
//!
//! Computes free time slots within a window, clusters events into busy
//! periods, proposes breaks inside long busy stretches, and ranks free
//! slots for deep-focus work.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Configuration for interval analysis.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Free slots shorter than this are discarded as noise. Default: 15.
    pub min_free_slot_minutes: i64,

    /// Maximum gap between consecutive events that still counts as one
    /// busy period. Default: 30.
    pub cluster_gap_minutes: i64,

    /// Busy periods at least this long get a suggested break. Default: 180.
    pub break_after_minutes: i64,

    /// Length of a suggested break. Default: 15.
    pub break_length_minutes: i64,

    /// Minimum free-slot length to qualify as focus time. Default: 90.
    pub focus_slot_minutes: i64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_free_slot_minutes: 15,
            cluster_gap_minutes: 30,
            break_after_minutes: 180,
            break_length_minutes: 15,
            focus_slot_minutes: 90,
        }
    }
}

/// Score for free slots starting in the morning focus window (9-12).
const FOCUS_MORNING_SCORE: u32 = 10;
/// Score for all other free slots.
const FOCUS_BASELINE_SCORE: u32 = 5;
/// How many focus slots to return.
const FOCUS_SLOT_LIMIT: usize = 3;

/// A contiguous interval within an analysis window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Interval start (inclusive).
    pub start: DateTime<Utc>,
    /// Interval end (exclusive).
    pub end: DateTime<Utc>,
    /// Whether the interval is free for scheduling.
    pub available: bool,
}

impl TimeSlot {
    /// Slot length in whole minutes.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A maximal run of events whose consecutive gaps stay within the cluster
/// threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPeriod {
    /// When the run starts.
    pub start: DateTime<Utc>,
    /// When the run ends.
    pub end: DateTime<Utc>,
    /// Number of events in the run.
    pub event_count: usize,
}

/// Everything interval analysis has to say about one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAnalysis {
    /// Booked share of the working day, 0-100.
    pub busy_score: f64,
    /// Free slots within the window, disjoint and sorted.
    pub free_slots: Vec<TimeSlot>,
    /// Busy periods within the window.
    pub busy_periods: Vec<BusyPeriod>,
    /// Suggested breaks inside long busy periods.
    pub suggested_breaks: Vec<TimeSlot>,
    /// Best free slots for deep-focus work, at most three.
    pub focus_slots: Vec<TimeSlot>,
}

/// Compute free time slots within `[window_start, window_end)`.
///
/// Events are clipped to the window; events fully outside it are ignored.
/// The sweep handles overlapping events by only ever advancing the cursor.
/// Slots shorter than the configured minimum are dropped.
///
/// The returned slots are pairwise disjoint, sorted by start, and fully
/// contained in the window. An empty event list yields the whole window as
/// one free slot (when long enough); a degenerate window yields nothing.
pub fn free_slots(
    events: &[Event],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    config: &AnalyzerConfig,
) -> Vec<TimeSlot> {
    if window_start >= window_end {
        return Vec::new();
    }

    // Clip to the window and drop events that don't intersect it.
    let mut clipped: Vec<(DateTime<Utc>, DateTime<Utc>)> = events
        .iter()
        .filter(|e| e.end > window_start && e.start < window_end)
        .map(|e| (e.start.max(window_start), e.end.min(window_end)))
        .collect();
    clipped.sort_by_key(|&(start, _)| start);

    let min_slot = Duration::minutes(config.min_free_slot_minutes);
    let mut slots = Vec::new();
    let mut cursor = window_start;

    for (start, end) in clipped {
        if cursor < start && start - cursor >= min_slot {
            slots.push(TimeSlot {
                start: cursor,
                end: start,
                available: true,
            });
        }
        cursor = cursor.max(end);
    }

    if cursor < window_end && window_end - cursor >= min_slot {
        slots.push(TimeSlot {
            start: cursor,
            end: window_end,
            available: true,
        });
    }

    tracing::debug!(
        slots = slots.len(),
        events = events.len(),
        "computed free slots"
    );
    slots
}

/// Cluster events into busy periods.
///
/// Walking events in start order, the current period extends while the gap
/// to the next event stays within the cluster threshold; otherwise it is
/// closed and a new one starts. Each period records its span and event count.
pub fn busy_periods(events: &[Event], config: &AnalyzerConfig) -> Vec<BusyPeriod> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|e| e.start);

    let max_gap = Duration::minutes(config.cluster_gap_minutes);
    let mut periods: Vec<BusyPeriod> = Vec::new();
    let mut current: Option<BusyPeriod> = None;

    for event in sorted {
        match current.as_mut() {
            None => {
                current = Some(BusyPeriod {
                    start: event.start,
                    end: event.end,
                    event_count: 1,
                });
            }
            Some(period) => {
                if event.start - period.end <= max_gap {
                    // Overlapping events must not move the period end backwards.
                    period.end = period.end.max(event.end);
                    period.event_count += 1;
                } else {
                    periods.push(period.clone());
                    current = Some(BusyPeriod {
                        start: event.start,
                        end: event.end,
                        event_count: 1,
                    });
                }
            }
        }
    }

    if let Some(period) = current {
        periods.push(period);
    }

    periods
}

/// Suggest a short break inside each long busy period.
///
/// Periods spanning at least `break_after_minutes` get one break of
/// `break_length_minutes`, starting at the period's temporal midpoint.
pub fn suggest_breaks(periods: &[BusyPeriod], config: &AnalyzerConfig) -> Vec<TimeSlot> {
    periods
        .iter()
        .filter(|p| (p.end - p.start).num_minutes() >= config.break_after_minutes)
        .map(|p| {
            let break_start = p.start + Duration::minutes((p.end - p.start).num_minutes() / 2);
            TimeSlot {
                start: break_start,
                end: break_start + Duration::minutes(config.break_length_minutes),
                available: true,
            }
        })
        .collect()
}

/// Rank free slots for deep-focus work and return the best three.
///
/// Only slots of at least `focus_slot_minutes` qualify. Slots starting in
/// the morning (hour 9 to 11 inclusive) score higher than the rest; ties
/// keep chronological order.
pub fn focus_slots(free: &[TimeSlot], config: &AnalyzerConfig) -> Vec<TimeSlot> {
    let mut candidates: Vec<&TimeSlot> = free
        .iter()
        .filter(|slot| slot.duration_minutes() >= config.focus_slot_minutes)
        .collect();

    candidates.sort_by_key(|slot| std::cmp::Reverse(focus_score(slot)));
    candidates
        .into_iter()
        .take(FOCUS_SLOT_LIMIT)
        .cloned()
        .collect()
}

fn focus_score(slot: &TimeSlot) -> u32 {
    let hour = slot.start.hour();
    if (9..12).contains(&hour) {
        FOCUS_MORNING_SCORE
    } else {
        FOCUS_BASELINE_SCORE
    }
}

/// Booked minutes as a share of the working day, capped at 100.
///
/// Returns 0.0 for an empty event list or a non-positive working window.
pub fn busy_score(events: &[Event], working_minutes: i64) -> f64 {
    if events.is_empty() || working_minutes <= 0 {
        return 0.0;
    }

    #[expect(clippy::cast_precision_loss, reason = "minute totals are small")]
    let booked: f64 = events.iter().map(Event::duration_minutes).sum::<i64>() as f64;
    #[expect(clippy::cast_precision_loss, reason = "minute totals are small")]
    let working = working_minutes as f64;
    (booked / working * 100.0).min(100.0)
}

/// Default working day used by [`analyze_day`] when scoring busyness.
const DEFAULT_WORKING_MINUTES: i64 = 480;

/// Run the full interval analysis for one day's window.
pub fn analyze_day(
    events: &[Event],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    config: &AnalyzerConfig,
) -> DayAnalysis {
    let free = free_slots(events, window_start, window_end, config);
    let periods = busy_periods(events, config);
    let breaks = suggest_breaks(&periods, config);
    let focus = focus_slots(&free, config);

    DayAnalysis {
        busy_score: busy_score(events, DEFAULT_WORKING_MINUTES),
        free_slots: free,
        busy_periods: periods,
        suggested_breaks: breaks,
        focus_slots: focus,
    }
}
