//! Core calendar analytics for timelens.
//!
//! This crate contains the pure analysis logic:
//! - Interval analysis: free slots, busy clusters, break and focus suggestions
//! - Balance scoring: actual vs. target life-area distribution with reports
//! - Pattern mining: recurring regularities in a historical event window
//! - Insight synthesis: ordered checks over the other analyses' outputs
//! - Extraction: best-effort parsing of free text into draft events
//!
//! Everything here is deterministic and side-effect free: callers pass in
//! event slices and the current time, and get fresh values back. Storage
//! and language-model access live behind the seams in [`repo`] and the
//! `tl-nlu` crate.

pub mod balance;
pub mod classify;
pub mod event;
pub mod extract;
pub mod insight;
pub mod interval;
pub mod pattern;
pub mod repo;
pub mod types;

pub use balance::{
    AnalyticsPeriod, MonthlyReport, TimeBalance, Trend, WeeklyReport, default_targets,
    monthly_report, time_balance, weekly_report,
};
pub use classify::{AreaClassifier, ClassifierRule};
pub use event::{Event, LifeArea};
pub use extract::{
    DraftEvent, ExtractedFields, fallback_extract, resolve_date, resolve_draft, resolve_time,
};
pub use insight::{
    Insight, InsightInput, InsightType, Priority, RecordedInsight, Suggestion, SuggestionType,
    synthesize_insights,
};
pub use interval::{
    AnalyzerConfig, BusyPeriod, DayAnalysis, TimeSlot, analyze_day, busy_periods, busy_score,
    focus_slots, free_slots, suggest_breaks,
};
pub use pattern::{Pattern, mine_patterns};
pub use repo::{EventRepository, InsightSink};
pub use types::{AreaId, Confidence, EventId, EventSource, UserId, ValidationError};
