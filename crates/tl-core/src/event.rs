//! Calendar events and user-defined life areas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AreaId, Confidence, EventId, EventSource, UserId, ValidationError};

/// A single calendar event owned by a user.
///
/// Construct through [`Event::new`], which rejects intervals where the end
/// does not come after the start. Analysis code may therefore assume
/// `start < end` for every event it receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: EventId,
    /// The user who owns this event.
    pub owner: UserId,
    /// Event title as entered or imported.
    pub title: String,
    /// When the event starts.
    pub start: DateTime<Utc>,
    /// When the event ends. Always after `start`.
    pub end: DateTime<Utc>,
    /// Whether this is an all-day event.
    pub all_day: bool,
    /// The life area this event is categorized into, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<AreaId>,
    /// Where this event came from.
    pub source: EventSource,
    /// How confident the system is in this event's data (1.0 for manual entry).
    #[serde(default)]
    pub confidence: Confidence,
}

impl Event {
    /// Creates a new event after validating the interval.
    #[expect(clippy::too_many_arguments, reason = "plain constructor over all fields")]
    pub fn new(
        id: EventId,
        owner: UserId,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        all_day: bool,
        area: Option<AreaId>,
        source: EventSource,
        confidence: Confidence,
    ) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidInterval {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self {
            id,
            owner,
            title: title.into(),
            start,
            end,
            all_day,
            area,
            source,
            confidence,
        })
    }

    /// Event length in whole minutes.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A user-defined time-allocation bucket with a target share of total time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeArea {
    /// Unique identifier for this area.
    pub id: AreaId,
    /// The user who owns this area.
    pub owner: UserId,
    /// Display name, e.g. "Work" or "Health".
    pub name: String,
    /// Target share of total tracked time, in percent (0-100).
    pub target_percentage: f64,
}

impl LifeArea {
    /// Creates a new life area after validating the target percentage.
    pub fn new(
        id: AreaId,
        owner: UserId,
        name: impl Into<String>,
        target_percentage: f64,
    ) -> Result<Self, ValidationError> {
        if !(0.0..=100.0).contains(&target_percentage) || target_percentage.is_nan() {
            return Err(ValidationError::TargetOutOfRange {
                value: target_percentage,
            });
        }
        Ok(Self {
            id,
            owner,
            name: name.into(),
            target_percentage,
        })
    }
}
