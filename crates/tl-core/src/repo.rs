//! Storage seams the analytics core reads through.
//!
//! The core computes over slices handed to it and owns no storage; these
//! traits are the boundary callers implement against their own store.

use chrono::{DateTime, Utc};

use crate::event::{Event, LifeArea};
use crate::insight::Insight;
use crate::types::UserId;

/// Read access to a user's events and life areas.
pub trait EventRepository {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Events owned by `owner` intersecting `[start, end)`.
    fn events_in_range(
        &self,
        owner: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, Self::Error>;

    /// All life areas configured by `owner`.
    fn areas(&self, owner: &UserId) -> Result<Vec<LifeArea>, Self::Error>;
}

/// Write access for persisting synthesized insights.
pub trait InsightSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn record(&self, owner: &UserId, insights: &[Insight]) -> Result<(), Self::Error>;
}
