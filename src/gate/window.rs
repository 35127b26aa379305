//! Trailing-window event counter.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::error::{GateError, Result};

/// Default age after which recorded events are dropped.
pub const DEFAULT_RETENTION_SECS: i64 = 3600;

/// Convert epoch seconds into a UTC timestamp.
///
/// Fails with `InvalidArgument` when the value is outside the representable range.
pub fn timestamp_from_secs(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| GateError::InvalidArgument(format!("invalid timestamp: {}", secs)))
}

/// Whole seconds of a non-negative period.
fn period_secs(period: Duration) -> Result<i64> {
    if period < Duration::zero() {
        return Err(GateError::InvalidArgument(format!(
            "period must not be negative: {}s",
            period.num_seconds()
        )));
    }
    Ok(period.num_seconds())
}

/// The ordered event history of a single actor.
///
/// Events are whole epoch seconds kept in non-decreasing order, so both window
/// counts and pruning are boundary searches rather than scans.
#[derive(Debug, Clone)]
pub struct WindowCounter {
    /// Recorded events, sorted ascending, duplicates allowed
    events: VecDeque<i64>,
    /// Maximum age of an event relative to the latest record
    retention: Duration,
}

impl WindowCounter {
    /// Create an empty counter with the default one hour retention.
    pub fn new() -> Self {
        Self::with_retention(Duration::seconds(DEFAULT_RETENTION_SECS))
    }

    /// Create an empty counter with a custom retention horizon.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            events: VecDeque::new(),
            retention,
        }
    }

    /// Count events `e` with `reference_time - period <= e <= reference_time`.
    pub fn count_in_window(&self, period: Duration, reference_time: DateTime<Utc>) -> Result<usize> {
        let upper = reference_time.timestamp();
        let lower = upper.saturating_sub(period_secs(period)?);

        let start = self.events.partition_point(|e| *e < lower);
        let end = self.events.partition_point(|e| *e <= upper);
        Ok(end.saturating_sub(start))
    }

    /// Record an event at `time`, then drop anything older than the retention horizon.
    ///
    /// Out-of-order times are accepted and inserted at their sorted position.
    pub fn record(&mut self, time: DateTime<Utc>) {
        let ts = time.timestamp();
        let idx = self.events.partition_point(|e| *e <= ts);
        self.events.insert(idx, ts);
        self.prune(time, self.retention);
    }

    /// Delete every event strictly older than `reference_time - horizon`.
    pub fn prune(&mut self, reference_time: DateTime<Utc>, horizon: Duration) {
        let cutoff = reference_time
            .timestamp()
            .saturating_sub(horizon.num_seconds().max(0));
        let stale = self.events.partition_point(|e| *e < cutoff);
        self.events.drain(..stale);
    }

    /// Forget every event. Only used to reset state.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of events currently held.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are held.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The retention horizon applied on every record.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Iterate the stored events in ascending order.
    pub fn events(&self) -> impl Iterator<Item = i64> + '_ {
        self.events.iter().copied()
    }
}

impl Default for WindowCounter {
    fn default() -> Self {
        Self::new()
    }
}
