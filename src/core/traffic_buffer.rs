//! In-memory buffer of recent request records.
//!
//! Records are kept ordered by timestamp so that window queries and
//! retention eviction only touch the ends of the buffer.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::models::RequestRecord;

// Largest span chrono can represent, in whole seconds
const MAX_SPAN_SECONDS: i64 = i64::MAX / 1_000;

/// Convert a configured number of seconds into a span, saturating at the
/// largest span chrono supports
pub fn span_seconds(seconds: u64) -> Duration {
    let seconds = i64::try_from(seconds).unwrap_or(i64::MAX).min(MAX_SPAN_SECONDS);
    Duration::seconds(seconds)
}

/// Start of a span ending at `now`, or `None` when it reaches past the
/// earliest representable time
pub fn span_start(now: DateTime<Utc>, span: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(span)
}

/// Time-ordered buffer of recent records
#[derive(Debug)]
pub struct TrafficBuffer {
    records: VecDeque<RequestRecord>,
    retention: Duration,
}

impl TrafficBuffer {
    /// Create a buffer keeping `retention_seconds` of traffic
    pub fn new(retention_seconds: u64) -> Self {
        Self {
            records: VecDeque::new(),
            retention: span_seconds(retention_seconds),
        }
    }

    /// Insert a record at its timestamp position
    pub fn push(&mut self, record: RequestRecord) {
        match self.records.back() {
            Some(last) if last.timestamp > record.timestamp => {
                let index = self.records.partition_point(|r| r.timestamp <= record.timestamp);
                self.records.insert(index, record);
            }
            _ => self.records.push_back(record),
        }
    }

    pub fn extend<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = RequestRecord>,
    {
        for record in records {
            self.push(record);
        }
    }

    /// Records observed within the last `seconds` before `now`
    pub fn recent(&self, now: DateTime<Utc>, seconds: u64) -> Vec<RequestRecord> {
        let start = match span_start(now, span_seconds(seconds)) {
            Some(since) => self.records.partition_point(|r| r.timestamp < since),
            None => 0,
        };
        self.records.range(start..).cloned().collect()
    }

    /// Drop records older than the retention period; returns how many went
    pub fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = match span_start(now, self.retention) {
            Some(cutoff) => cutoff,
            None => return 0,
        };
        let mut evicted = 0;
        while let Some(front) = self.records.front() {
            if front.timestamp >= cutoff {
                break;
            }
            self.records.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
