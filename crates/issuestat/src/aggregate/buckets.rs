use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Accumulator, AggregateError};
use crate::platform::IssueRecord;
use crate::snapshot::{GroupingPayload, SnapshotPayload};
use crate::window::{Granularity, TimeWindow};

/// Opened/closed counts of one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    pub key: String,
    pub opened: u64,
    pub closed: u64,
}

/// Pre-seeded, newest-first sequence of time buckets covering a window.
#[derive(Debug, Clone)]
pub struct BucketSeries {
    granularity: Granularity,
    buckets: Vec<BucketCount>,
    index: HashMap<String, usize>,
}

impl BucketSeries {
    /// Seed one zeroed bucket per calendar unit touched by `[oldest, now]`.
    ///
    /// Keys run from the unit containing `now` down to the unit containing
    /// `oldest`, both inclusive. The order is never changed afterwards.
    #[must_use]
    pub fn seed(window: &TimeWindow, granularity: Granularity) -> Self {
        let floor = granularity.unit_start(window.oldest().date_naive());
        let mut current = Some(granularity.unit_start(window.now().date_naive()));

        let mut buckets = Vec::new();
        let mut index = HashMap::new();

        while let Some(date) = current {
            if date < floor {
                break;
            }

            let key = granularity.key_for_date(date);
            index.entry(key.clone()).or_insert_with(|| {
                buckets.push(BucketCount {
                    key,
                    opened: 0,
                    closed: 0,
                });
                buckets.len() - 1
            });

            current = granularity.previous_unit(date);
        }

        tracing::debug!(
            granularity = %granularity,
            buckets = buckets.len(),
            "Seeded bucket series"
        );

        Self {
            granularity,
            buckets,
            index,
        }
    }

    fn bucket_mut(&mut self, instant: DateTime<Utc>) -> Result<&mut BucketCount, AggregateError> {
        let key = self.granularity.key(instant);
        match self.index.get(&key) {
            Some(idx) => Ok(&mut self.buckets[*idx]),
            None => Err(AggregateError::BucketNotFound { key }),
        }
    }

    pub fn record_opened(&mut self, instant: DateTime<Utc>) -> Result<(), AggregateError> {
        self.bucket_mut(instant)?.opened += 1;
        Ok(())
    }

    pub fn record_closed(&mut self, instant: DateTime<Utc>) -> Result<(), AggregateError> {
        self.bucket_mut(instant)?.closed += 1;
        Ok(())
    }

    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Buckets in seeding order.
    #[must_use]
    pub fn snapshot(&self) -> &[BucketCount] {
        &self.buckets
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.key.as_str())
    }
}

impl Accumulator for BucketSeries {
    fn record_opened(&mut self, record: &IssueRecord) -> Result<(), AggregateError> {
        BucketSeries::record_opened(self, record.created_at)
    }

    fn record_closed(
        &mut self,
        _record: &IssueRecord,
        closed_at: DateTime<Utc>,
    ) -> Result<(), AggregateError> {
        BucketSeries::record_closed(self, closed_at)
    }

    fn payload(&self) -> SnapshotPayload {
        SnapshotPayload::Grouping(GroupingPayload {
            granularity: self.granularity.as_str().to_string(),
            format: self.granularity.format().to_string(),
            buckets: self.buckets.clone(),
        })
    }
}
