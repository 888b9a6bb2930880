//! The garbage-collection decision engine.
//!
//! A streaming fold over the sorted lifecycle stream with a one-record
//! lookback window. Each step looks at the pair (previous, current); the
//! end-of-stream case is a final step with `current = None`. The engine
//! never buffers more than one record, so memory use is constant no matter
//! how large the merged snapshot is.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::GcConfig;
use crate::models::{DeleteAction, LifecycleRecord, MetadataDelete, PhysicalDelete};

/// Counters for one decision-engine run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GcStats {
    /// Records folded into the state machine.
    pub records: u64,
    /// Records skipped because they do not mark the object dead.
    pub skipped_live: u64,
    /// Metadata-delete actions emitted.
    pub metadata_deletes: u64,
    /// Physical-delete actions emitted.
    pub physical_deletes: u64,
    /// Objects left for a later run because they are inside the grace period.
    pub deferred: u64,
}

/// The decision engine.
///
/// Feed records in (objectId, timestamp) order via [`push`], then call
/// [`finish`] exactly once. Both return the actions resolved by that step,
/// in emission order. Re-running the same stream produces the same actions;
/// consumers are required to tolerate re-deletion.
///
/// [`push`]: GarbageCollector::push
/// [`finish`]: GarbageCollector::finish
pub struct GarbageCollector {
    grace_period: Duration,
    now: DateTime<Utc>,
    previous: Option<LifecycleRecord>,
    stats: GcStats,
}

impl GarbageCollector {
    pub fn new(config: &GcConfig) -> Self {
        Self {
            grace_period: config.grace_period,
            now: config.now,
            previous: None,
            stats: GcStats::default(),
        }
    }

    /// Folds the next record, returning the actions resolved for the one
    /// before it.
    pub fn push(&mut self, record: LifecycleRecord) -> Vec<DeleteAction> {
        self.stats.records += 1;
        self.step(Some(record))
    }

    /// Performs the final fold step with no current record.
    pub fn finish(&mut self) -> Vec<DeleteAction> {
        self.step(None)
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    fn step(&mut self, current: Option<LifecycleRecord>) -> Vec<DeleteAction> {
        let previous = self.previous.take();
        self.previous = current;

        let Some(prev) = previous else {
            return Vec::new();
        };

        if !prev.is_dead() {
            self.stats.skipped_live += 1;
            return Vec::new();
        }

        let superseded = self
            .previous
            .as_ref()
            .is_some_and(|curr| curr.object_id == prev.object_id);

        if superseded {
            // Another record for this object follows, so its metadata row
            // can go now. Physical reclamation stays with whichever record
            // of the run is chronologically last.
            return vec![self.metadata_delete(&prev)];
        }

        let age = self.now - prev.timestamp;
        if age < self.grace_period {
            // Too young. A later run will pick the object up again once it
            // ages past the threshold.
            debug!(
                object_id = %prev.object_id,
                age_secs = age.num_seconds(),
                "object inside grace period, deferring"
            );
            self.stats.deferred += 1;
            return Vec::new();
        }

        let mut actions = vec![self.metadata_delete(&prev)];
        if let Some(payload) = &prev.payload {
            for shark in &payload.sharks {
                self.stats.physical_deletes += 1;
                actions.push(DeleteAction::Physical(PhysicalDelete {
                    url: shark.url.clone(),
                    server_id: shark.server_id.clone(),
                    zone_id: shark.zone_id.clone(),
                    owner: payload.owner.clone(),
                    object_id: payload.object_id.clone(),
                }));
            }
        }
        actions
    }

    fn metadata_delete(&mut self, record: &LifecycleRecord) -> DeleteAction {
        self.stats.metadata_deletes += 1;
        DeleteAction::Metadata(MetadataDelete {
            metadata_target: record.metadata_target.clone(),
            object_id: record.object_id.clone(),
            timestamp: record.timestamp,
        })
    }
}
