//! The cruft collector, the inverse of the auditor.

use crate::models::{CruftCandidate, PhysicalCopy};

/// Counters for one cruft run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CruftStats {
    pub records: u64,
    pub cruft: u64,
}

/// Finds physical copies with no live metadata reference.
///
/// Consumes the reverse-sorted candidate stream, where all metadata rows
/// for an object precede its physical rows. State is the most recently
/// seen metadata objectId; a physical row for any other object is cruft
/// and gets routed back into the deletion pipeline.
#[derive(Default)]
pub struct CruftCollector {
    tracked: Option<String>,
    stats: CruftStats,
}

impl CruftCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the next candidate, returning the copy if it turned out to be
    /// cruft.
    pub fn push(&mut self, candidate: CruftCandidate) -> Option<PhysicalCopy> {
        self.stats.records += 1;
        match candidate {
            CruftCandidate::Metadata { object_id } => {
                self.tracked = Some(object_id);
                None
            }
            CruftCandidate::Physical(copy) => {
                if self.tracked.as_deref() == Some(copy.object_id.as_str()) {
                    None
                } else {
                    self.stats.cruft += 1;
                    Some(copy)
                }
            }
        }
    }

    pub fn stats(&self) -> &CruftStats {
        &self.stats
    }
}
