//! The consistency auditor.

use std::collections::HashSet;

use crate::models::{AuditRecord, SourceKind};

/// A metadata reference that no known physical copy justifies.
///
/// Problems are findings, not errors: they are the auditor's product and
/// never abort a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditProblem {
    /// The offending row, verbatim.
    pub record: AuditRecord,
}

/// Counters for one audit run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuditStats {
    pub records: u64,
    pub objects: u64,
    pub problems: u64,
}

/// Streaming check that every metadata reference points into the replica
/// set established by the leading physical rows of its object.
///
/// State is one object at a time: the current objectId and its accumulated
/// replica ids (bounded by the replication factor).
#[derive(Default)]
pub struct Auditor {
    current: Option<ReplicaSet>,
    stats: AuditStats,
}

struct ReplicaSet {
    object_id: String,
    storage_ids: HashSet<String>,
}

impl Auditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the next pair record, returning a problem if the record is a
    /// metadata reference the current replica set cannot justify.
    pub fn push(&mut self, record: AuditRecord) -> Option<AuditProblem> {
        self.stats.records += 1;
        match record.source {
            SourceKind::Physical => {
                match &mut self.current {
                    Some(set) if set.object_id == record.object_id => {
                        set.storage_ids.insert(record.storage_id);
                    }
                    _ => {
                        // First sight of a new object establishes its set.
                        self.stats.objects += 1;
                        self.current = Some(ReplicaSet {
                            object_id: record.object_id,
                            storage_ids: HashSet::from([record.storage_id]),
                        });
                    }
                }
                None
            }
            SourceKind::Metadata => {
                let justified = self.current.as_ref().is_some_and(|set| {
                    set.object_id == record.object_id
                        && set.storage_ids.contains(&record.storage_id)
                });
                if justified {
                    None
                } else {
                    self.stats.problems += 1;
                    Some(AuditProblem { record })
                }
            }
        }
    }

    pub fn stats(&self) -> &AuditStats {
        &self.stats
    }
}
