//! Delete actions emitted by the decision engine.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{GcError, GcResult};

/// Number of tab-separated fields in a metadata-delete action line.
const METADATA_FIELDS: usize = 3;

/// An immutable action resolved by the decision engine.
///
/// Actions are consumed exactly once by the matching executor. Re-emission
/// across overlapping runs is expected; consumers must treat re-deletion of
/// an already-deleted key as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteAction {
    /// Drop one metadata row.
    Metadata(MetadataDelete),
    /// Remove one physical replica.
    Physical(PhysicalDelete),
}

/// Deletion of a single metadata row, addressed by shard and natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDelete {
    pub metadata_target: String,
    pub object_id: String,
    pub timestamp: DateTime<Utc>,
}

impl MetadataDelete {
    /// The row key in the metadata store, derived from (objectId, timestamp).
    ///
    /// Millisecond epoch avoids RFC 3339 normalization mismatches between
    /// the producer and the store.
    pub fn key(&self) -> String {
        format!("/{}/{}", self.object_id, self.timestamp.timestamp_millis())
    }

    /// Serializes to the metadata-action stream format.
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.metadata_target,
            self.object_id,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    /// Parses one line of the metadata-action stream.
    pub fn parse(line: &str, line_no: u64) -> GcResult<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != METADATA_FIELDS {
            return Err(GcError::malformed(
                line_no,
                format!(
                    "expected {} tab-separated fields, got {}",
                    METADATA_FIELDS,
                    fields.len()
                ),
            ));
        }
        Ok(Self {
            metadata_target: fields[0].to_string(),
            object_id: fields[1].to_string(),
            timestamp: super::record::parse_timestamp(fields[2], line_no)?,
        })
    }
}

/// Deletion of a single physical replica on a storage node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDelete {
    pub url: String,
    pub server_id: String,
    pub zone_id: String,
    pub owner: String,
    pub object_id: String,
}

impl PhysicalDelete {
    /// Serializes to the physical-action stream format.
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.url, self.server_id, self.zone_id, self.owner, self.object_id
        )
    }
}
