//! Lifecycle records consumed by the decision engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GcError, GcResult};

/// Number of tab-separated fields in a lifecycle record line.
const LIFECYCLE_FIELDS: usize = 5;

/// Lifecycle record discriminator. Only dead records drive reclamation;
/// everything else is treated as live and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    Dead,
    Other(String),
}

impl RecordType {
    pub fn from_field(s: &str) -> Self {
        match s {
            "dead" => RecordType::Dead,
            other => RecordType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecordType::Dead => "dead",
            RecordType::Other(s) => s.as_str(),
        }
    }
}

/// A physical replica location on a storage node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shark {
    pub url: String,
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub zone_id: String,
}

/// Structured payload of a dead record: the owner and the replica set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadPayload {
    pub owner: String,
    pub object_id: String,
    #[serde(default)]
    pub sharks: Vec<Shark>,
}

/// One row of the sorted lifecycle stream.
///
/// The stream is totally ordered by (objectId, timestamp) ascending; the
/// engine relies on that ordering but does not enforce it.
#[derive(Debug, Clone)]
pub struct LifecycleRecord {
    pub object_id: String,
    pub timestamp: DateTime<Utc>,
    pub record_type: RecordType,
    /// Parsed payload, present exactly for dead records.
    pub payload: Option<DeadPayload>,
    /// The metadata shard holding the row that produced this record.
    pub metadata_target: String,
}

impl LifecycleRecord {
    /// Parses one tab-separated line.
    ///
    /// The payload blob of a dead record is parsed eagerly so that an
    /// unparsable blob fails the run here instead of being silently skipped
    /// later. Payloads of non-dead records are never inspected.
    pub fn parse(line: &str, line_no: u64) -> GcResult<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != LIFECYCLE_FIELDS {
            return Err(GcError::malformed(
                line_no,
                format!(
                    "expected {} tab-separated fields, got {}",
                    LIFECYCLE_FIELDS,
                    fields.len()
                ),
            ));
        }

        let object_id = fields[0].to_string();
        let timestamp = parse_timestamp(fields[1], line_no)?;
        let record_type = RecordType::from_field(fields[2]);

        let payload = match record_type {
            RecordType::Dead => {
                let payload: DeadPayload =
                    serde_json::from_str(fields[3]).map_err(|source| GcError::MalformedPayload {
                        line: line_no,
                        object_id: object_id.clone(),
                        source,
                    })?;
                Some(payload)
            }
            RecordType::Other(_) => None,
        };

        Ok(Self {
            object_id,
            timestamp,
            record_type,
            payload,
            metadata_target: fields[4].to_string(),
        })
    }

    /// Whether this record marks the object dead.
    pub fn is_dead(&self) -> bool {
        self.record_type == RecordType::Dead
    }
}

/// Parses an RFC 3339 timestamp field.
pub(crate) fn parse_timestamp(raw: &str, line_no: u64) -> GcResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GcError::malformed(line_no, format!("bad timestamp {:?}: {}", raw, e)))
}
