//! Records consumed by the consistency auditor and the cruft collector.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{GcError, GcResult};

/// Where a row in a comparison stream came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Storage-node inventory.
    Physical,
    /// Metadata-store snapshot.
    Metadata,
}

impl SourceKind {
    pub fn from_field(s: &str, line_no: u64) -> GcResult<Self> {
        match s {
            "physical" => Ok(SourceKind::Physical),
            "metadata" => Ok(SourceKind::Metadata),
            other => Err(GcError::malformed(
                line_no,
                format!("unknown source {:?}", other),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Physical => "physical",
            SourceKind::Metadata => "metadata",
        }
    }
}

/// One row of the audit pairing stream: an (object, storage reference)
/// pair, pre-grouped so all physical rows for an object precede its
/// metadata rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub object_id: String,
    pub storage_id: String,
    pub source: SourceKind,
}

impl AuditRecord {
    pub fn parse(line: &str, line_no: u64) -> GcResult<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 3 {
            return Err(GcError::malformed(
                line_no,
                format!("expected 3 tab-separated fields, got {}", fields.len()),
            ));
        }
        Ok(Self {
            object_id: fields[0].to_string(),
            storage_id: fields[1].to_string(),
            source: SourceKind::from_field(fields[2], line_no)?,
        })
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.object_id,
            self.storage_id,
            self.source.as_str()
        )
    }
}

/// One row of the reverse-sorted cruft candidate stream. Metadata rows for
/// an object precede its physical rows; only physical rows carry the copy
/// details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CruftCandidate {
    Metadata { object_id: String },
    Physical(PhysicalCopy),
}

/// A physical copy as reported by a storage-node inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalCopy {
    pub object_id: String,
    pub storage_id: String,
    pub owner: String,
    pub bytes: u64,
    pub create_time: DateTime<Utc>,
}

impl CruftCandidate {
    pub fn parse(line: &str, line_no: u64) -> GcResult<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            return Err(GcError::malformed(
                line_no,
                format!("expected at least 2 tab-separated fields, got {}", fields.len()),
            ));
        }
        let object_id = fields[0].to_string();
        match SourceKind::from_field(fields[1], line_no)? {
            SourceKind::Metadata => {
                if fields.len() != 2 {
                    return Err(GcError::malformed(
                        line_no,
                        format!("metadata row takes 2 fields, got {}", fields.len()),
                    ));
                }
                Ok(CruftCandidate::Metadata { object_id })
            }
            SourceKind::Physical => {
                if fields.len() != 6 {
                    return Err(GcError::malformed(
                        line_no,
                        format!("physical row takes 6 fields, got {}", fields.len()),
                    ));
                }
                let bytes = fields[4].parse::<u64>().map_err(|e| {
                    GcError::malformed(line_no, format!("bad byte count {:?}: {}", fields[4], e))
                })?;
                Ok(CruftCandidate::Physical(PhysicalCopy {
                    object_id,
                    storage_id: fields[2].to_string(),
                    owner: fields[3].to_string(),
                    bytes,
                    create_time: super::record::parse_timestamp(fields[5], line_no)?,
                }))
            }
        }
    }
}

impl PhysicalCopy {
    /// Re-emits this copy in the shape the garbage collector's input stage
    /// accepts as an additional dead candidate.
    pub fn to_cruft_line(&self) -> String {
        format!(
            "physical\t{}\t{}\t{}\t{}\t{}",
            self.storage_id,
            self.owner,
            self.object_id,
            self.bytes,
            self.create_time.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}
