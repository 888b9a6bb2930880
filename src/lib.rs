//! reefgc: garbage collection for a sharded object store.
//!
//! Objects may be hard-linked, so several metadata rows can reference one
//! physical replica set; replicas are only reclaimed once no row anywhere
//! references them. This crate holds the decision engine that turns a
//! sorted lifecycle stream into two idempotent action streams, the
//! auditors that argue both directions of metadata/storage consistency,
//! and the batched executor that applies metadata deletions per shard.
//!
//! # Example
//!
//! ```no_run
//! use reefgc::{pipeline, GcConfig};
//!
//! #[tokio::main]
//! async fn main() -> reefgc::GcResult<()> {
//!     let input = tokio::io::BufReader::new(tokio::io::stdin());
//!     let mut metadata_out = Vec::new();
//!     let mut physical_out = Vec::new();
//!     let stats =
//!         pipeline::run_gc(input, &mut metadata_out, &mut physical_out, &GcConfig::default())
//!             .await?;
//!     eprintln!("{} metadata deletes", stats.metadata_deletes);
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod pipeline;

// Re-exports for convenience
pub use collector::{AuditProblem, Auditor, CruftCollector, GarbageCollector, GcStats};
pub use config::{
    Args, CleanConfig, Command, GcConfig, DEFAULT_BATCH_SIZE, DEFAULT_GRACE_PERIOD_DAYS,
};
pub use error::{GcError, GcResult};
pub use executor::{CleanEvent, CleanStats, Cleaner, ClientRegistry, MetadataClient};
