//! Command-line arguments and run configuration.

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{GcError, GcResult};

/// Default grace period in days before physical reclamation is permitted.
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 2;

/// Default number of metadata-delete actions per delete-many request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "reefgc")]
#[command(about = "Garbage collection engine for a sharded object store")]
#[command(version)]
pub struct Args {
    /// Enable debug logging.
    #[arg(long, short = 'd', global = true)]
    pub debug: bool,

    /// Enable silent mode (minimal logging).
    #[arg(long, short = 's', global = true)]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// The tool to run.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the garbage-collection decision engine over a sorted lifecycle stream.
    Gc {
        /// Input file with sorted lifecycle records (stdin if omitted).
        input: Option<PathBuf>,

        /// Grace period in days before physical reclamation.
        #[arg(long, default_value_t = DEFAULT_GRACE_PERIOD_DAYS)]
        grace_days: i64,

        /// Reference time as RFC 3339 (defaults to the current time).
        #[arg(long)]
        now: Option<String>,

        /// Output file for metadata-delete actions (stdout if omitted).
        #[arg(long)]
        metadata_out: Option<PathBuf>,

        /// Output file for physical-delete actions (stdout if omitted).
        #[arg(long)]
        physical_out: Option<PathBuf>,
    },

    /// Check that every metadata reference is backed by a known physical copy.
    Audit {
        /// Input file with sorted audit pair records (stdin if omitted).
        input: Option<PathBuf>,
    },

    /// Find physical copies with no live metadata reference.
    Cruft {
        /// Input file with reverse-sorted cruft candidates (stdin if omitted).
        input: Option<PathBuf>,
    },

    /// Apply a metadata-delete action stream against one shard.
    Clean {
        /// Input file with metadata-delete actions (stdin if omitted).
        input: Option<PathBuf>,

        /// The metadata shard the action stream was produced for.
        #[arg(long)]
        target: String,

        /// Actions per delete-many request.
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
}

/// Configuration for one decision-engine run.
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Minimum age of a dead record before its replicas may be reclaimed.
    pub grace_period: Duration,
    /// Reference time used for age computation.
    pub now: DateTime<Utc>,
}

impl GcConfig {
    /// Builds a config from the `gc` subcommand arguments.
    pub fn from_args(grace_days: i64, now: Option<&str>) -> GcResult<Self> {
        if grace_days < 0 {
            return Err(GcError::Config(format!(
                "grace period must not be negative, got {} days",
                grace_days
            )));
        }

        let now = match now {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map_err(|e| GcError::Config(format!("invalid --now timestamp: {}", e)))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };

        Ok(Self {
            grace_period: Duration::days(grace_days),
            now,
        })
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::days(DEFAULT_GRACE_PERIOD_DAYS),
            now: Utc::now(),
        }
    }
}

/// Configuration for one delete-executor run.
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// The metadata shard this run applies to.
    pub target: String,
    /// Actions per delete-many request.
    pub batch_size: usize,
}

impl CleanConfig {
    /// Builds a config from the `clean` subcommand arguments.
    pub fn new(target: impl Into<String>, batch_size: usize) -> GcResult<Self> {
        if batch_size == 0 {
            return Err(GcError::Config("batch size must be at least 1".to_string()));
        }
        Ok(Self {
            target: target.into(),
            batch_size,
        })
    }
}
