//! Batched delete executor for one metadata shard.
//!
//! Actions are read in order, grouped into fixed-size batches, and handed
//! to a single worker over a capacity-1 channel. That depth-1 queue is the
//! backpressure mechanism: exactly one delete-many request is in flight per
//! target, and batches apply strictly FIFO. A failed batch is reported and
//! skipped; the run keeps going with the next one.

use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CleanConfig;
use crate::error::{GcError, GcResult};
use crate::executor::MetadataClient;
use crate::models::MetadataDelete;

/// Statistics for one clean run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanStats {
    /// Actions read from the input stream.
    pub actions: u64,
    /// Delete-many requests issued.
    pub batches: u64,
    /// Rows the store actually removed.
    pub deleted: u64,
    /// Keys that were already gone when their batch was applied.
    pub already_deleted: u64,
    /// Batches whose request failed.
    pub failed_batches: u64,
}

/// Emitted to the caller's event channel when a batch request fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanEvent {
    BatchFailed {
        target: String,
        request_id: String,
        keys: Vec<String>,
        latency: Duration,
        reason: String,
    },
}

#[derive(Debug, Default)]
struct WorkerStats {
    batches: u64,
    deleted: u64,
    already_deleted: u64,
    failed_batches: u64,
}

/// The delete executor for a single expected target.
pub struct Cleaner {
    target: String,
    batch_size: usize,
    client: Arc<dyn MetadataClient>,
    events: Option<mpsc::UnboundedSender<CleanEvent>>,
}

impl Cleaner {
    pub fn new(config: &CleanConfig, client: Arc<dyn MetadataClient>) -> Self {
        Self {
            target: config.target.clone(),
            batch_size: config.batch_size,
            client,
            events: None,
        }
    }

    /// Sends batch-failure events to the given channel in addition to logs.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<CleanEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Drains a metadata-delete action stream against the target.
    ///
    /// Every action must name this cleaner's target; a mismatch aborts the
    /// run (the stream was routed to the wrong shard). On end of stream the
    /// final partial batch is flushed, the worker drains, and the combined
    /// statistics are returned.
    pub async fn clean<R>(&self, reader: R) -> GcResult<CleanStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let (batch_tx, batch_rx) = mpsc::channel::<Vec<MetadataDelete>>(1);
        let worker = tokio::spawn(drain_batches(
            Arc::clone(&self.client),
            self.target.clone(),
            self.events.clone(),
            batch_rx,
        ));

        // Feed first, join the worker unconditionally, then surface any
        // feed error: the worker must not outlive the run even when the
        // input stream was bad.
        let fed = self.feed(reader, batch_tx).await;
        let worker_stats = worker
            .await
            .map_err(|e| GcError::client(&self.target, format!("delete worker died: {}", e)))?;
        let actions = fed?;

        let stats = CleanStats {
            actions,
            batches: worker_stats.batches,
            deleted: worker_stats.deleted,
            already_deleted: worker_stats.already_deleted,
            failed_batches: worker_stats.failed_batches,
        };
        info!(
            shard = %self.target,
            actions = stats.actions,
            batches = stats.batches,
            deleted = stats.deleted,
            already_deleted = stats.already_deleted,
            failed_batches = stats.failed_batches,
            "clean run complete"
        );
        Ok(stats)
    }

    /// Reads actions and enqueues full batches; flushes the remainder and
    /// closes the queue on end of stream.
    async fn feed<R>(
        &self,
        reader: R,
        batch_tx: mpsc::Sender<Vec<MetadataDelete>>,
    ) -> GcResult<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut line_no = 0u64;
        let mut actions = 0u64;
        let mut buffer: Vec<MetadataDelete> = Vec::with_capacity(self.batch_size);

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.is_empty() {
                continue;
            }
            let action = MetadataDelete::parse(&line, line_no)?;
            if action.metadata_target != self.target {
                return Err(GcError::TargetMismatch {
                    expected: self.target.clone(),
                    actual: action.metadata_target,
                });
            }
            actions += 1;
            buffer.push(action);
            if buffer.len() == self.batch_size {
                let full = mem::replace(&mut buffer, Vec::with_capacity(self.batch_size));
                self.enqueue(&batch_tx, full).await?;
            }
        }
        if !buffer.is_empty() {
            self.enqueue(&batch_tx, buffer).await?;
        }
        Ok(actions)
    }

    async fn enqueue(
        &self,
        batch_tx: &mpsc::Sender<Vec<MetadataDelete>>,
        batch: Vec<MetadataDelete>,
    ) -> GcResult<()> {
        batch_tx
            .send(batch)
            .await
            .map_err(|_| GcError::client(&self.target, "delete worker stopped"))
    }
}

/// The single per-target worker: applies queued batches one at a time.
async fn drain_batches(
    client: Arc<dyn MetadataClient>,
    target: String,
    events: Option<mpsc::UnboundedSender<CleanEvent>>,
    mut batch_rx: mpsc::Receiver<Vec<MetadataDelete>>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while let Some(batch) = batch_rx.recv().await {
        stats.batches += 1;
        let keys: Vec<String> = batch.iter().map(MetadataDelete::key).collect();
        let filter = key_filter(&keys);
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        match client.delete_many(&filter).await {
            Ok(response) => {
                let attempted = keys.len() as u64;
                let deleted = response.deleted.min(attempted);
                stats.deleted += deleted;
                stats.already_deleted += attempted - deleted;
                debug!(
                    shard = %target,
                    request_id = %request_id,
                    attempted,
                    deleted,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "delete batch applied"
                );
            }
            Err(e) => {
                stats.failed_batches += 1;
                let latency = started.elapsed();
                warn!(
                    shard = %target,
                    request_id = %request_id,
                    keys = keys.len(),
                    latency_ms = latency.as_millis() as u64,
                    error = %e,
                    "delete batch failed"
                );
                if let Some(tx) = &events {
                    let _ = tx.send(CleanEvent::BatchFailed {
                        target: target.clone(),
                        request_id,
                        keys,
                        latency,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
    stats
}

/// Builds the disjunction filter over row keys. A single key collapses to
/// the bare equality term.
fn key_filter(keys: &[String]) -> String {
    if let [key] = keys {
        return format!("(_key={})", key);
    }
    let mut filter = String::from("(|");
    for key in keys {
        filter.push_str("(_key=");
        filter.push_str(key);
        filter.push(')');
    }
    filter.push(')');
    filter
}
