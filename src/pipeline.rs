//! Line-stream drivers wiring the state machines to async I/O.
//!
//! Each driver reads newline-delimited records from an [`AsyncBufRead`],
//! folds them through the matching state machine, and writes the resulting
//! stream to its sink. Input is assumed to be pre-sorted by the external
//! merge stage; ordering is not checked here. Diagnostics go to tracing
//! only, never into the output streams.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::collector::{Auditor, AuditStats, CruftCollector, CruftStats, GarbageCollector, GcStats};
use crate::config::GcConfig;
use crate::error::GcResult;
use crate::models::{AuditRecord, CruftCandidate, DeleteAction, LifecycleRecord};

/// Runs the decision engine over a sorted lifecycle stream.
///
/// Metadata-delete and physical-delete actions are written to separate
/// sinks in emission order. Any parse failure aborts the run before further
/// output is produced.
pub async fn run_gc<R, M, P>(
    reader: R,
    metadata_out: &mut M,
    physical_out: &mut P,
    config: &GcConfig,
) -> GcResult<GcStats>
where
    R: AsyncBufRead + Unpin,
    M: AsyncWrite + Unpin,
    P: AsyncWrite + Unpin,
{
    let mut collector = GarbageCollector::new(config);
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.is_empty() {
            continue;
        }
        let record = LifecycleRecord::parse(&line, line_no)?;
        for action in collector.push(record) {
            write_action(&action, metadata_out, physical_out).await?;
        }
    }
    for action in collector.finish() {
        write_action(&action, metadata_out, physical_out).await?;
    }

    metadata_out.flush().await?;
    physical_out.flush().await?;

    let stats = collector.stats().clone();
    info!(
        records = stats.records,
        skipped_live = stats.skipped_live,
        metadata_deletes = stats.metadata_deletes,
        physical_deletes = stats.physical_deletes,
        deferred = stats.deferred,
        "gc run complete"
    );
    Ok(stats)
}

async fn write_action<M, P>(
    action: &DeleteAction,
    metadata_out: &mut M,
    physical_out: &mut P,
) -> GcResult<()>
where
    M: AsyncWrite + Unpin,
    P: AsyncWrite + Unpin,
{
    match action {
        DeleteAction::Metadata(m) => {
            metadata_out.write_all(m.to_line().as_bytes()).await?;
            metadata_out.write_all(b"\n").await?;
        }
        DeleteAction::Physical(p) => {
            physical_out.write_all(p.to_line().as_bytes()).await?;
            physical_out.write_all(b"\n").await?;
        }
    }
    Ok(())
}

/// Runs the consistency auditor, writing one line per problem, each
/// carrying the offending row verbatim.
pub async fn run_audit<R, W>(reader: R, problems_out: &mut W) -> GcResult<AuditStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut auditor = Auditor::new();
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.is_empty() {
            continue;
        }
        let record = AuditRecord::parse(&line, line_no)?;
        if let Some(problem) = auditor.push(record) {
            problems_out
                .write_all(problem.record.to_line().as_bytes())
                .await?;
            problems_out.write_all(b"\n").await?;
        }
    }
    problems_out.flush().await?;

    let stats = auditor.stats().clone();
    info!(
        records = stats.records,
        objects = stats.objects,
        problems = stats.problems,
        "audit run complete"
    );
    Ok(stats)
}

/// Runs the cruft collector, re-emitting each orphaned physical copy in
/// the shape the gc input stage accepts.
pub async fn run_cruft<R, W>(reader: R, cruft_out: &mut W) -> GcResult<CruftStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut collector = CruftCollector::new();
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.is_empty() {
            continue;
        }
        let candidate = CruftCandidate::parse(&line, line_no)?;
        if let Some(copy) = collector.push(candidate) {
            cruft_out.write_all(copy.to_cruft_line().as_bytes()).await?;
            cruft_out.write_all(b"\n").await?;
        }
    }
    cruft_out.flush().await?;

    let stats = collector.stats().clone();
    info!(
        records = stats.records,
        cruft = stats.cruft,
        "cruft run complete"
    );
    Ok(stats)
}
