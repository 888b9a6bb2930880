//! Decision-engine tests.

mod common;

use chrono::{DateTime, Duration, Utc};
use common::{dead_line, live_line};
use reefgc::models::{DeleteAction, LifecycleRecord};
use reefgc::pipeline::run_gc;
use reefgc::{GarbageCollector, GcConfig, GcError};

fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

fn config(now: &str, grace_days: i64) -> GcConfig {
    GcConfig {
        grace_period: Duration::days(grace_days),
        now: at(now),
    }
}

fn record(line: &str) -> LifecycleRecord {
    LifecycleRecord::parse(line, 1).unwrap()
}

/// Runs a whole stream through the engine and collects every action.
fn collect(config: &GcConfig, lines: &[String]) -> Vec<DeleteAction> {
    let mut engine = GarbageCollector::new(config);
    let mut actions = Vec::new();
    for line in lines {
        actions.extend(engine.push(record(line)));
    }
    actions.extend(engine.finish());
    actions
}

#[test]
fn single_aged_dead_record_is_fully_reclaimed() {
    let config = config("2020-01-10T00:00:00Z", 2);
    let lines = vec![dead_line("obj1", "2020-01-01T00:00:00Z", &["A", "B"], "shard1")];

    let actions = collect(&config, &lines);

    assert_eq!(actions.len(), 3);
    let DeleteAction::Metadata(meta) = &actions[0] else {
        panic!("expected a metadata delete first");
    };
    assert_eq!(meta.metadata_target, "shard1");
    assert_eq!(meta.object_id, "obj1");
    assert_eq!(meta.timestamp, at("2020-01-01T00:00:00Z"));

    let urls: Vec<&str> = actions[1..]
        .iter()
        .map(|a| match a {
            DeleteAction::Physical(p) => p.url.as_str(),
            other => panic!("expected physical deletes, got {:?}", other),
        })
        .collect();
    assert_eq!(urls, ["A", "B"]);
}

#[test]
fn object_inside_grace_period_is_left_alone() {
    let config = config("2020-01-02T00:00:00Z", 2);
    let lines = vec![dead_line("obj1", "2020-01-01T00:00:00Z", &["A"], "shard1")];

    let actions = collect(&config, &lines);

    assert!(actions.is_empty());
}

#[test]
fn grace_boundary_is_inclusive() {
    // Aged exactly the grace period: reclaimed.
    let config = config("2020-01-03T00:00:00Z", 2);
    let lines = vec![dead_line("obj1", "2020-01-01T00:00:00Z", &["A", "B"], "shard1")];

    let actions = collect(&config, &lines);

    let physical = actions
        .iter()
        .filter(|a| matches!(a, DeleteAction::Physical(_)))
        .count();
    assert_eq!(physical, 2);
}

#[test]
fn linked_object_defers_physical_to_the_last_record() {
    let config = config("2020-06-01T00:00:00Z", 2);
    let lines = vec![
        dead_line("obj1", "2020-01-01T00:00:00Z", &["A", "B"], "shard1"),
        dead_line("obj1", "2020-01-01T00:00:01Z", &["A", "B"], "shard2"),
    ];

    let mut engine = GarbageCollector::new(&config);

    // The first record is superseded: metadata cleanup only.
    let first = engine.push(record(&lines[0]));
    assert!(first.is_empty());
    let second = engine.push(record(&lines[1]));
    assert_eq!(second.len(), 1);
    let DeleteAction::Metadata(meta) = &second[0] else {
        panic!("superseded record must only drop its metadata row");
    };
    assert_eq!(meta.metadata_target, "shard1");

    // The chronologically last record carries the physical reclamation.
    let last = engine.finish();
    assert_eq!(last.len(), 3);
    let DeleteAction::Metadata(meta) = &last[0] else {
        panic!("expected the second row's metadata delete");
    };
    assert_eq!(meta.metadata_target, "shard2");
    assert!(last[1..]
        .iter()
        .all(|a| matches!(a, DeleteAction::Physical(_))));
}

#[test]
fn live_records_shield_nothing_and_are_skipped() {
    let config = config("2020-06-01T00:00:00Z", 2);
    let lines = vec![
        live_line("obj1", "2020-01-01T00:00:00Z", "shard1"),
        dead_line("obj2", "2020-01-01T00:00:00Z", &["A"], "shard1"),
    ];

    let actions = collect(&config, &lines);

    // Only obj2 is reclaimed.
    assert_eq!(actions.len(), 2);
    assert!(actions
        .iter()
        .all(|a| !matches!(a, DeleteAction::Metadata(m) if m.object_id == "obj1")));
}

#[test]
fn dead_then_recreated_object_keeps_its_replicas() {
    let config = config("2020-06-01T00:00:00Z", 2);
    let lines = vec![
        dead_line("obj1", "2020-01-01T00:00:00Z", &["A"], "shard1"),
        live_line("obj1", "2020-02-01T00:00:00Z", "shard1"),
    ];

    let actions = collect(&config, &lines);

    // The dead row goes, but the recreation keeps the replicas alive.
    assert_eq!(actions.len(), 1);
    assert!(matches!(&actions[0], DeleteAction::Metadata(m) if m.object_id == "obj1"));
}

#[test]
fn rerunning_the_same_stream_yields_the_same_actions() {
    let config = config("2020-06-01T00:00:00Z", 2);
    let lines = vec![
        dead_line("obj1", "2020-01-01T00:00:00Z", &["A", "B"], "shard1"),
        dead_line("obj2", "2020-01-05T00:00:00Z", &["C"], "shard2"),
        live_line("obj3", "2020-01-06T00:00:00Z", "shard1"),
    ];

    let first = collect(&config, &lines);
    let second = collect(&config, &lines);

    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn stats_count_each_disposition() {
    let config = config("2020-06-01T00:00:00Z", 2);
    let lines = vec![
        live_line("obj1", "2020-01-01T00:00:00Z", "shard1"),
        dead_line("obj2", "2020-01-01T00:00:00Z", &["A", "B"], "shard1"),
        dead_line("obj3", "2020-05-31T00:00:00Z", &["C"], "shard1"),
    ];

    let mut engine = GarbageCollector::new(&config);
    for line in &lines {
        engine.push(record(line));
    }
    engine.finish();

    let stats = engine.stats();
    assert_eq!(stats.records, 3);
    assert_eq!(stats.skipped_live, 1);
    assert_eq!(stats.metadata_deletes, 1);
    assert_eq!(stats.physical_deletes, 2);
    assert_eq!(stats.deferred, 1);
}

#[tokio::test]
async fn gc_pipeline_splits_the_two_action_streams() {
    // The concrete two-shark scenario, driven through the async driver.
    let input = "obj1\t2020-01-01T00:00:00Z\tdead\t{\"owner\":\"u\",\"objectId\":\"obj1\",\"sharks\":[{\"url\":\"A\"},{\"url\":\"B\"}]}\tshard1\n";
    let config = config("2020-01-03T00:00:00Z", 2);

    let mut metadata_out = Vec::new();
    let mut physical_out = Vec::new();
    let stats = run_gc(input.as_bytes(), &mut metadata_out, &mut physical_out, &config)
        .await
        .unwrap();

    assert_eq!(stats.metadata_deletes, 1);
    assert_eq!(stats.physical_deletes, 2);
    assert_eq!(
        String::from_utf8(metadata_out).unwrap(),
        "shard1\tobj1\t2020-01-01T00:00:00.000Z\n"
    );
    assert_eq!(
        String::from_utf8(physical_out).unwrap(),
        "A\t\t\tu\tobj1\nB\t\t\tu\tobj1\n"
    );
}

#[tokio::test]
async fn gc_pipeline_aborts_on_malformed_dead_payload() {
    let input = "obj1\t2020-01-01T00:00:00Z\tdead\t{broken\tshard1\n";
    let config = config("2020-01-10T00:00:00Z", 2);

    let mut metadata_out = Vec::new();
    let mut physical_out = Vec::new();
    let err = run_gc(input.as_bytes(), &mut metadata_out, &mut physical_out, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, GcError::MalformedPayload { line: 1, .. }));
    assert!(metadata_out.is_empty());
    assert!(physical_out.is_empty());
}

#[tokio::test]
async fn gc_pipeline_aborts_on_short_line() {
    let input = "obj1\t2020-01-01T00:00:00Z\n";
    let config = config("2020-01-10T00:00:00Z", 2);

    let mut metadata_out = Vec::new();
    let mut physical_out = Vec::new();
    let err = run_gc(input.as_bytes(), &mut metadata_out, &mut physical_out, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, GcError::MalformedRecord { line: 1, .. }));
}

#[tokio::test]
async fn gc_pipeline_reads_files() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "{}",
        dead_line("obj1", "2020-01-01T00:00:00Z", &["A"], "shard1")
    )
    .unwrap();

    let reader = tokio::io::BufReader::new(tokio::fs::File::open(file.path()).await.unwrap());
    let config = config("2020-06-01T00:00:00Z", 2);
    let mut metadata_out = Vec::new();
    let mut physical_out = Vec::new();
    let stats = run_gc(reader, &mut metadata_out, &mut physical_out, &config)
        .await
        .unwrap();

    assert_eq!(stats.records, 1);
    assert_eq!(stats.metadata_deletes, 1);
    assert_eq!(stats.physical_deletes, 1);
}
