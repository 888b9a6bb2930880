//! Common test utilities.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use reefgc::executor::{DeleteManyResponse, MetadataClient};
use reefgc::{GcError, GcResult};

/// Builds a dead lifecycle line with one shark per url.
#[allow(dead_code)]
pub fn dead_line(object_id: &str, timestamp: &str, sharks: &[&str], target: &str) -> String {
    let sharks: Vec<serde_json::Value> = sharks
        .iter()
        .map(|url| {
            serde_json::json!({
                "url": url,
                "serverId": format!("srv-{}", url),
                "zoneId": format!("zone-{}", url),
            })
        })
        .collect();
    let payload = serde_json::json!({
        "owner": "owner1",
        "objectId": object_id,
        "sharks": sharks,
    });
    format!("{}\t{}\tdead\t{}\t{}", object_id, timestamp, payload, target)
}

/// Builds a non-dead lifecycle line.
#[allow(dead_code)]
pub fn live_line(object_id: &str, timestamp: &str, target: &str) -> String {
    format!("{}\t{}\tlive\t{{}}\t{}", object_id, timestamp, target)
}

/// Scripted outcome for one mock request.
#[allow(dead_code)]
pub enum MockReply {
    /// Report this many rows deleted.
    Deleted(u64),
    /// Fail the request.
    Fail(&'static str),
}

/// Metadata client that records filters and replays scripted outcomes.
///
/// With no script, every request succeeds and reports one deleted row per
/// key term in the filter.
pub struct MockMetadataClient {
    filters: Mutex<Vec<String>>,
    script: Mutex<VecDeque<MockReply>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

#[allow(dead_code)]
impl MockMetadataClient {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// A mock whose requests take `delay` to complete, for concurrency
    /// observation.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            filters: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn with_script(self, replies: Vec<MockReply>) -> Self {
        *self.script.lock().unwrap() = replies.into();
        self
    }

    /// Filters received so far, in arrival order.
    pub fn filters(&self) -> Vec<String> {
        self.filters.lock().unwrap().clone()
    }

    /// Highest number of concurrently outstanding requests observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataClient for MockMetadataClient {
    async fn delete_many(&self, filter: &str) -> GcResult<DeleteManyResponse> {
        let outstanding = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(outstanding, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.filters.lock().unwrap().push(filter.to_string());
        let reply = self.script.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            None => Ok(DeleteManyResponse {
                deleted: filter.matches("(_key=").count() as u64,
            }),
            Some(MockReply::Deleted(deleted)) => Ok(DeleteManyResponse { deleted }),
            Some(MockReply::Fail(reason)) => Err(GcError::client("mock", reason)),
        }
    }
}
