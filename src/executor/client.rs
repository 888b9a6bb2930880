//! Metadata-store client and per-target connection registry.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{GcError, GcResult};

/// Response to a delete-many request. The store reports success per
/// request, not per key; `deleted` is the number of rows actually removed,
/// which may be lower than the number of keys when some were already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteManyResponse {
    pub deleted: u64,
}

/// Trait for the one operation the executor needs from the metadata store:
/// delete every row matched by a disjunction filter over keys.
///
/// Deleting an already-deleted key must not be an error on the store side;
/// re-attempting a batch is always safe.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn delete_many(&self, filter: &str) -> GcResult<DeleteManyResponse>;
}

#[derive(Serialize)]
struct WireRequest<'a> {
    id: &'a str,
    method: &'static str,
    filter: &'a str,
}

#[derive(Deserialize)]
struct WireReply {
    id: String,
    #[serde(default)]
    deleted: u64,
    #[serde(default)]
    error: Option<String>,
}

/// Line-delimited JSON request/response client over a TCP connection to
/// one metadata shard.
///
/// The connection carries at most one outstanding request; the executor's
/// depth-1 work queue already guarantees that, and the mutex enforces it
/// for any other caller sharing the client.
pub struct TcpMetadataClient {
    target: String,
    stream: Mutex<BufStream<TcpStream>>,
}

impl TcpMetadataClient {
    /// Connects to the given `host:port` target.
    pub async fn connect(target: &str) -> GcResult<Self> {
        let stream = TcpStream::connect(target)
            .await
            .map_err(|e| GcError::client(target, format!("connect failed: {}", e)))?;
        debug!(shard = target, "connected to metadata shard");
        Ok(Self {
            target: target.to_string(),
            stream: Mutex::new(BufStream::new(stream)),
        })
    }
}

#[async_trait]
impl MetadataClient for TcpMetadataClient {
    async fn delete_many(&self, filter: &str) -> GcResult<DeleteManyResponse> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = WireRequest {
            id: &request_id,
            method: "deleteMany",
            filter,
        };
        let mut frame = serde_json::to_string(&request)
            .map_err(|e| GcError::client(&self.target, format!("encode failed: {}", e)))?;
        frame.push('\n');

        let mut stream = self.stream.lock().await;
        stream.write_all(frame.as_bytes()).await?;
        stream.flush().await?;

        let mut line = String::new();
        let n = stream.read_line(&mut line).await?;
        if n == 0 {
            return Err(GcError::client(&self.target, "connection closed mid-request"));
        }

        let reply: WireReply = serde_json::from_str(line.trim_end())
            .map_err(|e| GcError::client(&self.target, format!("bad reply frame: {}", e)))?;
        if reply.id != request_id {
            return Err(GcError::client(
                &self.target,
                format!("reply id {} does not match request {}", reply.id, request_id),
            ));
        }
        if let Some(error) = reply.error {
            return Err(GcError::client(&self.target, error));
        }
        Ok(DeleteManyResponse {
            deleted: reply.deleted,
        })
    }
}

/// Per-target client registry with explicit lifecycle: connections open on
/// first use, are reused across runs for the same target, and are dropped
/// together by [`close_all`].
///
/// [`close_all`]: ClientRegistry::close_all
#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<String, Arc<dyn MetadataClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pre-built client for a target, replacing any existing one.
    pub fn insert(&self, target: impl Into<String>, client: Arc<dyn MetadataClient>) {
        self.clients.insert(target.into(), client);
    }

    /// Returns the client for a target, connecting on first use.
    pub async fn get_or_connect(&self, target: &str) -> GcResult<Arc<dyn MetadataClient>> {
        if let Some(client) = self.clients.get(target) {
            return Ok(Arc::clone(&client));
        }
        let client: Arc<dyn MetadataClient> = Arc::new(TcpMetadataClient::connect(target).await?);
        self.clients.insert(target.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Returns the cached client for a target, if one is open.
    pub fn get(&self, target: &str) -> Option<Arc<dyn MetadataClient>> {
        self.clients.get(target).map(|c| Arc::clone(&c))
    }

    /// Drops every cached connection.
    pub fn close_all(&self) {
        self.clients.clear();
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
