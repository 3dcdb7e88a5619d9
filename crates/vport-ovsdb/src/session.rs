//! OVSDB session: connection ownership, monitor feed, transactions.
//!
//! A [`Session`] multiplexes two logically independent streams over one
//! TCP connection: synchronous request/reply exchanges (`monitor`,
//! `transact`) and unsolicited push notifications. Replies are matched
//! to their requests by numeric id; everything else goes through the
//! notifier handler, which only acts on row updates.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use vport_common::{VportError, VportResult};

use crate::cache::TableCache;
use crate::codec::JsonCodec;
use crate::protocol::{self, Operation, OperationResult, TableUpdates};

/// Default OVSDB TCP endpoint.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:6640";

/// Default bound on any request/reply exchange.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

type Transport = Framed<TcpStream, JsonCodec>;
type PendingReplies = Arc<DashMap<u64, oneshot::Sender<Value>>>;

/// An event the database pushes outside the request/reply flow.
///
/// Only `Updated` carries state; the remaining variants exist to
/// satisfy the protocol's callback contract and are dropped.
#[derive(Debug)]
enum MonitorEvent {
    /// A batch of committed row changes.
    Updated(TableUpdates),
    /// The database granted a lock we never requested.
    Locked,
    /// A lock was taken away by another client.
    Stolen,
    /// Connection keepalive.
    Echo,
}

/// A live session against one `ovsdb-server`.
///
/// Dropping the session tears down the reader task and the connection.
pub struct Session {
    endpoint: String,
    writer: Mutex<SplitSink<Transport, Value>>,
    pending: PendingReplies,
    next_id: AtomicU64,
    cache: Arc<RwLock<TableCache>>,
    rpc_timeout: Duration,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("rpc_timeout", &self.rpc_timeout)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connect to the database and load the initial snapshot of the
    /// Bridge, Port, and Interface tables.
    ///
    /// # Errors
    ///
    /// Returns [`VportError::ConnectionFailed`] if the endpoint cannot
    /// be reached or the initial snapshot cannot be loaded. A session
    /// is never handed out with an unpopulated cache.
    pub async fn connect(endpoint: &str) -> VportResult<Self> {
        Self::connect_with_timeout(endpoint, DEFAULT_RPC_TIMEOUT).await
    }

    /// [`Session::connect`] with an explicit request/reply timeout.
    pub async fn connect_with_timeout(
        endpoint: &str,
        rpc_timeout: Duration,
    ) -> VportResult<Self> {
        let stream = TcpStream::connect(endpoint).await.map_err(|e| {
            VportError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })?;
        tracing::debug!(endpoint, "Connected to ovsdb-server");

        let (writer, reader_half) = Framed::new(stream, JsonCodec).split();
        let pending: PendingReplies = Arc::new(DashMap::new());
        let cache = Arc::new(RwLock::new(TableCache::new()));

        let reader = tokio::spawn(run_reader(
            reader_half,
            Arc::clone(&pending),
            Arc::clone(&cache),
        ));

        let session = Self {
            endpoint: endpoint.to_string(),
            writer: Mutex::new(writer),
            pending,
            next_id: AtomicU64::new(0),
            cache,
            rpc_timeout,
            reader,
        };

        session
            .load_initial_snapshot()
            .await
            .map_err(|e| VportError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                message: format!("initial snapshot failed: {e}"),
            })?;

        Ok(session)
    }

    /// Submit an ordered batch of operations as one transaction and
    /// wait for the per-operation results.
    ///
    /// The call suspends until the database replies or the session's
    /// timeout elapses; unrelated notifications arriving meanwhile are
    /// handled independently and never mixed into the reply.
    ///
    /// # Errors
    ///
    /// Returns [`VportError::ConnectionFailed`] if the exchange times
    /// out or the connection drops, and [`VportError::TransactionFailed`]
    /// if the database rejects the request itself. Per-operation errors
    /// are reported in the returned results, not here.
    pub async fn transact(&self, operations: Vec<Operation>) -> VportResult<Vec<OperationResult>> {
        let mut params = vec![json!(protocol::DATABASE)];
        for op in &operations {
            params.push(serde_json::to_value(op)?);
        }

        let result = self.rpc("transact", Value::Array(params)).await?;
        let results: Vec<OperationResult> = serde_json::from_value(result)?;
        Ok(results)
    }

    /// Read access to the mirrored table state.
    pub async fn cache(&self) -> RwLockReadGuard<'_, TableCache> {
        self.cache.read().await
    }

    /// The endpoint this session is connected to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request the full-state snapshot plus live change feed for the
    /// tables provisioning cares about, and seed the cache with the
    /// snapshot.
    async fn load_initial_snapshot(&self) -> VportResult<()> {
        let params = json!([
            protocol::DATABASE,
            Value::Null,
            {
                protocol::table::BRIDGE: {"columns": ["name", "ports"]},
                protocol::table::PORT: {"columns": ["name", "interfaces"]},
                protocol::table::INTERFACE: {"columns": ["name", "type"]},
            },
        ]);

        let result = self.rpc("monitor", params).await?;
        let snapshot: TableUpdates = serde_json::from_value(result)?;
        let mut cache = self.cache.write().await;
        cache.apply_update(snapshot);
        tracing::debug!(
            bridges = cache.row_count(protocol::table::BRIDGE),
            ports = cache.row_count(protocol::table::PORT),
            interfaces = cache.row_count(protocol::table::INTERFACE),
            "Initial snapshot loaded"
        );
        Ok(())
    }

    /// One request/reply exchange, bounded by the session timeout.
    async fn rpc(&self, method: &str, params: Value) -> VportResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let request = json!({"method": method, "params": params, "id": id});
        let sent = self.writer.lock().await.send(request).await;
        if let Err(e) = sent {
            self.pending.remove(&id);
            return Err(VportError::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                message: format!("sending '{method}' failed: {e}"),
            });
        }

        let reply = match tokio::time::timeout(self.rpc_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(VportError::ConnectionFailed {
                    endpoint: self.endpoint.clone(),
                    message: format!("connection closed before reply to '{method}'"),
                });
            }
            Err(_) => {
                self.pending.remove(&id);
                return Err(VportError::ConnectionFailed {
                    endpoint: self.endpoint.clone(),
                    message: format!(
                        "no reply to '{method}' within {:?}",
                        self.rpc_timeout
                    ),
                });
            }
        };

        if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
            let error = error
                .as_str()
                .map_or_else(|| error.to_string(), str::to_string);
            return Err(VportError::TransactionFailed {
                error,
                details: None,
            });
        }

        Ok(reply.get("result").cloned().unwrap_or(Value::Null))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Reader task: the sole consumer of the connection's inbound half.
///
/// Routes replies to their waiting callers and everything else through
/// the notifier handler. Exits when the connection closes, waking all
/// in-flight callers with an error.
async fn run_reader(
    mut inbound: SplitStream<Transport>,
    pending: PendingReplies,
    cache: Arc<RwLock<TableCache>>,
) {
    while let Some(next) = inbound.next().await {
        let message = match next {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Connection read failed");
                break;
            }
        };

        if let Some(method) = message.get("method").and_then(Value::as_str) {
            let event = classify(method, message.get("params"));
            handle_event(event, &cache).await;
        } else if let Some(id) = message.get("id").and_then(Value::as_u64) {
            match pending.remove(&id) {
                Some((_, tx)) => {
                    let _ = tx.send(message);
                }
                None => tracing::warn!(id, "Reply for unknown request id"),
            }
        } else {
            tracing::trace!("Ignoring message with neither method nor id");
        }
    }

    // Dropping the senders wakes every in-flight caller with an error.
    pending.clear();
    tracing::debug!("Reader task finished");
}

/// Map an inbound method call to a notifier event.
fn classify(method: &str, params: Option<&Value>) -> Option<MonitorEvent> {
    match method {
        "update" => {
            // params: [monitor id, table updates]
            let updates = params
                .and_then(|p| p.get(1))
                .cloned()
                .and_then(|v| serde_json::from_value::<TableUpdates>(v).ok());
            match updates {
                Some(updates) => Some(MonitorEvent::Updated(updates)),
                None => {
                    tracing::warn!("Malformed update notification");
                    None
                }
            }
        }
        "locked" => Some(MonitorEvent::Locked),
        "stolen" => Some(MonitorEvent::Stolen),
        "echo" => Some(MonitorEvent::Echo),
        other => {
            tracing::trace!(method = other, "Unhandled notification method");
            None
        }
    }
}

/// Notifier handler. Applying an update is a local map mutation; no
/// variant performs network I/O or submits transactions.
async fn handle_event(event: Option<MonitorEvent>, cache: &Arc<RwLock<TableCache>>) {
    match event {
        Some(MonitorEvent::Updated(updates)) => {
            cache.write().await.apply_update(updates);
        }
        Some(MonitorEvent::Locked | MonitorEvent::Stolen | MonitorEvent::Echo) | None => {}
    }
}
