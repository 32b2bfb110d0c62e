// src/control/channel.rs

//! Supervisor-side handle to a bound shim connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

use crate::control::wire::{self, Op, RequestFrame, ResponseFrame};
use crate::errors::{Result, UpkeepError};

/// Upper bound on a single request/response exchange with the shim.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// A resolved control channel to the shim inside the managed process.
///
/// Cheap to clone; all clones share the underlying connection. Requests are
/// written on the connection's write half and matched to responses by id by
/// the registry's read loop.
#[derive(Clone, Debug)]
pub struct ControlChannel {
    inner: Arc<ChannelInner>,
}

#[derive(Debug)]
struct ChannelInner {
    name: String,
    conn_id: u64,
    writer: Mutex<OwnedWriteHalf>,
    pending: Mutex<HashMap<u64, oneshot::Sender<ResponseFrame>>>,
    next_id: AtomicU64,
}

impl ControlChannel {
    pub(crate) fn new(name: String, conn_id: u64, writer: OwnedWriteHalf) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                name,
                conn_id,
                writer: Mutex::new(writer),
                pending: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn conn_id(&self) -> u64 {
        self.inner.conn_id
    }

    /// Fire-and-forget shutdown notification. Transport failures come back
    /// to the caller, who logs them and proceeds with termination.
    pub async fn notify_shutdown(&self) -> Result<()> {
        let frame = RequestFrame {
            id: None,
            op: Op::Shutdown,
        };
        let mut writer = self.inner.writer.lock().await;
        wire::write_frame(&mut *writer, &frame)
            .await
            .map_err(|e| UpkeepError::ChannelUnavailable(e.to_string()))?;
        debug!(name = %self.inner.name, "shutdown notification sent");
        Ok(())
    }

    /// Request a profiling snapshot from the shim.
    pub async fn process_profile(&self) -> Result<serde_json::Value> {
        self.request(Op::Profile).await
    }

    async fn request(&self, op: Op) -> Result<serde_json::Value> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(id, tx);

        let frame = RequestFrame { id: Some(id), op };
        {
            let mut writer = self.inner.writer.lock().await;
            if let Err(e) = wire::write_frame(&mut *writer, &frame).await {
                self.inner.pending.lock().await.remove(&id);
                return Err(UpkeepError::ChannelUnavailable(e.to_string()));
            }
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(response)) => response.into_result().map_err(UpkeepError::ControlCall),
            Ok(Err(_closed)) => Err(UpkeepError::ChannelUnavailable(
                "connection closed during call".to_string(),
            )),
            Err(_elapsed) => {
                self.inner.pending.lock().await.remove(&id);
                Err(UpkeepError::ChannelUnavailable(format!(
                    "call timed out after {}s",
                    CALL_TIMEOUT.as_secs()
                )))
            }
        }
    }

    /// Route a response from the read loop to the waiting caller.
    pub(crate) async fn complete(&self, response: ResponseFrame) {
        match self.inner.pending.lock().await.remove(&response.id) {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => {
                debug!(name = %self.inner.name, id = response.id, "response without a pending call");
            }
        }
    }
}
