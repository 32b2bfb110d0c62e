// src/control/registry.rs

//! Name-addressed registry of shim connections.
//!
//! The supervisor binds the listener; shims connect, send a bind frame and
//! stay connected. Lookup resolves a bound name to a [`ControlChannel`].
//! A connection closing unbinds its name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::control::channel::ControlChannel;
use crate::control::wire::ShimFrame;
use crate::errors::{Result, UpkeepError};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct ControlRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    bindings: Mutex<HashMap<String, ControlChannel>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                bindings: Mutex::new(HashMap::new()),
                accept_task: Mutex::new(None),
            }),
        }
    }

    /// Bind the loopback listener and start accepting shim connections.
    ///
    /// Returns the actual bound port (useful with port 0 in tests).
    pub async fn bind(&self, port: u16) -> Result<u16> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let bound = listener.local_addr()?.port();
        info!(port = bound, "control registry listening");

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(accept_loop(listener, inner));
        *self.inner.accept_task.lock().await = Some(handle);
        Ok(bound)
    }

    /// Resolve a bound name. Fails when nothing has bound it; there is no
    /// waiting or retrying here.
    pub async fn lookup(&self, name: &str) -> Result<ControlChannel> {
        self.inner
            .bindings
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| UpkeepError::ChannelUnavailable(format!("name '{name}' is not bound")))
    }

    /// Names currently bound.
    pub async fn bound_names(&self) -> Vec<String> {
        self.inner.bindings.lock().await.keys().cloned().collect()
    }

    /// Stop accepting and drop all bindings.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.inner.accept_task.lock().await.take() {
            handle.abort();
        }
        self.inner.bindings.lock().await.clear();
        debug!("control registry shut down");
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn accept_loop(listener: TcpListener, inner: Arc<RegistryInner>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!(%addr, "control connection accepted");
                tokio::spawn(handle_connection(stream, Arc::clone(&inner)));
            }
            Err(e) => {
                warn!(error = %e, "control accept failed");
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, inner: Arc<RegistryInner>) {
    let (read_half, write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // First frame must bind a name.
    let name = match lines.next_line().await {
        Ok(Some(line)) => match serde_json::from_str::<ShimFrame>(&line) {
            Ok(ShimFrame::Bind(bind)) => bind.bind,
            Ok(_) => {
                warn!("control connection sent a non-bind first frame; dropping");
                return;
            }
            Err(e) => {
                warn!(error = %e, "unparseable bind frame; dropping connection");
                return;
            }
        },
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "control connection failed before binding");
            return;
        }
    };

    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let channel = ControlChannel::new(name.clone(), conn_id, write_half);

    {
        let mut bindings = inner.bindings.lock().await;
        if bindings.insert(name.clone(), channel.clone()).is_some() {
            warn!(name = %name, "replacing existing control binding");
        } else {
            info!(name = %name, "control name bound");
        }
    }

    // Route responses until the shim disconnects.
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<ShimFrame>(&line) {
                Ok(ShimFrame::Response(response)) => channel.complete(response).await,
                Ok(ShimFrame::Bind(_)) => {
                    warn!(name = %name, "duplicate bind frame ignored");
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "unparseable control frame");
                }
            },
            Ok(None) => break,
            Err(e) => {
                warn!(name = %name, error = %e, "control connection read failed");
                break;
            }
        }
    }

    // Unbind, unless a newer connection already replaced this binding.
    let mut bindings = inner.bindings.lock().await;
    if bindings
        .get(&name)
        .is_some_and(|bound| bound.conn_id() == conn_id)
    {
        bindings.remove(&name);
        debug!(name = %name, "control connection closed; name unbound");
    }
}
