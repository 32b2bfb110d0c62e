// src/control/shim.rs

//! Shim-side client: connect to the registry, bind a name, serve requests.
//!
//! The production shim lives inside the managed process; a Rust-managed
//! process can embed this module directly. The integration tests drive the
//! supervisor side through it as well.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::control::wire::{self, BindFrame, Op, RequestFrame, ResponseFrame};

/// Callbacks served by the shim.
pub struct ShimCallbacks {
    /// Invoked on a shutdown notification; no response is sent.
    pub on_shutdown: Box<dyn Fn() + Send + Sync>,

    /// Produces the profiling snapshot returned for profile requests.
    pub profile: Box<dyn Fn() -> serde_json::Value + Send + Sync>,
}

/// Connect to the registry on the loopback port, bind `name` and serve
/// requests until the registry side goes away.
pub async fn run_shim(port: u16, name: &str, callbacks: ShimCallbacks) -> Result<()> {
    let stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .with_context(|| format!("connecting to control registry on port {port}"))?;
    let (read_half, mut write_half) = stream.into_split();

    wire::write_frame(
        &mut write_half,
        &BindFrame {
            bind: name.to_string(),
        },
    )
    .await?;
    debug!(name = %name, "bound control name");

    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("reading control request")?
    {
        let request: RequestFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "unparseable control request");
                continue;
            }
        };

        match request.op {
            Op::Shutdown => {
                debug!(name = %name, "shutdown notification received");
                (callbacks.on_shutdown)();
            }
            Op::Profile => {
                if let Some(id) = request.id {
                    let snapshot = (callbacks.profile)();
                    wire::write_frame(&mut write_half, &ResponseFrame::ok(id, snapshot)).await?;
                }
            }
        }
    }

    debug!(name = %name, "control connection closed");
    Ok(())
}
