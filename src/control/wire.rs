// src/control/wire.rs

//! JSON Lines frames exchanged over a control connection.
//!
//! - shim -> registry, once after connect: `{"bind": "<name>"}`
//! - registry -> shim: `{"id": 7, "op": "profile"}` or `{"op": "shutdown"}`
//!   (shutdown carries no id and gets no response)
//! - shim -> registry: `{"id": 7, "ok": {...}}` or `{"id": 7, "err": "..."}`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// First frame on every shim connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindFrame {
    pub bind: String,
}

/// Request sent from the registry to the shim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestFrame {
    /// Present for request/response operations; absent for fire-and-forget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub op: Op,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Shutdown,
    Profile,
}

/// Response sent from the shim for requests that carried an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseFrame {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl ResponseFrame {
    pub fn ok(id: u64, value: serde_json::Value) -> Self {
        Self {
            id,
            ok: Some(value),
            err: None,
        }
    }

    pub fn err(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            ok: None,
            err: Some(message.into()),
        }
    }

    pub fn into_result(self) -> std::result::Result<serde_json::Value, String> {
        match (self.ok, self.err) {
            (_, Some(err)) => Err(err),
            (Some(value), None) => Ok(value),
            (None, None) => Ok(serde_json::Value::Null),
        }
    }
}

/// Everything a shim may send; `bind` exactly once, then responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ShimFrame {
    Bind(BindFrame),
    Response(ResponseFrame),
}

/// Serialize a frame and write it as a single line.
pub async fn write_frame<W, T>(writer: &mut W, frame: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_string(frame).context("encoding control frame")?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .context("writing control frame")?;
    Ok(())
}
