// src/control/mod.rs

//! Host-local control plane shared between the supervisor and the shim
//! loaded into the managed process.
//!
//! The supervisor owns a name-addressed registry on a fixed loopback port;
//! the shim connects, binds the supervisor's discovery name and then serves
//! requests (shutdown notification, profiling snapshot) over the same
//! connection. Names carry the supervisor PID so several supervisors can
//! share a host.

pub mod channel;
pub mod registry;
pub mod shim;
pub mod wire;

pub use channel::ControlChannel;
pub use registry::ControlRegistry;

use std::time::Duration;

use crate::config::WebhookCredentials;

/// Fixed loopback port of the control registry.
pub const CONTROL_PORT: u16 = 7491;

/// Prefix of discovery names; the supervisor PID follows it.
pub const DISCOVERY_PREFIX: &str = "upkeep#";

/// Delay between starting the managed process and the single attempt to
/// resolve its control channel.
pub const CHANNEL_GRACE: Duration = Duration::from_secs(20);

const WEBHOOK_SEPARATOR: &str = "/;/";
const CREDENTIAL_SEPARATOR: &str = "%%";

/// Discovery name for a supervisor with the given PID.
pub fn discovery_name(pid: u32) -> String {
    format!("{DISCOVERY_PREFIX}{pid}")
}

/// Encode the payload handed to the shim through the injection argument:
/// `{name}` or `{name}/;/{id}%%{token}`.
pub fn encode_injection_payload(name: &str, webhook: Option<&WebhookCredentials>) -> String {
    match webhook {
        Some(creds) => format!(
            "{name}{WEBHOOK_SEPARATOR}{}{CREDENTIAL_SEPARATOR}{}",
            creds.id, creds.token
        ),
        None => name.to_string(),
    }
}

/// Decode an injection payload back into the discovery name and optional
/// webhook credentials. Malformed webhook segments are dropped.
pub fn decode_injection_payload(raw: &str) -> (String, Option<WebhookCredentials>) {
    match raw.split_once(WEBHOOK_SEPARATOR) {
        None => (raw.to_string(), None),
        Some((name, webhook)) => {
            let creds = webhook
                .split_once(CREDENTIAL_SEPARATOR)
                .filter(|(id, token)| !id.is_empty() && !token.is_empty())
                .map(|(id, token)| WebhookCredentials {
                    id: id.to_string(),
                    token: token.to_string(),
                });
            (name.to_string(), creds)
        }
    }
}
