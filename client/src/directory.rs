//! Pre-connection server probe.
//!
//! Before a session is opened, a candidate server is checked with a single
//! `status` action. The first frame it sends back is read as its metadata
//! and the socket is closed again.

use crate::connection::{CloseReason, Endpoint};
use crate::error::ClientError;
use crate::transport::{Inbound, Transport, WebSocketTransport};
use log::{debug, warn};
use shared::{ClientAction, ServerStatus, CLOSE_NORMAL};
use std::time::Duration;
use tokio::time::timeout;

/// Time allowed for the handshake and the reply when the CLI gives none.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2000;

/// Connects to `endpoint` and fetches its status, giving up after
/// `timeout_ms`.
pub async fn probe(endpoint: &Endpoint, timeout_ms: u64) -> Result<ServerStatus, ClientError> {
    let attempt = async {
        let mut transport = WebSocketTransport::connect(endpoint).await?;
        probe_with(&mut transport).await
    };

    timeout(Duration::from_millis(timeout_ms), attempt)
        .await
        .map_err(|_| ClientError::Timeout(timeout_ms))?
}

/// Runs the status exchange over an already-open transport.
pub async fn probe_with<T: Transport>(transport: &mut T) -> Result<ServerStatus, ClientError> {
    transport.send(ClientAction::Status.to_json()?).await?;

    let reply = match transport.recv().await? {
        Inbound::Text(text) => text,
        Inbound::Closed(reason) => {
            debug!("Probe closed early: {}", reason);
            return Err(ClientError::ClosedBeforeReply);
        }
    };

    let closing = CloseReason {
        code: CLOSE_NORMAL,
        reason: "probe complete".to_string(),
    };
    if let Err(e) = transport.close(&closing).await {
        warn!("Error closing probe connection: {}", e);
    }

    Ok(serde_json::from_str(&reply)?)
}
