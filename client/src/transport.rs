//! Socket abstraction between the runtime and the wire.

use crate::connection::{CloseReason, Endpoint};
use crate::error::ClientError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Close code reported when the peer vanished without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;
/// Close code reported for a close frame without a status.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// What the transport produced next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Closed(CloseReason),
}

/// A text-frame duplex connection.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, text: String) -> Result<(), ClientError>;

    /// Next text frame or the close that ended the stream.
    async fn recv(&mut self) -> Result<Inbound, ClientError>;

    async fn close(&mut self, reason: &CloseReason) -> Result<(), ClientError>;
}

/// WebSocket transport, plain or TLS depending on the endpoint.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketTransport {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, ClientError> {
        if endpoint.address.is_empty() {
            return Err(ClientError::InvalidEndpoint("empty address".to_string()));
        }

        if endpoint.use_encryption {
            install_crypto_provider();
        }

        let url = endpoint.url();
        debug!("Opening {}", url);
        let (stream, _response) = connect_async(url.as_str()).await?;
        Ok(Self { stream })
    }
}

/// Rustls needs a process-wide crypto provider before the first TLS
/// handshake. Installing twice is harmless; the first one stays.
fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), ClientError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Inbound, ClientError> {
        loop {
            match self.stream.next().await {
                None => {
                    return Ok(Inbound::Closed(CloseReason {
                        code: CLOSE_ABNORMAL,
                        reason: "stream ended".to_string(),
                    }))
                }
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => return Ok(Inbound::Text(text)),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => return Ok(Inbound::Text(text)),
                    Err(_) => warn!("Ignoring non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = match frame {
                        Some(frame) => CloseReason {
                            code: u16::from(frame.code),
                            reason: frame.reason.into_owned(),
                        },
                        None => CloseReason {
                            code: CLOSE_NO_STATUS,
                            reason: String::new(),
                        },
                    };
                    return Ok(Inbound::Closed(reason));
                }
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => {}
            }
        }
    }

    async fn close(&mut self, reason: &CloseReason) -> Result<(), ClientError> {
        let frame = CloseFrame {
            code: CloseCode::from(reason.code),
            reason: reason.reason.clone().into(),
        };
        self.stream.close(Some(frame)).await?;
        Ok(())
    }
}
