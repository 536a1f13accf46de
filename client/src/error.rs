//! Client error types.

use thiserror::Error;

/// Errors raised by the client runtime, the directory probe and the
/// event dispatcher.
///
/// The dispatcher never returns these to its caller; it records them as
/// faults on the engine instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// WebSocket failure on connect, send or receive.
    #[error("transport error: {0}")]
    Transport(Box<tokio_tungstenite::tungstenite::Error>),

    /// A frame could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The synced catalog size disagrees with the announced size.
    #[error("character catalog mismatch: expected {expected}, received {actual}")]
    CatalogMismatch {
        /// Count announced in the server status.
        expected: usize,
        /// Count actually received.
        actual: usize,
    },

    /// A deck references a character missing from the local catalog.
    #[error("deck for {owner} references unknown character {name:?}")]
    UnknownCharacter {
        /// Player whose deck failed to decode.
        owner: String,
        /// Name that did not resolve.
        name: String,
    },

    /// A player name the server referenced is not in the roster.
    #[error("player {name:?} is not in the roster")]
    UnknownPlayer {
        /// The name that failed to resolve.
        name: String,
    },

    /// The connection is not open.
    #[error("not connected")]
    NotConnected,

    /// The peer did not answer in time.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The peer closed the socket before replying.
    #[error("connection closed before a reply was received")]
    ClosedBeforeReply,

    /// The endpoint could not be turned into a URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Transport(Box::new(e))
    }
}
