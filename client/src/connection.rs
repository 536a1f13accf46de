//! Connection lifecycle and the outbound queue.
//!
//! `ConnectionManager` is transport-agnostic: it records what the socket is
//! doing and queues frames for the runtime to write. Sends while
//! disconnected are dropped, and nothing here reconnects on its own. A
//! fresh connection means a fresh engine.

use log::{debug, info};
use shared::ClientAction;
use std::collections::VecDeque;
use std::fmt;

/// A validated server address as handed over by the directory lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
    pub use_encryption: bool,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16, use_encryption: bool) -> Self {
        Self {
            address: address.into(),
            port,
            use_encryption,
        }
    }

    pub fn url(&self) -> String {
        let scheme = if self.use_encryption { "wss" } else { "ws" };
        format!("{}://{}:{}", scheme, self.address, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// Coarse setup progress. Only moves forward within one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientStatus {
    #[default]
    Initialized,
    /// Server status received, catalog requested.
    Setup,
    /// Catalog received and validated.
    Synced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reason, self.code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub connected: bool,
    pub last_close: Option<CloseReason>,
    pub status: ClientStatus,
}

/// A frame or command waiting for the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Action(ClientAction),
    Close(CloseReason),
}

#[derive(Debug, Default)]
pub struct ConnectionManager {
    state: ConnectionState,
    outbox: VecDeque<Outgoing>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected
    }

    pub fn status(&self) -> ClientStatus {
        self.state.status
    }

    /// Marks the socket open and announces liveness before anything else.
    pub fn on_open(&mut self) {
        info!("Connection open");
        self.state = ConnectionState {
            connected: true,
            last_close: None,
            status: ClientStatus::Initialized,
        };
        self.outbox.clear();
        self.outbox.push_back(Outgoing::Action(ClientAction::Status));
    }

    /// Queues an action. Returns false if it was dropped.
    pub fn send(&mut self, action: ClientAction) -> bool {
        if !self.state.connected {
            debug!("Dropping {} action: not connected", action.name());
            return false;
        }
        self.outbox.push_back(Outgoing::Action(action));
        true
    }

    /// Closes the connection from our side, recording why.
    pub fn close(&mut self, code: u16, reason: impl Into<String>) {
        let reason = CloseReason {
            code,
            reason: reason.into(),
        };
        info!("Closing connection: {}", reason);
        if self.state.connected {
            self.outbox.push_back(Outgoing::Close(reason.clone()));
        }
        self.state.connected = false;
        self.state.last_close = Some(reason);
    }

    /// Records a close observed on the transport. A reason we set ourselves
    /// via [`close`](Self::close) takes precedence.
    pub fn on_closed(&mut self, code: u16, reason: impl Into<String>) {
        self.state.connected = false;
        if self.state.last_close.is_none() {
            let reason = CloseReason {
                code,
                reason: reason.into(),
            };
            info!("Connection closed: {}", reason);
            self.state.last_close = Some(reason);
        }
        self.outbox.retain(|outgoing| matches!(outgoing, Outgoing::Close(_)));
    }

    /// Advances the status; never moves it backwards.
    pub fn advance_status(&mut self, status: ClientStatus) -> bool {
        if status <= self.state.status {
            return false;
        }
        debug!("Client status {:?} -> {:?}", self.state.status, status);
        self.state.status = status;
        true
    }

    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        self.outbox.drain(..).collect()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outbox.is_empty()
    }
}
