use crate::connection::{Endpoint, Outgoing};
use crate::engine::Engine;
use crate::error::ClientError;
use crate::transport::{Inbound, Transport, WebSocketTransport, CLOSE_ABNORMAL};
use log::{error, info, warn};
use shared::{ClientAction, CLOSE_NORMAL};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub player_name: String,
    /// Simulated latency, split evenly between send and receive.
    pub fake_ping_ms: u64,
}

impl ClientConfig {
    pub fn new(endpoint: Endpoint, player_name: impl Into<String>) -> Self {
        Self {
            endpoint,
            player_name: player_name.into(),
            fake_ping_ms: 0,
        }
    }
}

/// Cloneable write surface for front ends running on other tasks.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    intents: mpsc::UnboundedSender<ClientAction>,
}

impl ClientHandle {
    pub fn send(&self, action: ClientAction) -> Result<(), ClientError> {
        self.intents
            .send(action)
            .map_err(|_| ClientError::NotConnected)
    }
}

/// Drives one [`Engine`] over one transport until the connection closes.
pub struct Client<T: Transport> {
    transport: T,
    engine: Engine,
    intents: mpsc::UnboundedReceiver<ClientAction>,
    fake_ping_ms: u64,
}

impl Client<WebSocketTransport> {
    pub async fn connect(config: &ClientConfig) -> Result<(Self, ClientHandle), ClientError> {
        info!("Connecting to {} as {}", config.endpoint, config.player_name);
        let transport = WebSocketTransport::connect(&config.endpoint).await?;
        let engine = Engine::with_system_clock(config.player_name.clone());

        let (mut client, handle) = Client::new(transport, engine);
        client.fake_ping_ms = config.fake_ping_ms;
        Ok((client, handle))
    }
}

impl<T: Transport> Client<T> {
    /// Wraps an already-open transport. The engine is told the socket is
    /// open, which queues the liveness announcement.
    pub fn new(transport: T, mut engine: Engine) -> (Self, ClientHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        engine.on_open();

        let client = Client {
            transport,
            engine,
            intents: rx,
            fake_ping_ms: 0,
        };
        (client, ClientHandle { intents: tx })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }

    /// Runs until the connection is closed by either side.
    ///
    /// Transport failures are recorded on the engine's connection state
    /// before being returned.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        loop {
            if let Err(e) = self.flush().await {
                error!("Error sending: {}", e);
                self.engine.on_closed(CLOSE_ABNORMAL, e.to_string());
                return Err(e);
            }

            if !self.engine.connection_state().connected {
                break;
            }

            let wait = self
                .engine
                .next_deadline()
                .map(|at| Duration::from_millis(at.saturating_sub(self.engine.now())));
            let timer = async move {
                match wait {
                    Some(wait) => sleep(wait).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                inbound = self.transport.recv() => {
                    match inbound {
                        Ok(Inbound::Text(text)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }
                            self.engine.handle_message(&text);
                        }
                        Ok(Inbound::Closed(reason)) => {
                            self.engine.on_closed(reason.code, reason.reason);
                        }
                        Err(e) => {
                            error!("Error receiving: {}", e);
                            self.engine.on_closed(CLOSE_ABNORMAL, e.to_string());
                            return Err(e);
                        }
                    }
                },

                intent = self.intents.recv() => {
                    match intent {
                        Some(action) => {
                            self.engine.send(action);
                        }
                        None => self.engine.close(CLOSE_NORMAL, "client shut down"),
                    }
                },

                _ = timer => {
                    self.engine.poll_timers();
                },
            }
        }

        if let Some(reason) = &self.engine.connection_state().last_close {
            info!("Session ended: {}", reason);
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ClientError> {
        for outgoing in self.engine.drain_outgoing() {
            match outgoing {
                Outgoing::Action(action) => {
                    if self.fake_ping_ms > 0 {
                        sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                    }
                    self.transport.send(action.to_json()?).await?;
                }
                Outgoing::Close(reason) => {
                    if let Err(e) = self.transport.close(&reason).await {
                        warn!("Error closing transport: {}", e);
                    }
                }
            }
        }
        Ok(())
    }
}
