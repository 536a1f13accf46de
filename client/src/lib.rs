//! # Drafting Client Library
//!
//! Client side of a real-time, two-player drafting game. It keeps a single
//! WebSocket connection to the game server, mirrors the server's view of the
//! session in local stores and estimates the clock offset so draft timers
//! read the same for every participant.
//!
//! ## Architecture Overview
//!
//! The client is a secondary, eventually-consistent mirror of the server.
//! It never resolves conflicts locally: it applies what the server asserts,
//! displays it, and asks again when it needs to.
//!
//! ```text
//! transport ─▶ Client (network) ─▶ Engine::handle_message (dispatcher)
//!                                        │
//!            ┌───────────┬───────────┬───┴───────┬────────────┬─────────┐
//!            ▼           ▼           ▼           ▼            ▼         ▼
//!      ClockSync    Connection    Roster     DraftSession   Decks    GamePhase
//! ```
//!
//! Outbound, UI intents become [`shared::ClientAction`]s that are queued on
//! the connection and written by the runtime.
//!
//! ## Module Organization
//!
//! ### Engine (`engine`, `dispatcher`)
//! The engine owns every store and is built once per connection. The
//! dispatcher decodes each frame into a tagged event and routes it to one
//! handler; unknown events fall through to an explicit no-op.
//!
//! ### Stores (`roster`, `draft`, `deck`, `catalog`, `phase`)
//! Passive records mutated only by the dispatcher. The catalog is an
//! immutable snapshot; decks are decoded against it by name.
//!
//! ### Timing (`clock`)
//! Round-trip samples feed an exponentially smoothed offset estimate. The
//! engine reads time through the [`clock::Clock`] trait so tests can drive
//! it by hand.
//!
//! ### Networking (`connection`, `transport`, `network`, `directory`)
//! `connection` records lifecycle and queues frames, `transport` wraps the
//! socket, `network` runs the event loop, and `directory` probes a server
//! before a session is opened.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::connection::Endpoint;
//! use client::network::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), client::error::ClientError> {
//!     let config = ClientConfig::new(Endpoint::new("127.0.0.1", 8080, false), "Alice");
//!     let (mut client, handle) = Client::connect(&config).await?;
//!
//!     handle.send(shared::ClientAction::Ready)?;
//!     client.run().await?;
//!
//!     println!("closed: {:?}", client.engine().connection_state().last_close);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Model
//!
//! - Malformed frames and unknown events are logged and ignored.
//! - Data faults (a deck naming an unknown character, an initiative holder
//!   missing from the roster) are recorded on the engine and exposed via
//!   [`engine::Engine::faults`].
//! - A catalog whose size disagrees with the announced size closes the
//!   connection with a descriptive reason.
//! - Nothing reconnects automatically; a new connection means a new engine.

pub mod catalog;
pub mod clock;
pub mod connection;
pub mod deck;
pub mod directory;
mod dispatcher;
pub mod draft;
pub mod engine;
pub mod error;
pub mod input;
pub mod network;
pub mod phase;
pub mod roster;
pub mod transport;

pub use engine::Engine;
pub use error::ClientError;
pub use network::{Client, ClientConfig, ClientHandle};
