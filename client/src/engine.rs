//! The synchronization engine: one per connection.
//!
//! `Engine` owns every store and is the single writer for all of them. The
//! dispatcher (see `dispatcher.rs`) mutates it in response to server events;
//! presentation code gets read-only accessors plus [`Engine::send`], which
//! is its only write surface.

use crate::catalog::Catalog;
use crate::clock::{Clock, ClockEstimate, ClockSynchronizer, SystemClock};
use crate::connection::{ConnectionManager, ConnectionState, Outgoing};
use crate::deck::DeckStore;
use crate::draft::DraftSessionStore;
use crate::error::ClientError;
use crate::phase::{GamePhase, GamePhaseStateMachine};
use crate::roster::RosterStore;
use log::{info, warn};
use shared::{ClientAction, Player, ServerStatus};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Chat,
    System,
}

/// One line of the message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: u64,
    pub kind: LogKind,
    pub sender: Option<String>,
    pub text: String,
}

pub struct Engine {
    pub(crate) local_name: String,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) connection: ConnectionManager,
    pub(crate) sync: ClockSynchronizer,
    pub(crate) roster: RosterStore,
    pub(crate) draft: DraftSessionStore,
    pub(crate) decks: DeckStore,
    pub(crate) phase: GamePhaseStateMachine,
    pub(crate) catalog: Option<Catalog>,
    pub(crate) expected_characters: Option<usize>,
    pub(crate) server_status: Option<ServerStatus>,
    pub(crate) declared_initiative: Option<String>,
    pub(crate) messages: Vec<LogEntry>,
    pub(crate) faults: Vec<ClientError>,
}

impl Engine {
    pub fn new(local_name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            local_name: local_name.into(),
            clock,
            connection: ConnectionManager::new(),
            sync: ClockSynchronizer::new(),
            roster: RosterStore::new(),
            draft: DraftSessionStore::new(),
            decks: DeckStore::new(),
            phase: GamePhaseStateMachine::new(),
            catalog: None,
            expected_characters: None,
            server_status: None,
            declared_initiative: None,
            messages: Vec::new(),
            faults: Vec::new(),
        }
    }

    pub fn with_system_clock(local_name: impl Into<String>) -> Self {
        Self::new(local_name, Arc::new(SystemClock))
    }

    // Read access

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn connection_state(&self) -> &ConnectionState {
        self.connection.state()
    }

    pub fn clock_estimate(&self) -> ClockEstimate {
        self.sync.estimate()
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn draft(&self) -> &DraftSessionStore {
        &self.draft
    }

    pub fn decks(&self) -> &DeckStore {
        &self.decks
    }

    pub fn phase(&self) -> GamePhase {
        self.phase.phase()
    }

    pub fn game_started(&self) -> bool {
        self.phase.game_started()
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    pub fn server_status(&self) -> Option<&ServerStatus> {
        self.server_status.as_ref()
    }

    pub fn messages(&self) -> &[LogEntry] {
        &self.messages
    }

    /// Data faults raised while applying events, oldest first.
    pub fn faults(&self) -> &[ClientError] {
        &self.faults
    }

    /// The roster entry holding initiative, looked up by name against the
    /// current roster on every call.
    pub fn initiative(&self) -> Option<&Player> {
        self.declared_initiative
            .as_deref()
            .and_then(|name| self.roster.get(name))
    }

    pub fn has_initiative(&self) -> bool {
        self.initiative()
            .is_some_and(|player| player.name == self.local_name)
    }

    /// Server time now, once at least one clock sample exists.
    pub fn server_now(&self) -> Option<u64> {
        self.sync.server_now(self.clock.now_ms())
    }

    /// Time left on the draft timer in server time.
    pub fn draft_time_remaining(&self) -> Option<Duration> {
        if !self.draft.is_active() {
            return None;
        }
        let end_time = self.draft.end_time()?;
        let server_now = self.server_now()?;
        Some(Duration::from_millis(end_time.saturating_sub(server_now)))
    }

    // Connection lifecycle, driven by the runtime

    pub fn on_open(&mut self) {
        self.connection.on_open();
    }

    pub fn on_closed(&mut self, code: u16, reason: impl Into<String>) {
        self.connection.on_closed(code, reason);
    }

    pub fn close(&mut self, code: u16, reason: impl Into<String>) {
        self.connection.close(code, reason);
    }

    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        self.connection.drain_outgoing()
    }

    /// When the runtime should next call `poll_timers`.
    pub fn next_deadline(&self) -> Option<u64> {
        self.phase.next_deadline()
    }

    // Outbound intents

    /// Queues an action; dropped silently when disconnected.
    pub fn send(&mut self, action: ClientAction) -> bool {
        self.connection.send(action)
    }

    // Internal helpers for the dispatcher

    pub(crate) fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    pub(crate) fn log_system(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!("{}", text);
        self.messages.push(LogEntry {
            at: self.now(),
            kind: LogKind::System,
            sender: None,
            text,
        });
    }

    pub(crate) fn log_chat(&mut self, sender: Option<String>, text: String) {
        info!("[chat] {}: {}", sender.as_deref().unwrap_or("server"), text);
        self.messages.push(LogEntry {
            at: self.now(),
            kind: LogKind::Chat,
            sender,
            text,
        });
    }

    pub(crate) fn record_fault(&mut self, fault: ClientError) {
        warn!("{}", fault);
        self.faults.push(fault);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("local_name", &self.local_name)
            .field("connection", self.connection.state())
            .field("phase", &self.phase.phase())
            .field("players", &self.roster.len())
            .field("faults", &self.faults.len())
            .finish()
    }
}
