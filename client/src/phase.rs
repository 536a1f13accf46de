//! Top-level game phase.
//!
//! ```text
//!            gameStart (+delay)
//!   Lobby ─────────────────────▶ Draft ──▶ InProgress
//!     ▲                            │            │
//!     └──────── gameEnd ───────────┴────────────┘
//! ```
//!
//! The phase is always server-asserted. The delayed switch into `Draft` is
//! tagged with the generation it was scheduled under; `gameEnd` (or a newer
//! `gameStart`) bumps the generation so a stale timer can never override a
//! more recent reset.

use log::debug;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GamePhase {
    #[default]
    Lobby,
    Draft,
    /// Post-draft play. Entered and rendered outside this crate.
    InProgress,
}

impl GamePhase {
    /// Maps the numeric phase reported in the server status.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Lobby),
            1 => Some(Self::Draft),
            2 => Some(Self::InProgress),
            _ => None,
        }
    }

    fn can_transition_to(self, to: GamePhase) -> bool {
        matches!(
            (self, to),
            (Self::Lobby, Self::Draft)
                | (Self::Draft, Self::InProgress)
                | (Self::Draft, Self::Lobby)
                | (Self::InProgress, Self::Lobby)
        )
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Draft => write!(f, "Draft"),
            Self::InProgress => write!(f, "InProgress"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid phase transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: GamePhase,
    pub to: GamePhase,
}

/// A phase change waiting for its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTransition {
    pub generation: u64,
    pub fire_at: u64,
    pub target: GamePhase,
}

#[derive(Debug, Default)]
pub struct GamePhaseStateMachine {
    phase: GamePhase,
    game_started: bool,
    generation: u64,
    pending: Vec<ScheduledTransition>,
}

impl GamePhaseStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn game_started(&self) -> bool {
        self.game_started
    }

    pub fn transition(&mut self, to: GamePhase) -> Result<(), InvalidTransition> {
        if !self.phase.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.phase,
                to,
            });
        }
        debug!("Phase {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Flags the game as started and schedules the switch into the draft.
    pub fn start_game(&mut self, now: u64, delay_ms: u64) -> ScheduledTransition {
        self.generation += 1;
        self.game_started = true;

        let scheduled = ScheduledTransition {
            generation: self.generation,
            fire_at: now + delay_ms,
            target: GamePhase::Draft,
        };
        self.pending.push(scheduled);
        scheduled
    }

    /// Forces the lobby immediately and invalidates every pending timer.
    pub fn end_game(&mut self) {
        self.generation += 1;
        self.game_started = false;
        if self.phase != GamePhase::Lobby {
            debug!("Phase {} -> {}", self.phase, GamePhase::Lobby);
            self.phase = GamePhase::Lobby;
        }
    }

    /// Removes and returns every transition due at `now`, stale or not.
    pub fn take_due(&mut self, now: u64) -> Vec<ScheduledTransition> {
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|scheduled| scheduled.fire_at <= now);
        self.pending = waiting;
        due
    }

    pub fn is_current(&self, scheduled: &ScheduledTransition) -> bool {
        scheduled.generation == self.generation
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.iter().map(|scheduled| scheduled.fire_at).min()
    }
}
