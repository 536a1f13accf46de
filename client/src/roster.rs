//! Current player list.
//!
//! The server always sends the whole roster; there are no incremental
//! per-player patches. Lookups are by name.

use shared::Player;

#[derive(Debug, Clone, Default)]
pub struct RosterStore {
    players: Vec<Player>,
}

impl RosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the roster wholesale.
    pub fn replace(&mut self, players: Vec<Player>) {
        self.players = players;
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn get(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
