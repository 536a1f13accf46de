//! Draft session state: pack, stage/round, timer and selections.

use shared::{Character, Player, NO_ACTIVE_DRAFT};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct DraftSessionStore {
    stage: i32,
    round: i32,
    pack: Vec<Character>,
    end_time: Option<u64>,
    selections: HashMap<String, Option<String>>,
    current_selection: Option<String>,
    opponent_hovering: Option<String>,
}

impl Default for DraftSessionStore {
    fn default() -> Self {
        Self {
            stage: NO_ACTIVE_DRAFT,
            round: NO_ACTIVE_DRAFT,
            pack: Vec::new(),
            end_time: None,
            selections: HashMap::new(),
            current_selection: None,
            opponent_hovering: None,
        }
    }
}

impl DraftSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new draft tick. Every selection from the previous tick is
    /// discarded.
    pub fn apply_tick(
        &mut self,
        stage: i32,
        round: i32,
        pack: Vec<Character>,
        end_time: u64,
        players: &[Player],
    ) {
        self.stage = stage;
        self.round = round;
        self.pack = pack;
        self.end_time = Some(end_time);
        self.current_selection = None;
        self.selections = players
            .iter()
            .map(|player| (player.name.clone(), None))
            .collect();
    }

    /// Records a selection for display. `player` is absent when the server
    /// only reports the highlighted pack item.
    pub fn record_selection(&mut self, player: Option<&str>, selected: String) {
        if let Some(player) = player {
            self.selections
                .insert(player.to_string(), Some(selected.clone()));
        }
        self.current_selection = Some(selected);
    }

    pub fn set_opponent_hover(&mut self, hovering: String) {
        self.opponent_hovering = Some(hovering);
    }

    pub fn clear_opponent_hover(&mut self) {
        self.opponent_hovering = None;
    }

    /// Back to the between-games sentinel state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.stage != NO_ACTIVE_DRAFT
    }

    pub fn stage(&self) -> i32 {
        self.stage
    }

    pub fn round(&self) -> i32 {
        self.round
    }

    pub fn pack(&self) -> &[Character] {
        &self.pack
    }

    pub fn end_time(&self) -> Option<u64> {
        self.end_time
    }

    pub fn current_selection(&self) -> Option<&str> {
        self.current_selection.as_deref()
    }

    pub fn selection_of(&self, player: &str) -> Option<&str> {
        self.selections.get(player).and_then(|s| s.as_deref())
    }

    pub fn selections(&self) -> &HashMap<String, Option<String>> {
        &self.selections
    }

    pub fn opponent_hovering(&self) -> Option<&str> {
        self.opponent_hovering.as_deref()
    }
}
