//! Inbound event dispatch.
//!
//! Each frame is decoded into a [`ServerEvent`] and routed to exactly one
//! handler. Nothing here returns an error to the caller: malformed frames
//! and unknown events are logged and dropped, data faults are recorded on
//! the engine, and a catalog mismatch closes the connection.

use crate::catalog::Catalog;
use crate::connection::ClientStatus;
use crate::deck::decode_deck;
use crate::engine::Engine;
use crate::error::ClientError;
use crate::phase::GamePhase;
use log::{debug, info, warn};
use shared::{
    Character, ClientAction, DeckEntry, Player, ServerEvent, ServerStatus,
    CLOSE_CATALOG_MISMATCH, GAME_START_DRAFT_DELAY_MS,
};

impl Engine {
    /// Handles one raw inbound frame.
    pub fn handle_message(&mut self, raw: &str) {
        match ServerEvent::from_json(raw) {
            Ok(event) => self.dispatch(event),
            Err(e) => warn!("Ignoring malformed frame: {}", e),
        }
    }

    pub fn dispatch(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Status(status) => self.on_server_status(status),
            ServerEvent::Heartbeat { server_time } => self.on_heartbeat(server_time),
            ServerEvent::ClockSync {
                client_sent_at,
                server_time,
            } => {
                let now = self.now();
                let raw_offset = self
                    .sync
                    .observe_round_trip(client_sent_at, server_time, now);
                debug!(
                    "Clock sample: raw offset {:.1}ms, smoothed {:?}, ping {}ms",
                    raw_offset,
                    self.sync.offset_ms(),
                    self.sync.ping_ms()
                );
            }
            ServerEvent::Characters { characters } => self.on_characters(characters),
            ServerEvent::ChatMessage { message, sender } => self.log_chat(sender, message),
            ServerEvent::Players { players } => {
                debug!("Roster replaced: {} players", players.len());
                self.roster.replace(players);
            }
            ServerEvent::GameStart { initiative_player } => self.on_game_start(initiative_player),
            ServerEvent::GameEnd => self.on_game_end(),
            ServerEvent::DraftTick {
                players,
                draft_stage,
                round,
                pack,
                end_time,
                initiative_player,
            } => self.on_draft_tick(players, draft_stage, round, pack, end_time, initiative_player),
            ServerEvent::Hover { hovering } => self.draft.set_opponent_hover(hovering),
            ServerEvent::Unhover => self.draft.clear_opponent_hover(),
            ServerEvent::Selected { selected, player } => {
                self.draft.record_selection(player.as_deref(), selected);
            }
            ServerEvent::Decks { decks } => self.on_decks(decks),
            ServerEvent::Unknown => debug!("Ignoring unknown event"),
        }
    }

    /// Fires every scheduled transition whose deadline has passed.
    pub fn poll_timers(&mut self) {
        let now = self.now();
        for scheduled in self.phase.take_due(now) {
            if !self.phase.is_current(&scheduled) {
                debug!(
                    "Discarding stale transition to {} (generation {})",
                    scheduled.target, scheduled.generation
                );
                continue;
            }

            // A game start replayed mid-draft keeps the phase but still
            // announces initiative.
            if self.phase.phase() != scheduled.target {
                if let Err(e) = self.phase.transition(scheduled.target) {
                    warn!("{}", e);
                    continue;
                }
            }

            if scheduled.target == GamePhase::Draft {
                let message = if self.has_initiative() {
                    "You have the initiative.".to_string()
                } else if let Some(holder) = self.initiative() {
                    format!("{} has the initiative.", holder.name)
                } else {
                    "The draft has started.".to_string()
                };
                self.log_system(message);
            }
        }
    }

    fn on_server_status(&mut self, status: ServerStatus) {
        info!(
            "Server \"{}\" by {}: {} characters, {} online",
            status.title, status.owner, status.loaded_characters, status.online_players
        );
        let expected = status.loaded_characters;
        self.server_status = Some(status);

        if self.connection.advance_status(ClientStatus::Setup) {
            self.expected_characters = Some(expected);
            self.connection.send(ClientAction::RequestCharacters);
        }
    }

    fn on_heartbeat(&mut self, server_time: u64) {
        let now = self.now();
        self.sync.observe_heartbeat(server_time, now);
        self.connection
            .send(ClientAction::Pong { client_sent_at: now });
    }

    fn on_characters(&mut self, characters: Vec<Character>) {
        if self.catalog.is_some() {
            warn!("Ignoring repeated character catalog");
            return;
        }

        match self.expected_characters {
            Some(expected) if expected != characters.len() => {
                let fault = ClientError::CatalogMismatch {
                    expected,
                    actual: characters.len(),
                };
                let reason = fault.to_string();
                self.record_fault(fault);
                self.connection.close(CLOSE_CATALOG_MISMATCH, reason);
                return;
            }
            Some(_) => {}
            None => warn!("Catalog received before the server announced its size"),
        }

        info!("Character catalog synced: {} entries", characters.len());
        self.catalog = Some(Catalog::new(characters));
        self.connection.advance_status(ClientStatus::Synced);
    }

    fn on_game_start(&mut self, initiative_player: String) {
        info!("Game starting");
        self.declare_initiative(initiative_player);
        self.decks.materialize_empty(self.roster.players());

        let now = self.now();
        self.phase.start_game(now, GAME_START_DRAFT_DELAY_MS);
    }

    fn on_game_end(&mut self) {
        info!("Game ended");
        self.phase.end_game();
        self.draft.reset();
        self.decks.clear();
        self.declared_initiative = None;
    }

    fn on_draft_tick(
        &mut self,
        players: Vec<Player>,
        stage: i32,
        round: i32,
        pack: Vec<Character>,
        end_time: u64,
        initiative_player: String,
    ) {
        debug!(
            "Draft tick: stage {}, round {}, {} in pack",
            stage,
            round,
            pack.len()
        );
        self.roster.replace(players);
        self.draft
            .apply_tick(stage, round, pack, end_time, self.roster.players());
        self.declare_initiative(initiative_player);
    }

    fn on_decks(&mut self, decks: Vec<DeckEntry>) {
        let catalog = self.catalog.clone().unwrap_or_default();
        for entry in decks {
            match decode_deck(&entry.player, &entry.deck, &catalog) {
                Ok(deck) => self.decks.replace(deck),
                Err(fault) => self.record_fault(fault),
            }
        }
    }

    // Resolution is a plain name lookup; a holder missing from the roster
    // is reported rather than guessed.
    fn declare_initiative(&mut self, name: String) {
        if !self.roster.contains(&name) {
            self.record_fault(ClientError::UnknownPlayer { name: name.clone() });
        }
        self.declared_initiative = Some(name);
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::ManualClock;
    use crate::connection::{ClientStatus, CloseReason, Outgoing};
    use crate::engine::{Engine, LogKind};
    use crate::error::ClientError;
    use crate::phase::GamePhase;
    use assert_approx_eq::assert_approx_eq;
    use shared::{ClientAction, CLOSE_CATALOG_MISMATCH, GAME_START_DRAFT_DELAY_MS};
    use std::sync::Arc;

    fn connected_engine(local_name: &str) -> (Engine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let mut engine = Engine::new(local_name, clock.clone());
        engine.on_open();
        engine.drain_outgoing();
        (engine, clock)
    }

    fn sent_actions(engine: &mut Engine) -> Vec<ClientAction> {
        engine
            .drain_outgoing()
            .into_iter()
            .filter_map(|outgoing| match outgoing {
                Outgoing::Action(action) => Some(action),
                Outgoing::Close(_) => None,
            })
            .collect()
    }

    fn characters_json(names: &[&str]) -> String {
        let list: Vec<String> = names
            .iter()
            .map(|name| format!(r#"{{"name":"{}"}}"#, name))
            .collect();
        format!(r#"{{"event":"characters","characters":[{}]}}"#, list.join(","))
    }

    fn synced_engine(local_name: &str) -> (Engine, Arc<ManualClock>) {
        let (mut engine, clock) = connected_engine(local_name);
        engine.handle_message(r#"{"event":"status","title":"T","owner":"O","loadedCharacters":3}"#);
        engine.handle_message(&characters_json(&["Knight", "Archer", "Healer"]));
        engine.handle_message(r#"{"event":"players","players":[{"name":"A"},{"name":"B"}]}"#);
        engine.drain_outgoing();
        (engine, clock)
    }

    #[test]
    fn test_malformed_frames_are_ignored() {
        let (mut engine, _clock) = connected_engine("A");
        engine.handle_message("{not json");
        engine.handle_message(r#"{"serverTime":5}"#);
        engine.handle_message(r#"{"event":"players","players":"nobody"}"#);

        assert!(engine.connection_state().connected);
        assert!(engine.faults().is_empty());
        assert!(engine.roster().is_empty());
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let (mut engine, _clock) = connected_engine("A");
        engine.handle_message(r#"{"event":"tournamentBracket","rounds":4}"#);

        assert!(engine.connection_state().connected);
        assert!(engine.faults().is_empty());
        assert!(sent_actions(&mut engine).is_empty());
    }

    #[test]
    fn test_heartbeat_replies_with_pong() {
        let (mut engine, clock) = connected_engine("A");
        clock.set(5_000);
        engine.handle_message(r#"{"event":"heartbeat","serverTime":4960}"#);

        assert_eq!(
            sent_actions(&mut engine),
            vec![ClientAction::Pong {
                client_sent_at: 5_000
            }]
        );
        assert_eq!(engine.clock_estimate().last_ping_ms, 40);
    }

    #[test]
    fn test_heartbeat_ping_clamps_to_zero() {
        let (mut engine, clock) = connected_engine("A");
        clock.set(5_000);
        engine.handle_message(r#"{"event":"heartbeat","serverTime":7000}"#);
        assert_eq!(engine.clock_estimate().last_ping_ms, 0);
    }

    #[test]
    fn test_clock_sync_scenario() {
        let (mut engine, clock) = connected_engine("A");
        clock.set(1_100);
        engine.handle_message(r#"{"event":"clockSync","clientSentAt":1000,"serverTime":1050}"#);

        let estimate = engine.clock_estimate();
        assert_approx_eq!(estimate.offset_ms.unwrap(), 0.0);
        assert_eq!(estimate.last_ping_ms, 50);
        assert_eq!(engine.server_now(), Some(1_100));
    }

    #[test]
    fn test_setup_handshake_reaches_synced() {
        let (mut engine, _clock) = connected_engine("A");

        engine.handle_message(r#"{"event":"status","title":"T","owner":"O","loadedCharacters":2}"#);
        assert_eq!(engine.connection_state().status, ClientStatus::Setup);
        assert_eq!(sent_actions(&mut engine), vec![ClientAction::RequestCharacters]);

        engine.handle_message(&characters_json(&["Knight", "Archer"]));
        assert_eq!(engine.connection_state().status, ClientStatus::Synced);
        assert_eq!(engine.catalog().unwrap().len(), 2);
        assert_eq!(engine.server_status().unwrap().title, "T");
    }

    #[test]
    fn test_catalog_mismatch_closes_connection() {
        let (mut engine, _clock) = connected_engine("A");
        engine.handle_message(r#"{"event":"status","loadedCharacters":3}"#);
        engine.drain_outgoing();

        engine.handle_message(&characters_json(&["Knight", "Archer"]));

        let state = engine.connection_state();
        assert!(!state.connected);
        assert_eq!(state.status, ClientStatus::Setup);
        let close = state.last_close.clone().unwrap();
        assert_eq!(close.code, CLOSE_CATALOG_MISMATCH);
        assert!(close.reason.contains("expected 3"));
        assert!(engine.catalog().is_none());
        assert!(matches!(
            engine.faults(),
            [ClientError::CatalogMismatch {
                expected: 3,
                actual: 2
            }]
        ));
        assert_eq!(
            engine.drain_outgoing(),
            vec![Outgoing::Close(CloseReason {
                code: CLOSE_CATALOG_MISMATCH,
                reason: "character catalog mismatch: expected 3, received 2".to_string()
            })]
        );
    }

    #[test]
    fn test_catalog_before_status_is_accepted() {
        let (mut engine, _clock) = connected_engine("A");

        engine.handle_message(&characters_json(&["Knight", "Archer"]));

        let state = engine.connection_state();
        assert!(state.connected);
        assert_eq!(state.status, ClientStatus::Synced);
        assert_eq!(engine.catalog().unwrap().len(), 2);
        assert!(engine.faults().is_empty());

        // A late status no longer moves setup backwards or re-requests.
        engine.handle_message(r#"{"event":"status","loadedCharacters":2}"#);
        assert_eq!(engine.connection_state().status, ClientStatus::Synced);
        assert!(sent_actions(&mut engine).is_empty());
    }

    #[test]
    fn test_catalog_is_immutable_once_synced() {
        let (mut engine, _clock) = synced_engine("A");
        engine.handle_message(&characters_json(&["Other"]));

        let catalog = engine.catalog().unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.get("Other").is_none());
    }

    #[test]
    fn test_repeated_status_does_not_re_request() {
        let (mut engine, _clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"status","title":"Renamed","loadedCharacters":9}"#);

        assert!(sent_actions(&mut engine).is_empty());
        assert_eq!(engine.connection_state().status, ClientStatus::Synced);
        assert_eq!(engine.server_status().unwrap().title, "Renamed");
    }

    #[test]
    fn test_chat_is_appended() {
        let (mut engine, _clock) = connected_engine("A");
        engine.handle_message(r#"{"event":"chatMessage","message":"gl hf","sender":"B"}"#);
        engine.handle_message(r#"{"event":"chatMessage","message":"server restarting soon"}"#);

        let messages = engine.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, LogKind::Chat);
        assert_eq!(messages[0].sender.as_deref(), Some("B"));
        assert_eq!(messages[1].text, "server restarting soon");
        assert_eq!(messages[1].sender, None);
    }

    #[test]
    fn test_game_start_resolves_initiative_to_opponent() {
        let (mut engine, clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"gameStart","initiativePlayer":"B"}"#);

        assert_eq!(engine.initiative().unwrap().name, "B");
        assert!(!engine.has_initiative());
        assert!(engine.game_started());
        assert_eq!(engine.decks().len(), 2);
        assert!(engine.decks().get("A").unwrap().cards.is_empty());
        assert_eq!(engine.phase(), GamePhase::Lobby);

        clock.advance(GAME_START_DRAFT_DELAY_MS);
        engine.poll_timers();

        assert_eq!(engine.phase(), GamePhase::Draft);
        let last = engine.messages().last().unwrap();
        assert_eq!(last.kind, LogKind::System);
        assert_eq!(last.text, "B has the initiative.");
    }

    #[test]
    fn test_game_start_local_initiative_message() {
        let (mut engine, clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"gameStart","initiativePlayer":"A"}"#);
        assert!(engine.has_initiative());

        clock.advance(GAME_START_DRAFT_DELAY_MS);
        engine.poll_timers();
        assert_eq!(engine.messages().last().unwrap().text, "You have the initiative.");
    }

    #[test]
    fn test_game_start_during_draft_still_announces_initiative() {
        let (mut engine, clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"gameStart","initiativePlayer":"A"}"#);
        clock.advance(GAME_START_DRAFT_DELAY_MS);
        engine.poll_timers();
        assert_eq!(engine.phase(), GamePhase::Draft);

        engine.handle_message(r#"{"event":"gameStart","initiativePlayer":"B"}"#);
        clock.advance(GAME_START_DRAFT_DELAY_MS);
        engine.poll_timers();

        assert_eq!(engine.phase(), GamePhase::Draft);
        assert!(engine.game_started());
        assert!(!engine.has_initiative());
        assert_eq!(engine.messages().last().unwrap().text, "B has the initiative.");
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn test_timer_not_fired_early() {
        let (mut engine, clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"gameStart","initiativePlayer":"A"}"#);

        clock.advance(GAME_START_DRAFT_DELAY_MS - 1);
        engine.poll_timers();
        assert_eq!(engine.phase(), GamePhase::Lobby);
        assert_eq!(
            engine.next_deadline(),
            Some(1_000 + GAME_START_DRAFT_DELAY_MS)
        );
    }

    #[test]
    fn test_game_end_before_timer_keeps_lobby() {
        let (mut engine, clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"gameStart","initiativePlayer":"B"}"#);
        engine.handle_message(r#"{"event":"gameEnd"}"#);

        clock.advance(GAME_START_DRAFT_DELAY_MS * 2);
        engine.poll_timers();

        assert_eq!(engine.phase(), GamePhase::Lobby);
        assert!(!engine.game_started());
        assert!(engine
            .messages()
            .iter()
            .all(|entry| !entry.text.contains("initiative")));
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn test_game_end_resets_draft_and_decks() {
        let (mut engine, clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"gameStart","initiativePlayer":"A"}"#);
        clock.advance(GAME_START_DRAFT_DELAY_MS);
        engine.poll_timers();
        engine.handle_message(
            r#"{"event":"draftTick","players":[{"name":"A"},{"name":"B"}],"draftStage":1,"round":2,"pack":[{"name":"Knight"}],"endTime":90000,"initiativePlayer":"A"}"#,
        );
        engine.handle_message(r#"{"event":"decks","decks":[{"player":"A","deck":["Knight"]}]}"#);

        engine.handle_message(r#"{"event":"gameEnd"}"#);

        assert_eq!(engine.phase(), GamePhase::Lobby);
        assert!(!engine.game_started());
        assert!(engine.decks().is_empty());
        assert_eq!(engine.draft().stage(), -1);
        assert_eq!(engine.draft().round(), -1);
        assert!(engine.draft().pack().is_empty());
        // The roster outlives the game.
        assert_eq!(engine.roster().len(), 2);
    }

    #[test]
    fn test_game_end_in_lobby_is_harmless() {
        let (mut engine, _clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"gameEnd"}"#);

        assert_eq!(engine.phase(), GamePhase::Lobby);
        assert!(engine.decks().is_empty());
        assert_eq!(engine.draft().stage(), -1);
    }

    #[test]
    fn test_draft_tick_replaces_state_and_clears_selection() {
        let (mut engine, _clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"selected","selected":"Knight","player":"B"}"#);
        assert_eq!(engine.draft().current_selection(), Some("Knight"));

        engine.handle_message(
            r#"{"event":"draftTick","players":[{"name":"A","ready":true},{"name":"B"}],"draftStage":0,"round":3,"pack":[{"name":"Archer"},{"name":"Healer"}],"endTime":50000,"initiativePlayer":"B"}"#,
        );

        let draft = engine.draft();
        assert_eq!(draft.current_selection(), None);
        assert_eq!(draft.selection_of("B"), None);
        assert_eq!(draft.stage(), 0);
        assert_eq!(draft.round(), 3);
        assert_eq!(draft.pack().len(), 2);
        assert_eq!(draft.end_time(), Some(50_000));
        assert!(engine.roster().get("A").unwrap().ready);
        assert_eq!(engine.initiative().unwrap().name, "B");
    }

    #[test]
    fn test_initiative_holder_missing_from_roster_is_a_fault() {
        let (mut engine, _clock) = synced_engine("A");
        engine.handle_message(
            r#"{"event":"draftTick","players":[{"name":"A"},{"name":"B"}],"draftStage":0,"round":0,"endTime":1,"initiativePlayer":"C"}"#,
        );

        assert!(engine.initiative().is_none());
        assert!(!engine.has_initiative());
        assert!(matches!(
            engine.faults(),
            [ClientError::UnknownPlayer { name }] if name == "C"
        ));
    }

    #[test]
    fn test_initiative_follows_roster_replacement() {
        let (mut engine, _clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"gameStart","initiativePlayer":"B"}"#);
        assert!(engine.initiative().is_some());

        engine.handle_message(r#"{"event":"players","players":[{"name":"A"},{"name":"C"}]}"#);
        assert!(engine.initiative().is_none());
    }

    #[test]
    fn test_opponent_hover_last_write_wins() {
        let (mut engine, _clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"hover","hovering":"Knight"}"#);
        engine.handle_message(r#"{"event":"hover","hovering":"Healer"}"#);
        assert_eq!(engine.draft().opponent_hovering(), Some("Healer"));

        engine.handle_message(r#"{"event":"unhover"}"#);
        assert_eq!(engine.draft().opponent_hovering(), None);
    }

    #[test]
    fn test_deck_update_replaces_decks() {
        let (mut engine, _clock) = synced_engine("A");
        engine.handle_message(
            r#"{"event":"decks","decks":[{"player":"A","deck":["Knight","Healer"]},{"player":"B","deck":["Archer"]}]}"#,
        );
        engine.handle_message(r#"{"event":"decks","decks":[{"player":"A","deck":["Archer"]}]}"#);

        let a: Vec<&str> = engine
            .decks()
            .get("A")
            .unwrap()
            .cards
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(a, vec!["Archer"]);
        assert_eq!(engine.decks().get("B").unwrap().cards.len(), 1);
        assert!(engine.faults().is_empty());
    }

    #[test]
    fn test_deck_update_with_unknown_character_is_surfaced() {
        let (mut engine, _clock) = synced_engine("A");
        engine.handle_message(r#"{"event":"decks","decks":[{"player":"A","deck":["Knight"]}]}"#);

        engine.handle_message(
            r#"{"event":"decks","decks":[{"player":"A","deck":["Knight","Ghost"]},{"player":"B","deck":["Healer"]}]}"#,
        );

        // A's previous deck is kept intact, B still applies.
        let a = engine.decks().get("A").unwrap();
        assert_eq!(a.cards.len(), 1);
        assert_eq!(a.cards[0].name, "Knight");
        assert_eq!(engine.decks().get("B").unwrap().cards[0].name, "Healer");
        assert!(matches!(
            engine.faults(),
            [ClientError::UnknownCharacter { owner, name }] if owner == "A" && name == "Ghost"
        ));
        assert!(engine.connection_state().connected);
    }
}
