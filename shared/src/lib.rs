//! Wire protocol shared by the drafting client and its tooling.
//!
//! Every frame on the socket is a single JSON object. Client frames carry an
//! `action` discriminant, server frames carry an `event` discriminant.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Delay between `gameStart` and the switch to the draft phase, leaving room
/// for the start-of-game animation.
pub const GAME_START_DRAFT_DELAY_MS: u64 = 1500;

/// Close code used when the synced catalog disagrees with the announced size.
pub const CLOSE_CATALOG_MISMATCH: u16 = 4001;

/// Close code used for a normal, client-initiated shutdown.
pub const CLOSE_NORMAL: u16 = 1000;

/// Stage/round value outside an active draft.
pub const NO_ACTIVE_DRAFT: i32 = -1;

/// Current Unix time in milliseconds.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Outbound frames, client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientAction {
    #[serde(rename_all = "camelCase")]
    Pong {
        client_sent_at: u64,
    },
    Status,
    RequestCharacters,
    ChatMessage {
        message: String,
    },
    Ready,
    Hover {
        hovering: String,
    },
    Unhover,
    Select {
        selected: String,
    },
    DecidePassiveDiscard {
        discard: bool,
    },
    InitDiscard,
    CardSelect {
        selected: String,
    },
    #[serde(rename_all = "camelCase")]
    SwapPosition {
        source_pos: String,
        target_pos: String,
    },
}

impl ClientAction {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of the action, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientAction::Pong { .. } => "pong",
            ClientAction::Status => "status",
            ClientAction::RequestCharacters => "requestCharacters",
            ClientAction::ChatMessage { .. } => "chatMessage",
            ClientAction::Ready => "ready",
            ClientAction::Hover { .. } => "hover",
            ClientAction::Unhover => "unhover",
            ClientAction::Select { .. } => "select",
            ClientAction::DecidePassiveDiscard { .. } => "decidePassiveDiscard",
            ClientAction::InitDiscard => "initDiscard",
            ClientAction::CardSelect { .. } => "cardSelect",
            ClientAction::SwapPosition { .. } => "swapPosition",
        }
    }
}

/// Inbound frames, server to client.
///
/// Event names the client does not know decode to [`ServerEvent::Unknown`]
/// so newer servers can add events without breaking older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerEvent {
    Status(ServerStatus),
    #[serde(rename_all = "camelCase")]
    Heartbeat {
        server_time: u64,
    },
    #[serde(rename_all = "camelCase")]
    ClockSync {
        client_sent_at: u64,
        server_time: u64,
    },
    Characters {
        characters: Vec<Character>,
    },
    ChatMessage {
        message: String,
        #[serde(default)]
        sender: Option<String>,
    },
    Players {
        players: Vec<Player>,
    },
    #[serde(rename_all = "camelCase")]
    GameStart {
        initiative_player: String,
    },
    GameEnd,
    #[serde(rename_all = "camelCase")]
    DraftTick {
        players: Vec<Player>,
        draft_stage: i32,
        round: i32,
        #[serde(default)]
        pack: Vec<Character>,
        end_time: u64,
        initiative_player: String,
    },
    Hover {
        hovering: String,
    },
    Unhover,
    Selected {
        selected: String,
        #[serde(default)]
        player: Option<String>,
    },
    Decks {
        decks: Vec<DeckEntry>,
    },
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// A catalog entry. Only the name is interpreted; the rest is carried as-is
/// for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub hovering: Option<String>,
    #[serde(default)]
    pub init_discard_remaining: Option<u32>,
    #[serde(default)]
    pub passive_discard_remaining: Option<u32>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready: false,
            hovering: None,
            init_discard_remaining: None,
            passive_discard_remaining: None,
        }
    }
}

/// Server metadata returned in answer to a `status` action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerStatus {
    pub title: String,
    pub owner: String,
    pub loaded_characters: usize,
    pub online_players: u32,
    pub phase: u8,
    pub require_password: bool,
}

/// One player's deck in compact form: ordered catalog names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckEntry {
    pub player: String,
    pub deck: Vec<String>,
}
