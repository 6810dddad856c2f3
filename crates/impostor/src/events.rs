//! The event surface: what clients send and what the server pushes.
//!
//! Both directions use adjacent tagging, so every payload looks like
//! `{ "event": "game:vote", "data": { ... } }` inside an
//! [`Envelope`](impostor_protocol::Envelope).

use impostor_game::{FinishedData, GameView, PublicPlayer, RoleCard, RoundResult};
use impostor_protocol::{PlayerId, Reply, RoomCode};
use impostor_room::{Room, RoomSettings};
use serde::{Deserialize, Serialize};

/// A request from a client.
///
/// Room codes arrive as raw strings and are validated by the
/// coordinator, so a missing code is reported as `CODE_REQUIRED`
/// rather than as a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "room:create")]
    CreateRoom {
        #[serde(default)]
        name: String,
        /// Falls back to the server's default settings when omitted.
        #[serde(default)]
        settings: Option<RoomSettings>,
    },

    #[serde(rename = "room:join")]
    JoinRoom {
        #[serde(default)]
        code: String,
        #[serde(default)]
        name: String,
    },

    #[serde(rename = "room:get-info")]
    RoomInfo {
        #[serde(default)]
        code: String,
    },

    #[serde(rename = "room:leave")]
    LeaveRoom,

    /// Starts the first game in the sender's room. Host only.
    #[serde(rename = "game:start")]
    StartGame(StartGameRequest),

    #[serde(rename = "game:get-state")]
    GameState {
        #[serde(default)]
        code: String,
    },

    #[serde(rename = "game:reveal-complete")]
    RevealComplete {
        #[serde(default)]
        code: String,
    },

    #[serde(rename = "game:vote", rename_all = "camelCase")]
    Vote {
        #[serde(default)]
        code: String,
        #[serde(default)]
        voted_player_id: Option<PlayerId>,
    },

    #[serde(rename = "game:start-voting")]
    StartVoting {
        #[serde(default)]
        code: String,
    },

    /// Replaces the room's game with a fresh one. Original host only.
    #[serde(rename = "game:new-game")]
    NewGame {
        #[serde(default)]
        code: String,
    },

    #[serde(rename = "game:next-round")]
    NextRound {
        #[serde(default)]
        code: String,
    },

    #[serde(rename = "ping")]
    Ping,
}

impl ClientEvent {
    /// The wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "room:create",
            Self::JoinRoom { .. } => "room:join",
            Self::RoomInfo { .. } => "room:get-info",
            Self::LeaveRoom => "room:leave",
            Self::StartGame(_) => "game:start",
            Self::GameState { .. } => "game:get-state",
            Self::RevealComplete { .. } => "game:reveal-complete",
            Self::Vote { .. } => "game:vote",
            Self::StartVoting { .. } => "game:start-voting",
            Self::NewGame { .. } => "game:new-game",
            Self::NextRound { .. } => "game:next-round",
            Self::Ping => "ping",
        }
    }
}

/// Options for `game:start`. Anything left out keeps the room's
/// current setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartGameRequest {
    pub pack_id: Option<String>,
    pub selected_packs: Vec<String>,
    pub hint_for_impostors: Option<bool>,
    pub discussion_seconds: Option<u32>,
    pub impostor_count: Option<usize>,
    pub locale: Option<String>,
}

impl StartGameRequest {
    /// The room settings this request would leave behind.
    ///
    /// The pack selection is remembered so a later "new game" draws
    /// from the same packs: `selectedPacks` wins, then a lone `packId`.
    pub fn apply_to(&self, base: &RoomSettings) -> RoomSettings {
        let mut settings = base.clone();
        if let Some(count) = self.impostor_count {
            settings.impostor_count = count;
        }
        if let Some(seconds) = self.discussion_seconds {
            settings.discussion_seconds = seconds;
        }
        if let Some(hint) = self.hint_for_impostors {
            settings.hint_for_impostors = hint;
        }
        if let Some(locale) = &self.locale {
            settings.locale = locale.clone();
        }
        if !self.selected_packs.is_empty() {
            settings.selected_word_pack_ids = self.selected_packs.clone();
        } else if let Some(id) = self.pack_id.as_ref().filter(|id| !id.is_empty()) {
            settings.selected_word_pack_ids = vec![id.clone()];
        }
        settings.normalized()
    }
}

/// A message pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// First message on every connection: the id this connection plays
    /// under.
    #[serde(rename = "connected", rename_all = "camelCase")]
    Connected { player_id: PlayerId },

    /// Acknowledges the request whose envelope carried `seq == reply_to`.
    #[serde(rename = "ack", rename_all = "camelCase")]
    Ack { reply_to: u64, reply: Reply<AckData> },

    #[serde(rename = "room:updated")]
    RoomUpdated(Room),

    #[serde(rename = "game:started")]
    GameStarted(GameStarted),

    /// Sent privately to each player.
    #[serde(rename = "game:role")]
    Role(RoleCard),

    #[serde(rename = "game:players-update")]
    PlayersUpdate(PlayersUpdate),

    #[serde(rename = "game:discussion-started")]
    DiscussionStarted(DiscussionStarted),

    #[serde(rename = "game:voting-started")]
    VotingStarted(VotingStarted),

    #[serde(rename = "game:vote-result")]
    VoteResult(RoundResult),

    #[serde(rename = "game:finished")]
    Finished(FinishedData),
}

impl ServerEvent {
    /// The wire name, for logging and tests.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Ack { .. } => "ack",
            Self::RoomUpdated(_) => "room:updated",
            Self::GameStarted(_) => "game:started",
            Self::Role(_) => "game:role",
            Self::PlayersUpdate(_) => "game:players-update",
            Self::DiscussionStarted(_) => "game:discussion-started",
            Self::VotingStarted(_) => "game:voting-started",
            Self::VoteResult(_) => "game:vote-result",
            Self::Finished(_) => "game:finished",
        }
    }
}

/// Data carried by a successful acknowledgement, keyed by kind:
/// `{ "room": {...} }`, `{ "game": {...} }`, `{ "vote": {...} }` or
/// `"pong"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AckData {
    Room(Room),
    Game(GameView),
    Vote(VoteProgress),
    Pong,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStarted {
    pub code: RoomCode,
    pub round: u32,
    pub players: Vec<PublicPlayer>,
    pub impostor_count: usize,
    pub discussion_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayersUpdate {
    pub players: Vec<PublicPlayer>,
    pub votes_cast: usize,
    pub votes_required: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionStarted {
    /// Absolute deadline, epoch milliseconds.
    pub ends_at: u64,
    /// Discussion length in seconds.
    pub duration: u32,
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingStarted {
    pub players: Vec<PublicPlayer>,
    pub round: u32,
}

/// How far the current round's voting has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteProgress {
    pub votes_cast: usize,
    pub votes_required: usize,
}
