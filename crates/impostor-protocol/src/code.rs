//! Stable error codes reported to clients.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable reason a request was rejected.
///
/// Clients localize these; the set is part of the wire contract, so
/// variants are only ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- input validation --
    CodeRequired,
    NameRequired,
    BadRequest,
    InvalidTarget,

    // -- authorization --
    NotHost,
    NotOriginalHost,

    // -- state preconditions --
    RoomNotFound,
    RoomFull,
    NotInRoom,
    GameNotFound,
    PlayerNotInGame,
    NotEnoughPlayers,
    NotVotingPhase,
    NotDiscussionPhase,
    NotResultsPhase,
    GameFinished,

    // -- resources --
    PackInvalid,
}

impl ErrorCode {
    /// Wire spelling of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeRequired => "CODE_REQUIRED",
            Self::NameRequired => "NAME_REQUIRED",
            Self::BadRequest => "BAD_REQUEST",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::NotHost => "NOT_HOST",
            Self::NotOriginalHost => "NOT_ORIGINAL_HOST",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::RoomFull => "ROOM_FULL",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::GameNotFound => "GAME_NOT_FOUND",
            Self::PlayerNotInGame => "PLAYER_NOT_IN_GAME",
            Self::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            Self::NotVotingPhase => "NOT_VOTING_PHASE",
            Self::NotDiscussionPhase => "NOT_DISCUSSION_PHASE",
            Self::NotResultsPhase => "NOT_RESULTS_PHASE",
            Self::GameFinished => "GAME_FINISHED",
            Self::PackInvalid => "PACK_INVALID",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
