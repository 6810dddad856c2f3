//! Error types for the room layer.

use impostor_protocol::{ErrorCode, PlayerId, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room code was supplied, or it was not a valid code.
    #[error("room code is required")]
    CodeRequired,

    /// The player supplied an empty display name.
    #[error("player name is required")]
    NameRequired,

    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room is at `maxPlayers`.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The player is already a member of a different room.
    #[error("player {0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// The player is not in any room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),
}

impl RoomError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CodeRequired => ErrorCode::CodeRequired,
            Self::NameRequired => ErrorCode::NameRequired,
            Self::NotFound(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            // Only reachable if a caller skips leaving the old room first.
            Self::AlreadyInRoom(..) => ErrorCode::BadRequest,
            Self::NotInRoom(_) => ErrorCode::NotInRoom,
        }
    }
}
