//! Error types for the server crate.

use impostor_game::GameError;
use impostor_protocol::{ErrorCode, Phase, PlayerId, ProtocolError, RoomCode};
use impostor_room::RoomError;
use impostor_transport::TransportError;

/// Why the coordinator rejected a request.
///
/// Every variant maps to a wire [`ErrorCode`]; none of them leave any
/// state changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Game(#[from] GameError),

    /// A room-scoped request from a player who is in no room.
    #[error("player {0} is not in any room")]
    NoRoom(PlayerId),

    #[error("player {0} is not the host of room {1}")]
    NotHost(PlayerId, RoomCode),

    #[error("player {0} did not create room {1}")]
    NotOriginalHost(PlayerId, RoomCode),

    #[error("room {0} has no game")]
    GameNotFound(RoomCode),

    #[error("word pack {0} is missing or empty")]
    PackInvalid(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl CoordinatorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Room(e) => e.code(),
            Self::Game(e) => e.code(),
            Self::NoRoom(_) => ErrorCode::RoomNotFound,
            Self::NotHost(..) => ErrorCode::NotHost,
            Self::NotOriginalHost(..) => ErrorCode::NotOriginalHost,
            Self::GameNotFound(_) => ErrorCode::GameNotFound,
            Self::PackInvalid(_) => ErrorCode::PackInvalid,
            Self::BadRequest(_) => ErrorCode::BadRequest,
        }
    }

    /// The game's actual phase, for wrong-phase rejections.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Game(e) => e.phase(),
            _ => None,
        }
    }
}

/// Top-level error for running the server.
#[derive(Debug, thiserror::Error)]
pub enum ImpostorError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}
