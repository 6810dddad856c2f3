//! Error types for the game layer.

use impostor_protocol::{ErrorCode, Phase, PlayerId};

/// Errors raised by role assignment and the phase machine.
///
/// Phase errors carry the phase the session was actually in so the
/// client can resynchronize.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Fewer than [`MIN_PLAYERS`](crate::MIN_PLAYERS) players.
    #[error("need at least {min} players, have {players}")]
    NotEnoughPlayers { players: usize, min: usize },

    /// `impostor_count` must leave at least one civilian.
    #[error("{impostors} impostors is too many for {players} players")]
    TooManyImpostors { impostors: usize, players: usize },

    /// A game needs at least one impostor.
    #[error("a game needs at least one impostor")]
    NoImpostors,

    /// The player is not one of this session's participants.
    #[error("player {0} is not in this game")]
    PlayerNotInGame(PlayerId),

    /// A vote named someone who is not playing.
    #[error("player {0} cannot be voted for")]
    InvalidTarget(PlayerId),

    #[error("game is not in the voting phase (currently {0})")]
    NotVotingPhase(Phase),

    #[error("game is not in the discussion phase (currently {0})")]
    NotDiscussionPhase(Phase),

    #[error("game is not showing vote results (currently {0})")]
    NotResultsPhase(Phase),

    #[error("game is already finished")]
    GameFinished,
}

impl GameError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            // Too many impostors is "not enough players for this setup".
            Self::NotEnoughPlayers { .. } | Self::TooManyImpostors { .. } => {
                ErrorCode::NotEnoughPlayers
            }
            Self::NoImpostors => ErrorCode::BadRequest,
            Self::PlayerNotInGame(_) => ErrorCode::PlayerNotInGame,
            Self::InvalidTarget(_) => ErrorCode::InvalidTarget,
            Self::NotVotingPhase(_) => ErrorCode::NotVotingPhase,
            Self::NotDiscussionPhase(_) => ErrorCode::NotDiscussionPhase,
            Self::NotResultsPhase(_) => ErrorCode::NotResultsPhase,
            Self::GameFinished => ErrorCode::GameFinished,
        }
    }

    /// The phase the session was actually in, for state-precondition
    /// errors.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::NotVotingPhase(p) | Self::NotDiscussionPhase(p) | Self::NotResultsPhase(p) => {
                Some(*p)
            }
            Self::GameFinished => Some(Phase::Finished),
            _ => None,
        }
    }
}
