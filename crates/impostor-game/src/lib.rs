//! Game rules for the impostor server.
//!
//! - [`assign_roles`] deals secret roles.
//! - [`tally`] counts a voting round.
//! - [`GameSession`] is the phase machine that ties them together.
//!
//! Nothing here does I/O or keeps time: callers pass `now_ms` in and
//! schedule deadlines themselves.

pub mod error;
pub mod roles;
pub mod session;
pub mod tally;
pub mod view;

pub use error::GameError;
pub use roles::{GamePlayer, MIN_PLAYERS, Participant, assign_roles};
pub use session::{GameSession, GameSetup, RevealProgress, SessionId, VoteAccepted};
pub use tally::{VoteTally, tally};
pub use view::{
    Ballot, FinishedData, GameView, Identity, PublicPlayer, RoleCard, RoundResult,
};
