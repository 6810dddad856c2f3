//! Client-facing snapshots of a session.
//!
//! These are the only game shapes that leave the server. Nothing here
//! exposes another player's role or word.

use impostor_protocol::{Phase, PlayerId, Role, RoomCode, Team};
use serde::{Deserialize, Serialize};

use crate::VoteTally;

/// A player as everyone at the table sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub name: String,
    pub has_seen_role: bool,
    pub has_voted: bool,
}

/// A player's own secret, sent privately as `game:role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCard {
    pub role: Role,
    pub word: Option<String>,
    pub impostor_count: usize,
}

/// Name and id, for revealing the impostors at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: PlayerId,
    pub name: String,
}

/// The result of resolving a completed voting round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round: u32,
    #[serde(flatten)]
    pub tally: VoteTally,
    /// Every ballot, impostors' included.
    pub votes: Vec<Ballot>,
    /// Where the session went: `vote-results` or `finished`.
    pub phase: Phase,
    pub winner: Option<Team>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
}

/// Snapshot taken when the session reaches `finished`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedData {
    pub winner: Team,
    pub impostors: Vec<Identity>,
    pub secret_word: String,
    pub impostor_hint: Option<String>,
    pub rounds: u32,
    pub last_result: Option<RoundResult>,
}

/// The state of a session as seen by one viewer.
///
/// `me` is filled only when the viewer is a participant. The secret
/// word shows up only through `me` (for civilians) and `finished_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub code: RoomCode,
    pub phase: Phase,
    pub round: u32,
    pub players: Vec<PublicPlayer>,
    pub me: Option<RoleCard>,
    pub impostor_count: usize,
    pub discussion_seconds: u32,
    pub discussion_ends_at: Option<u64>,
    pub votes_cast: usize,
    pub votes_required: usize,
    pub eliminated_players: Vec<PlayerId>,
    pub last_result: Option<RoundResult>,
    pub winner: Option<Team>,
    pub finished_data: Option<FinishedData>,
}
