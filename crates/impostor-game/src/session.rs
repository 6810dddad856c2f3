//! The per-room game phase machine.
//!
//! ```text
//! revealing ──last confirmation──▶ discussion ──timer / request / first vote──▶ voting
//!                                      ▲                                         │
//!                                      └──────── next round ── vote-results ◀────┤
//!                                                                                ▼
//!                                                                            finished
//! ```
//!
//! Every transition is a method on [`GameSession`] that checks the
//! current phase first. Voting is split in two: [`GameSession::record_vote`]
//! stores a ballot, and [`GameSession::resolve_round`] tallies once every
//! civilian has voted. The second is idempotent so it can be scheduled
//! after the voter's acknowledgement and called again safely.

use std::collections::BTreeMap;
use std::fmt;

use impostor_protocol::{Phase, PlayerId, Role, RoomCode, Team};
use rand::Rng;

use crate::{
    Ballot, FinishedData, GameError, GamePlayer, GameView, Identity, Participant, PublicPlayer,
    RoleCard, RoundResult, assign_roles, tally,
};

/// Distinguishes one session from the one that replaced it.
///
/// Deferred work (role delivery, the discussion deadline, round
/// resolution) carries the id it was scheduled for and does nothing if
/// the room has moved on to a newer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

/// Everything a session needs besides its players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSetup {
    pub secret_word: String,
    /// Word shown to impostors; `None` means no hint.
    pub impostor_hint: Option<String>,
    pub impostor_count: usize,
    pub discussion_seconds: u32,
}

/// What a reveal confirmation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealProgress {
    /// Still waiting on other players.
    Waiting { seen: usize, total: usize },
    /// This was the last confirmation; discussion runs until `ends_at`.
    DiscussionStarted { ends_at: u64 },
    /// The session is past the reveal; nothing changed.
    AlreadyRevealed,
}

/// What an accepted ballot did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteAccepted {
    /// The ballot arrived during discussion and moved the session to
    /// voting.
    pub promoted: bool,
    /// Every civilian has now voted; [`GameSession::resolve_round`] will
    /// produce a result.
    pub round_complete: bool,
}

/// One game played in a room.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    code: RoomCode,
    phase: Phase,
    players: Vec<GamePlayer>,
    secret_word: String,
    impostor_hint: Option<String>,
    impostor_count: usize,
    discussion_seconds: u32,
    discussion_ends_at: Option<u64>,
    votes: BTreeMap<PlayerId, PlayerId>,
    round: u32,
    // Nobody is removed from play; stays empty.
    eliminated_players: Vec<PlayerId>,
    discovered: Vec<PlayerId>,
    winner: Option<Team>,
    last_result: Option<RoundResult>,
    finished_data: Option<FinishedData>,
}

impl GameSession {
    /// Deals roles and opens the session in `revealing`.
    ///
    /// Players keep the order of `participants`; only the roles are
    /// shuffled.
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        id: SessionId,
        code: RoomCode,
        participants: &[Participant],
        setup: GameSetup,
    ) -> Result<Self, GameError> {
        let mut players = assign_roles(
            rng,
            participants,
            &setup.secret_word,
            setup.impostor_count,
            setup.impostor_hint.as_deref(),
        )?;
        players.sort_by_key(|p| participants.iter().position(|q| q.id == p.id));

        tracing::debug!(%code, session = %id, players = players.len(), "game session dealt");

        Ok(Self {
            id,
            code,
            phase: Phase::Revealing,
            players,
            secret_word: setup.secret_word,
            impostor_hint: setup.impostor_hint,
            impostor_count: setup.impostor_count,
            discussion_seconds: setup.discussion_seconds,
            discussion_ends_at: None,
            votes: BTreeMap::new(),
            round: 1,
            eliminated_players: Vec::new(),
            discovered: Vec::new(),
            winner: None,
            last_result: None,
            finished_data: None,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn players(&self) -> &[GamePlayer] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&GamePlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_participant(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    pub fn secret_word(&self) -> &str {
        &self.secret_word
    }

    pub fn impostor_hint(&self) -> Option<&str> {
        self.impostor_hint.as_deref()
    }

    pub fn impostor_count(&self) -> usize {
        self.impostor_count
    }

    pub fn discussion_seconds(&self) -> u32 {
        self.discussion_seconds
    }

    /// Absolute deadline of the current discussion, in epoch
    /// milliseconds.
    pub fn discussion_ends_at(&self) -> Option<u64> {
        self.discussion_ends_at
    }

    /// Ballots of the current round, impostors' included.
    pub fn votes(&self) -> &BTreeMap<PlayerId, PlayerId> {
        &self.votes
    }

    pub fn eliminated_players(&self) -> &[PlayerId] {
        &self.eliminated_players
    }

    /// Impostors discovered so far, in discovery order.
    pub fn discovered_impostors(&self) -> &[PlayerId] {
        &self.discovered
    }

    pub fn winner(&self) -> Option<Team> {
        self.winner
    }

    pub fn last_result(&self) -> Option<&RoundResult> {
        self.last_result.as_ref()
    }

    pub fn finished_data(&self) -> Option<&FinishedData> {
        self.finished_data.as_ref()
    }

    pub fn civilians(&self) -> Vec<PlayerId> {
        self.ids_with_role(Role::Civilian)
    }

    pub fn impostors(&self) -> Vec<PlayerId> {
        self.ids_with_role(Role::Impostor)
    }

    fn ids_with_role(&self, role: Role) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.role == role)
            .map(|p| p.id)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Reveal
    // -----------------------------------------------------------------------

    /// Marks that `player` has seen their role.
    ///
    /// The confirmation that completes the set moves the session to
    /// discussion with a deadline of `now_ms + discussion_seconds`.
    /// Repeats are harmless.
    pub fn confirm_reveal(
        &mut self,
        player: PlayerId,
        now_ms: u64,
    ) -> Result<RevealProgress, GameError> {
        let entry = self
            .players
            .iter_mut()
            .find(|p| p.id == player)
            .ok_or(GameError::PlayerNotInGame(player))?;
        if self.phase != Phase::Revealing {
            return Ok(RevealProgress::AlreadyRevealed);
        }
        entry.has_seen_role = true;

        let seen = self.players.iter().filter(|p| p.has_seen_role).count();
        let total = self.players.len();
        if seen < total {
            return Ok(RevealProgress::Waiting { seen, total });
        }

        let ends_at = self.enter_discussion(now_ms);
        Ok(RevealProgress::DiscussionStarted { ends_at })
    }

    fn enter_discussion(&mut self, now_ms: u64) -> u64 {
        let ends_at = now_ms + u64::from(self.discussion_seconds) * 1000;
        self.phase = Phase::Discussion;
        self.discussion_ends_at = Some(ends_at);
        tracing::debug!(code = %self.code, round = self.round, ends_at, "discussion started");
        ends_at
    }

    // -----------------------------------------------------------------------
    // Discussion → voting
    // -----------------------------------------------------------------------

    /// Ends discussion early on a civilian's request.
    ///
    /// Returns `Ok(false)` if voting is already open, or if the request
    /// came from an impostor. An impostor's request is dropped without an
    /// error so the reply looks the same as anyone else's.
    pub fn start_voting(&mut self, requester: PlayerId) -> Result<bool, GameError> {
        let Some(requester) = self.player(requester) else {
            return Err(GameError::PlayerNotInGame(requester));
        };
        let from_impostor = requester.is_impostor();
        match self.phase {
            Phase::Discussion if from_impostor => Ok(false),
            Phase::Discussion => {
                self.enter_voting("requested");
                Ok(true)
            }
            Phase::Voting => Ok(false),
            Phase::Finished => Err(GameError::GameFinished),
            other => Err(GameError::NotDiscussionPhase(other)),
        }
    }

    /// Ends discussion because its deadline passed.
    ///
    /// `round` is the round the deadline was scheduled for; a deadline
    /// left over from an earlier round does nothing.
    pub fn expire_discussion(&mut self, round: u32) -> bool {
        if self.phase != Phase::Discussion || self.round != round {
            return false;
        }
        self.enter_voting("deadline");
        true
    }

    fn enter_voting(&mut self, cause: &'static str) {
        self.phase = Phase::Voting;
        tracing::debug!(code = %self.code, round = self.round, cause, "voting started");
    }

    // -----------------------------------------------------------------------
    // Voting
    // -----------------------------------------------------------------------

    /// Stores `voter`'s ballot for `target`. A later ballot from the same
    /// voter replaces the earlier one.
    ///
    /// A ballot that arrives while the session is still in discussion
    /// is accepted and opens voting (`promoted` in the result).
    pub fn record_vote(
        &mut self,
        voter: PlayerId,
        target: PlayerId,
    ) -> Result<VoteAccepted, GameError> {
        if !self.is_participant(voter) {
            return Err(GameError::PlayerNotInGame(voter));
        }
        match self.phase {
            Phase::Voting | Phase::Discussion => {}
            Phase::Finished => return Err(GameError::GameFinished),
            other => return Err(GameError::NotVotingPhase(other)),
        }
        if !self.is_participant(target) {
            return Err(GameError::InvalidTarget(target));
        }

        let promoted = self.phase == Phase::Discussion;
        if promoted {
            self.enter_voting("early ballot");
        }
        self.votes.insert(voter, target);

        Ok(VoteAccepted {
            promoted,
            round_complete: self.is_round_complete(),
        })
    }

    /// Ballots needed to close a round: one per civilian.
    pub fn votes_required(&self) -> usize {
        self.players.iter().filter(|p| !p.is_impostor()).count()
    }

    /// Ballots recorded so far, impostors' included.
    ///
    /// This is the count clients see. An impostor's ballot moves it the
    /// same way a civilian's does, so the public counters never single
    /// out who holds which role.
    pub fn votes_cast(&self) -> usize {
        self.votes.len()
    }

    /// Civilian ballots recorded so far. Server-side only.
    pub fn civilian_ballots(&self) -> usize {
        self.players
            .iter()
            .filter(|p| !p.is_impostor() && self.votes.contains_key(&p.id))
            .count()
    }

    /// Voting is open and every civilian has a ballot in.
    pub fn is_round_complete(&self) -> bool {
        self.phase == Phase::Voting && self.civilian_ballots() == self.votes_required()
    }

    /// Tallies the round if it is complete, then runs the win check.
    ///
    /// Returns `None`, changing nothing, when the round is not ready
    /// (or was already resolved). Impostors are discovered only by a
    /// unanimous civilian vote; discoveries accumulate across rounds.
    pub fn resolve_round(&mut self) -> Option<RoundResult> {
        if !self.is_round_complete() {
            return None;
        }

        let civilians = self.civilians();
        let impostors = self.impostors();
        let tally = tally(&civilians, &impostors, &self.votes);
        if let Some(found) = tally.eliminated {
            if !self.discovered.contains(&found) {
                self.discovered.push(found);
            }
        }

        self.winner = self.check_winner(civilians.len(), &impostors);
        self.phase = if self.winner.is_some() {
            Phase::Finished
        } else {
            Phase::VoteResults
        };

        let result = RoundResult {
            round: self.round,
            tally,
            votes: self
                .votes
                .iter()
                .map(|(&voter_id, &target_id)| Ballot {
                    voter_id,
                    target_id,
                })
                .collect(),
            phase: self.phase,
            winner: self.winner,
        };
        self.last_result = Some(result.clone());

        if let Some(winner) = self.winner {
            self.finished_data = Some(self.snapshot(winner));
            tracing::info!(code = %self.code, %winner, rounds = self.round, "game finished");
        } else {
            tracing::debug!(
                code = %self.code,
                round = self.round,
                discovered = result.tally.impostor_discovered,
                "round resolved"
            );
        }
        Some(result)
    }

    fn check_winner(&self, civilians: usize, impostors: &[PlayerId]) -> Option<Team> {
        let hidden = impostors
            .iter()
            .filter(|id| !self.discovered.contains(id))
            .count();
        if hidden == 0 {
            Some(Team::Civilians)
        } else if civilians == 0 || hidden >= civilians {
            Some(Team::Impostors)
        } else {
            None
        }
    }

    fn snapshot(&self, winner: Team) -> FinishedData {
        FinishedData {
            winner,
            impostors: self
                .players
                .iter()
                .filter(|p| p.is_impostor())
                .map(|p| Identity {
                    id: p.id,
                    name: p.name.clone(),
                })
                .collect(),
            secret_word: self.secret_word.clone(),
            impostor_hint: self.impostor_hint.clone(),
            rounds: self.round,
            last_result: self.last_result.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Next round
    // -----------------------------------------------------------------------

    /// Leaves the results screen for another discussion with the same
    /// roles. Ballots are cleared; discoveries are kept.
    ///
    /// Returns the new discussion deadline.
    pub fn begin_next_round(&mut self, now_ms: u64) -> Result<u64, GameError> {
        match self.phase {
            Phase::VoteResults => {}
            Phase::Finished => return Err(GameError::GameFinished),
            other => return Err(GameError::NotResultsPhase(other)),
        }
        self.round += 1;
        self.votes.clear();
        Ok(self.enter_discussion(now_ms))
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn public_players(&self) -> Vec<PublicPlayer> {
        self.players
            .iter()
            .map(|p| PublicPlayer {
                id: p.id,
                name: p.name.clone(),
                has_seen_role: p.has_seen_role,
                has_voted: self.votes.contains_key(&p.id),
            })
            .collect()
    }

    /// `player`'s own role and word, or `None` for non-participants.
    pub fn role_card(&self, player: PlayerId) -> Option<RoleCard> {
        self.player(player).map(|p| RoleCard {
            role: p.role,
            word: p.word.clone(),
            impostor_count: self.impostor_count,
        })
    }

    /// The session as `viewer` may see it.
    pub fn view_for(&self, viewer: PlayerId) -> GameView {
        GameView {
            code: self.code.clone(),
            phase: self.phase,
            round: self.round,
            players: self.public_players(),
            me: self.role_card(viewer),
            impostor_count: self.impostor_count,
            discussion_seconds: self.discussion_seconds,
            discussion_ends_at: self.discussion_ends_at,
            votes_cast: self.votes_cast(),
            votes_required: self.votes_required(),
            eliminated_players: self.eliminated_players.clone(),
            last_result: self.last_result.clone(),
            winner: self.winner,
            finished_data: self.finished_data.clone(),
        }
    }
}
