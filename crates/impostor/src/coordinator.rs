//! The session coordinator: rooms, games and the rules between them.
//!
//! One [`SessionCoordinator`] owns every room and every game for the
//! life of the process. Each request locks the lobby, validates, mutates
//! and emits its broadcasts before releasing the lock, so no other
//! request for the same room observes a half-applied change.
//!
//! The only suspension point inside a request is the word-pack lookup
//! when a game starts. It runs with the lock released, and the request
//! re-validates the room once it locks again.
//!
//! Work that has to happen later (private role delivery, the discussion
//! deadline, round resolution) runs in spawned tasks. Each carries the
//! [`SessionId`] it was scheduled for and does nothing if the room's
//! game has been replaced since.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use impostor_game::{
    GameError, GameSession, GameSetup, GameView, Participant, RevealProgress, SessionId,
};
use impostor_protocol::{PlayerId, RoomCode};
use impostor_room::{LeaveOutcome, Room, RoomError, RoomRegistry, RoomSettings};
use tokio::sync::Mutex;

use crate::broadcast::Broadcaster;
use crate::config::GameConfig;
use crate::events::{
    DiscussionStarted, GameStarted, PlayersUpdate, ServerEvent, StartGameRequest, VoteProgress,
    VotingStarted,
};
use crate::packs::{WordPack, WordPackSource, resolve_pack};
use crate::CoordinatorError;

/// Identifies a round that may be ready to resolve.
///
/// Handed out by [`SessionCoordinator::vote`] when a ballot completes
/// the round, and redeemed with [`SessionCoordinator::maybe_resolve_round`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTicket {
    pub code: RoomCode,
    pub session: SessionId,
}

/// The outcome of an accepted vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    pub progress: VoteProgress,
    /// Present when this ballot completed the round.
    pub ticket: Option<RoundTicket>,
}

#[derive(Debug, Default)]
struct Lobby {
    rooms: RoomRegistry,
    games: HashMap<RoomCode, GameSession>,
    next_session: u64,
}

impl Lobby {
    fn game(&self, code: &RoomCode) -> Result<&GameSession, CoordinatorError> {
        self.games
            .get(code)
            .ok_or_else(|| CoordinatorError::GameNotFound(code.clone()))
    }

    fn game_mut(&mut self, code: &RoomCode) -> Result<&mut GameSession, CoordinatorError> {
        self.games
            .get_mut(code)
            .ok_or_else(|| CoordinatorError::GameNotFound(code.clone()))
    }

    /// The game in `code` if `player` is one of its participants.
    fn game_for(
        &mut self,
        code: &RoomCode,
        player: PlayerId,
    ) -> Result<&mut GameSession, CoordinatorError> {
        let game = self.game_mut(code)?;
        if !game.is_participant(player) {
            return Err(GameError::PlayerNotInGame(player).into());
        }
        Ok(game)
    }

    fn is_current(&self, code: &RoomCode, session: SessionId) -> bool {
        self.games.get(code).is_some_and(|g| g.id() == session)
    }

    fn next_session_id(&mut self) -> SessionId {
        self.next_session += 1;
        SessionId(self.next_session)
    }
}

/// Why a game is being dealt.
enum Deal {
    Start,
    Rematch,
}

/// Sequences rooms and games behind the client event surface.
pub struct SessionCoordinator<B: Broadcaster, W: WordPackSource> {
    lobby: Mutex<Lobby>,
    broadcaster: Arc<B>,
    packs: Arc<W>,
    config: GameConfig,
}

impl<B: Broadcaster, W: WordPackSource> SessionCoordinator<B, W> {
    pub fn new(broadcaster: Arc<B>, packs: Arc<W>, config: GameConfig) -> Self {
        Self {
            lobby: Mutex::new(Lobby::default()),
            broadcaster,
            packs,
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    /// Creates a room hosted by `player`, leaving their current room
    /// first.
    pub async fn create_room(
        &self,
        player: PlayerId,
        name: &str,
        settings: Option<RoomSettings>,
    ) -> Result<Room, CoordinatorError> {
        if name.trim().is_empty() {
            return Err(RoomError::NameRequired.into());
        }
        let settings = settings.unwrap_or_else(|| self.config.default_settings.clone());

        let mut lobby = self.lobby.lock().await;
        if lobby.rooms.room_of(player).is_some() {
            self.leave_locked(&mut lobby, player)?;
        }
        let room = lobby
            .rooms
            .create(player, name, settings, now_ms())?
            .clone();
        self.broadcaster.subscribe(room.code(), player);
        Ok(room)
    }

    /// Adds `player` to the room `raw_code`.
    ///
    /// Rejoining the same room is a no-op that keeps the stored name.
    /// Joining a different room leaves the current one, but only after
    /// the new room is known to accept the player.
    pub async fn join_room(
        &self,
        player: PlayerId,
        raw_code: &str,
        name: &str,
    ) -> Result<Room, CoordinatorError> {
        let code = parse_code(raw_code)?;
        let mut lobby = self.lobby.lock().await;

        let target = lobby.rooms.get(&code)?;
        if name.trim().is_empty() {
            return Err(RoomError::NameRequired.into());
        }
        let already_member = target.contains(player);
        if !already_member && target.is_full() {
            return Err(RoomError::RoomFull(code).into());
        }
        if !already_member && lobby.rooms.room_of(player).is_some() {
            self.leave_locked(&mut lobby, player)?;
        }

        lobby.rooms.join(&code, player, name)?;
        self.broadcaster.subscribe(&code, player);
        let room = lobby.rooms.get(&code)?.clone();
        if !already_member {
            self.broadcaster
                .emit_to_room(&code, &ServerEvent::RoomUpdated(room.clone()));
        }
        Ok(room)
    }

    pub async fn room_info(&self, raw_code: &str) -> Result<Room, CoordinatorError> {
        let code = parse_code(raw_code)?;
        let lobby = self.lobby.lock().await;
        Ok(lobby.rooms.get(&code)?.clone())
    }

    pub async fn leave_room(&self, player: PlayerId) -> Result<(), CoordinatorError> {
        let mut lobby = self.lobby.lock().await;
        self.leave_locked(&mut lobby, player)?;
        Ok(())
    }

    /// Cleans up after a closed connection.
    ///
    /// The player leaves their room but stays in any running game, where
    /// they still count as a voter.
    pub async fn disconnect(&self, player: PlayerId) {
        let mut lobby = self.lobby.lock().await;
        if lobby.rooms.room_of(player).is_some() {
            if let Err(e) = self.leave_locked(&mut lobby, player) {
                tracing::debug!(%player, error = %e, "disconnect cleanup failed");
            }
        }
    }

    fn leave_locked(
        &self,
        lobby: &mut Lobby,
        player: PlayerId,
    ) -> Result<LeaveOutcome, CoordinatorError> {
        let outcome = lobby.rooms.leave(player)?;
        let code = outcome.code().clone();
        self.broadcaster.unsubscribe(&code, player);

        match &outcome {
            LeaveOutcome::Destroyed { .. } => {
                if lobby.games.remove(&code).is_some() {
                    tracing::info!(%code, "game dropped with its room");
                }
            }
            LeaveOutcome::Left { .. } => {
                let room = lobby.rooms.get(&code)?.clone();
                self.broadcaster
                    .emit_to_room(&code, &ServerEvent::RoomUpdated(room));
            }
        }
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Starting games
    // -----------------------------------------------------------------------

    /// Starts the first game in `player`'s room. Host only.
    ///
    /// The request's options become the room's settings only if the game
    /// actually starts.
    pub async fn start_game(
        self: &Arc<Self>,
        player: PlayerId,
        request: StartGameRequest,
    ) -> Result<GameView, CoordinatorError> {
        let (code, settings) = {
            let lobby = self.lobby.lock().await;
            let code = lobby
                .rooms
                .room_of(player)
                .cloned()
                .ok_or(CoordinatorError::NoRoom(player))?;
            let room = lobby.rooms.get(&code)?;
            let settings = request.apply_to(room.settings());
            let has_game = lobby.games.contains_key(&code);
            self.check_can_deal(room, has_game, player, &settings, Deal::Start)?;
            (code, settings)
        };

        let pack = resolve_pack(
            self.packs.as_ref(),
            request.pack_id.as_deref(),
            &settings.selected_word_pack_ids,
            &settings.locale,
        )
        .await?;

        self.deal(player, &code, settings, &pack, Deal::Start).await
    }

    /// Replaces the room's game with a new one drawn from the room's
    /// remembered pack selection. Only the room's creator may do this,
    /// from any phase.
    pub async fn new_game(
        self: &Arc<Self>,
        player: PlayerId,
        raw_code: &str,
    ) -> Result<GameView, CoordinatorError> {
        let code = parse_code(raw_code)?;
        let settings = {
            let lobby = self.lobby.lock().await;
            let room = lobby.rooms.get(&code)?;
            let settings = room.settings().clone();
            let has_game = lobby.games.contains_key(&code);
            self.check_can_deal(room, has_game, player, &settings, Deal::Rematch)?;
            settings
        };

        let pack = resolve_pack(
            self.packs.as_ref(),
            None,
            &settings.selected_word_pack_ids,
            &settings.locale,
        )
        .await?;

        self.deal(player, &code, settings, &pack, Deal::Rematch).await
    }

    /// Permission and headcount checks shared by both ways of dealing.
    ///
    /// Once a room has had a game, replacing it belongs to the original
    /// host alone, whichever event asks.
    fn check_can_deal(
        &self,
        room: &Room,
        has_game: bool,
        player: PlayerId,
        settings: &RoomSettings,
        kind: Deal,
    ) -> Result<(), CoordinatorError> {
        let code = room.code();
        match kind {
            Deal::Start if has_game && !room.is_original_host(player) => {
                return Err(CoordinatorError::NotOriginalHost(player, code.clone()));
            }
            Deal::Start if !room.is_host(player) => {
                return Err(CoordinatorError::NotHost(player, code.clone()));
            }
            Deal::Rematch if !room.contains(player) => {
                return Err(RoomError::NotInRoom(player).into());
            }
            Deal::Rematch if !room.is_original_host(player) => {
                return Err(CoordinatorError::NotOriginalHost(player, code.clone()));
            }
            _ => {}
        }

        let players = room.players().len();
        let min = self.config.required_players();
        if players < min {
            return Err(GameError::NotEnoughPlayers { players, min }.into());
        }
        if settings.impostor_count >= players {
            return Err(GameError::TooManyImpostors {
                impostors: settings.impostor_count,
                players,
            }
            .into());
        }
        Ok(())
    }

    /// Second half of starting a game, after the pack lookup.
    async fn deal(
        self: &Arc<Self>,
        player: PlayerId,
        code: &RoomCode,
        settings: RoomSettings,
        pack: &WordPack,
        kind: Deal,
    ) -> Result<GameView, CoordinatorError> {
        let secret_word = pack
            .draw_word()
            .ok_or_else(|| CoordinatorError::PackInvalid(pack.id.clone()))?
            .to_string();
        let setup = GameSetup {
            secret_word,
            impostor_hint: settings.hint_for_impostors.then(|| pack.name.clone()),
            impostor_count: settings.impostor_count,
            discussion_seconds: settings.discussion_seconds,
        };

        let mut lobby = self.lobby.lock().await;
        // The room may have changed while the pack was being looked up.
        let has_game = lobby.games.contains_key(code);
        let room = lobby.rooms.get(code)?;
        self.check_can_deal(room, has_game, player, &settings, kind)?;
        let participants: Vec<Participant> = room
            .players()
            .iter()
            .map(|m| Participant::new(m.id, m.name.clone()))
            .collect();

        let session_id = lobby.next_session_id();
        let game = GameSession::new(
            &mut rand::rng(),
            session_id,
            code.clone(),
            &participants,
            setup,
        )?;
        lobby.rooms.get_mut(code)?.set_settings(settings);

        tracing::info!(
            %code,
            session = %session_id,
            pack = %pack.id,
            players = participants.len(),
            impostors = game.impostor_count(),
            "game started"
        );

        let started = ServerEvent::GameStarted(GameStarted {
            code: code.clone(),
            round: game.round(),
            players: game.public_players(),
            impostor_count: game.impostor_count(),
            discussion_seconds: game.discussion_seconds(),
        });
        let view = game.view_for(player);
        lobby.games.insert(code.clone(), game);
        self.announce(&lobby, code, &started);
        drop(lobby);

        self.schedule_roles(code.clone(), session_id);
        Ok(view)
    }

    fn schedule_roles(self: &Arc<Self>, code: RoomCode, session: SessionId) {
        let this = Arc::clone(self);
        let delay = self.config.role_reveal_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.deliver_roles(&code, session).await;
        });
    }

    /// Sends each participant their own role, privately.
    async fn deliver_roles(&self, code: &RoomCode, session: SessionId) {
        let lobby = self.lobby.lock().await;
        if !lobby.is_current(code, session) {
            tracing::debug!(%code, %session, "skipping roles for replaced game");
            return;
        }
        let Ok(game) = lobby.game(code) else {
            return;
        };
        for p in game.players() {
            let Some(card) = game.role_card(p.id) else {
                continue;
            };
            if !self.broadcaster.emit_to_player(p.id, &ServerEvent::Role(card)) {
                tracing::warn!(%code, player_id = %p.id, "role not delivered");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Playing
    // -----------------------------------------------------------------------

    /// The game in `raw_code` as `player` may see it.
    pub async fn game_state(
        &self,
        player: PlayerId,
        raw_code: &str,
    ) -> Result<GameView, CoordinatorError> {
        let code = parse_code(raw_code)?;
        let lobby = self.lobby.lock().await;
        Ok(lobby.game(&code)?.view_for(player))
    }

    /// Records that `player` has seen their role. The last confirmation
    /// opens discussion and, if configured, arms its deadline.
    pub async fn reveal_complete(
        self: &Arc<Self>,
        player: PlayerId,
        raw_code: &str,
    ) -> Result<(), CoordinatorError> {
        let code = parse_code(raw_code)?;
        let mut lobby = self.lobby.lock().await;
        let game = lobby.game_for(&code, player)?;
        let progress = game.confirm_reveal(player, now_ms())?;
        if progress == RevealProgress::AlreadyRevealed {
            return Ok(());
        }

        let update = players_update(game);
        let discussion = match progress {
            RevealProgress::DiscussionStarted { ends_at } => {
                Some((discussion_started(game, ends_at), game.id(), game.round(), game.discussion_seconds()))
            }
            _ => None,
        };

        self.broadcaster.emit_to_room(&code, &update);
        if let Some((event, session, round, seconds)) = discussion {
            tracing::info!(%code, round, "discussion started");
            self.announce(&lobby, &code, &event);
            drop(lobby);
            self.schedule_deadline(code, session, round, seconds);
        }
        Ok(())
    }

    /// Opens voting early at a civilian's request. An impostor's request
    /// succeeds without changing anything.
    pub async fn start_voting(
        &self,
        player: PlayerId,
        raw_code: &str,
    ) -> Result<(), CoordinatorError> {
        let code = parse_code(raw_code)?;
        let mut lobby = self.lobby.lock().await;
        let game = lobby.game_for(&code, player)?;
        if game.start_voting(player)? {
            let event = voting_started(game);
            tracing::info!(%code, %player, round = game.round(), "voting started on request");
            self.announce(&lobby, &code, &event);
        }
        Ok(())
    }

    /// Records a ballot.
    ///
    /// Tallying is not done here. When the ballot completes the round,
    /// the receipt carries a [`RoundTicket`]; pass it to
    /// [`schedule_resolution`](Self::schedule_resolution) after the
    /// voter has been acknowledged.
    pub async fn vote(
        &self,
        player: PlayerId,
        raw_code: &str,
        target: Option<PlayerId>,
    ) -> Result<VoteReceipt, CoordinatorError> {
        let code = parse_code(raw_code)?;
        let target = target
            .ok_or_else(|| CoordinatorError::BadRequest("votedPlayerId is required".into()))?;
        let mut lobby = self.lobby.lock().await;
        let game = lobby.game_for(&code, player)?;
        let accepted = game.record_vote(player, target)?;

        let progress = VoteProgress {
            votes_cast: game.votes_cast(),
            votes_required: game.votes_required(),
        };
        let ticket = accepted.round_complete.then(|| RoundTicket {
            code: code.clone(),
            session: game.id(),
        });
        let promoted = accepted.promoted.then(|| voting_started(game));
        let update = players_update(game);
        tracing::debug!(
            %code,
            %player,
            cast = progress.votes_cast,
            required = progress.votes_required,
            "vote recorded"
        );

        if let Some(event) = promoted {
            tracing::info!(%code, "voting opened by an early ballot");
            self.announce(&lobby, &code, &event);
        }
        self.broadcaster.emit_to_room(&code, &update);
        Ok(VoteReceipt { progress, ticket })
    }

    /// Resolves the ticket's round on a fresh task.
    pub fn schedule_resolution(self: &Arc<Self>, ticket: RoundTicket) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            this.maybe_resolve_round(&ticket).await;
        });
    }

    /// Tallies the ticket's round if it is still the current, complete
    /// round. Safe to call any number of times; only the first call that
    /// finds the round complete does anything.
    ///
    /// Returns whether this call resolved the round.
    pub async fn maybe_resolve_round(&self, ticket: &RoundTicket) -> bool {
        let mut lobby = self.lobby.lock().await;
        if !lobby.is_current(&ticket.code, ticket.session) {
            return false;
        }
        let Ok(game) = lobby.game_mut(&ticket.code) else {
            return false;
        };
        let Some(result) = game.resolve_round() else {
            return false;
        };
        let finished = game.finished_data().cloned();

        tracing::info!(
            code = %ticket.code,
            round = result.round,
            discovered = result.tally.impostor_discovered,
            phase = %result.phase,
            "round resolved"
        );
        self.announce(&lobby, &ticket.code, &ServerEvent::VoteResult(result));
        if let Some(data) = finished {
            self.announce(&lobby, &ticket.code, &ServerEvent::Finished(data));
        }
        true
    }

    /// Starts another discussion after the results screen.
    pub async fn next_round(
        self: &Arc<Self>,
        player: PlayerId,
        raw_code: &str,
    ) -> Result<(), CoordinatorError> {
        let code = parse_code(raw_code)?;
        let mut lobby = self.lobby.lock().await;
        let game = lobby.game_for(&code, player)?;
        let ends_at = game.begin_next_round(now_ms())?;
        let event = discussion_started(game, ends_at);
        let (session, round, seconds) = (game.id(), game.round(), game.discussion_seconds());

        tracing::info!(%code, round, "next round");
        self.announce(&lobby, &code, &event);
        drop(lobby);
        self.schedule_deadline(code, session, round, seconds);
        Ok(())
    }

    fn schedule_deadline(
        self: &Arc<Self>,
        code: RoomCode,
        session: SessionId,
        round: u32,
        seconds: u32,
    ) {
        if !self.config.auto_start_voting {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(u64::from(seconds))).await;
            this.expire_discussion(&code, session, round).await;
        });
    }

    async fn expire_discussion(&self, code: &RoomCode, session: SessionId, round: u32) {
        let mut lobby = self.lobby.lock().await;
        if !lobby.is_current(code, session) {
            return;
        }
        let Ok(game) = lobby.game_mut(code) else {
            return;
        };
        if game.expire_discussion(round) {
            let event = voting_started(game);
            tracing::info!(%code, round, "discussion time is up");
            self.announce(&lobby, code, &event);
        }
    }

    /// Sends a phase broadcast to the room and, when configured, once
    /// more to each member directly.
    fn announce(&self, lobby: &Lobby, code: &RoomCode, event: &ServerEvent) {
        self.broadcaster.emit_to_room(code, event);
        if !self.config.redundant_broadcast {
            return;
        }
        if let Ok(room) = lobby.rooms.get(code) {
            for member in room.players() {
                self.broadcaster.emit_to_player(member.id, event);
            }
        }
    }
}

fn players_update(game: &GameSession) -> ServerEvent {
    ServerEvent::PlayersUpdate(PlayersUpdate {
        players: game.public_players(),
        votes_cast: game.votes_cast(),
        votes_required: game.votes_required(),
    })
}

fn discussion_started(game: &GameSession, ends_at: u64) -> ServerEvent {
    ServerEvent::DiscussionStarted(DiscussionStarted {
        ends_at,
        duration: game.discussion_seconds(),
        round: game.round(),
    })
}

fn voting_started(game: &GameSession) -> ServerEvent {
    ServerEvent::VotingStarted(VotingStarted {
        players: game.public_players(),
        round: game.round(),
    })
}

fn parse_code(raw: &str) -> Result<RoomCode, CoordinatorError> {
    RoomCode::parse(raw).ok_or(CoordinatorError::Room(RoomError::CodeRequired))
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
