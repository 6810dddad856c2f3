//! Coordinator tests: rooms, game start policies, voting and deferred work.
//!
//! Events are observed through a real `ConnectionHub` with one inbox per
//! player, the same path the WebSocket handler uses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use impostor::prelude::*;
use impostor::events::PlayersUpdate;
use impostor::{RoundTicket, VoteReceipt};
use impostor_game::SessionId;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

type Coordinator = SessionCoordinator<ConnectionHub, InMemoryWordPacks>;

fn packs() -> InMemoryWordPacks {
    InMemoryWordPacks::new(vec![
        WordPack {
            id: "food".into(),
            name: "Comida".into(),
            words: vec!["Pizza".into()],
            locale: "en".into(),
            slug: "food".into(),
        },
        WordPack {
            id: "blank".into(),
            name: "Blank".into(),
            words: vec![],
            locale: "en".into(),
            slug: "blank".into(),
        },
    ])
}

fn quiet_config() -> GameConfig {
    GameConfig {
        redundant_broadcast: false,
        auto_start_voting: false,
        // Roles arrive well after any real-time test finishes.
        role_reveal_delay_ms: 60_000,
        ..GameConfig::default()
    }
}

fn food() -> StartGameRequest {
    StartGameRequest {
        pack_id: Some("food".into()),
        ..StartGameRequest::default()
    }
}

struct Table {
    coordinator: Arc<Coordinator>,
    hub: Arc<ConnectionHub>,
    inboxes: HashMap<PlayerId, mpsc::UnboundedReceiver<ServerEvent>>,
}

impl Table {
    fn new(config: GameConfig) -> Self {
        let hub = Arc::new(ConnectionHub::new());
        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::clone(&hub),
            Arc::new(packs()),
            config,
        ));
        Self {
            coordinator,
            hub,
            inboxes: HashMap::new(),
        }
    }

    fn connect(&mut self, id: u64) -> PlayerId {
        let player = PlayerId(id);
        let inbox = self.hub.register(player);
        self.inboxes.insert(player, inbox);
        player
    }

    /// Creates a room hosted by player 1 and joins players 2..=n.
    async fn seat(&mut self, n: u64) -> (RoomCode, Vec<PlayerId>) {
        let players: Vec<_> = (1..=n).map(|i| self.connect(i)).collect();
        let room = self
            .coordinator
            .create_room(players[0], "P1", None)
            .await
            .unwrap();
        let code = room.code().clone();
        for p in &players[1..] {
            self.coordinator
                .join_room(*p, code.as_str(), &format!("P{}", p.0))
                .await
                .unwrap();
        }
        for p in &players {
            self.drain(*p);
        }
        (code, players)
    }

    /// Seats `n` players, starts a game and confirms every reveal.
    async fn in_discussion(&mut self, n: u64) -> (RoomCode, Vec<PlayerId>) {
        let (code, players) = self.seat(n).await;
        self.coordinator.start_game(players[0], food()).await.unwrap();
        for p in &players {
            self.coordinator
                .reveal_complete(*p, code.as_str())
                .await
                .unwrap();
        }
        for p in &players {
            self.drain(*p);
        }
        (code, players)
    }

    fn drain(&mut self, player: PlayerId) -> Vec<ServerEvent> {
        let inbox = self.inboxes.get_mut(&player).expect("player connected");
        let mut events = Vec::new();
        while let Ok(event) = inbox.try_recv() {
            events.push(event);
        }
        events
    }

    fn names(&mut self, player: PlayerId) -> Vec<&'static str> {
        self.drain(player).iter().map(ServerEvent::name).collect()
    }

    async fn role_of(&self, code: &RoomCode, player: PlayerId) -> Role {
        self.coordinator
            .game_state(player, code.as_str())
            .await
            .unwrap()
            .me
            .expect("participant sees own role")
            .role
    }

    /// Splits players into (civilians, impostors).
    async fn sides(&self, code: &RoomCode, players: &[PlayerId]) -> (Vec<PlayerId>, Vec<PlayerId>) {
        let mut civilians = Vec::new();
        let mut impostors = Vec::new();
        for p in players {
            match self.role_of(code, *p).await {
                Role::Civilian => civilians.push(*p),
                Role::Impostor => impostors.push(*p),
            }
        }
        (civilians, impostors)
    }
}

fn error_code(err: &CoordinatorError) -> ErrorCode {
    err.code()
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_create_room_makes_creator_host_and_original_host() {
    let mut table = Table::new(quiet_config());
    let p1 = table.connect(1);
    let room = table.coordinator.create_room(p1, "Ana", None).await.unwrap();

    assert_eq!(room.host_id(), p1);
    assert_eq!(room.original_host_id(), p1);
    assert_eq!(room.players().len(), 1);
    assert_eq!(room.settings(), &RoomSettings::default());
}

#[tokio::test]
async fn test_create_room_requires_name() {
    let mut table = Table::new(quiet_config());
    let p1 = table.connect(1);
    let err = table.coordinator.create_room(p1, "   ", None).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NameRequired);
}

#[tokio::test]
async fn test_join_room_broadcasts_room_updated() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(1).await;
    let p2 = table.connect(2);

    let room = table
        .coordinator
        .join_room(p2, &code.as_str().to_lowercase(), "Bruno")
        .await
        .unwrap();
    assert_eq!(room.players().len(), 2);

    let host_events = table.drain(players[0]);
    assert!(matches!(&host_events[..], [ServerEvent::RoomUpdated(r)] if r.players().len() == 2));
}

#[tokio::test]
async fn test_join_room_rejoin_keeps_stored_name() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(2).await;

    let room = table
        .coordinator
        .join_room(players[1], code.as_str(), "Impersonator")
        .await
        .unwrap();
    assert_eq!(room.member(players[1]).unwrap().name, "P2");
    assert!(table.drain(players[0]).is_empty());
}

#[tokio::test]
async fn test_join_room_rejects_bad_requests() {
    let mut table = Table::new(quiet_config());
    let (code, _) = table.seat(1).await;
    let p9 = table.connect(9);

    let err = table.coordinator.join_room(p9, "", "Zoe").await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::CodeRequired);

    let err = table.coordinator.join_room(p9, "ZZZZZZ", "Zoe").await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::RoomNotFound);

    let err = table.coordinator.join_room(p9, code.as_str(), " ").await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NameRequired);
}

#[tokio::test]
async fn test_join_room_full() {
    let mut table = Table::new(quiet_config());
    let p1 = table.connect(1);
    let settings = RoomSettings {
        max_players: 3,
        ..RoomSettings::default()
    };
    let room = table.coordinator.create_room(p1, "Ana", Some(settings)).await.unwrap();
    for i in 2..=3 {
        let p = table.connect(i);
        table.coordinator.join_room(p, room.code().as_str(), "x").await.unwrap();
    }
    let p4 = table.connect(4);
    let err = table
        .coordinator
        .join_room(p4, room.code().as_str(), "Dan")
        .await
        .unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::RoomFull);
}

#[tokio::test]
async fn test_join_other_room_leaves_previous_and_migrates_host() {
    let mut table = Table::new(quiet_config());
    let (first, players) = table.seat(2).await;
    let p3 = table.connect(3);
    let second = table.coordinator.create_room(p3, "Carla", None).await.unwrap();

    table
        .coordinator
        .join_room(players[0], second.code().as_str(), "P1")
        .await
        .unwrap();

    let first_room = table.coordinator.room_info(first.as_str()).await.unwrap();
    assert_eq!(first_room.host_id(), players[1]);
    assert_eq!(first_room.original_host_id(), players[0]);
    assert!(!first_room.contains(players[0]));
    assert_eq!(table.names(players[1]), vec!["room:updated"]);
}

#[tokio::test]
async fn test_leave_room_last_member_destroys_room_and_game() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(3).await;
    table.coordinator.start_game(players[0], food()).await.unwrap();

    for p in &players {
        table.coordinator.leave_room(*p).await.unwrap();
    }

    let err = table.coordinator.room_info(code.as_str()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::RoomNotFound);
    let err = table.coordinator.game_state(players[0], code.as_str()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::GameNotFound);
}

#[tokio::test]
async fn test_leave_room_when_not_in_one() {
    let mut table = Table::new(quiet_config());
    let p1 = table.connect(1);
    let err = table.coordinator.leave_room(p1).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotInRoom);
}

// =========================================================================
// Starting games
// =========================================================================

#[tokio::test]
async fn test_start_game_with_two_players_is_rejected() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(2).await;

    let err = table.coordinator.start_game(players[0], food()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotEnoughPlayers);

    let err = table.coordinator.game_state(players[0], code.as_str()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::GameNotFound);
}

#[tokio::test]
async fn test_start_game_by_non_host_is_rejected_and_settings_unchanged() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(3).await;
    let before = table.coordinator.room_info(code.as_str()).await.unwrap();

    let request = StartGameRequest {
        discussion_seconds: Some(30),
        ..food()
    };
    let err = table.coordinator.start_game(players[1], request).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotHost);

    let after = table.coordinator.room_info(code.as_str()).await.unwrap();
    assert_eq!(before.settings(), after.settings());
    assert!(table.names(players[0]).is_empty());
}

#[tokio::test]
async fn test_start_game_outside_a_room() {
    let mut table = Table::new(quiet_config());
    let p1 = table.connect(1);
    let err = table.coordinator.start_game(p1, food()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::RoomNotFound);
}

#[tokio::test]
async fn test_start_game_with_empty_pack_leaves_room_restartable() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(3).await;

    let request = StartGameRequest {
        pack_id: Some("blank".into()),
        discussion_seconds: Some(30),
        ..StartGameRequest::default()
    };
    let err = table.coordinator.start_game(players[0], request).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::PackInvalid);
    let room = table.coordinator.room_info(code.as_str()).await.unwrap();
    assert_eq!(room.settings().discussion_seconds, 120);

    let view = table.coordinator.start_game(players[0], food()).await.unwrap();
    assert_eq!(view.phase, Phase::Revealing);
}

#[tokio::test]
async fn test_start_game_with_too_many_impostors_is_rejected() {
    let mut table = Table::new(quiet_config());
    let (_, players) = table.seat(3).await;
    let request = StartGameRequest {
        impostor_count: Some(3),
        ..food()
    };
    let err = table.coordinator.start_game(players[0], request).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotEnoughPlayers);
}

#[tokio::test]
async fn test_start_game_commits_settings_and_deals_roles() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(4).await;
    let request = StartGameRequest {
        impostor_count: Some(2),
        discussion_seconds: Some(45),
        ..food()
    };

    let view = table.coordinator.start_game(players[0], request).await.unwrap();
    assert_eq!(view.impostor_count, 2);
    assert_eq!(view.players.len(), 4);
    assert!(view.me.is_some());

    let room = table.coordinator.room_info(code.as_str()).await.unwrap();
    assert_eq!(room.settings().discussion_seconds, 45);
    assert_eq!(room.settings().selected_word_pack_ids, vec!["food".to_string()]);

    let (civilians, impostors) = table.sides(&code, &players).await;
    assert_eq!(civilians.len(), 2);
    assert_eq!(impostors.len(), 2);
    for p in &players {
        assert_eq!(table.names(*p), vec!["game:started"]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_game_delivers_private_roles_after_delay() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(3).await;
    table.coordinator.start_game(players[0], food()).await.unwrap();
    for p in &players {
        assert_eq!(table.names(*p), vec!["game:started"]);
    }

    tokio::time::sleep(Duration::from_millis(60_001)).await;

    for p in &players {
        let events = table.drain(*p);
        let [ServerEvent::Role(card)] = &events[..] else {
            panic!("expected exactly one private role, got {events:?}");
        };
        match table.role_of(&code, *p).await {
            Role::Civilian => assert_eq!(card.word.as_deref(), Some("Pizza")),
            Role::Impostor => assert_eq!(card.word.as_deref(), Some("Comida")),
        }
    }
}

#[tokio::test]
async fn test_start_game_without_hint_gives_impostor_no_word() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(3).await;
    let request = StartGameRequest {
        hint_for_impostors: Some(false),
        ..food()
    };
    table.coordinator.start_game(players[0], request).await.unwrap();

    let (_, impostors) = table.sides(&code, &players).await;
    let view = table.coordinator.game_state(impostors[0], code.as_str()).await.unwrap();
    assert_eq!(view.me.unwrap().word, None);
}

#[tokio::test]
async fn test_new_game_requires_original_host() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(4).await;
    table.coordinator.start_game(players[0], food()).await.unwrap();

    // Host leaves; hosting migrates to P2, who still cannot rematch.
    table.coordinator.leave_room(players[0]).await.unwrap();
    let err = table.coordinator.new_game(players[1], code.as_str()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotOriginalHost);

    // Outside the room the creator cannot rematch either.
    let err = table.coordinator.new_game(players[0], code.as_str()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotInRoom);

    table
        .coordinator
        .join_room(players[0], code.as_str(), "P1")
        .await
        .unwrap();
    let view = table.coordinator.new_game(players[0], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::Revealing);
    assert_eq!(view.players.len(), 4);
}

#[tokio::test]
async fn test_migrated_host_cannot_replace_running_game_with_start() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(4).await;
    table.coordinator.start_game(players[0], food()).await.unwrap();
    table.coordinator.leave_room(players[0]).await.unwrap();
    for p in &players[1..] {
        table.coordinator.reveal_complete(*p, code.as_str()).await.unwrap();
    }

    let err = table.coordinator.start_game(players[1], food()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotOriginalHost);

    // The running game is untouched.
    let view = table.coordinator.game_state(players[1], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::Revealing);
    assert_eq!(view.players.len(), 4);
    let seen: Vec<_> = view
        .players
        .iter()
        .filter(|p| p.has_seen_role)
        .map(|p| p.id)
        .collect();
    assert_eq!(seen, players[1..].to_vec());
}

#[tokio::test]
async fn test_original_host_may_restart_with_start() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(3).await;

    let view = table.coordinator.start_game(players[0], food()).await.unwrap();
    assert_eq!(view.phase, Phase::Revealing);
    assert_eq!(view.round, 1);
    let state = table.coordinator.game_state(players[1], code.as_str()).await.unwrap();
    assert!(state.players.iter().all(|p| !p.has_seen_role));
}

#[tokio::test]
async fn test_new_game_needs_three_players() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(3).await;
    table.coordinator.start_game(players[0], food()).await.unwrap();
    table.coordinator.leave_room(players[2]).await.unwrap();

    let err = table.coordinator.new_game(players[0], code.as_str()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotEnoughPlayers);
}

// =========================================================================
// Reveal and discussion
// =========================================================================

#[tokio::test]
async fn test_reveal_complete_last_confirmation_starts_discussion() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(3).await;
    table.coordinator.start_game(players[0], food()).await.unwrap();
    table.drain(players[0]);

    table.coordinator.reveal_complete(players[0], code.as_str()).await.unwrap();
    table.coordinator.reveal_complete(players[1], code.as_str()).await.unwrap();
    assert_eq!(
        table.names(players[0]),
        vec!["game:players-update", "game:players-update"]
    );

    table.coordinator.reveal_complete(players[2], code.as_str()).await.unwrap();
    let events = table.drain(players[0]);
    assert_eq!(events[0].name(), "game:players-update");
    let ServerEvent::DiscussionStarted(started) = &events[1] else {
        panic!("expected discussion start, got {events:?}");
    };
    assert_eq!(started.duration, 120);
    assert_eq!(started.round, 1);

    let view = table.coordinator.game_state(players[0], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::Discussion);
    assert_eq!(view.discussion_ends_at, Some(started.ends_at));

    // Repeats after the reveal change nothing.
    table.coordinator.reveal_complete(players[2], code.as_str()).await.unwrap();
    assert!(table.drain(players[0]).is_empty());
}

#[tokio::test]
async fn test_reveal_complete_by_outsider_is_rejected() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(3).await;
    table.coordinator.start_game(players[0], food()).await.unwrap();
    let p9 = table.connect(9);

    let err = table.coordinator.reveal_complete(p9, code.as_str()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::PlayerNotInGame);
}

#[tokio::test(start_paused = true)]
async fn test_discussion_deadline_opens_voting() {
    let config = GameConfig {
        auto_start_voting: true,
        ..quiet_config()
    };
    let mut table = Table::new(config);
    let (code, players) = table.seat(3).await;
    let request = StartGameRequest {
        discussion_seconds: Some(30),
        ..food()
    };
    table.coordinator.start_game(players[0], request).await.unwrap();
    for p in &players {
        table.coordinator.reveal_complete(*p, code.as_str()).await.unwrap();
    }
    table.drain(players[0]);

    tokio::time::sleep(Duration::from_secs(29)).await;
    let view = table.coordinator.game_state(players[0], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::Discussion);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let view = table.coordinator.game_state(players[0], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::Voting);
    let names = table.names(players[0]);
    assert!(names.contains(&"game:voting-started"), "{names:?}");
}

#[tokio::test(start_paused = true)]
async fn test_discussion_deadline_from_replaced_game_is_ignored() {
    let config = GameConfig {
        auto_start_voting: true,
        ..quiet_config()
    };
    let mut table = Table::new(config);
    let (code, players) = table.in_discussion(3).await;

    table.coordinator.new_game(players[0], code.as_str()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(121)).await;

    let view = table.coordinator.game_state(players[0], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::Revealing);
}

#[tokio::test]
async fn test_start_voting_reports_actual_phase_when_rejected() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.seat(3).await;
    table.coordinator.start_game(players[0], food()).await.unwrap();

    let err = table.coordinator.start_voting(players[1], code.as_str()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotDiscussionPhase);
    assert_eq!(err.phase(), Some(Phase::Revealing));
}

#[tokio::test]
async fn test_start_voting_open_to_civilians_only() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(3).await;
    let (civilians, impostors) = table.sides(&code, &players).await;

    // The impostor gets the same ok reply, but discussion goes on.
    table.coordinator.start_voting(impostors[0], code.as_str()).await.unwrap();
    assert!(table.drain(players[0]).is_empty());
    let view = table.coordinator.game_state(players[0], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::Discussion);

    table.coordinator.start_voting(civilians[1], code.as_str()).await.unwrap();
    assert_eq!(table.names(players[0]), vec!["game:voting-started"]);

    // Asking again is harmless and silent.
    table.coordinator.start_voting(civilians[0], code.as_str()).await.unwrap();
    assert!(table.drain(players[0]).is_empty());
}

// =========================================================================
// Voting
// =========================================================================

#[tokio::test]
async fn test_vote_during_discussion_promotes_to_voting() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(4).await;

    let receipt = table
        .coordinator
        .vote(players[0], code.as_str(), Some(players[1]))
        .await
        .unwrap();
    assert!(receipt.ticket.is_none());

    let view = table.coordinator.game_state(players[0], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::Voting);
    assert_eq!(
        table.names(players[2]),
        vec!["game:voting-started", "game:players-update"]
    );
}

#[tokio::test]
async fn test_vote_requires_target() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(3).await;
    let err = table.coordinator.vote(players[0], code.as_str(), None).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::BadRequest);

    let err = table
        .coordinator
        .vote(players[0], code.as_str(), Some(PlayerId(99)))
        .await
        .unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::InvalidTarget);
}

#[tokio::test]
async fn test_vote_in_any_order_resolves_exactly_once() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(3).await;
    let (civilians, impostors) = table.sides(&code, &players).await;
    let impostor = impostors[0];

    // Impostor first, then a civilian changes their mind.
    let receipt = table
        .coordinator
        .vote(impostor, code.as_str(), Some(civilians[0]))
        .await
        .unwrap();
    assert_eq!(receipt.progress.votes_cast, 1);
    table
        .coordinator
        .vote(civilians[0], code.as_str(), Some(civilians[1]))
        .await
        .unwrap();
    table
        .coordinator
        .vote(civilians[0], code.as_str(), Some(impostor))
        .await
        .unwrap();
    let VoteReceipt { progress, ticket } = table
        .coordinator
        .vote(civilians[1], code.as_str(), Some(impostor))
        .await
        .unwrap();
    assert_eq!(progress.votes_cast, 3);
    assert_eq!(progress.votes_required, 2);
    let ticket = ticket.expect("last civilian ballot completes the round");

    table.drain(players[0]);
    assert!(table.coordinator.maybe_resolve_round(&ticket).await);
    assert!(!table.coordinator.maybe_resolve_round(&ticket).await);

    let events = table.drain(players[0]);
    let names: Vec<_> = events.iter().map(ServerEvent::name).collect();
    assert_eq!(names, vec!["game:vote-result", "game:finished"]);
    let ServerEvent::VoteResult(result) = &events[0] else {
        unreachable!()
    };
    assert!(result.tally.impostor_discovered);
    assert_eq!(result.tally.vote_counts.get(&impostor), Some(&2));
    let ServerEvent::Finished(finished) = &events[1] else {
        unreachable!()
    };
    assert_eq!(finished.winner, Team::Civilians);
    assert_eq!(finished.secret_word, "Pizza");

    let err = table
        .coordinator
        .vote(civilians[0], code.as_str(), Some(impostor))
        .await
        .unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::GameFinished);
    assert_eq!(err.phase(), Some(Phase::Finished));
}

fn last_players_update(events: Vec<ServerEvent>) -> PlayersUpdate {
    events
        .into_iter()
        .rev()
        .find_map(|e| match e {
            ServerEvent::PlayersUpdate(update) => Some(update),
            _ => None,
        })
        .expect("a players update was sent")
}

#[tokio::test]
async fn test_impostor_ballot_is_reported_like_a_civilian_ballot() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(4).await;
    let (civilians, impostors) = table.sides(&code, &players).await;
    let observer = civilians[2];

    table
        .coordinator
        .vote(impostors[0], code.as_str(), Some(civilians[0]))
        .await
        .unwrap();
    let update = last_players_update(table.drain(observer));
    let voted: Vec<_> = update.players.iter().filter(|p| p.has_voted).map(|p| p.id).collect();
    assert_eq!(voted, vec![impostors[0]]);
    assert_eq!(update.votes_cast, 1);
    assert_eq!(update.votes_required, 3);

    table
        .coordinator
        .vote(civilians[0], code.as_str(), Some(impostors[0]))
        .await
        .unwrap();
    let update = last_players_update(table.drain(observer));
    assert_eq!(update.players.iter().filter(|p| p.has_voted).count(), 2);
    assert_eq!(update.votes_cast, 2);
    assert_eq!(update.votes_required, 3);
}

#[tokio::test]
async fn test_split_vote_then_next_round() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(3).await;
    let (civilians, _) = table.sides(&code, &players).await;

    table
        .coordinator
        .vote(civilians[0], code.as_str(), Some(civilians[1]))
        .await
        .unwrap();
    let receipt = table
        .coordinator
        .vote(civilians[1], code.as_str(), Some(civilians[0]))
        .await
        .unwrap();
    assert!(table.coordinator.maybe_resolve_round(&receipt.ticket.unwrap()).await);

    let view = table.coordinator.game_state(players[0], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::VoteResults);
    assert!(!view.last_result.as_ref().unwrap().tally.impostor_discovered);
    assert!(view.eliminated_players.is_empty());
    table.drain(players[0]);

    table.coordinator.next_round(players[2], code.as_str()).await.unwrap();
    let events = table.drain(players[0]);
    assert!(matches!(&events[..], [ServerEvent::DiscussionStarted(d)] if d.round == 2));

    let view = table.coordinator.game_state(players[0], code.as_str()).await.unwrap();
    assert_eq!(view.phase, Phase::Discussion);
    assert_eq!(view.votes_cast, 0);

    let err = table.coordinator.next_round(players[0], code.as_str()).await.unwrap_err();
    assert_eq!(error_code(&err), ErrorCode::NotResultsPhase);
}

#[tokio::test]
async fn test_stale_ticket_after_new_game_is_a_no_op() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(3).await;
    let (civilians, impostors) = table.sides(&code, &players).await;

    table
        .coordinator
        .vote(civilians[0], code.as_str(), Some(impostors[0]))
        .await
        .unwrap();
    let receipt = table
        .coordinator
        .vote(civilians[1], code.as_str(), Some(impostors[0]))
        .await
        .unwrap();
    let ticket = receipt.ticket.unwrap();

    table.coordinator.new_game(players[0], code.as_str()).await.unwrap();
    assert!(!table.coordinator.maybe_resolve_round(&ticket).await);

    let forged = RoundTicket {
        code: code.clone(),
        session: SessionId(999),
    };
    assert!(!table.coordinator.maybe_resolve_round(&forged).await);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_resolution_runs_after_caller_returns() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(3).await;
    let (civilians, impostors) = table.sides(&code, &players).await;

    table
        .coordinator
        .vote(civilians[0], code.as_str(), Some(impostors[0]))
        .await
        .unwrap();
    let receipt = table
        .coordinator
        .vote(civilians[1], code.as_str(), Some(impostors[0]))
        .await
        .unwrap();
    let ticket = receipt.ticket.unwrap();

    table.coordinator.schedule_resolution(ticket.clone());
    table.coordinator.schedule_resolution(ticket);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let names = table.names(players[0]);
    let results = names.iter().filter(|n| **n == "game:vote-result").count();
    assert_eq!(results, 1, "{names:?}");
}

#[tokio::test]
async fn test_disconnected_civilian_still_required_to_vote() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(4).await;
    let (civilians, impostors) = table.sides(&code, &players).await;

    table.coordinator.disconnect(civilians[2]).await;
    table
        .coordinator
        .vote(civilians[0], code.as_str(), Some(impostors[0]))
        .await
        .unwrap();
    let receipt = table
        .coordinator
        .vote(civilians[1], code.as_str(), Some(impostors[0]))
        .await
        .unwrap();
    assert!(receipt.ticket.is_none());
    assert_eq!(receipt.progress.votes_required, 3);
}

// =========================================================================
// Broadcast policy
// =========================================================================

#[tokio::test]
async fn test_redundant_broadcast_sends_phase_events_twice() {
    let config = GameConfig {
        redundant_broadcast: true,
        ..quiet_config()
    };
    let mut table = Table::new(config);
    let (_, players) = table.seat(3).await;
    table.coordinator.start_game(players[0], food()).await.unwrap();

    for p in &players {
        assert_eq!(table.names(*p), vec!["game:started", "game:started"]);
    }
}

#[tokio::test]
async fn test_game_state_hides_other_players_roles() {
    let mut table = Table::new(quiet_config());
    let (code, players) = table.in_discussion(3).await;
    let p9 = table.connect(9);

    let view = table.coordinator.game_state(p9, code.as_str()).await.unwrap();
    assert!(view.me.is_none());
    assert!(view.finished_data.is_none());
    assert_eq!(view.players.len(), players.len());
}
