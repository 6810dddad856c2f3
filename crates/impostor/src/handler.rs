//! Per-connection handler: outbound writer, inbound dispatch, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbound queue with the hub and spawn the writer
//!   2. Push `connected { playerId }`
//!   3. Loop: receive envelopes → dispatch to the coordinator → queue the ack
//!   4. On close or idle timeout, leave the room and drop the queue

use std::sync::Arc;
use std::time::Instant;

use impostor_protocol::{Codec, Envelope, PlayerId, Reply};
use impostor_transport::{Connection, WebSocketConnection};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::ImpostorError;
use crate::coordinator::RoundTicket;
use crate::events::{AckData, ClientEvent, ServerEvent};
use crate::packs::WordPackSource;
use crate::server::ServerState;
use crate::{Broadcaster, CoordinatorError};

/// Drop guard that takes a player out of their room when the handler
/// exits, panics included. `Drop` is synchronous, so the async cleanup
/// runs on a fire-and-forget task.
struct ConnectionGuard<W: WordPackSource> {
    player_id: PlayerId,
    state: Arc<ServerState<W>>,
}

impl<W: WordPackSource> Drop for ConnectionGuard<W> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.coordinator.disconnect(player_id).await;
            state.hub.unregister(player_id);
        });
    }
}

/// Just enough of a frame to acknowledge it when the rest is garbage.
#[derive(Deserialize)]
struct SeqOnly {
    seq: u64,
}

/// What a successfully dispatched request produced.
struct Handled {
    data: Option<AckData>,
    ticket: Option<RoundTicket>,
}

impl Handled {
    fn done() -> Self {
        Self {
            data: None,
            ticket: None,
        }
    }

    fn with(data: AckData) -> Self {
        Self {
            data: Some(data),
            ticket: None,
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<W: WordPackSource>(
    conn: WebSocketConnection,
    state: Arc<ServerState<W>>,
) -> Result<(), ImpostorError> {
    let conn = Arc::new(conn);
    let player_id = PlayerId(conn.id().get());
    tracing::debug!(conn_id = %conn.id(), %player_id, "handling new connection");

    let outbox = state.hub.register(player_id);
    let _guard = ConnectionGuard {
        player_id,
        state: Arc::clone(&state),
    };
    tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), outbox));
    state
        .hub
        .emit_to_player(player_id, &ServerEvent::Connected { player_id });

    let idle_timeout = state.config.idle_timeout();
    loop {
        let data = match tokio::time::timeout(idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "connection timed out");
                break;
            }
        };

        let envelope: Envelope<ClientEvent> = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                if let Ok(frame) = state.codec.decode::<SeqOnly>(&data) {
                    let err = CoordinatorError::BadRequest(e.to_string());
                    ack(&state, player_id, frame.seq, Err(err));
                }
                continue;
            }
        };

        let seq = envelope.seq;
        let event = envelope.payload;
        let name = event.name();
        let result = dispatch(&state, player_id, event).await;
        if let Err(e) = &result {
            tracing::debug!(%player_id, event = name, error = %e, "request rejected");
        }

        // The ack is queued before any deferred work can emit, so the
        // client always sees it first.
        let ticket = result.as_ref().ok().and_then(|h| h.ticket.clone());
        ack(&state, player_id, seq, result.map(|h| h.data));
        if let Some(ticket) = ticket {
            state.coordinator.schedule_resolution(ticket);
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%player_id, error = %e, "close failed");
    }
    // _guard drops here → room cleanup fires.
    Ok(())
}

/// Drains the player's outbound queue onto the socket.
async fn write_loop<W: WordPackSource>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<W>>,
    mut outbox: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let start = Instant::now();
    let mut seq: u64 = 1;

    while let Some(event) = outbox.recv().await {
        let envelope = Envelope::new(next_seq(&mut seq), start.elapsed().as_millis() as u64, event);
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Routes one request to the coordinator.
async fn dispatch<W: WordPackSource>(
    state: &Arc<ServerState<W>>,
    player_id: PlayerId,
    event: ClientEvent,
) -> Result<Handled, CoordinatorError> {
    let coordinator = &state.coordinator;
    let handled = match event {
        ClientEvent::CreateRoom { name, settings } => {
            let room = coordinator.create_room(player_id, &name, settings).await?;
            Handled::with(AckData::Room(room))
        }
        ClientEvent::JoinRoom { code, name } => {
            let room = coordinator.join_room(player_id, &code, &name).await?;
            Handled::with(AckData::Room(room))
        }
        ClientEvent::RoomInfo { code } => {
            Handled::with(AckData::Room(coordinator.room_info(&code).await?))
        }
        ClientEvent::LeaveRoom => {
            coordinator.leave_room(player_id).await?;
            Handled::done()
        }
        ClientEvent::StartGame(request) => {
            let view = coordinator.start_game(player_id, request).await?;
            Handled::with(AckData::Game(view))
        }
        ClientEvent::GameState { code } => {
            Handled::with(AckData::Game(coordinator.game_state(player_id, &code).await?))
        }
        ClientEvent::RevealComplete { code } => {
            coordinator.reveal_complete(player_id, &code).await?;
            Handled::done()
        }
        ClientEvent::Vote {
            code,
            voted_player_id,
        } => {
            let receipt = coordinator.vote(player_id, &code, voted_player_id).await?;
            Handled {
                data: Some(AckData::Vote(receipt.progress)),
                ticket: receipt.ticket,
            }
        }
        ClientEvent::StartVoting { code } => {
            coordinator.start_voting(player_id, &code).await?;
            Handled::done()
        }
        ClientEvent::NewGame { code } => {
            Handled::with(AckData::Game(coordinator.new_game(player_id, &code).await?))
        }
        ClientEvent::NextRound { code } => {
            coordinator.next_round(player_id, &code).await?;
            Handled::done()
        }
        ClientEvent::Ping => Handled::with(AckData::Pong),
    };
    Ok(handled)
}

/// Queues the acknowledgement for request `seq`.
fn ack<W: WordPackSource>(
    state: &ServerState<W>,
    player_id: PlayerId,
    seq: u64,
    result: Result<Option<AckData>, CoordinatorError>,
) {
    let reply = match result {
        Ok(Some(data)) => Reply::success(data),
        Ok(None) => Reply::done(),
        Err(e) => Reply::failure(e.code(), e.phase()),
    };
    state.hub.emit_to_player(
        player_id,
        &ServerEvent::Ack {
            reply_to: seq,
            reply,
        },
    );
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
