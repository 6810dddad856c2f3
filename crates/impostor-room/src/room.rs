//! A single room: its members, host identities and settings.

use impostor_protocol::{PlayerId, RoomCode};
use serde::{Deserialize, Serialize};

use crate::RoomSettings;

/// A member of a room as everyone else sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    pub id: PlayerId,
    pub name: String,
}

/// A lobby grouping players before and around a game.
///
/// Invariants, kept by [`RoomRegistry`](crate::RoomRegistry):
/// - `players` is never empty while the room is registered.
/// - `host_id` is always one of `players`.
/// - `original_host_id` is fixed at creation and may name a player who
///   has since left.
///
/// Serializes in the camelCase shape clients receive in `room:updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    code: RoomCode,
    host_id: PlayerId,
    original_host_id: PlayerId,
    players: Vec<RoomMember>,
    settings: RoomSettings,
    created_at: u64,
}

impl Room {
    pub(crate) fn new(
        code: RoomCode,
        host: RoomMember,
        settings: RoomSettings,
        created_at: u64,
    ) -> Self {
        Self {
            code,
            host_id: host.id,
            original_host_id: host.id,
            players: vec![host],
            settings,
            created_at,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// The player currently allowed to start the first game.
    pub fn host_id(&self) -> PlayerId {
        self.host_id
    }

    /// The room's creator. Only they may start a new game.
    pub fn original_host_id(&self) -> PlayerId {
        self.original_host_id
    }

    /// Members in join order.
    pub fn players(&self) -> &[RoomMember] {
        &self.players
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    /// Replaces the settings. Values are normalized first.
    pub fn set_settings(&mut self, settings: RoomSettings) {
        self.settings = settings.normalized();
    }

    /// Milliseconds since the Unix epoch at creation.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn member(&self, player_id: PlayerId) -> Option<&RoomMember> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn is_host(&self, player_id: PlayerId) -> bool {
        self.host_id == player_id
    }

    pub fn is_original_host(&self, player_id: PlayerId) -> bool {
        self.original_host_id == player_id
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.settings.max_players
    }

    pub(crate) fn push_member(&mut self, member: RoomMember) {
        self.players.push(member);
    }

    /// Removes a member. If they were the host, hosting passes to the
    /// first remaining member and the new host is returned.
    ///
    /// The caller is responsible for destroying the room if this leaves
    /// it empty; `host_id` is left untouched in that case.
    pub(crate) fn remove_member(&mut self, player_id: PlayerId) -> Option<PlayerId> {
        self.players.retain(|p| p.id != player_id);
        if self.host_id != player_id {
            return None;
        }
        let next = self.players.first()?.id;
        self.host_id = next;
        Some(next)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
