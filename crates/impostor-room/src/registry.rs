//! The room registry: owns every live room and the player → room index.
//!
//! # Concurrency note
//!
//! `RoomRegistry` is plain data with `&mut self` methods. It is owned by
//! the session coordinator, which serializes access to it; nothing else
//! holds a writable reference.

use std::collections::HashMap;

use impostor_protocol::{PlayerId, RoomCode};
use rand::Rng;

use crate::code::random_code;
use crate::{Room, RoomError, RoomMember, RoomSettings};

/// What a successful join did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The player was added to the room.
    Joined,
    /// The player was already a member; nothing changed, including
    /// their stored name.
    AlreadyMember,
}

/// What a leave did to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The player left; the room lives on. `new_host` is set when the
    /// departing player was the host.
    Left {
        code: RoomCode,
        new_host: Option<PlayerId>,
    },
    /// The player was the last member and the room is gone.
    Destroyed { code: RoomCode },
}

impl LeaveOutcome {
    pub fn code(&self) -> &RoomCode {
        match self {
            Self::Left { code, .. } | Self::Destroyed { code } => code,
        }
    }
}

/// Owns all live rooms.
///
/// A player is in at most one room at a time (`player_rooms` is the
/// index that enforces it).
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    player_rooms: HashMap<PlayerId, RoomCode>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room hosted by `host` using the thread-local RNG.
    pub fn create(
        &mut self,
        host: PlayerId,
        name: &str,
        settings: RoomSettings,
        created_at: u64,
    ) -> Result<&Room, RoomError> {
        self.create_with_rng(&mut rand::rng(), host, name, settings, created_at)
    }

    /// Creates a room, drawing codes from `rng` until one is unused.
    ///
    /// # Errors
    /// - [`RoomError::NameRequired`] if `name` is blank
    /// - [`RoomError::AlreadyInRoom`] if `host` is still in another room
    pub fn create_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        host: PlayerId,
        name: &str,
        settings: RoomSettings,
        created_at: u64,
    ) -> Result<&Room, RoomError> {
        let name = clean_name(name)?;
        if let Some(current) = self.player_rooms.get(&host) {
            return Err(RoomError::AlreadyInRoom(host, current.clone()));
        }

        let code = self.unique_code(|| random_code(&mut *rng));
        let member = RoomMember { id: host, name };
        let room = Room::new(code.clone(), member, settings.normalized(), created_at);

        self.player_rooms.insert(host, code.clone());
        tracing::info!(%code, %host, "room created");
        Ok(self.rooms.entry(code).or_insert(room))
    }

    /// Adds a player to a room.
    ///
    /// Joining a room the player is already in succeeds without touching
    /// the stored name, so a reconnecting client cannot overwrite it.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if no room has this code
    /// - [`RoomError::NameRequired`] if `name` is blank
    /// - [`RoomError::RoomFull`] if the room is at capacity
    /// - [`RoomError::AlreadyInRoom`] if the player is in a different room
    pub fn join(
        &mut self,
        code: &RoomCode,
        player_id: PlayerId,
        name: &str,
    ) -> Result<JoinOutcome, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let name = clean_name(name)?;

        if room.contains(player_id) {
            return Ok(JoinOutcome::AlreadyMember);
        }
        if let Some(current) = self.player_rooms.get(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, current.clone()));
        }
        if room.is_full() {
            return Err(RoomError::RoomFull(code.clone()));
        }

        room.push_member(RoomMember {
            id: player_id,
            name,
        });
        self.player_rooms.insert(player_id, code.clone());
        tracing::info!(%code, %player_id, players = room.players().len(), "player joined");
        Ok(JoinOutcome::Joined)
    }

    /// Removes a player from whatever room they are in.
    ///
    /// An emptied room is deleted immediately. Otherwise, if the player
    /// was the host, hosting passes to the first remaining member; the
    /// original host is never reassigned.
    ///
    /// # Errors
    /// Returns [`RoomError::NotInRoom`] if the player is in no room.
    pub fn leave(&mut self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        let code = self
            .player_rooms
            .remove(&player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;

        let Some(room) = self.rooms.get_mut(&code) else {
            return Err(RoomError::NotInRoom(player_id));
        };
        let new_host = room.remove_member(player_id);
        tracing::info!(%code, %player_id, players = room.players().len(), "player left");

        if room.is_empty() {
            self.rooms.remove(&code);
            tracing::info!(%code, "room destroyed");
            return Ok(LeaveOutcome::Destroyed { code });
        }
        if let Some(host) = new_host {
            tracing::info!(%code, %host, "host migrated");
        }
        Ok(LeaveOutcome::Left { code, new_host })
    }

    /// Looks up a room by code.
    pub fn get(&self, code: &RoomCode) -> Result<&Room, RoomError> {
        self.rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Result<&mut Room, RoomError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// The room a player is currently in, if any.
    pub fn room_of(&self, player_id: PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(&player_id)
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Calls `draw` until it yields a code no live room holds.
    fn unique_code(&self, mut draw: impl FnMut() -> RoomCode) -> RoomCode {
        loop {
            let code = draw();
            if !self.rooms.contains_key(&code) {
                return code;
            }
            tracing::debug!(%code, "room code collision, redrawing");
        }
    }
}

fn clean_name(name: &str) -> Result<String, RoomError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RoomError::NameRequired);
    }
    Ok(name.to_string())
}
