//! Secret role assignment.

use impostor_protocol::{PlayerId, Role};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::GameError;

/// Minimum number of players for a game.
pub const MIN_PLAYERS: usize = 3;

/// A player entering a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: PlayerId,
    pub name: String,
}

impl Participant {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A participant with their dealt role.
///
/// Holds secrets; never serialized as-is. Clients receive
/// [`PublicPlayer`](crate::PublicPlayer) or their own
/// [`RoleCard`](crate::RoleCard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePlayer {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    /// The secret word for civilians, the hint (if any) for impostors.
    pub word: Option<String>,
    pub has_seen_role: bool,
}

impl GamePlayer {
    pub fn is_impostor(&self) -> bool {
        self.role == Role::Impostor
    }
}

/// Deals roles: shuffles the players and makes the first
/// `impostor_count` impostors.
///
/// Civilians get `secret_word`; impostors get `hint` (which may be
/// `None`, meaning no hint). The returned order is the shuffled order,
/// so callers must match players by id, not position.
///
/// # Errors
/// - [`GameError::NotEnoughPlayers`] for fewer than [`MIN_PLAYERS`]
/// - [`GameError::NoImpostors`] for `impostor_count == 0`
/// - [`GameError::TooManyImpostors`] for `impostor_count >= players.len()`
pub fn assign_roles<R: Rng + ?Sized>(
    rng: &mut R,
    players: &[Participant],
    secret_word: &str,
    impostor_count: usize,
    hint: Option<&str>,
) -> Result<Vec<GamePlayer>, GameError> {
    if players.len() < MIN_PLAYERS {
        return Err(GameError::NotEnoughPlayers {
            players: players.len(),
            min: MIN_PLAYERS,
        });
    }
    if impostor_count == 0 {
        return Err(GameError::NoImpostors);
    }
    if impostor_count >= players.len() {
        return Err(GameError::TooManyImpostors {
            impostors: impostor_count,
            players: players.len(),
        });
    }

    let mut shuffled = players.to_vec();
    shuffled.shuffle(rng);

    let dealt = shuffled
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let (role, word) = if i < impostor_count {
                (Role::Impostor, hint.map(str::to_string))
            } else {
                (Role::Civilian, Some(secret_word.to_string()))
            };
            GamePlayer {
                id: p.id,
                name: p.name,
                role,
                word,
                has_seen_role: false,
            }
        })
        .collect();
    Ok(dealt)
}
