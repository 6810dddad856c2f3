//! Identity types and the small enums that travel on the wire.
//!
//! Everything here is plain data: the rules that decide how a [`Phase`]
//! may change live in `impostor-game`, not in the protocol layer.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies a connected player.
///
/// A player's identity is the identifier of the connection they arrived
/// on, so a reconnect produces a new `PlayerId`. Serialized as a plain
/// number (`#[serde(transparent)]`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A six-character room code such as `"K7QX2M"`.
///
/// Codes are drawn from [`RoomCode::ALPHABET`], which leaves out glyphs
/// that are easy to confuse when read aloud or typed (`O`/`0`, `I`/`1`).
/// Clients upper-case codes before sending, but [`RoomCode::parse`]
/// normalizes anyway.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in every room code.
    pub const LEN: usize = 6;

    /// Characters a room code may contain.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Normalizes and validates a client-supplied code.
    ///
    /// Surrounding whitespace is trimmed and letters are upper-cased.
    /// Returns `None` if the result is not exactly [`Self::LEN`]
    /// characters from [`Self::ALPHABET`].
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        let valid = code.len() == Self::LEN
            && code.bytes().all(|b| Self::ALPHABET.contains(&b));
        valid.then_some(Self(code))
    }

    /// Builds a code from alphabet indices. Indices wrap around the
    /// alphabet, so any `usize` is accepted.
    pub fn from_indices(indices: [usize; Self::LEN]) -> Self {
        let code = indices
            .iter()
            .map(|i| Self::ALPHABET[i % Self::ALPHABET.len()] as char)
            .collect();
        Self(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game enums
// ---------------------------------------------------------------------------

/// The phase a game session is in.
///
/// ```text
/// revealing → discussion ⇄ voting → vote-results → discussion …
///                                 ↘ finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Players are looking at their secret role card.
    Revealing,
    /// Timed open discussion.
    Discussion,
    /// Civilians are choosing who they think the impostor is.
    Voting,
    /// The round's tally is on screen; the game is not over yet.
    VoteResults,
    /// A team has won. Terminal.
    Finished,
}

impl Phase {
    /// Wire name of the phase, as used in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revealing => "revealing",
            Self::Discussion => "discussion",
            Self::Voting => "voting",
            Self::VoteResults => "vote-results",
            Self::Finished => "finished",
        }
    }

    /// Returns `true` for the terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's secret role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Knows the secret word; votes count.
    Civilian,
    /// Knows at most a category hint; votes are recorded but not counted.
    Impostor,
}

/// The side that won a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Civilians,
    Impostors,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Civilians => f.write_str("civilians"),
            Self::Impostors => f.write_str("impostors"),
        }
    }
}
