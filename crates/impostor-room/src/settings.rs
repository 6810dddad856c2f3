//! Per-room game settings.

use serde::{Deserialize, Serialize};

/// Settings a host chooses for their room.
///
/// Every field has a default so clients may send a partial object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomSettings {
    /// Maximum number of members, clamped to
    /// [`MIN_ROOM_SIZE`](Self::MIN_ROOM_SIZE)..=[`MAX_ROOM_SIZE`](Self::MAX_ROOM_SIZE).
    pub max_players: usize,

    /// How many impostors a game in this room deals.
    pub impostor_count: usize,

    /// Length of the discussion phase.
    pub discussion_seconds: u32,

    /// Whether impostors are told the word pack's category.
    pub hint_for_impostors: bool,

    /// Word packs the host picked. Remembered so "new game" can draw
    /// from the same selection.
    pub selected_word_pack_ids: Vec<String>,

    /// Preferred locale for word packs, e.g. `"en"` or `"es-MX"`.
    pub locale: String,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_players: 10,
            impostor_count: 1,
            discussion_seconds: 120,
            hint_for_impostors: true,
            selected_word_pack_ids: Vec::new(),
            locale: "en".to_string(),
        }
    }
}

impl RoomSettings {
    /// Smallest room that can hold a game.
    pub const MIN_ROOM_SIZE: usize = 3;
    /// Largest room supported.
    pub const MAX_ROOM_SIZE: usize = 20;

    /// Clamps out-of-range values so the settings are safe to use.
    ///
    /// - `max_players` into `MIN_ROOM_SIZE..=MAX_ROOM_SIZE`
    /// - `impostor_count` at least 1
    /// - `discussion_seconds` at least 1
    /// - an empty `locale` falls back to `"en"`
    pub fn normalized(mut self) -> Self {
        self.max_players = self
            .max_players
            .clamp(Self::MIN_ROOM_SIZE, Self::MAX_ROOM_SIZE);
        self.impostor_count = self.impostor_count.max(1);
        self.discussion_seconds = self.discussion_seconds.max(1);
        self.locale = self.locale.trim().to_string();
        if self.locale.is_empty() {
            self.locale = "en".to_string();
        }
        self
    }
}
