//! Server configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "bindAddr": "0.0.0.0:9000", "game": { "roleRevealDelayMs": 1500 } }
//! ```

use std::time::Duration;

use impostor_game::MIN_PLAYERS;
use impostor_room::RoomSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind_addr: String,
    /// A connection that sends nothing for this long is closed.
    pub idle_timeout_secs: u64,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout_secs: 120,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Game rules the server enforces on every room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Players needed to start a game. Never below 3.
    pub min_players: usize,
    /// Pause between `game:started` and the private `game:role`
    /// messages, so clients can switch screens first.
    pub role_reveal_delay_ms: u64,
    /// Send each phase broadcast to the room and again to every player.
    pub redundant_broadcast: bool,
    /// Open voting automatically when the discussion deadline passes.
    pub auto_start_voting: bool,
    /// Settings for rooms created without any.
    pub default_settings: RoomSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            role_reveal_delay_ms: 1000,
            redundant_broadcast: true,
            auto_start_voting: true,
            default_settings: RoomSettings::default(),
        }
    }
}

impl GameConfig {
    pub fn role_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.role_reveal_delay_ms)
    }

    /// `min_players`, raised to the floor role assignment needs.
    pub fn required_players(&self) -> usize {
        self.min_players.max(MIN_PLAYERS)
    }
}
