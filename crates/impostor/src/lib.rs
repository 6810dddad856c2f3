//! # Impostor
//!
//! Room and session orchestration for a social-deduction party game.
//! Players gather in rooms, one of them secretly becomes the impostor
//! (or several do), and the civilians try to find them by unanimous
//! vote.
//!
//! The server keeps rooms and games in memory, talks JSON over
//! WebSocket, and draws secret words from a pluggable
//! [`WordPackSource`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use impostor::prelude::*;
//!
//! # async fn run() -> Result<(), ImpostorError> {
//! let packs = InMemoryWordPacks::from_json(r#"[
//!     { "id": "food", "name": "Food", "words": ["Pizza", "Sushi"] }
//! ]"#).expect("valid packs");
//!
//! let server = ImpostorServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(packs)
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod broadcast;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod packs;

mod handler;
mod server;

pub use broadcast::{Broadcaster, ConnectionHub};
pub use config::{GameConfig, ServerConfig};
pub use coordinator::{RoundTicket, SessionCoordinator, VoteReceipt};
pub use error::{CoordinatorError, ImpostorError};
pub use events::{AckData, ClientEvent, ServerEvent, StartGameRequest};
pub use packs::{InMemoryWordPacks, WordPack, WordPackSource, resolve_pack};
pub use server::{ImpostorServer, ImpostorServerBuilder};

/// Everything needed to run a server or drive the coordinator directly.
pub mod prelude {
    pub use crate::{
        AckData, Broadcaster, ClientEvent, ConnectionHub, CoordinatorError, GameConfig,
        ImpostorError, ImpostorServer, ImpostorServerBuilder, InMemoryWordPacks, ServerConfig,
        ServerEvent, SessionCoordinator, StartGameRequest, WordPack, WordPackSource,
    };
    pub use impostor_game::GameView;
    pub use impostor_protocol::{Envelope, ErrorCode, Phase, PlayerId, Reply, Role, RoomCode, Team};
    pub use impostor_room::{Room, RoomSettings};
}
