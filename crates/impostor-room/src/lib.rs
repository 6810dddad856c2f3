//! Rooms for the impostor server.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms, tracks membership, migrates hosts
//! - [`Room`]: one lobby: code, members, host identities, settings
//! - [`RoomSettings`]: what the host configured

mod code;
mod error;
mod registry;
mod room;
mod settings;

pub use code::random_code;
pub use error::RoomError;
pub use registry::{JoinOutcome, LeaveOutcome, RoomRegistry};
pub use room::{Room, RoomMember};
pub use settings::RoomSettings;
