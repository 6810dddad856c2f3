//! Wire protocol for the impostor party game server.
//!
//! - **Types** ([`PlayerId`], [`RoomCode`], [`Phase`], [`Role`], [`Team`])
//!   shared by every layer above.
//! - **Framing** ([`Envelope`], [`Reply`]): how requests, pushes and
//!   acknowledgements are wrapped.
//! - **Error codes** ([`ErrorCode`]): the stable reasons a request can
//!   be rejected.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes in, frames out.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Coordinator (rooms, games)
//! ```

mod code;
mod codec;
mod error;
mod frame;
mod types;

pub use code::ErrorCode;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frame::{Envelope, Reply};
pub use types::{Phase, PlayerId, Role, RoomCode, Team};
