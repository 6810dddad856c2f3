//! Framing: the envelope every message travels in, and the reply shape
//! used to acknowledge requests.

use serde::{Deserialize, Serialize};

use crate::{ErrorCode, Phase};

/// The top-level wrapper for every message on the wire, in both
/// directions.
///
/// ```text
/// { "seq": 12, "timestamp": 53021, "payload": { "event": "game:vote", "data": { ... } } }
/// ```
///
/// - Client → server: `seq` is the client's own counter and is echoed
///   back in the matching acknowledgement so the client can pair them.
///   `timestamp` is informational and defaults to 0 when omitted.
/// - Server → client: `seq` is the per-connection outbound counter and
///   `timestamp` is milliseconds since the connection was accepted.
///
/// The payload type is chosen by the application; this crate only
/// knows that it is serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub seq: u64,
    #[serde(default)]
    pub timestamp: u64,
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Wraps a payload with the given sequence number and timestamp.
    pub fn new(seq: u64, timestamp: u64, payload: T) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}

/// The acknowledgement for a single request.
///
/// Serializes as `{ "ok": true, "data": ... }` on success and as
/// `{ "ok": false, "error": "NOT_HOST" }` on failure. State-precondition
/// failures also carry the phase the game was actually in, so a client
/// with stale state can tell what happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply<T> {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Reply<T> {
    /// A successful reply carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            error: None,
            phase: None,
            data: Some(data),
        }
    }

    /// A successful reply with nothing to report.
    pub fn done() -> Self {
        Self {
            ok: true,
            error: None,
            phase: None,
            data: None,
        }
    }

    /// A failed reply.
    pub fn failure(error: ErrorCode, phase: Option<Phase>) -> Self {
        Self {
            ok: false,
            error: Some(error),
            phase,
            data: None,
        }
    }
}
