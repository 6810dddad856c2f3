//! Room code generation.

use impostor_protocol::RoomCode;
use rand::Rng;

/// Draws a random code. Uniqueness is the registry's job.
pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    let len = RoomCode::ALPHABET.len();
    let indices: [usize; RoomCode::LEN] = std::array::from_fn(|_| rng.random_range(0..len));
    RoomCode::from_indices(indices)
}
