//! Signed HLS playback: token signing through GQL and playlist URL composition.

pub mod signer;
pub mod usher;

pub use signer::{GQL_URL, PlaybackSigner, PlaybackToken};
pub use usher::{PlaylistUrlBuilder, USHER_URL};

/// Canonical form of a channel login or video id: trimmed and lower-cased.
pub fn normalize_target(target: &str) -> String {
    target.trim().to_lowercase()
}
