//! Helix Streams API types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A live stream, as returned by `GET /helix/streams`.
///
/// Helix only lists streams that are currently live, so a user with no entry is offline.
///
/// See: <https://dev.twitch.tv/docs/api/reference/#get-streams>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub user_id: String,
    /// Login of the broadcasting user; the join key against [`crate::twitch_api::User`].
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub game_id: String,
    /// Name of the category being played, empty if unset.
    #[serde(default)]
    pub game_name: String,
    /// Always `live` for listed streams.
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: String,
    pub viewer_count: u64,
    /// When the broadcast began.
    pub started_at: Timestamp,
    #[serde(default)]
    pub language: String,
    /// Thumbnail URL template containing `{width}` and `{height}` placeholders.
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_mature: bool,
}
