//! Helix Videos API types.
//!
//! [`Video`] is handed to clients as-is: the proxy does not reshape video listings.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Number of archived broadcasts returned per channel.
pub const ARCHIVE_PAGE_SIZE: u32 = 20;

/// A video, as returned by `GET /helix/videos`.
///
/// See: <https://dev.twitch.tv/docs/api/reference/#get-videos>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// The video's ID, usable as the `vod` parameter of the HLS endpoint.
    pub id: String,
    /// ID of the stream the video originated from, `null` for uploads and highlights.
    #[serde(default)]
    pub stream_id: Option<String>,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: Timestamp,
    pub published_at: Timestamp,
    pub url: String,
    /// Thumbnail URL template containing `%{width}` and `%{height}` placeholders.
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub viewable: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub language: String,
    /// `archive`, `highlight` or `upload`.
    #[serde(rename = "type")]
    pub kind: String,
    /// ISO 8601 style duration, e.g. `3h8m33s`.
    pub duration: String,
    #[serde(default)]
    pub muted_segments: Option<Vec<MutedSegment>>,
}

/// A segment of a video whose audio was muted for copyright reasons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutedSegment {
    /// Length in seconds.
    pub duration: u64,
    /// Offset from the start of the video, in seconds.
    pub offset: u64,
}
