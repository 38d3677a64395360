//! Signed playlist URLs on the usher manifest service.

use crate::playback::{PlaybackToken, normalize_target};
use rand::Rng;
use reqwest::Url;

/// Base URL of the usher manifest service.
pub const USHER_URL: &str = "https://usher.ttvnw.net";

/// Identifies the consuming player to usher.
const PLAYER: &str = "twitchweb";

/// Upper bound (exclusive) of the cache-busting `p` parameter.
pub const CACHE_BUST_RANGE: u32 = 10_000_000;

/// Builds signed manifest URLs against a usher base URL.
#[derive(Debug, Clone)]
pub struct PlaylistUrlBuilder {
    base: Url,
}

impl PlaylistUrlBuilder {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// `…/api/channel/hls/{channel}.m3u8`, with the login percent-encoded as a path segment.
    pub fn live_url(&self, channel: &str, token: &PlaybackToken) -> Url {
        let mut url = self.base.clone();
        let manifest = format!("{}.m3u8", normalize_target(channel));
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "channel", "hls", manifest.as_str()]);
        }
        url.query_pairs_mut()
            .append_pair("sig", &token.signature)
            .append_pair("token", &token.value)
            .append_pair("player", PLAYER)
            .append_pair("allow_source", "true")
            .append_pair("allow_audio_only", "true")
            .append_pair("playlist_include_framerate", "true")
            .append_pair("reassignments_supported", "true")
            .append_pair("p", &cache_buster().to_string());
        url
    }

    /// `…/vod/{video_id}.m3u8`. Video ids are numeric and inserted as given.
    pub fn vod_url(&self, video_id: &str, token: &PlaybackToken) -> Url {
        let mut url = self.base.clone();
        let path = format!(
            "{}/vod/{}.m3u8",
            url.path().trim_end_matches('/'),
            normalize_target(video_id)
        );
        url.set_path(&path);
        url.query_pairs_mut()
            .append_pair("sig", &token.signature)
            .append_pair("token", &token.value)
            .append_pair("player", PLAYER)
            .append_pair("allow_source", "true")
            .append_pair("allow_audio_only", "true")
            .append_pair("p", &cache_buster().to_string());
        url
    }
}

impl Default for PlaylistUrlBuilder {
    fn default() -> Self {
        Self::new(Url::parse(USHER_URL).expect("usher base URL is valid"))
    }
}

/// Drawn fresh for every URL so that edge caches never serve one viewer's manifest to another.
fn cache_buster() -> u32 {
    rand::thread_rng().gen_range(0..CACHE_BUST_RANGE)
}
