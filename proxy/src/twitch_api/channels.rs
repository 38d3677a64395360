//! Channel records: a user identity joined with its live status.

use crate::twitch_api::{Stream, User};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub login: String,
    pub display_name: String,
    pub profile_image_url: String,
    pub is_live: bool,
    /// Present exactly when `is_live` is set.
    pub stream: Option<LiveInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveInfo {
    pub title: String,
    pub game_name: String,
    pub viewer_count: u64,
    pub thumbnail_url: String,
    pub started_at: Timestamp,
}

impl From<Stream> for LiveInfo {
    fn from(s: Stream) -> Self {
        Self {
            title: s.title,
            game_name: s.game_name,
            viewer_count: s.viewer_count,
            thumbnail_url: s.thumbnail_url,
            started_at: s.started_at,
        }
    }
}

impl ChannelRecord {
    pub fn new(user: User, stream: Option<Stream>) -> Self {
        let stream = stream.map(LiveInfo::from);
        Self {
            id: user.id,
            login: user.login,
            display_name: user.display_name,
            profile_image_url: user.profile_image_url,
            is_live: stream.is_some(),
            stream,
        }
    }

    /// Joins users with live streams on login.
    ///
    /// Records come out in the order of `users`. Streams whose login matches no user are
    /// dropped.
    pub fn join(users: Vec<User>, streams: Vec<Stream>) -> Vec<Self> {
        let mut live: HashMap<String, Stream> = streams
            .into_iter()
            .map(|s| (s.user_login.to_lowercase(), s))
            .collect();
        users
            .into_iter()
            .map(|user| {
                let stream = live.remove(&user.login.to_lowercase());
                Self::new(user, stream)
            })
            .collect()
    }
}
