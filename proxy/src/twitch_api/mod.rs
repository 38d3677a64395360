//! Twitch Helix API client.
//!
//! Only the three listings the proxy needs are modelled:
//!
//! - [`users::User`] via `GET /helix/users?login=…`
//! - [`streams::Stream`] via `GET /helix/streams?user_login=…`
//! - [`videos::Video`] via `GET /helix/videos?user_id=…&type=archive`
//!
//! Users and streams are joined client-side into [`channels::ChannelRecord`].

pub mod channels;
pub mod client;
pub mod streams;
pub mod users;
pub mod videos;

pub use channels::{ChannelRecord, LiveInfo};
pub use client::{HELIX_URL, HelixClient};
pub use streams::Stream;
pub use users::User;
pub use videos::Video;

use serde::{Deserialize, Serialize};

/// Every Helix listing wraps its items in a `data` array.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: Vec<T>,
}
