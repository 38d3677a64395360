//! Helix Users API types.

use serde::{Deserialize, Serialize};

/// A Twitch user, as returned by `GET /helix/users`.
///
/// See: <https://dev.twitch.tv/docs/api/reference/#get-users>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user's ID.
    pub id: String,
    /// The user's login name, always lower-case.
    pub login: String,
    /// The user's display name, which may differ from `login` in case or script.
    pub display_name: String,
    /// `partner`, `affiliate` or an empty string.
    #[serde(default)]
    pub broadcaster_type: String,
    #[serde(default)]
    pub description: String,
    /// A URL to the user's profile image.
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub offline_image_url: String,
}
