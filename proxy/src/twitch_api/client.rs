//! Core Helix API client functionality.

use crate::error::{ProxyError, Result};
use crate::oauth::AppTokenCache;
use crate::playback::normalize_target;
use crate::twitch_api::videos::ARCHIVE_PAGE_SIZE;
use crate::twitch_api::{ChannelRecord, DataResponse, Stream, User, Video};
use eyre::Context;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

/// Base URL of the Helix API.
pub const HELIX_URL: &str = "https://api.twitch.tv/helix";

/// Client for the Twitch Helix API.
///
/// Every request carries the app access token from the shared [`AppTokenCache`] and the
/// registered client id. Failures are not retried: a single upstream error surfaces to the
/// caller as [`ProxyError::Upstream`].
#[derive(Debug, Clone)]
pub struct HelixClient {
    /// Shared app token slot
    tokens: Arc<AppTokenCache>,
    /// Base URL, without trailing slash
    base_url: String,
    /// HTTP client for API requests
    client: reqwest::Client,
}

impl HelixClient {
    pub fn new(
        tokens: Arc<AppTokenCache>,
        base_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            tokens,
            base_url,
            client,
        }
    }

    pub fn tokens(&self) -> &AppTokenCache {
        &self.tokens
    }

    /// Makes an authenticated `GET` request against a Helix endpoint and parses the JSON body.
    ///
    /// Repeated keys in `params` are sent as repeated query parameters
    /// (`login=a&login=b`), which is how Helix expects multi-valued filters.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The path below the Helix base URL, e.g. `users`
    /// * `params` - Query parameters
    ///
    /// # Errors
    ///
    /// * [`ProxyError::Configuration`] if no app credentials are configured
    /// * [`ProxyError::Upstream`] if the token grant or the API call returns non-2xx
    #[instrument(skip(self), level = tracing::Level::DEBUG)]
    pub async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let access_token = self.tokens.get_token().await?;
        let Some(app) = self.tokens.credentials().app() else {
            return Err(ProxyError::Configuration(
                "TWITCH_CLIENT_ID must be set to call the Twitch API",
            ));
        };

        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(params)
            .bearer_auth(access_token)
            .header("Client-Id", app.client_id.as_str())
            .send()
            .await
            .with_context(|| format!("send request to Helix API: {url}"))?;

        if !response.status().is_success() {
            let e = ProxyError::from_response(response).await;
            tracing::warn!(endpoint, error = %e, "Helix request failed");
            return Err(e);
        }

        let body = response
            .json()
            .await
            .with_context(|| format!("parse Helix {endpoint} response as JSON"))?;
        Ok(body)
    }

    /// Looks up users by login name.
    ///
    /// Unknown logins are silently absent from the result.
    ///
    /// See: <https://dev.twitch.tv/docs/api/reference/#get-users>
    #[instrument(skip(self))]
    pub async fn users_by_login(&self, logins: &[String]) -> Result<Vec<User>> {
        if logins.is_empty() {
            return Ok(Vec::new());
        }
        let logins: Vec<_> = logins.iter().map(|l| normalize_target(l)).collect();
        let params: Vec<_> = logins.iter().map(|l| ("login", l.as_str())).collect();
        let users: DataResponse<User> = self.call("users", &params).await?;
        tracing::debug!(
            requested = logins.len(),
            returned_items = users.data.len(),
            "fetched users"
        );
        Ok(users.data)
    }

    /// Lists the streams that are currently live among the given logins.
    ///
    /// See: <https://dev.twitch.tv/docs/api/reference/#get-streams>
    #[instrument(skip(self))]
    pub async fn live_streams_by_login(&self, logins: &[String]) -> Result<Vec<Stream>> {
        if logins.is_empty() {
            return Ok(Vec::new());
        }
        let logins: Vec<_> = logins.iter().map(|l| normalize_target(l)).collect();
        let params: Vec<_> = logins.iter().map(|l| ("user_login", l.as_str())).collect();
        let streams: DataResponse<Stream> = self.call("streams", &params).await?;
        tracing::debug!(
            requested = logins.len(),
            returned_items = streams.data.len(),
            "fetched live streams"
        );
        Ok(streams.data)
    }

    /// Fetches channel records for the given logins, in the order they were requested.
    ///
    /// Logins with no matching user are skipped. The streams lookup is not made when no
    /// login matched.
    #[instrument(skip(self))]
    pub async fn channels(&self, logins: &[String]) -> Result<Vec<ChannelRecord>> {
        let mut users = self.users_by_login(logins).await?;
        if users.is_empty() {
            return Ok(Vec::new());
        }
        let requested: Vec<_> = logins.iter().map(|l| normalize_target(l)).collect();
        users.sort_by_key(|u| {
            requested
                .iter()
                .position(|l| *l == u.login.to_lowercase())
                .unwrap_or(usize::MAX)
        });
        let streams = self.live_streams_by_login(logins).await?;
        Ok(ChannelRecord::join(users, streams))
    }

    /// Lists the most recent archived broadcasts of a user.
    ///
    /// See: <https://dev.twitch.tv/docs/api/reference/#get-videos>
    #[instrument(skip(self))]
    pub async fn archived_videos(&self, user_id: &str) -> Result<Vec<Video>> {
        let first = ARCHIVE_PAGE_SIZE.to_string();
        let params = [
            ("user_id", user_id),
            ("type", "archive"),
            ("first", first.as_str()),
        ];
        let videos: DataResponse<Video> = self.call("videos", &params).await?;
        tracing::debug!(user_id, returned_items = videos.data.len(), "fetched videos");
        Ok(videos.data)
    }

    /// Resolves a login to its user, then lists its archived broadcasts.
    ///
    /// Returns `None` when no user has that login, without making the videos call.
    #[instrument(skip(self))]
    pub async fn archived_videos_by_login(&self, login: &str) -> Result<Option<Vec<Video>>> {
        let users = self.users_by_login(&[login.to_string()]).await?;
        let Some(user) = users.into_iter().next() else {
            tracing::debug!(login, "no user with that login");
            return Ok(None);
        };
        self.archived_videos(&user.id).await.map(Some)
    }
}
