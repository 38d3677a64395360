//! Playback access token signing through Twitch GQL.

use crate::credentials::Credentials;
use crate::error::{ProxyError, Result};
use crate::playback::normalize_target;
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Twitch GQL endpoint.
pub const GQL_URL: &str = "https://gql.twitch.tv/gql";

const OPERATION_NAME: &str = "PlaybackAccessToken";

/// Content hash of the `PlaybackAccessToken` persisted query. GQL rejects the request with
/// `PersistedQueryNotFound` if this does not match the query registered upstream.
const PERSISTED_QUERY_HASH: &str =
    "0828119ded1c13477966434e15800ff57ddacf13ba1911c129dc2200705b0712";

/// Player type requested in the signed claims; `embed` yields the default manifest variant
/// without server-side ad insertion.
const PLAYER_TYPE: &str = "embed";

/// A signature and the signed claims it covers, authorizing one manifest fetch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaybackToken {
    pub signature: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedQueryRequest<'a> {
    operation_name: &'static str,
    extensions: Extensions,
    variables: Variables<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Extensions {
    persisted_query: PersistedQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedQuery {
    version: u8,
    sha256_hash: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Variables<'a> {
    is_live: bool,
    login: &'a str,
    is_vod: bool,
    #[serde(rename = "vodID")]
    vod_id: &'a str,
    player_type: &'static str,
}

impl<'a> PersistedQueryRequest<'a> {
    fn live(login: &'a str) -> Self {
        Self::new(Variables {
            is_live: true,
            login,
            is_vod: false,
            vod_id: "",
            player_type: PLAYER_TYPE,
        })
    }

    fn vod(video_id: &'a str) -> Self {
        Self::new(Variables {
            is_live: false,
            login: "",
            is_vod: true,
            vod_id: video_id,
            player_type: PLAYER_TYPE,
        })
    }

    fn new(variables: Variables<'a>) -> Self {
        Self {
            operation_name: OPERATION_NAME,
            extensions: Extensions {
                persisted_query: PersistedQuery {
                    version: 1,
                    sha256_hash: PERSISTED_QUERY_HASH,
                },
            },
            variables,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GqlResponse {
    data: Option<AccessTokenData>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// Twitch has served the token under both the older `*AccessToken` and the current
/// `*PlaybackAccessToken` names, so either is accepted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenData {
    stream_playback_access_token: Option<RawToken>,
    stream_access_token: Option<RawToken>,
    video_playback_access_token: Option<RawToken>,
    video_access_token: Option<RawToken>,
}

#[derive(Debug, Deserialize)]
struct RawToken {
    signature: Option<String>,
    value: Option<String>,
}

impl RawToken {
    fn complete(self) -> Option<PlaybackToken> {
        match (self.signature, self.value) {
            (Some(signature), Some(value)) if !signature.is_empty() && !value.is_empty() => {
                Some(PlaybackToken { signature, value })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Live,
    Vod,
}

/// Obtains playback tokens for live channels and VODs.
///
/// Only the public client id is sent: GQL signs playback for anonymous viewers.
#[derive(Debug, Clone)]
pub struct PlaybackSigner {
    credentials: Arc<Credentials>,
    gql_url: String,
    client: reqwest::Client,
}

impl PlaybackSigner {
    pub fn new(
        credentials: Arc<Credentials>,
        gql_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            gql_url: gql_url.into(),
            client,
        }
    }

    /// Signs playback of a live channel.
    ///
    /// Returns `Ok(None)` if the channel is offline or does not exist.
    #[instrument(skip(self))]
    pub async fn sign_live(&self, channel: &str) -> Result<Option<PlaybackToken>> {
        let channel = normalize_target(channel);
        self.sign(&PersistedQueryRequest::live(&channel), Target::Live)
            .await
    }

    /// Signs playback of a recorded video.
    ///
    /// Returns `Ok(None)` if the video is unavailable.
    #[instrument(skip(self))]
    pub async fn sign_vod(&self, video_id: &str) -> Result<Option<PlaybackToken>> {
        let video_id = normalize_target(video_id);
        self.sign(&PersistedQueryRequest::vod(&video_id), Target::Vod)
            .await
    }

    async fn sign(
        &self,
        request: &PersistedQueryRequest<'_>,
        target: Target,
    ) -> Result<Option<PlaybackToken>> {
        let response = self
            .client
            .post(&self.gql_url)
            .header("Client-Id", self.credentials.public_client_id().as_str())
            .json(request)
            .send()
            .await
            .with_context(|| format!("send playback token request to {}", self.gql_url))?;

        let status = response.status();
        if !status.is_success() {
            let e = ProxyError::from_response(response).await;
            tracing::warn!(error = %e, "playback token request failed");
            return Err(e);
        }

        let body = response
            .text()
            .await
            .context("read playback token response body")?;
        let parsed: GqlResponse =
            serde_json::from_str(&body).context("parse playback token response as JSON")?;

        let token = parsed.data.and_then(|data| {
            let raw = match target {
                Target::Live => data
                    .stream_playback_access_token
                    .or(data.stream_access_token),
                Target::Vod => data.video_playback_access_token.or(data.video_access_token),
            };
            raw.and_then(RawToken::complete)
        });

        match token {
            Some(token) => {
                tracing::debug!("obtained playback token");
                Ok(Some(token))
            }
            None if !parsed.errors.is_empty() => {
                tracing::warn!(errors = ?parsed.errors, "GQL rejected playback token request");
                Err(ProxyError::Upstream { status, body })
            }
            None => {
                tracing::debug!("no playback token: target offline or unavailable");
                Ok(None)
            }
        }
    }
}
