//! Application access token acquisition and caching.
//!
//! Helix calls are authenticated with an app access token obtained through the OAuth
//! client-credentials grant. The token is cached in a single slot and only refreshed once
//! it comes within [`EXPIRY_MARGIN`] of its expiry (or was never fetched at all). Refresh is
//! always lazy: the next caller after expiry pays for it.

use crate::credentials::Credentials;
use crate::error::{ProxyError, Result};
use eyre::Context;
use oauth2::AccessToken;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Twitch identity endpoint for the client-credentials grant.
pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// A cached token is not handed out once it is this close to expiring.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// An app access token together with the absolute instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AppToken {
    value: AccessToken,
    expires_at: SystemTime,
}

impl AppToken {
    pub fn new(value: AccessToken, expires_at: SystemTime) -> Self {
        Self { value, expires_at }
    }

    pub fn secret(&self) -> &str {
        self.value.secret()
    }

    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    /// Whether this token may still be handed out at `now`.
    pub fn is_fresh_at(&self, now: SystemTime) -> bool {
        match self.expires_at.checked_sub(EXPIRY_MARGIN) {
            Some(deadline) => now < deadline,
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrantResponse {
    access_token: AccessToken,
    expires_in: u64,
}

/// Single-slot cache for the application access token.
///
/// Refreshes are serialized by a separate async mutex, so concurrent callers that find the
/// slot stale produce one identity request between them rather than one each. The slot
/// itself is only ever locked to read or replace the token, never across network I/O.
#[derive(Debug)]
pub struct AppTokenCache {
    credentials: Arc<Credentials>,
    token_url: String,
    client: reqwest::Client,
    slot: RwLock<Option<AppToken>>,
    refresh: Mutex<()>,
}

impl AppTokenCache {
    pub fn new(
        credentials: Arc<Credentials>,
        token_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            token_url: token_url.into(),
            client,
            slot: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the cached token without refreshing it, if one was ever fetched.
    ///
    /// Does not wait for a refresh that is in flight.
    pub async fn peek(&self) -> Option<AppToken> {
        self.slot.read().await.clone()
    }

    async fn fresh_secret(&self) -> Option<String> {
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|t| t.is_fresh_at(SystemTime::now()))
            .map(|t| t.secret().to_string())
    }

    /// Returns a bearer token that is valid for at least [`EXPIRY_MARGIN`].
    ///
    /// # Errors
    ///
    /// * [`ProxyError::Configuration`] if no client id/secret pair is configured
    /// * [`ProxyError::Upstream`] if the identity endpoint rejects the grant
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> Result<String> {
        let Some(app) = self.credentials.app() else {
            return Err(ProxyError::Configuration(
                "TWITCH_CLIENT_ID and TWITCH_CLIENT_SECRET must be set to call the Twitch API",
            ));
        };

        if let Some(secret) = self.fresh_secret().await {
            tracing::trace!("app access token cache hit");
            return Ok(secret);
        }

        let _refresh = self.refresh.lock().await;
        // whoever held the refresh lock before us may already have stored a fresh token
        if let Some(secret) = self.fresh_secret().await {
            tracing::trace!("app access token refreshed by another caller");
            return Ok(secret);
        }

        let cached = self.slot.read().await.is_some();
        tracing::debug!(
            cached,
            "app access token missing or stale, fetching"
        );

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.secret().as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .with_context(|| format!("send client-credentials grant to {}", self.token_url))?;

        if !response.status().is_success() {
            let e = ProxyError::from_response(response).await;
            tracing::warn!(error = %e, "client-credentials grant rejected");
            return Err(e);
        }

        let grant: TokenGrantResponse = response
            .json()
            .await
            .context("parse client-credentials grant response as JSON")?;

        let expires_at = SystemTime::now()
            .checked_add(Duration::from_secs(grant.expires_in))
            .ok_or_else(|| {
                eyre::eyre!(
                    "client-credentials grant returned out-of-range expires_in: {}",
                    grant.expires_in
                )
            })?;
        let token = AppToken::new(grant.access_token, expires_at);
        let secret = token.secret().to_string();
        tracing::debug!(expires_in = grant.expires_in, "obtained new app access token");
        *self.slot.write().await = Some(token);

        Ok(secret)
    }
}
