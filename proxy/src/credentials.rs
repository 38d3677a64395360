//! Statically configured Twitch client identifiers.
//!
//! Twitch splits trust between two domains: the GQL playback-signing endpoint accepts the
//! public web client id without any secret, while the Helix metadata API requires an
//! application registered on the developer console, identified by a client id and secret.

use oauth2::{ClientId, ClientSecret};

/// Client id used by the Twitch web player. It is public and only grants access to the
/// unauthenticated GQL operations, playback signing among them.
pub const DEFAULT_PUBLIC_CLIENT_ID: &str = "kimne78kx3ncx6brgo4mv6wki5h1ko";

/// A registered Helix application.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    public_client_id: ClientId,
    app: Option<AppCredentials>,
}

impl Credentials {
    /// Blank or whitespace-only values count as absent.
    pub fn new(
        public_client_id: impl Into<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        let non_blank =
            |v: Option<String>| v.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let app = match (non_blank(client_id), non_blank(client_secret)) {
            (Some(id), Some(secret)) => Some(AppCredentials {
                client_id: ClientId::new(id),
                client_secret: ClientSecret::new(secret),
            }),
            _ => None,
        };
        Self {
            public_client_id: ClientId::new(public_client_id.into()),
            app,
        }
    }

    pub fn public_client_id(&self) -> &ClientId {
        &self.public_client_id
    }

    pub fn app(&self) -> Option<&AppCredentials> {
        self.app.as_ref()
    }

    pub fn has_app_credentials(&self) -> bool {
        self.app.is_some()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_CLIENT_ID, None, None)
    }
}
