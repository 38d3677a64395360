//! Command-line and environment configuration.

use crate::credentials::{Credentials, DEFAULT_PUBLIC_CLIENT_ID};
use crate::oauth::TOKEN_URL;
use crate::playback::{GQL_URL, USHER_URL};
use crate::twitch_api::HELIX_URL;
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    #[default]
    Development,
    /// Error responses omit `details` and `stack`.
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "twitch-hls-proxy")]
#[command(about = "Signs Twitch HLS playback and proxies Helix metadata")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Public client id sent to the GQL playback-signing endpoint
    #[arg(long, env = "TWITCH_PUBLIC_CLIENT_ID", default_value = DEFAULT_PUBLIC_CLIENT_ID)]
    pub public_client_id: String,

    /// Client id of the application registered for the Helix API
    #[arg(long, env = "TWITCH_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Client secret of the application registered for the Helix API
    #[arg(long, env = "TWITCH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Deployment environment; production hides error details from clients
    #[arg(long, env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,

    /// OAuth token endpoint used for the client-credentials grant
    #[arg(long, env = "TWITCH_TOKEN_URL", default_value = TOKEN_URL, hide = true)]
    pub token_url: String,

    /// Helix API base URL
    #[arg(long, env = "TWITCH_HELIX_URL", default_value = HELIX_URL, hide = true)]
    pub helix_url: String,

    /// GQL endpoint for playback signing
    #[arg(long, env = "TWITCH_GQL_URL", default_value = GQL_URL, hide = true)]
    pub gql_url: String,

    /// Usher manifest base URL used in signed playlist URLs
    #[arg(long, env = "TWITCH_USHER_URL", default_value = USHER_URL, hide = true)]
    pub usher_url: reqwest::Url,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.public_client_id.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
        )
    }
}
