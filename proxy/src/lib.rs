//! A small HTTP service that signs Twitch HLS playback and serves channel and video
//! metadata from the Helix API.
//!
//! Two credential domains are involved. Playback signing goes to the GQL endpoint with the
//! public web client id. Metadata calls go to Helix with an app access token obtained from
//! the client-credentials grant and cached in [`oauth::AppTokenCache`].

pub mod config;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod playback;
pub mod server;
pub mod twitch_api;

pub use config::{Config, Environment};
pub use error::{ProxyError, Result};
pub use server::{App, serve};
