//! HTTP front end: an http1 accept loop dispatching to the route handlers.

mod response;
mod routes;

use crate::config::{Config, Environment};
use crate::oauth::AppTokenCache;
use crate::playback::{PlaybackSigner, PlaylistUrlBuilder};
use crate::twitch_api::HelixClient;
use eyre::Context;
use http::request::Parts;
use http::{Method, Request, StatusCode};
use hyper::service::service_fn;
use response::{ApiError, empty, with_cors};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

pub use response::Body;
pub use routes::ROUTES;

/// Pause after a failed `accept`, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Everything a request handler needs, shared by all connections.
#[derive(Debug, Clone)]
pub struct App {
    pub helix: HelixClient,
    pub signer: PlaybackSigner,
    pub playlists: PlaylistUrlBuilder,
    pub environment: Environment,
}

impl App {
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build HTTP client")?;

        let credentials = Arc::new(config.credentials());
        let tokens = Arc::new(AppTokenCache::new(
            Arc::clone(&credentials),
            config.token_url.clone(),
            client.clone(),
        ));
        Ok(Self {
            helix: HelixClient::new(tokens, config.helix_url.clone(), client.clone()),
            signer: PlaybackSigner::new(credentials, config.gql_url.clone(), client),
            playlists: PlaylistUrlBuilder::new(config.usher_url.clone()),
            environment: config.environment,
        })
    }

    /// Routes one request. Every response, errors included, carries the CORS headers.
    pub async fn handle<B>(&self, req: Request<B>) -> http::Response<Body> {
        let (parts, _) = req.into_parts();
        let response = self
            .route(&parts)
            .await
            .unwrap_or_else(|e| e.into_response(self.environment));
        tracing::debug!(
            method = %parts.method,
            path = parts.uri.path(),
            status = response.status().as_u16(),
            "handled request"
        );
        with_cors(response)
    }

    async fn route(&self, req: &Parts) -> Result<http::Response<Body>, ApiError> {
        if req.method == Method::OPTIONS {
            return Ok(empty(StatusCode::NO_CONTENT));
        }
        if req.method != Method::GET {
            return Err(ApiError::MethodNotAllowed);
        }

        let uri = &req.uri;
        match uri.path() {
            "/" => routes::index(self).await,
            "/api/channels" => routes::channels(self, uri).await,
            "/hls" => routes::hls(self, uri).await,
            "/oauth/callback" => routes::oauth_callback(&req.headers, uri),
            path => match path.strip_prefix("/api/videos/") {
                Some(channel) if !channel.contains('/') => routes::videos(self, channel).await,
                _ => Err(ApiError::NotFound("Not found".to_string())),
            },
        }
    }
}

/// Serves connections from `listener` until `shutdown` flips to `true`.
///
/// Open connections are then asked to shut down gracefully, and this only returns once
/// each of them has finished the request it was on.
pub async fn serve(
    listener: TcpListener,
    app: Arc<App>,
    mut shutdown: watch::Receiver<bool>,
) -> eyre::Result<()> {
    let mut connections = JoinSet::new();
    loop {
        let (conn, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
            // reap finished connections
            Some(_) = connections.join_next(), if !connections.is_empty() => continue,
            _ = shutdown.changed() => break,
        };
        if *shutdown.borrow() {
            break;
        }

        let app = Arc::clone(&app);
        let mut shutdown = shutdown.clone();
        connections.spawn(async move {
            let conn = hyper_util::rt::TokioIo::new(conn);
            let service = service_fn(move |req| {
                let app = Arc::clone(&app);
                async move { Ok::<_, Infallible>(app.handle(req).await) }
            });
            let mut serve = std::pin::pin!(
                hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
            );

            let result = tokio::select! {
                exit = serve.as_mut() => exit,
                _ = shutdown.changed() => {
                    serve.as_mut().graceful_shutdown();
                    serve.await
                }
            };
            if let Err(e) = result {
                tracing::debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }

    drop(listener);
    tracing::info!(
        open_connections = connections.len(),
        "server shutting down"
    );
    while connections.join_next().await.is_some() {}
    tracing::info!("server stopped");
    Ok(())
}
