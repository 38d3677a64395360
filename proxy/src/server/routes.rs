//! Route handlers. Each returns a response or an [`ApiError`] for [`App::handle`] to render.

use super::App;
use super::response::{ApiError, Body, html, json};
use crate::playback::normalize_target;
use http::{HeaderMap, Response, StatusCode, Uri, header};
use std::time::SystemTime;

/// Helix accepts at most this many logins per users or streams request.
const MAX_LOGINS: usize = 100;

const CALLBACK_PAGE: &str = include_str!("../../oauth_callback.html");

/// Routes served, as listed by the status endpoint.
pub const ROUTES: &[&str] = &[
    "GET /",
    "GET /api/channels?logins=a,b,c",
    "GET /api/videos/:channel",
    "GET /hls?channel=X",
    "GET /hls?vod=Y",
    "GET /oauth/callback",
];

type RouteResult = Result<Response<Body>, ApiError>;

fn query_param(uri: &Uri, name: &str) -> Option<String> {
    form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| normalize_target(&v))
        .filter(|v| !v.is_empty())
}

/// Status endpoint: configuration state and available routes.
pub(crate) async fn index(app: &App) -> RouteResult {
    let credentials = app.helix.tokens().credentials();
    let cached = app.helix.tokens().peek().await;
    let expires_at = cached
        .as_ref()
        .and_then(|t| jiff::Timestamp::try_from(t.expires_at()).ok());
    let fresh = cached
        .as_ref()
        .is_some_and(|t| t.is_fresh_at(SystemTime::now()));

    Ok(json(
        StatusCode::OK,
        &serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "environment": app.environment.as_str(),
            "config": {
                "public_client_id": !credentials.public_client_id().is_empty(),
                "api_credentials": credentials.has_app_credentials(),
            },
            "app_token": {
                "cached": fresh,
                "expires_at": expires_at,
            },
            "routes": ROUTES,
        }),
    ))
}

/// `GET /api/channels?logins=a,b,c`
pub(crate) async fn channels(app: &App, uri: &Uri) -> RouteResult {
    let raw = form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .find(|(k, _)| k == "logins")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();

    let mut logins: Vec<String> = Vec::new();
    for login in raw.split(',').map(normalize_target) {
        if !login.is_empty() && !logins.contains(&login) {
            logins.push(login);
        }
    }

    if logins.is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required query parameter: logins".to_string(),
        ));
    }
    if logins.len() > MAX_LOGINS {
        return Err(ApiError::BadRequest(format!(
            "At most {MAX_LOGINS} logins can be requested at once"
        )));
    }

    let channels = app
        .helix
        .channels(&logins)
        .await
        .map_err(ApiError::internal("Failed to fetch channels"))?;

    Ok(json(
        StatusCode::OK,
        &serde_json::json!({ "channels": channels }),
    ))
}

/// `GET /api/videos/:channel`
pub(crate) async fn videos(app: &App, segment: &str) -> RouteResult {
    let channel = urlencoding::decode(segment)
        .map(|c| normalize_target(&c))
        .map_err(|_| ApiError::BadRequest("Channel name is not valid UTF-8".to_string()))?;
    if channel.is_empty() {
        return Err(ApiError::BadRequest("Missing channel name".to_string()));
    }

    let videos = app
        .helix
        .archived_videos_by_login(&channel)
        .await
        .map_err(ApiError::internal("Failed to fetch videos"))?
        .ok_or_else(|| ApiError::NotFound(format!("Channel not found: {channel}")))?;

    Ok(json(StatusCode::OK, &serde_json::json!({ "videos": videos })))
}

/// `GET /hls?channel=X` or `GET /hls?vod=Y`; `channel` wins when both are given.
pub(crate) async fn hls(app: &App, uri: &Uri) -> RouteResult {
    let url = if let Some(channel) = query_param(uri, "channel") {
        let token = app
            .signer
            .sign_live(&channel)
            .await
            .map_err(ApiError::internal("Failed to get playback token"))?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Channel is offline or does not exist: {channel}"))
            })?;
        app.playlists.live_url(&channel, &token)
    } else if let Some(vod) = query_param(uri, "vod") {
        let token = app
            .signer
            .sign_vod(&vod)
            .await
            .map_err(ApiError::internal("Failed to get playback token"))?
            .ok_or_else(|| ApiError::NotFound(format!("Video is unavailable: {vod}")))?;
        app.playlists.vod_url(&vod, &token)
    } else {
        return Err(ApiError::BadRequest(
            "Missing required query parameter: channel or vod".to_string(),
        ));
    };

    Ok(json(
        StatusCode::OK,
        &serde_json::json!({ "url": url.as_str() }),
    ))
}

/// Help page for OAuth redirects; shows the URL it was reached at.
pub(crate) fn oauth_callback(headers: &HeaderMap, uri: &Uri) -> RouteResult {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let request_url = format!("{scheme}://{host}{uri}");

    let page = CALLBACK_PAGE.replace("{{request_url}}", &escape_html(&request_url));
    Ok(html(StatusCode::OK, page))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
