use clap::Parser;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use twitch_hls_proxy::{App, Config};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_with(server: &MockServer, extra: &[&str]) -> App {
    let token_url = format!("--token-url={}/oauth2/token", server.uri());
    let helix_url = format!("--helix-url={}/helix", server.uri());
    let gql_url = format!("--gql-url={}/gql", server.uri());
    let mut args = vec![
        "twitch-hls-proxy",
        token_url.as_str(),
        helix_url.as_str(),
        gql_url.as_str(),
        "--usher-url=https://usher.ttvnw.net",
    ];
    args.extend_from_slice(extra);
    let config = Config::try_parse_from(args).unwrap();
    App::from_config(&config).unwrap()
}

fn app(server: &MockServer) -> App {
    app_with(
        server,
        &[
            "--client-id=app-id",
            "--client-secret=app-secret",
            "--environment=development",
        ],
    )
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "app-token",
            "expires_in": 3600,
            "token_type": "bearer",
        })))
        .mount(server)
        .await;
}

async fn send_method(app: &App, method: Method, uri: &str) -> (StatusCode, HeaderMap, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "proxy.test")
        .body(())
        .unwrap();
    let response = app.handle(req).await;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(app: &App, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = send_method(app, Method::GET, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

fn user_json(id: &str, login: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "login": login,
        "display_name": login.to_uppercase(),
        "type": "",
        "broadcaster_type": "partner",
        "description": "",
        "profile_image_url": format!("https://img.test/{login}.png"),
        "offline_image_url": "",
        "view_count": 0,
        "created_at": "2013-06-03T19:12:02Z",
    })
}

fn stream_json(user_id: &str, login: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "40952121085",
        "user_id": user_id,
        "user_login": login,
        "user_name": login.to_uppercase(),
        "game_id": "29595",
        "game_name": "Dota 2",
        "type": "live",
        "title": "ranked",
        "viewer_count": 1234,
        "started_at": "2024-05-01T12:00:00Z",
        "language": "en",
        "thumbnail_url": "https://img.test/live_{width}x{height}.jpg",
        "tag_ids": [],
        "tags": ["English"],
        "is_mature": false,
    })
}

fn gql_token(field: &str, signature: &str, value: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "data": { field: { "signature": signature, "value": value } },
    }))
}

#[tokio::test]
async fn channel_without_stream_is_offline() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .and(query_param("login", "gorgc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [user_json("108268890", "gorgc")],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app(&server), "/api/channels?logins=gorgc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({
            "channels": [{
                "id": "108268890",
                "login": "gorgc",
                "display_name": "GORGC",
                "profile_image_url": "https://img.test/gorgc.png",
                "is_live": false,
                "stream": null,
            }],
        })
    );
}

#[tokio::test]
async fn channels_keep_requested_order_and_join_streams() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [user_json("1", "alpha"), user_json("2", "bravo")],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [stream_json("1", "alpha")],
        })))
        .mount(&server)
        .await;

    let (status, body) = get(&app(&server), "/api/channels?logins=Bravo,%20alpha%20,bravo,,").await;
    assert_eq!(status, StatusCode::OK);
    let channels = body["channels"].as_array().unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0]["login"], "bravo");
    assert_eq!(channels[0]["is_live"], false);
    assert_eq!(channels[1]["login"], "alpha");
    assert_eq!(channels[1]["is_live"], true);
    assert_eq!(channels[1]["stream"]["game_name"], "Dota 2");
    assert_eq!(channels[1]["stream"]["viewer_count"], 1234);

    let requests = server.received_requests().await.unwrap();
    let users = requests
        .iter()
        .find(|r| r.url.path() == "/helix/users")
        .unwrap();
    assert_eq!(users.url.query(), Some("login=bravo&login=alpha"));
}

#[tokio::test]
async fn channels_require_logins() {
    let server = MockServer::start().await;
    let app = app(&server);

    let (status, body) = get(&app, "/api/channels").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("logins"));

    let (status, _) = get(&app, "/api/channels?logins=,%20,").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn too_many_logins_is_rejected() {
    let server = MockServer::start().await;
    let logins: Vec<String> = (0..101).map(|i| format!("user{i}")).collect();
    let uri = format!("/api/channels?logins={}", logins.join(","));

    let (status, _) = get(&app(&server), &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_channel_videos_is_not_found() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = get(&app(&server), "/api/videos/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nobody"));
}

#[tokio::test]
async fn videos_of_known_channel() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .and(query_param("login", "gorgc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [user_json("42", "gorgc")],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/videos"))
        .and(query_param("user_id", "42"))
        .and(query_param("type", "archive"))
        .and(query_param("first", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "id": "2150000000",
                "stream_id": null,
                "user_id": "42",
                "user_login": "gorgc",
                "user_name": "Gorgc",
                "title": "past broadcast",
                "description": "",
                "created_at": "2024-05-01T12:00:00Z",
                "published_at": "2024-05-01T12:00:00Z",
                "url": "https://www.twitch.tv/videos/2150000000",
                "thumbnail_url": "",
                "viewable": "public",
                "view_count": 10,
                "language": "en",
                "type": "archive",
                "duration": "3h8m33s",
                "muted_segments": null,
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app(&server), "/api/videos/GorgC").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["videos"][0]["id"], "2150000000");
    assert_eq!(body["videos"][0]["duration"], "3h8m33s");
}

#[tokio::test]
async fn live_playlist_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gql"))
        .and(body_partial_json(serde_json::json!({
            "variables": { "isLive": true, "login": "foo" },
        })))
        .respond_with(gql_token("streamPlaybackAccessToken", "S", "V"))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app(&server), "/hls?channel=foo").await;
    assert_eq!(status, StatusCode::OK);

    let url = reqwest::Url::parse(body["url"].as_str().unwrap()).unwrap();
    assert_eq!(url.host_str(), Some("usher.ttvnw.net"));
    assert_eq!(url.path(), "/api/channel/hls/foo.m3u8");
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let param = |name: &str| {
        query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(param("sig"), Some("S"));
    assert_eq!(param("token"), Some("V"));
    let p: u32 = param("p").unwrap().parse().unwrap();
    assert!(p < 10_000_000);
}

#[tokio::test]
async fn vod_playlist_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gql"))
        .and(body_partial_json(serde_json::json!({
            "variables": { "isVod": true, "vodID": "123456" },
        })))
        .respond_with(gql_token("videoPlaybackAccessToken", "vs", "vv"))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app(&server), "/hls?vod=123456").await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://usher.ttvnw.net/vod/123456.m3u8?"));
    assert!(url.contains("sig=vs"));
    assert!(url.contains("token=vv"));
}

#[tokio::test]
async fn channel_wins_over_vod() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gql"))
        .and(body_partial_json(serde_json::json!({
            "variables": { "isLive": true, "login": "foo" },
        })))
        .respond_with(gql_token("streamPlaybackAccessToken", "S", "V"))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app(&server), "/hls?vod=1&channel=foo").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["url"].as_str().unwrap().contains("/api/channel/hls/foo.m3u8"));
}

#[tokio::test]
async fn hls_without_target_makes_no_calls() {
    let server = MockServer::start().await;

    let (status, body) = get(&app(&server), "/hls").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("channel or vod"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn offline_channel_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "streamPlaybackAccessToken": null },
        })))
        .mount(&server)
        .await;

    let (status, _) = get(&app(&server), "/hls?channel=sleeping").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_credentials_report_configuration_error() {
    let server = MockServer::start().await;
    let app = app_with(&server, &["--client-id=", "--client-secret="]);

    let (status, body) = get(&app, "/api/channels?logins=gorgc").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("TWITCH_CLIENT_ID"));
    assert!(server.received_requests().await.unwrap().is_empty());

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["api_credentials"], false);
}

#[tokio::test]
async fn upstream_failure_details_depend_on_environment() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let (status, body) = get(&app(&server), "/api/channels?logins=gorgc").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch channels");
    assert!(body["details"].as_str().unwrap().contains("maintenance"));
    assert!(body["stack"].is_string());

    let production = app_with(
        &server,
        &[
            "--client-id=app-id",
            "--client-secret=app-secret",
            "--environment=production",
        ],
    );
    let (status, body) = get(&production, "/api/channels?logins=gorgc").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({ "error": "Failed to fetch channels" }));
}

#[tokio::test]
async fn status_reports_token_state() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .mount(&server)
        .await;
    let app = app(&server);

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "development");
    assert_eq!(body["config"]["public_client_id"], true);
    assert_eq!(body["config"]["api_credentials"], true);
    assert_eq!(body["app_token"]["cached"], false);
    assert!(body["app_token"]["expires_at"].is_null());
    assert!(
        body["routes"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r == "GET /hls?channel=X")
    );

    get(&app, "/api/channels?logins=gorgc").await;
    let (_, body) = get(&app, "/").await;
    assert_eq!(body["app_token"]["cached"], true);
    assert!(body["app_token"]["expires_at"].is_string());
}

#[tokio::test]
async fn status_answers_during_slow_token_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "access_token": "app-token",
                    "expires_in": 3600,
                    "token_type": "bearer",
                }))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let app = app(&server);

    let refreshing = {
        let app = app.clone();
        tokio::spawn(async move {
            let req = Request::get("/api/channels?logins=gorgc").body(()).unwrap();
            app.handle(req).await
        })
    };
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let status = tokio::time::timeout(std::time::Duration::from_secs(1), get(&app, "/")).await;
    let (status, body) = status.expect("status route blocked behind token refresh");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["app_token"]["cached"], false);
    refreshing.abort();
}

#[tokio::test]
async fn cors_and_fallbacks() {
    let server = MockServer::start().await;
    let app = app(&server);

    let (status, headers, body) = send_method(&app, Method::OPTIONS, "/hls").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert!(body.is_empty());

    let (status, headers, _) = send_method(&app, Method::POST, "/hls?channel=foo").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers["access-control-allow-origin"], "*");

    let (status, body) = get(&app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, serde_json::json!({ "error": "Not found" }));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn oauth_callback_echoes_escaped_url() {
    let server = MockServer::start().await;
    let (status, headers, body) = send_method(
        &app(&server),
        Method::GET,
        "/oauth/callback?code=abc&state=%3Cx%3E",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    assert!(body.contains("http://proxy.test/oauth/callback?code=abc&amp;state=%3Cx%3E"));
    assert!(!body.contains("{{request_url}}"));
}
