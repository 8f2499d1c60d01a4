use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use quarterdeck::config::Config;
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;
    config.slack.client_id = "1234.5678".to_string();
    config.slack.client_secret = "test-secret".to_string();

    let state = quarterdeck::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    quarterdeck::api::router(state).await
}

fn session_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("expected a session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("expected a redirect")
        .to_str()
        .unwrap()
        .to_string()
}

/// Starts the OAuth flow, returning the session cookie and the state nonce
/// embedded in the authorize redirect.
async fn start_flow(app: &Router) -> (String, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/slack")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let cookie = session_cookie(&response);
    let redirect = location(&response);
    assert!(redirect.starts_with("https://slack.com/oauth/v2/authorize?"));

    let state = redirect
        .split("state=")
        .nth(1)
        .expect("authorize URL should carry a state nonce")
        .split('&')
        .next()
        .unwrap()
        .to_string();

    (cookie, state)
}

async fn callback(app: &Router, cookie: &str, query: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/auth/slack/callback{query}"))
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_initiate_issues_state_and_redirects_to_slack() {
    let app = spawn_app().await;

    let (_, state) = start_flow(&app).await;
    assert_eq!(state.len(), 64);
}

#[tokio::test]
async fn test_initiate_without_slack_config_is_unsupported() {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = quarterdeck::api::create_app_state_from_config(config)
        .await
        .unwrap();
    let app = quarterdeck::api::router(state).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/slack")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

/// Each initiate overwrites any stale nonce: only the newest state survives.
#[tokio::test]
async fn test_reinitiating_overwrites_the_stale_nonce() {
    let app = spawn_app().await;

    let (cookie, first_state) = start_flow(&app).await;

    // Second start on the same session.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/slack")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let redirect = location(&response);
    let second_state = redirect
        .split("state=")
        .nth(1)
        .unwrap()
        .split('&')
        .next()
        .unwrap()
        .to_string();

    assert_ne!(first_state, second_state);

    // The stale nonce no longer validates.
    let response = callback(
        &app,
        &cookie,
        &format!("?code=abc&state={first_state}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).contains("CSRF"));
}

#[tokio::test]
async fn test_callback_without_a_session_nonce_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/slack/callback?code=abc&state=forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let redirect = location(&response);
    assert!(redirect.starts_with("/login?error="));
    assert!(redirect.contains("CSRF"));
}

#[tokio::test]
async fn test_callback_with_mismatched_state_is_rejected() {
    let app = spawn_app().await;

    let (cookie, _state) = start_flow(&app).await;

    let response = callback(&app, &cookie, "?code=abc&state=not-the-nonce").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).contains("CSRF"));
}

/// The nonce is single use: it is cleared by the first check, so replaying a
/// previously-valid state fails even though it once matched.
#[tokio::test]
async fn test_state_nonce_is_single_use() {
    let app = spawn_app().await;

    let (cookie, state) = start_flow(&app).await;

    // First callback consumes the nonce. With a valid state but no code the
    // flow dies at the missing-code check, after the nonce is gone.
    let response = callback(&app, &cookie, &format!("?state={state}")).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).contains("authorization%20code"));

    // Replaying the same, previously-valid state now fails CSRF validation.
    let response = callback(&app, &cookie, &format!("?code=abc&state={state}")).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).contains("CSRF"));
}

#[tokio::test]
async fn test_provider_error_short_circuits_the_flow() {
    let app = spawn_app().await;

    let (cookie, state) = start_flow(&app).await;

    let response = callback(
        &app,
        &cookie,
        &format!("?error=access_denied&state={state}"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let redirect = location(&response);
    assert!(redirect.starts_with("/login?error="));
    assert!(redirect.contains("access_denied"));

    // The nonce was still consumed: a follow-up callback cannot reuse it.
    let response = callback(&app, &cookie, &format!("?code=abc&state={state}")).await;
    assert!(location(&response).contains("CSRF"));
}
