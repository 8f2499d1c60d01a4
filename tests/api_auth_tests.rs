use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use quarterdeck::config::Config;
use tower::ServiceExt;

/// Bootstrap key seeded by the initial migration (must match
/// m20260601_initial.rs).
const BOOTSTRAP_KEY: &str = "quarterdeck_bootstrap_key_please_rotate";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;

    let state = quarterdeck::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    quarterdeck::api::router(state).await
}

fn login_request(admin_key: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from(format!("{{\"admin_key\":\"{admin_key}\"}}")))
        .unwrap()
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

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Logs in with the given key and returns the session cookie plus the
/// response body.
async fn login(app: &Router, admin_key: &str) -> (String, serde_json::Value) {
    let response = app.clone().oneshot(login_request(admin_key)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = session_cookie(&response);
    (cookie, body_json(response).await)
}

#[tokio::test]
async fn test_login_rejects_unknown_and_empty_keys() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(login_request("definitely-not-a-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");

    let response = app.clone().oneshot(login_request("   ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_bootstrap_key_establishes_session() {
    let app = spawn_app().await;

    let (cookie, body) = login(&app, BOOTSTRAP_KEY).await;
    assert_eq!(body["data"]["username"], "root");
    assert_eq!(body["data"]["role"], "superadmin");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "root");
}

#[tokio::test]
async fn test_login_trims_surrounding_whitespace() {
    let app = spawn_app().await;

    let (_, body) = login(&app, &format!("  {BOOTSTRAP_KEY}  ")).await;
    assert_eq!(body["data"]["username"], "root");
}

#[tokio::test]
async fn test_me_requires_a_session() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_the_session() {
    let app = spawn_app().await;

    let (cookie, _) = login(&app, BOOTSTRAP_KEY).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// A key stays redeemable: two logins with the same key both succeed and
/// resolve to the same username.
#[tokio::test]
async fn test_admin_keys_are_reusable() {
    let app = spawn_app().await;

    let (_, first) = login(&app, BOOTSTRAP_KEY).await;
    let (_, second) = login(&app, BOOTSTRAP_KEY).await;

    assert_eq!(first["data"]["username"], second["data"]["username"]);
}

/// Usernames bound to keys are case-folded, so keys issued for "Bob" and
/// "BOB" resolve to one account.
#[tokio::test]
async fn test_key_redemption_case_folds_usernames() {
    let app = spawn_app().await;

    let (root_cookie, _) = login(&app, BOOTSTRAP_KEY).await;

    let mut keys = Vec::new();
    for name in ["Bob", "BOB"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/admin/keys")
                    .header(header::COOKIE, &root_cookie)
                    .header("Content-Type", "application/json")
                    .body(Body::from(format!("{{\"name\":\"{name}\"}}")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        keys.push(body["data"]["key"].as_str().unwrap().to_string());
    }

    for key in &keys {
        let (_, body) = login(&app, key).await;
        assert_eq!(body["data"]["username"], "bob");
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/users")
                .header(header::COOKIE, &root_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;

    let bobs: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|user| user["username"] == "bob")
        .collect();
    assert_eq!(bobs.len(), 1);
}

/// Revoking a key kills future logins with it but leaves sessions it already
/// established untouched.
#[tokio::test]
async fn test_key_revocation_spares_live_sessions() {
    let app = spawn_app().await;

    let (root_cookie, _) = login(&app, BOOTSTRAP_KEY).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/keys")
                .header(header::COOKIE, &root_cookie)
                .header("Content-Type", "application/json")
                .body(Body::from("{\"name\":\"fieldagent\"}"))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    let key = body["data"]["key"].as_str().unwrap().to_string();

    let (agent_cookie, _) = login(&app, &key).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/keys")
                .header(header::COOKIE, &root_cookie)
                .header("Content-Type", "application/json")
                .body(Body::from(format!("{{\"key\":\"{key}\"}}")))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Future logins with the key fail...
    let response = app.clone().oneshot(login_request(&key)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // ...but the session the key established is still alive.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, &agent_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
