mod common;

use common::*;
use serde_json::json;

#[tokio::test]
async fn health_answers_ok() {
    let api = api(settings("production", false));
    let response = warp::test::request()
        .method("GET")
        .path("/api/health")
        .reply(&api)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(&response)["data"], "OK");
}

#[tokio::test]
async fn register_then_me_then_logout() {
    let api = api(settings("production", false));

    let response = post_json(&api, "/api/auth/register", &alice()).await;
    assert_eq!(response.status(), 201);
    let body = body_json(&response);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["principal"]["email"], "alice@example.com");
    let tokens = &body["data"]["tokens"];
    assert_eq!(tokens["token_type"], "Bearer");
    let expires_in = tokens["expires_in"].as_i64().unwrap();
    assert!(expires_in > 0 && expires_in <= 900);
    let access = tokens["access_token"].as_str().unwrap().to_string();

    let me = with_bearer(&api, "GET", "/api/auth/me", &access).await;
    assert_eq!(me.status(), 200);
    assert_eq!(body_json(&me)["data"]["name"], "Alice");

    let logout = with_bearer(&api, "POST", "/api/auth/logout", &access).await;
    assert_eq!(logout.status(), 200);

    let me = with_bearer(&api, "GET", "/api/auth/me", &access).await;
    assert_eq!(me.status(), 401);
    let body = body_json(&me);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "InvalidToken");
}

#[tokio::test]
async fn login_accepts_only_the_right_password() {
    let api = api(settings("production", false));
    register_alice(&api).await;

    let wrong = post_json(
        &api,
        "/api/auth/login",
        &json!({"email": "alice@example.com", "password": "wrong horse"}),
    )
    .await;
    assert_eq!(wrong.status(), 401);
    assert_eq!(body_json(&wrong)["error"]["code"], "InvalidCredentials");

    let unknown = post_json(
        &api,
        "/api/auth/login",
        &json!({"email": "bob@example.com", "password": "correct horse"}),
    )
    .await;
    assert_eq!(unknown.status(), 401);
    assert_eq!(body_json(&unknown)["error"]["code"], "InvalidCredentials");

    let right = post_json(
        &api,
        "/api/auth/login",
        &json!({"email": " Alice@Example.com ", "password": "correct horse"}),
    )
    .await;
    assert_eq!(right.status(), 200);
    assert_eq!(body_json(&right)["data"]["principal"]["email"], "alice@example.com");
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let api = api(settings("production", false));
    let (_, refresh) = register_alice(&api).await;

    let first = with_bearer(&api, "POST", "/api/auth/refresh", &refresh).await;
    assert_eq!(first.status(), 200);
    let rotated = body_json(&first)["data"]["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(rotated, refresh);

    let replay = with_bearer(&api, "POST", "/api/auth/refresh", &refresh).await;
    assert_eq!(replay.status(), 401);
    assert_eq!(body_json(&replay)["error"]["code"], "InvalidRefreshToken");

    let next = with_bearer(&api, "POST", "/api/auth/refresh", &rotated).await;
    assert_eq!(next.status(), 200);
}

#[tokio::test]
async fn token_kinds_cannot_stand_in_for_each_other() {
    let api = api(settings("production", false));
    let (access, refresh) = register_alice(&api).await;

    let me = with_bearer(&api, "GET", "/api/auth/me", &refresh).await;
    assert_eq!(me.status(), 401);

    let refreshed = with_bearer(&api, "POST", "/api/auth/refresh", &access).await;
    assert_eq!(refreshed.status(), 401);
}

#[tokio::test]
async fn missing_or_garbled_bearer_is_unauthorized() {
    let api = api(settings("production", false));

    let missing = warp::test::request()
        .method("GET")
        .path("/api/auth/me")
        .reply(&api)
        .await;
    assert_eq!(missing.status(), 401);

    let garbled = with_bearer(&api, "GET", "/api/auth/me", "not.a.token").await;
    assert_eq!(garbled.status(), 401);

    let no_refresh = warp::test::request()
        .method("POST")
        .path("/api/auth/refresh")
        .reply(&api)
        .await;
    assert_eq!(no_refresh.status(), 401);
}

#[tokio::test]
async fn invalid_registration_reports_fields() {
    let api = api(settings("production", false));
    let response = post_json(
        &api,
        "/api/auth/register",
        &json!({"email": "not-an-email", "password": "short", "name": ""}),
    )
    .await;
    assert_eq!(response.status(), 422);

    let body = body_json(&response);
    assert_eq!(body["error"]["code"], "ValidationFailed");
    let fields: Vec<&str> = body["error"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password", "name"]);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let api = api(settings("production", false));
    register_alice(&api).await;

    let again = post_json(&api, "/api/auth/register", &alice()).await;
    assert_eq!(again.status(), 409);
    assert_eq!(body_json(&again)["error"]["code"], "EmailTaken");
}

#[tokio::test]
async fn unparsable_body_is_a_bad_request() {
    let api = api(settings("production", false));
    let response = warp::test::request()
        .method("POST")
        .path("/api/auth/login")
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&api)
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(body_json(&response)["error"]["code"], "InvalidRequestBody");
}

#[tokio::test]
async fn unknown_routes_and_methods() {
    let api = api(settings("production", false));

    let unknown = warp::test::request()
        .method("GET")
        .path("/api/nope")
        .reply(&api)
        .await;
    assert_eq!(unknown.status(), 404);

    let wrong_method = warp::test::request()
        .method("POST")
        .path("/api/auth/me")
        .reply(&api)
        .await;
    assert_eq!(wrong_method.status(), 405);
}

#[test]
fn oversized_token_lifetime_fails_at_assembly() {
    let mut settings = settings("production", false);
    settings.auth.refresh_ttl_secs = u64::MAX;
    let assembled = keystone::server::Server::assemble(
        &settings,
        &keys(),
        std::sync::Arc::new(keystone::infra_memory::InMemorySessionStore::new()),
        std::sync::Arc::new(keystone::infra_memory::InMemoryPrincipalRepo::new()),
    );
    assert!(assembled.is_err());
}
