#![allow(dead_code)]

use keystone::infra_keys::{KeyProvider, SigningSecret};
use keystone::infra_memory::{InMemoryPrincipalRepo, InMemorySessionStore};
use keystone::server::Server;
use keystone::settings::Settings;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::{Arc, LazyLock};
use warp::Filter;
use warp::http::Response;
use warp::hyper::body::Bytes;

// Small key; generation dominates test time otherwise.
pub static TEST_KEY: LazyLock<RsaPrivateKey> =
    LazyLock::new(|| RsaPrivateKey::new(&mut rand::rngs::OsRng, 1024).unwrap());

pub fn public_key() -> RsaPublicKey {
    RsaPublicKey::from(&*TEST_KEY)
}

pub fn keys() -> KeyProvider {
    KeyProvider::from_parts(
        TEST_KEY.clone(),
        public_key(),
        SigningSecret::new(vec![7u8; 32]).unwrap(),
    )
    .unwrap()
}

pub fn settings(environment: &str, encrypted_auth: bool) -> Settings {
    let mut settings = Settings::default();
    settings.app.environment = environment.to_string();
    settings.envelope.encrypted_auth = encrypted_auth;
    settings
}

pub fn api(
    settings: Settings,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone + 'static {
    let server = Server::assemble(
        &settings,
        &keys(),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryPrincipalRepo::new()),
    )
    .unwrap();
    keystone::api::api(Arc::new(server))
}

pub fn body_json(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

pub fn alice() -> Value {
    json!({
        "email": "alice@example.com",
        "password": "correct horse",
        "name": "Alice"
    })
}

pub async fn post_json<F>(api: &F, path: &str, body: &Value) -> Response<Bytes>
where
    F: Filter<Error = Infallible> + 'static,
    F::Extract: warp::Reply + Send,
{
    warp::test::request()
        .method("POST")
        .path(path)
        .json(body)
        .reply(api)
        .await
}

pub async fn with_bearer<F>(api: &F, method: &str, path: &str, token: &str) -> Response<Bytes>
where
    F: Filter<Error = Infallible> + 'static,
    F::Extract: warp::Reply + Send,
{
    warp::test::request()
        .method(method)
        .path(path)
        .header("authorization", format!("Bearer {}", token))
        .reply(api)
        .await
}

/// Registers alice and returns `(access_token, refresh_token)`.
pub async fn register_alice<F>(api: &F) -> (String, String)
where
    F: Filter<Error = Infallible> + 'static,
    F::Extract: warp::Reply + Send,
{
    let response = post_json(api, "/api/auth/register", &alice()).await;
    assert_eq!(response.status(), 201);
    let body = body_json(&response);
    (
        body["data"]["tokens"]["access_token"].as_str().unwrap().to_string(),
        body["data"]["tokens"]["refresh_token"].as_str().unwrap().to_string(),
    )
}
