use super::error::*;
use super::gateway;
use super::handler;
use crate::application_port::*;
use crate::domain_model::PrincipalId;
use crate::server::*;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::filters::BoxedFilter;
use warp::hyper::body::Bytes;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handler::health);

    let register = warp::path!("auth" / "register")
        .and(warp::post())
        .and(auth_body::<handler::RegisterRequest>(&server))
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(auth_body::<handler::LoginRequest>(&server))
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::path!("auth" / "refresh")
        .and(warp::post())
        .and(bearer_token(ApiErrorCode::InvalidRefreshToken))
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path!("auth" / "logout")
        .and(warp::post())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::path!("auth" / "me")
        .and(warp::get())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::me);

    let expose_decrypt = server.expose_decrypt;
    let decrypt = warp::path("decrypt")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::any().and_then(move || async move {
            if expose_decrypt {
                Ok(())
            } else {
                Err(reject::not_found())
            }
        }))
        .untuple_one()
        .and(gateway::decrypted_body(
            server.envelope_cipher.clone(),
            server.body_limit_bytes,
        ))
        .and_then(handler::echo_decrypted);

    health
        .or(register)
        .or(login)
        .or(refresh)
        .or(logout)
        .or(me)
        .or(decrypt)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// JSON body for register/login, opened by the gateway first when
/// encrypted auth is switched on.
fn auth_body<T>(server: &Server) -> BoxedFilter<(T,)>
where
    T: DeserializeOwned + Send + 'static,
{
    let limit = server.body_limit_bytes;
    if server.encrypted_auth {
        gateway::decrypted_body(server.envelope_cipher.clone(), limit)
            .and_then(|body: Bytes| async move {
                serde_json::from_slice::<T>(&body)
                    .map_err(|_| reject::custom(ApiErrorCode::InvalidRequestBody))
            })
            .boxed()
    } else {
        warp::body::content_length_limit(limit)
            .and(warp::body::json())
            .boxed()
    }
}

fn bearer_token(
    missing: ApiErrorCode,
) -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str()).and_then(
        move |header: Option<String>| {
            let missing = missing.clone();
            async move {
                header
                    .as_deref()
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| reject::custom(missing))
            }
        },
    )
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (PrincipalId,), Error = warp::Rejection> + Clone {
    bearer_token(ApiErrorCode::InvalidToken).and_then(move |token: String| {
        let auth_service = auth_service.clone();
        async move {
            auth_service
                .verify_token(&token)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)
        }
    })
}
