use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
                fields: None,
            }),
        }
    }
}

pub async fn health() -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok("OK")))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub principal: Principal,
    pub tokens: AuthTokens,
}

pub async fn register(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = RegisterInput {
        email: body.email,
        password: body.password,
        name: body.name,
    };
    let result = auth_service.register(input).await.map_err(reject_auth)?;

    let response = ApiResponse::ok(LoginResponse {
        principal: result.principal,
        tokens: result.tokens,
    });
    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        StatusCode::CREATED,
    ))
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let result = auth_service.login(input).await.map_err(reject_auth)?;

    Ok(warp::reply::json(&ApiResponse::ok(LoginResponse {
        principal: result.principal,
        tokens: result.tokens,
    })))
}

pub async fn refresh(
    refresh_token: String,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh_token(&refresh_token)
        .await
        .map_err(reject_auth)?;
    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    message: &'static str,
}

pub async fn logout(
    principal_id: PrincipalId,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(principal_id)
        .await
        .map_err(reject_auth)?;
    Ok(warp::reply::json(&ApiResponse::ok(LogoutResponse {
        message: "Logged out",
    })))
}

pub async fn me(
    principal_id: PrincipalId,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let principal = auth_service
        .current_principal(principal_id)
        .await
        .map_err(reject_auth)?;
    Ok(warp::reply::json(&ApiResponse::ok(principal)))
}

/// Echoes whatever JSON the gateway handed over. Development only.
pub async fn echo_decrypted(body: Bytes) -> Result<impl warp::Reply, warp::Rejection> {
    let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        debug!("decrypted body is not JSON: {}", e);
        reject::custom(ApiErrorCode::InvalidRequestBody)
    })?;
    Ok(warp::reply::json(&ApiResponse::ok(value)))
}
