use crate::api::v1::gateway::GatewayRejection;
use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use crate::logger::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, body) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.status(), ApiResponse::<()>::err(code.clone(), code.to_string()))
    } else if let Some(InvalidFields(fields)) = err.find::<InvalidFields>() {
        let code = ApiErrorCode::ValidationFailed;
        let mut body = ApiResponse::<()>::err(code.clone(), code.to_string());
        if let Some(error) = body.error.as_mut() {
            error.fields = Some(fields.clone());
        }
        (code.status(), body)
    } else if let Some(GatewayRejection(e)) = err.find::<GatewayRejection>() {
        // The gateway answers in its own `{"error": ...}` shape.
        let json = warp::reply::json(&GatewayErrorBody {
            error: e.to_string(),
        });
        return Ok(warp::reply::with_status(json, StatusCode::BAD_REQUEST));
    } else {
        let code = ApiErrorCode::from_warp(&err);
        (code.status(), ApiResponse::<()>::err(code.clone(), code.to_string()))
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

#[derive(Debug, Serialize)]
struct GatewayErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid request body")]
    InvalidRequestBody,
    #[error("Validation failed")]
    ValidationFailed,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Unsupported media type")]
    UnsupportedMediaType,
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidRequestBody => StatusCode::BAD_REQUEST,
            ApiErrorCode::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorCode::EmailTaken => StatusCode::CONFLICT,
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn unavailable<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        error!("Dependency unavailable: {}", error);
        ApiErrorCode::ServiceUnavailable
    }

    fn from_warp(err: &Rejection) -> ApiErrorCode {
        if err.is_not_found() {
            ApiErrorCode::NotFound
        } else if err.find::<warp::body::BodyDeserializeError>().is_some()
            || err.find::<reject::InvalidHeader>().is_some()
            || err.find::<reject::MissingHeader>().is_some()
            || err.find::<reject::LengthRequired>().is_some()
        {
            ApiErrorCode::InvalidRequestBody
        } else if err.find::<reject::PayloadTooLarge>().is_some() {
            ApiErrorCode::PayloadTooLarge
        } else if err.find::<reject::UnsupportedMediaType>().is_some() {
            ApiErrorCode::UnsupportedMediaType
        } else if err.find::<reject::MethodNotAllowed>().is_some() {
            ApiErrorCode::MethodNotAllowed
        } else {
            ApiErrorCode::internal(format!("unhandled rejection: {:?}", err))
        }
    }
}

impl reject::Reject for ApiErrorCode {}

/// Field-level validation failures; the only errors that carry detail.
#[derive(Debug)]
pub struct InvalidFields(pub Vec<FieldError>);

impl reject::Reject for InvalidFields {}

impl From<TokenError> for ApiErrorCode {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Unauthenticated => ApiErrorCode::InvalidToken,
            TokenError::InvalidRefreshToken => ApiErrorCode::InvalidRefreshToken,
            TokenError::StoreUnavailable(e) => ApiErrorCode::unavailable(e),
            TokenError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Validation(_) => ApiErrorCode::ValidationFailed,
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::EmailTaken => ApiErrorCode::EmailTaken,
            AuthError::PrincipalNotFound => ApiErrorCode::NotFound,
            AuthError::Token(e) => ApiErrorCode::from(e),
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

/// Keeps validation detail; everything else collapses to its code.
pub fn reject_auth(error: AuthError) -> Rejection {
    match error {
        AuthError::Validation(fields) => reject::custom(InvalidFields(fields)),
        other => reject::custom(ApiErrorCode::from(other)),
    }
}
