use crate::application_port::CodecError;
use crate::domain_model::*;
use crate::domain_port::SessionStoreError;
use std::fmt;

/// What callers get to see. Reasons stay internal.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<SessionStoreError> for TokenError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::Unavailable(e) => TokenError::StoreUnavailable(e),
        }
    }
}

/// Why a presented token was turned away; used for logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Malformed,
    InvalidSignature,
    Expired,
    WrongKind,
    Revoked,
}

impl From<CodecError> for RejectReason {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed => RejectReason::Malformed,
            CodecError::Expired => RejectReason::Expired,
            CodecError::InvalidSignature | CodecError::Signing => RejectReason::InvalidSignature,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::Malformed => "malformed",
            RejectReason::InvalidSignature => "invalid_signature",
            RejectReason::Expired => "expired",
            RejectReason::WrongKind => "wrong_kind",
            RejectReason::Revoked => "revoked",
        };
        f.write_str(text)
    }
}

/// What to do with a revocation check when the session store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationPolicy {
    #[default]
    FailClosed,
    FailOpen,
}

#[async_trait::async_trait]
pub trait TokenManager: Send + Sync {
    async fn issue_token_pair(&self, principal: &Principal) -> Result<TokenPair, TokenError>;
    async fn verify_access(&self, token: &str) -> Result<PrincipalId, TokenError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError>;
    async fn logout(&self, subject: PrincipalId) -> Result<(), TokenError>;
}
