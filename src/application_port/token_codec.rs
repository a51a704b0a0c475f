use crate::domain_model::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token could not be signed")]
    Signing,
}

/// Turns claims into signed strings and back. Holds no per-token state.
pub trait TokenCodec: Send + Sync {
    fn encode(&self, claims: &TokenClaims) -> Result<SignedToken, CodecError>;

    /// Verifies the integrity tag before any claim is looked at.
    fn decode(&self, token: &str) -> Result<TokenClaims, CodecError>;
}
