use crate::domain_model::*;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// A token id to record as valid, together with how long it should live.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub token_id: TokenId,
    pub ttl: Duration,
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Record every grant as active for `subject`, as one atomic step.
    async fn mark_valid(
        &self,
        subject: PrincipalId,
        grants: &[SessionGrant],
    ) -> Result<(), SessionStoreError>;

    /// A missing or expired key is `Ok(false)`.
    async fn is_valid(&self, token_id: &TokenId) -> Result<bool, SessionStoreError>;

    /// Returns whether the token was still recorded.
    async fn revoke(&self, token_id: &TokenId) -> Result<bool, SessionStoreError>;

    /// Returns how many token ids were dropped.
    async fn revoke_all_for_subject(&self, subject: PrincipalId)
    -> Result<u64, SessionStoreError>;

    /// Consume `old` and record every grant, as one atomic step.
    /// Returns `Ok(false)` without touching anything if `old` is not valid for `subject`.
    async fn rotate(
        &self,
        subject: PrincipalId,
        old: &TokenId,
        grants: &[SessionGrant],
    ) -> Result<bool, SessionStoreError>;
}
