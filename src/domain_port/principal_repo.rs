use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("email already registered")]
    EmailTaken,
    #[error("store error: {0}")]
    Store(String),
}

#[async_trait::async_trait]
pub trait PrincipalRepo: Send + Sync {
    /// Fails with `EmailTaken` if the email is already in use.
    async fn create(&self, principal: NewPrincipal) -> Result<Principal, RepoError>;

    /// Fetch a principal with its credential (for login).
    async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRecord>, RepoError>;

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, RepoError>;
}
