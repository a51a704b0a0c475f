use crate::application_impl::SignupValidator;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::PrincipalRepo;
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;

pub struct RealAuthService {
    principal_repo: Arc<dyn PrincipalRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_manager: Arc<dyn TokenManager>,
    validator: SignupValidator,
}

impl RealAuthService {
    pub fn new(
        principal_repo: Arc<dyn PrincipalRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_manager: Arc<dyn TokenManager>,
        validator: SignupValidator,
    ) -> Self {
        Self {
            principal_repo,
            credential_hasher,
            token_manager,
            validator,
        }
    }

    async fn issue(&self, principal: Principal) -> Result<LoginResult, AuthError> {
        let pair = self.token_manager.issue_token_pair(&principal).await?;
        Ok(LoginResult {
            principal,
            tokens: AuthTokens::from_pair(pair, Utc::now()),
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<LoginResult, AuthError> {
        let RegisterInput {
            email,
            password,
            name,
        } = self
            .validator
            .validate_register(request)
            .map_err(AuthError::Validation)?;

        if self.principal_repo.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let principal = self
            .principal_repo
            .create(NewPrincipal {
                id: PrincipalId::new_random(),
                email,
                name,
                password_hash,
            })
            .await?;

        info!(principal = %principal.id, "principal registered");
        self.issue(principal).await
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = self
            .validator
            .validate_login(request)
            .map_err(AuthError::Validation)?;

        let record = self
            .principal_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &record.password_hash)
            .await?;
        if !ok {
            debug!(principal = %record.principal.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue(record.principal).await
    }

    async fn verify_token(&self, token: &str) -> Result<PrincipalId, AuthError> {
        Ok(self.token_manager.verify_access(token).await?)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let pair = self.token_manager.refresh(refresh_token).await?;
        Ok(AuthTokens::from_pair(pair, Utc::now()))
    }

    async fn logout(&self, principal_id: PrincipalId) -> Result<(), AuthError> {
        Ok(self.token_manager.logout(principal_id).await?)
    }

    async fn current_principal(&self, principal_id: PrincipalId) -> Result<Principal, AuthError> {
        self.principal_repo
            .find_by_id(principal_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)
    }
}
