use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{SessionGrant, SessionStore, SessionStoreError};
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TokenLifetimes {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

pub struct RealTokenManager {
    codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    lifetimes: TokenLifetimes,
    revocation_policy: RevocationPolicy,
}

impl RealTokenManager {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        lifetimes: TokenLifetimes,
        revocation_policy: RevocationPolicy,
    ) -> Self {
        Self {
            codec,
            session_store,
            lifetimes,
            revocation_policy,
        }
    }

    /// Mint and sign a fresh pair without touching the store.
    fn mint_pair(
        &self,
        subject: PrincipalId,
    ) -> Result<(TokenPair, [SessionGrant; 2]), TokenError> {
        let now = Utc::now();
        let access = TokenClaims::mint(subject, TokenKind::Access, now, self.lifetimes.access_ttl);
        let refresh =
            TokenClaims::mint(subject, TokenKind::Refresh, now, self.lifetimes.refresh_ttl);

        let access_token = self
            .codec
            .encode(&access)
            .map_err(|e| TokenError::InternalError(e.to_string()))?;
        let refresh_token = self
            .codec
            .encode(&refresh)
            .map_err(|e| TokenError::InternalError(e.to_string()))?;

        let grants = [
            SessionGrant {
                token_id: access.token_id.clone(),
                ttl: Duration::from_secs(access.remaining_secs(now)),
            },
            SessionGrant {
                token_id: refresh.token_id.clone(),
                ttl: Duration::from_secs(refresh.remaining_secs(now)),
            },
        ];
        let pair = TokenPair {
            access_token,
            refresh_token,
            access_token_expires_at: access.expires_at,
            refresh_token_expires_at: refresh.expires_at,
        };
        Ok((pair, grants))
    }

    fn decode_kind(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<TokenClaims, RejectReason> {
        let claims = self.codec.decode(token).map_err(RejectReason::from)?;
        if claims.kind != expected {
            return Err(RejectReason::WrongKind);
        }
        Ok(claims)
    }
}

#[async_trait::async_trait]
impl TokenManager for RealTokenManager {
    async fn issue_token_pair(&self, principal: &Principal) -> Result<TokenPair, TokenError> {
        let (pair, grants) = self.mint_pair(principal.id)?;
        self.session_store.mark_valid(principal.id, &grants).await?;
        debug!(subject = %principal.id, "token pair issued");
        Ok(pair)
    }

    async fn verify_access(&self, token: &str) -> Result<PrincipalId, TokenError> {
        let claims = self.decode_kind(token, TokenKind::Access).map_err(|reason| {
            debug!(%reason, "access token rejected");
            TokenError::Unauthenticated
        })?;

        match self.session_store.is_valid(&claims.token_id).await {
            Ok(true) => Ok(claims.subject),
            Ok(false) => {
                debug!(reason = %RejectReason::Revoked, subject = %claims.subject, "access token rejected");
                Err(TokenError::Unauthenticated)
            }
            Err(SessionStoreError::Unavailable(e)) => match self.revocation_policy {
                RevocationPolicy::FailClosed => {
                    error!("revocation check failed, rejecting: {}", e);
                    Err(TokenError::StoreUnavailable(e))
                }
                RevocationPolicy::FailOpen => {
                    warn!("revocation check failed, accepting signed token: {}", e);
                    Ok(claims.subject)
                }
            },
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let claims = self
            .decode_kind(refresh_token, TokenKind::Refresh)
            .map_err(|reason| {
                debug!(%reason, "refresh token rejected");
                TokenError::InvalidRefreshToken
            })?;

        let (pair, grants) = self.mint_pair(claims.subject)?;

        // Rotation: consume the old id and record the new pair in one step.
        let rotated = self
            .session_store
            .rotate(claims.subject, &claims.token_id, &grants)
            .await?;
        if !rotated {
            warn!(
                reason = %RejectReason::Revoked,
                subject = %claims.subject,
                "refresh token reuse or revoked session"
            );
            return Err(TokenError::InvalidRefreshToken);
        }

        debug!(subject = %claims.subject, "refresh token rotated");
        Ok(pair)
    }

    async fn logout(&self, subject: PrincipalId) -> Result<(), TokenError> {
        let dropped = self.session_store.revoke_all_for_subject(subject).await?;
        info!(%subject, dropped, "sessions revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{JwtConfig, JwtHs256Codec};
    use crate::infra_keys::SigningSecret;
    use crate::infra_memory::InMemorySessionStore;

    /// Store whose backend is always down.
    struct DownSessionStore;

    #[async_trait::async_trait]
    impl SessionStore for DownSessionStore {
        async fn mark_valid(
            &self,
            _subject: PrincipalId,
            _grants: &[SessionGrant],
        ) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Unavailable("connection refused".into()))
        }

        async fn is_valid(&self, _token_id: &TokenId) -> Result<bool, SessionStoreError> {
            Err(SessionStoreError::Unavailable("connection refused".into()))
        }

        async fn revoke(&self, _token_id: &TokenId) -> Result<bool, SessionStoreError> {
            Err(SessionStoreError::Unavailable("connection refused".into()))
        }

        async fn revoke_all_for_subject(
            &self,
            _subject: PrincipalId,
        ) -> Result<u64, SessionStoreError> {
            Err(SessionStoreError::Unavailable("connection refused".into()))
        }

        async fn rotate(
            &self,
            _subject: PrincipalId,
            _old: &TokenId,
            _grants: &[SessionGrant],
        ) -> Result<bool, SessionStoreError> {
            Err(SessionStoreError::Unavailable("connection refused".into()))
        }
    }

    fn codec() -> Arc<dyn TokenCodec> {
        Arc::new(JwtHs256Codec::new(
            JwtConfig {
                issuer: "keystone.test".into(),
                audience: "keystone-tests".into(),
                leeway_secs: 0,
            },
            &SigningSecret::new(vec![42u8; 32]).unwrap(),
        ))
    }

    fn lifetimes() -> TokenLifetimes {
        TokenLifetimes {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    fn manager_with(store: Arc<dyn SessionStore>, policy: RevocationPolicy) -> RealTokenManager {
        RealTokenManager::new(codec(), store, lifetimes(), policy)
    }

    fn manager() -> RealTokenManager {
        manager_with(Arc::new(InMemorySessionStore::new()), RevocationPolicy::FailClosed)
    }

    fn principal() -> Principal {
        Principal {
            id: PrincipalId::new_random(),
            email: "alice@example.com".into(),
            name: "Alice".into(),
        }
    }

    #[tokio::test]
    async fn issued_access_token_verifies_to_subject() {
        let manager = manager();
        let alice = principal();
        let pair = manager.issue_token_pair(&alice).await.unwrap();
        let subject = manager
            .verify_access(pair.access_token.as_str())
            .await
            .unwrap();
        assert_eq!(subject, alice.id);
        assert!(pair.refresh_token_expires_at > pair.access_token_expires_at);
    }

    #[tokio::test]
    async fn token_kinds_are_not_interchangeable() {
        let manager = manager();
        let pair = manager.issue_token_pair(&principal()).await.unwrap();

        assert!(matches!(
            manager.verify_access(pair.refresh_token.as_str()).await,
            Err(TokenError::Unauthenticated)
        ));
        assert!(matches!(
            manager.refresh(pair.access_token.as_str()).await,
            Err(TokenError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn refresh_token_rotates_exactly_once() {
        let manager = manager();
        let alice = principal();
        let pair = manager.issue_token_pair(&alice).await.unwrap();

        let rotated = manager.refresh(pair.refresh_token.as_str()).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);
        assert_eq!(
            manager
                .verify_access(rotated.access_token.as_str())
                .await
                .unwrap(),
            alice.id
        );

        assert!(matches!(
            manager.refresh(pair.refresh_token.as_str()).await,
            Err(TokenError::InvalidRefreshToken)
        ));
        assert!(manager.refresh(rotated.refresh_token.as_str()).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_refresh_with_same_token_has_one_winner() {
        let manager = Arc::new(manager());
        let pair = manager.issue_token_pair(&principal()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            let token = pair.refresh_token.clone();
            handles.push(tokio::spawn(async move {
                manager.refresh(token.as_str()).await.is_ok()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn logout_revokes_every_earlier_token() {
        let manager = manager();
        let alice = principal();
        let bob = principal();
        let first = manager.issue_token_pair(&alice).await.unwrap();
        let second = manager.issue_token_pair(&alice).await.unwrap();
        let bobs = manager.issue_token_pair(&bob).await.unwrap();

        manager.logout(alice.id).await.unwrap();

        for pair in [&first, &second] {
            assert!(matches!(
                manager.verify_access(pair.access_token.as_str()).await,
                Err(TokenError::Unauthenticated)
            ));
            assert!(matches!(
                manager.refresh(pair.refresh_token.as_str()).await,
                Err(TokenError::InvalidRefreshToken)
            ));
        }
        assert_eq!(
            manager.verify_access(bobs.access_token.as_str()).await.unwrap(),
            bob.id
        );

        let fresh = manager.issue_token_pair(&alice).await.unwrap();
        assert!(manager.verify_access(fresh.access_token.as_str()).await.is_ok());
    }

    #[tokio::test]
    async fn individually_revoked_token_is_rejected() {
        let store = Arc::new(InMemorySessionStore::new());
        let manager = manager_with(store.clone(), RevocationPolicy::FailClosed);
        let pair = manager.issue_token_pair(&principal()).await.unwrap();

        let claims = codec().decode(pair.access_token.as_str()).unwrap();
        assert!(store.revoke(&claims.token_id).await.unwrap());
        assert!(matches!(
            manager.verify_access(pair.access_token.as_str()).await,
            Err(TokenError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn unreachable_store_fails_closed_by_default() {
        let healthy = manager();
        let pair = healthy.issue_token_pair(&principal()).await.unwrap();

        let closed = manager_with(Arc::new(DownSessionStore), RevocationPolicy::FailClosed);
        assert!(matches!(
            closed.verify_access(pair.access_token.as_str()).await,
            Err(TokenError::StoreUnavailable(_))
        ));
        assert!(matches!(
            closed.refresh(pair.refresh_token.as_str()).await,
            Err(TokenError::StoreUnavailable(_))
        ));
        assert!(matches!(
            closed.issue_token_pair(&principal()).await,
            Err(TokenError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn fail_open_policy_accepts_signed_token_when_store_is_down() {
        let healthy = manager();
        let alice = principal();
        let pair = healthy.issue_token_pair(&alice).await.unwrap();

        let open = manager_with(Arc::new(DownSessionStore), RevocationPolicy::FailOpen);
        assert_eq!(
            open.verify_access(pair.access_token.as_str()).await.unwrap(),
            alice.id
        );
        assert!(matches!(
            open.verify_access("garbage").await,
            Err(TokenError::Unauthenticated)
        ));
        assert!(matches!(
            open.refresh(pair.refresh_token.as_str()).await,
            Err(TokenError::StoreUnavailable(_))
        ));
    }

    /// Records every `mark_valid` batch, then delegates to memory.
    #[derive(Default)]
    struct RecordingSessionStore {
        inner: InMemorySessionStore,
        batches: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl SessionStore for RecordingSessionStore {
        async fn mark_valid(
            &self,
            subject: PrincipalId,
            grants: &[SessionGrant],
        ) -> Result<(), SessionStoreError> {
            self.batches.lock().unwrap().push(grants.len());
            self.inner.mark_valid(subject, grants).await
        }

        async fn is_valid(&self, token_id: &TokenId) -> Result<bool, SessionStoreError> {
            self.inner.is_valid(token_id).await
        }

        async fn revoke(&self, token_id: &TokenId) -> Result<bool, SessionStoreError> {
            self.inner.revoke(token_id).await
        }

        async fn revoke_all_for_subject(
            &self,
            subject: PrincipalId,
        ) -> Result<u64, SessionStoreError> {
            self.inner.revoke_all_for_subject(subject).await
        }

        async fn rotate(
            &self,
            subject: PrincipalId,
            old: &TokenId,
            grants: &[SessionGrant],
        ) -> Result<bool, SessionStoreError> {
            self.inner.rotate(subject, old, grants).await
        }
    }

    #[tokio::test]
    async fn issuance_records_the_pair_in_one_store_call() {
        let store = Arc::new(RecordingSessionStore::default());
        let manager = manager_with(store.clone(), RevocationPolicy::FailClosed);
        let alice = principal();
        manager.issue_token_pair(&alice).await.unwrap();

        assert_eq!(*store.batches.lock().unwrap(), vec![2]);
        assert_eq!(store.inner.len(), 2);
    }
}
