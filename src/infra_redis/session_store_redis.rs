use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisWrite, Script, ToRedisArgs};
use std::time::Duration;

const SESSION_MARK: &str = include_str!("session_mark.lua");
const SESSION_ROTATE: &str = include_str!("session_rotate.lua");
const SESSION_REVOKE_ALL: &str = include_str!("session_revoke_all.lua");

/// Layout:
/// - `<prefix>:tok:<jti>` holds the subject id, expiring with the token.
/// - `<prefix>:sub:<subject>` is a sorted set of that subject's token keys,
///   scored by expiry; every write prunes members that have already expired,
///   so it only ever holds live sessions.
///
/// Multi-key updates run as Lua scripts so Redis applies them atomically.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    mark: Script,
    rotate: Script,
    revoke_all: Script,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
            mark: Script::new(SESSION_MARK),
            rotate: Script::new(SESSION_ROTATE),
            revoke_all: Script::new(SESSION_REVOKE_ALL),
        }
    }

    fn token_key(&self, token_id: &TokenId) -> String {
        format!("{}:tok:{}", self.prefix, token_id)
    }

    fn subject_key(&self, subject: PrincipalId) -> String {
        format!("{}:sub:{}", self.prefix, subject)
    }

    #[inline]
    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

impl ToRedisArgs for PrincipalId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes())
    }
}

fn unavailable(e: redis::RedisError) -> SessionStoreError {
    SessionStoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn mark_valid(
        &self,
        subject: PrincipalId,
        grants: &[SessionGrant],
    ) -> Result<(), SessionStoreError> {
        let mut invocation = self.mark.prepare_invoke();
        invocation.key(self.subject_key(subject)).arg(&subject);
        for grant in grants {
            invocation
                .key(self.token_key(&grant.token_id))
                .arg(Self::ttl_secs(grant.ttl));
        }

        let mut conn = self.conn.clone();
        let _: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn is_valid(&self, token_id: &TokenId) -> Result<bool, SessionStoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(self.token_key(token_id))
            .await
            .map_err(unavailable)?;
        Ok(exists)
    }

    async fn revoke(&self, token_id: &TokenId) -> Result<bool, SessionStoreError> {
        // The index entry is left behind; revoke_all tolerates dangling keys.
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .del(self.token_key(token_id))
            .await
            .map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn revoke_all_for_subject(
        &self,
        subject: PrincipalId,
    ) -> Result<u64, SessionStoreError> {
        let mut conn = self.conn.clone();
        let dropped: i64 = self
            .revoke_all
            .key(self.subject_key(subject))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(dropped.max(0) as u64)
    }

    async fn rotate(
        &self,
        subject: PrincipalId,
        old: &TokenId,
        grants: &[SessionGrant],
    ) -> Result<bool, SessionStoreError> {
        let mut invocation = self.rotate.prepare_invoke();
        invocation
            .key(self.token_key(old))
            .key(self.subject_key(subject))
            .arg(&subject);
        for grant in grants {
            invocation
                .key(self.token_key(&grant.token_id))
                .arg(Self::ttl_secs(grant.ttl));
        }

        let mut conn = self.conn.clone();
        let status: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(status == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_never_rounds_down_to_zero() {
        assert_eq!(RedisSessionStore::ttl_secs(Duration::from_millis(300)), 1);
        assert_eq!(RedisSessionStore::ttl_secs(Duration::from_secs(900)), 900);
    }

    // The tests below need a running redis-server:
    // $ KEYSTONE_TEST_REDIS=redis://127.0.0.1:6379 cargo test -- --ignored

    const HOUR: Duration = Duration::from_secs(3600);

    async fn live_store() -> RedisSessionStore {
        let dsn = std::env::var("KEYSTONE_TEST_REDIS")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let conn = redis::Client::open(dsn)
            .unwrap()
            .get_connection_manager()
            .await
            .unwrap();
        RedisSessionStore::new(conn, format!("keystone-test:{}", uuid::Uuid::new_v4()))
    }

    fn grant(ttl: Duration) -> SessionGrant {
        SessionGrant {
            token_id: TokenId::new_random(),
            ttl,
        }
    }

    async fn index_len(store: &RedisSessionStore, subject: PrincipalId) -> i64 {
        let mut conn = store.conn.clone();
        conn.zcard(store.subject_key(subject)).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "needs a live redis-server"]
    async fn rotate_requires_matching_subject() {
        let store = live_store().await;
        let owner = PrincipalId::new_random();
        let old = grant(HOUR);
        store.mark_valid(owner, &[old.clone()]).await.unwrap();

        let new = grant(HOUR);
        let stranger = PrincipalId::new_random();
        assert!(!store.rotate(stranger, &old.token_id, &[new.clone()]).await.unwrap());
        assert!(store.is_valid(&old.token_id).await.unwrap());
        assert!(!store.is_valid(&new.token_id).await.unwrap());

        assert!(store.rotate(owner, &old.token_id, &[new.clone()]).await.unwrap());
        assert!(!store.is_valid(&old.token_id).await.unwrap());
        assert!(store.is_valid(&new.token_id).await.unwrap());
        assert!(!store.rotate(owner, &old.token_id, &[]).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "needs a live redis-server"]
    async fn concurrent_rotations_have_one_winner() {
        let store = std::sync::Arc::new(live_store().await);
        let owner = PrincipalId::new_random();
        let old = grant(HOUR);
        store.mark_valid(owner, &[old.clone()]).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let old_id = old.token_id.clone();
            handles.push(tokio::spawn(async move {
                store.rotate(owner, &old_id, &[grant(HOUR), grant(HOUR)]).await.unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(index_len(&store, owner).await, 2);
    }

    #[tokio::test]
    #[ignore = "needs a live redis-server"]
    async fn revoke_all_only_touches_one_subject() {
        let store = live_store().await;
        let alice = PrincipalId::new_random();
        let bob = PrincipalId::new_random();
        let (a1, a2, b1) = (grant(HOUR), grant(HOUR), grant(HOUR));
        store.mark_valid(alice, &[a1.clone(), a2.clone()]).await.unwrap();
        store.mark_valid(bob, &[b1.clone()]).await.unwrap();

        assert_eq!(store.revoke_all_for_subject(alice).await.unwrap(), 2);
        assert!(!store.is_valid(&a1.token_id).await.unwrap());
        assert!(!store.is_valid(&a2.token_id).await.unwrap());
        assert!(store.is_valid(&b1.token_id).await.unwrap());
        assert_eq!(index_len(&store, alice).await, 0);
        store.revoke_all_for_subject(bob).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs a live redis-server"]
    async fn subject_index_drops_expired_members() {
        let store = live_store().await;
        let subject = PrincipalId::new_random();
        let short = grant(Duration::from_secs(1));
        let long = grant(HOUR);
        store.mark_valid(subject, &[short.clone(), long.clone()]).await.unwrap();
        assert_eq!(index_len(&store, subject).await, 2);

        tokio::time::sleep(Duration::from_millis(2100)).await;

        let next = grant(HOUR);
        assert!(store.rotate(subject, &long.token_id, &[next.clone()]).await.unwrap());
        assert_eq!(index_len(&store, subject).await, 1);
        assert_eq!(store.revoke_all_for_subject(subject).await.unwrap(), 1);
    }
}
