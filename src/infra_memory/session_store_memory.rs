use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Writes between two sweeps of expired entries.
pub const PURGE_EVERY_WRITES: u64 = 256;

#[derive(Debug, Clone)]
struct SessionEntry {
    subject: PrincipalId,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local session store.
///
/// Expired entries are dropped when read, and swept in bulk every
/// `PURGE_EVERY_WRITES` writes so ids that are never presented again
/// do not accumulate.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: DashMap<TokenId, SessionEntry>,
    writes: AtomicU64,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns how many expired entries were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    fn insert_all(&self, subject: PrincipalId, grants: &[SessionGrant]) {
        let now = Instant::now();
        for grant in grants {
            self.entries.insert(
                grant.token_id.clone(),
                SessionEntry {
                    subject,
                    expires_at: now + grant.ttl,
                },
            );
        }
        self.note_write();
    }

    fn note_write(&self) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % PURGE_EVERY_WRITES == 0 {
            let dropped = self.purge_expired();
            if dropped > 0 {
                debug!(dropped, "expired sessions swept");
            }
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn mark_valid(
        &self,
        subject: PrincipalId,
        grants: &[SessionGrant],
    ) -> Result<(), SessionStoreError> {
        self.insert_all(subject, grants);
        Ok(())
    }

    async fn is_valid(&self, token_id: &TokenId) -> Result<bool, SessionStoreError> {
        let now = Instant::now();
        let live = match self.entries.get(token_id) {
            Some(entry) => entry.is_live(now),
            None => return Ok(false),
        };
        if !live {
            self.entries.remove_if(token_id, |_, entry| !entry.is_live(now));
        }
        Ok(live)
    }

    async fn revoke(&self, token_id: &TokenId) -> Result<bool, SessionStoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(token_id)
            .is_some_and(|(_, entry)| entry.is_live(now)))
    }

    async fn revoke_all_for_subject(
        &self,
        subject: PrincipalId,
    ) -> Result<u64, SessionStoreError> {
        let now = Instant::now();
        let mut dropped = 0u64;
        self.entries.retain(|_, entry| {
            if entry.subject == subject {
                if entry.is_live(now) {
                    dropped += 1;
                }
                false
            } else {
                entry.is_live(now)
            }
        });
        Ok(dropped)
    }

    async fn rotate(
        &self,
        subject: PrincipalId,
        old: &TokenId,
        grants: &[SessionGrant],
    ) -> Result<bool, SessionStoreError> {
        let now = Instant::now();
        // remove_if holds the shard lock, so only one caller can consume `old`.
        let consumed = self
            .entries
            .remove_if(old, |_, entry| entry.subject == subject && entry.is_live(now));
        if consumed.is_none() {
            return Ok(false);
        }
        self.insert_all(subject, grants);
        Ok(true)
    }
}
