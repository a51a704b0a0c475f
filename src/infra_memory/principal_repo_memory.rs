use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Principal storage for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalRepo {
    records: DashMap<PrincipalId, PrincipalRecord>,
    by_email: DashMap<String, PrincipalId>,
}

impl InMemoryPrincipalRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PrincipalRepo for InMemoryPrincipalRepo {
    async fn create(&self, new: NewPrincipal) -> Result<Principal, RepoError> {
        match self.by_email.entry(new.email.clone()) {
            Entry::Occupied(_) => Err(RepoError::EmailTaken),
            Entry::Vacant(slot) => {
                let principal = Principal {
                    id: new.id,
                    email: new.email,
                    name: new.name,
                };
                self.records.insert(
                    new.id,
                    PrincipalRecord {
                        principal: principal.clone(),
                        password_hash: new.password_hash,
                        created_at: Utc::now(),
                    },
                );
                slot.insert(new.id);
                Ok(principal)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRecord>, RepoError> {
        let Some(id) = self.by_email.get(email).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.records.get(&id).map(|record| record.clone()))
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, RepoError> {
        Ok(self.records.get(&id).map(|record| record.principal.clone()))
    }
}
