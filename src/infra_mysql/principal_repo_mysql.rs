use super::util::is_dup_key;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

const CREATE_PRINCIPAL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS principal (
    principal_id  BINARY(16)   NOT NULL PRIMARY KEY,
    email         VARCHAR(320) NOT NULL,
    name          VARCHAR(255) NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    created_at    TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
    UNIQUE KEY uq_principal_email (email)
)
"#;

pub struct MySqlPrincipalRepo {
    pool: MySqlPool,
}

impl MySqlPrincipalRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlPrincipalRepo { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), RepoError> {
        sqlx::query(CREATE_PRINCIPAL_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Store(e.to_string()))?;
        Ok(())
    }

    #[inline]
    fn id_as_bytes(id: &PrincipalId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn id_from_bytes(id: &[u8]) -> Result<PrincipalId, RepoError> {
        Ok(PrincipalId(
            Uuid::from_slice(id).map_err(|e| RepoError::Store(e.to_string()))?,
        ))
    }

    fn row_to_principal(row: &MySqlRow) -> Result<Principal, RepoError> {
        let id_bytes: Vec<u8> = row
            .try_get("principal_id")
            .map_err(|e| RepoError::Store(e.to_string()))?;
        let email: String = row
            .try_get("email")
            .map_err(|e| RepoError::Store(e.to_string()))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| RepoError::Store(e.to_string()))?;

        Ok(Principal {
            id: Self::id_from_bytes(&id_bytes)?,
            email,
            name,
        })
    }

    fn row_to_record(row: MySqlRow) -> Result<PrincipalRecord, RepoError> {
        let principal = Self::row_to_principal(&row)?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| RepoError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| RepoError::Store(e.to_string()))?;

        Ok(PrincipalRecord {
            principal,
            password_hash,
            created_at,
        })
    }
}

#[async_trait::async_trait]
impl PrincipalRepo for MySqlPrincipalRepo {
    async fn create(&self, new: NewPrincipal) -> Result<Principal, RepoError> {
        sqlx::query(
            r#"
INSERT INTO principal (principal_id, email, name, password_hash)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(Self::id_as_bytes(&new.id))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                RepoError::EmailTaken
            } else {
                RepoError::Store(e.to_string())
            }
        })?;

        Ok(Principal {
            id: new.id,
            email: new.email,
            name: new.name,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRecord>, RepoError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT principal_id, email, name, password_hash, created_at
FROM principal
WHERE email = ?
"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, RepoError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT principal_id, email, name
FROM principal
WHERE principal_id = ?
"#,
        )
        .bind(Self::id_as_bytes(&id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Store(e.to_string()))?;

        row_opt.as_ref().map(Self::row_to_principal).transpose()
    }
}
