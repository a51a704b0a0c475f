use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_keys::KeyProvider;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub envelope_cipher: Arc<dyn EnvelopeCipher>,
    /// Mount the `/decrypt` echo endpoint.
    pub expose_decrypt: bool,
    /// Route register/login bodies through the decryption gateway.
    pub encrypted_auth: bool,
    pub body_limit_bytes: u64,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let keys = KeyProvider::load(&settings.keys)?;

        let session_store: Arc<dyn SessionStore> = match settings.session_store.backend.as_str()
        {
            "memory" => Arc::new(InMemorySessionStore::new()),
            "redis" => {
                let redis_client = redis::Client::open(settings.session_store.redis_dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(
                    redis_manager,
                    settings.session_store.prefix.clone(),
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown session store backend: {}", other)),
        };

        let mut pool = None;
        let principal_repo: Arc<dyn PrincipalRepo> = match settings.persistence.backend.as_str() {
            "memory" => Arc::new(InMemoryPrincipalRepo::new()),
            "mysql" => {
                let mysql_pool = Pool::<MySql>::connect(&settings.persistence.mysql_dsn).await?;
                let repo = MySqlPrincipalRepo::new(mysql_pool.clone());
                if settings.persistence.auto_migrate {
                    repo.ensure_schema().await?;
                }
                pool = Some(mysql_pool);
                Arc::new(repo)
            }
            other => return Err(anyhow::anyhow!("Unknown persistence backend: {}", other)),
        };

        let mut server = Self::assemble(settings, &keys, session_store, principal_repo)?;
        server.pool = pool;
        info!(
            session_store = %settings.session_store.backend,
            persistence = %settings.persistence.backend,
            environment = %settings.app.environment,
            "server assembled"
        );
        Ok(server)
    }

    /// Wires the services over already-built adapters.
    pub fn assemble(
        settings: &Settings,
        keys: &KeyProvider,
        session_store: Arc<dyn SessionStore>,
        principal_repo: Arc<dyn PrincipalRepo>,
    ) -> anyhow::Result<Self> {
        settings.validate()?;

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(
            JwtConfig {
                issuer: settings.auth.issuer.clone(),
                audience: settings.auth.audience.clone(),
                leeway_secs: settings.auth.leeway_secs,
            },
            keys.signing_secret(),
        ));

        let token_manager: Arc<dyn TokenManager> = Arc::new(RealTokenManager::new(
            token_codec,
            session_store,
            TokenLifetimes {
                access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
                refresh_ttl: Duration::from_secs(settings.auth.refresh_ttl_secs),
            },
            settings.auth.revocation_policy,
        ));

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            principal_repo,
            credential_hasher,
            token_manager,
            SignupValidator::new(settings.auth.min_password_len),
        ));

        let padding: KeyWrapPadding = settings
            .envelope
            .padding
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let envelope_cipher: Arc<dyn EnvelopeCipher> = Arc::new(RsaAesGcmCipher::new(
            keys.private_key(),
            padding,
            settings.envelope.max_envelope_bytes,
        ));

        let expose_decrypt = settings.app.is_development();
        if expose_decrypt {
            warn!("development mode: /decrypt echo endpoint is mounted");
        }

        Ok(Self {
            auth_service,
            envelope_cipher,
            expose_decrypt,
            encrypted_auth: settings.envelope.encrypted_auth,
            body_limit_bytes: settings.http.body_limit_bytes,
            pool: None,
        })
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
        info!("server resources released");
    }
}
