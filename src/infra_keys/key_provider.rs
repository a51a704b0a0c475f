use crate::logger::*;
use crate::settings::KeysSettings;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MIN_SIGNING_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KeyLoadError {
    #[error("cannot read key file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("key file {path:?} is not a usable PEM-encoded RSA key")]
    Pem { path: PathBuf },
    #[error("no signing secret configured (set {env_var} or keys.signing_key_path)")]
    MissingSigningSecret { env_var: String },
    #[error("signing secret is invalid: {0}")]
    InvalidSigningSecret(String),
    #[error("public key does not belong to the private key")]
    Mismatch,
}

/// Symmetric secret for token signatures. Debug output never shows the bytes.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: Vec<u8>) -> Result<Self, KeyLoadError> {
        if bytes.len() < MIN_SIGNING_SECRET_LEN {
            return Err(KeyLoadError::InvalidSigningSecret(format!(
                "expected at least {} bytes, got {}",
                MIN_SIGNING_SECRET_LEN,
                bytes.len()
            )));
        }
        Ok(SigningSecret(bytes))
    }

    /// Accepts the base64url form printed by `generate_signing_key`, padded or not.
    pub fn from_base64url(encoded: &str) -> Result<Self, KeyLoadError> {
        let trimmed = encoded.trim().trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .map_err(|e| KeyLoadError::InvalidSigningSecret(e.to_string()))?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<{} bytes>)", self.0.len())
    }
}

pub fn load_private_key(path: impl AsRef<Path>) -> Result<RsaPrivateKey, KeyLoadError> {
    let path = path.as_ref();
    let pem = read_file(path)?;
    RsaPrivateKey::from_pkcs1_pem(&pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(&pem))
        .map_err(|_| KeyLoadError::Pem {
            path: path.to_path_buf(),
        })
}

pub fn load_public_key(path: impl AsRef<Path>) -> Result<RsaPublicKey, KeyLoadError> {
    let path = path.as_ref();
    let pem = read_file(path)?;
    RsaPublicKey::from_public_key_pem(&pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(&pem))
        .map_err(|_| KeyLoadError::Pem {
            path: path.to_path_buf(),
        })
}

/// A file path wins over the environment variable.
pub fn load_signing_secret(
    path: Option<&str>,
    env_var: &str,
) -> Result<SigningSecret, KeyLoadError> {
    if let Some(path) = path {
        let contents = read_file(Path::new(path))?;
        let value = contents
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        // Accept the `NAME=value` line the generator prints.
        let value = value.split_once('=').map_or(value, |(name, rest)| {
            if name == env_var { rest } else { value }
        });
        return SigningSecret::from_base64url(value);
    }

    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => SigningSecret::from_base64url(&value),
        _ => Err(KeyLoadError::MissingSigningSecret {
            env_var: env_var.to_string(),
        }),
    }
}

fn read_file(path: &Path) -> Result<String, KeyLoadError> {
    std::fs::read_to_string(path).map_err(|source| KeyLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// All key material the process needs, loaded once at startup and shared read-only.
#[derive(Clone)]
pub struct KeyProvider {
    private_key: Arc<RsaPrivateKey>,
    public_key: Arc<RsaPublicKey>,
    signing_secret: SigningSecret,
}

impl KeyProvider {
    pub fn load(settings: &KeysSettings) -> Result<Self, KeyLoadError> {
        let private_key = load_private_key(&settings.private_key_path)?;
        let public_key = load_public_key(&settings.public_key_path)?;
        let signing_secret =
            load_signing_secret(settings.signing_key_path.as_deref(), &settings.signing_key_env)?;

        let provider = Self::from_parts(private_key, public_key, signing_secret)?;
        info!(
            private_key = %settings.private_key_path,
            public_key = %settings.public_key_path,
            "key material loaded"
        );
        Ok(provider)
    }

    pub fn from_parts(
        private_key: RsaPrivateKey,
        public_key: RsaPublicKey,
        signing_secret: SigningSecret,
    ) -> Result<Self, KeyLoadError> {
        if private_key.to_public_key() != public_key {
            return Err(KeyLoadError::Mismatch);
        }
        Ok(KeyProvider {
            private_key: Arc::new(private_key),
            public_key: Arc::new(public_key),
            signing_secret,
        })
    }

    pub fn private_key(&self) -> Arc<RsaPrivateKey> {
        self.private_key.clone()
    }

    pub fn public_key(&self) -> Arc<RsaPublicKey> {
        self.public_key.clone()
    }

    pub fn signing_secret(&self) -> &SigningSecret {
        &self.signing_secret
    }
}

impl fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyProvider")
            .field("signing_secret", &self.signing_secret)
            .finish_non_exhaustive()
    }
}
