use crate::application_port::{EnvelopeCipher, EnvelopeError};
use crate::domain_model::Envelope;
use aes_gcm::aead::{Aead, KeyInit, Nonce};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::str::FromStr;
use std::sync::Arc;

pub const GCM_NONCE_LEN: usize = 12;
pub const GCM_TAG_LEN: usize = 16;

/// How the symmetric key is wrapped with the RSA key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWrapPadding {
    OaepSha256,
    Pkcs1v15,
}

impl FromStr for KeyWrapPadding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oaep_sha256" => Ok(KeyWrapPadding::OaepSha256),
            "pkcs1v15" => Ok(KeyWrapPadding::Pkcs1v15),
            other => Err(format!("unknown key wrap padding: {}", other)),
        }
    }
}

/// RSA key unwrap followed by AES-GCM (`nonce || ciphertext || tag`).
pub struct RsaAesGcmCipher {
    private_key: Arc<RsaPrivateKey>,
    padding: KeyWrapPadding,
    max_envelope_bytes: usize,
}

impl RsaAesGcmCipher {
    pub fn new(
        private_key: Arc<RsaPrivateKey>,
        padding: KeyWrapPadding,
        max_envelope_bytes: usize,
    ) -> Self {
        Self {
            private_key,
            padding,
            max_envelope_bytes,
        }
    }

    fn unwrap_key(&self, wrapped: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let mut rng = OsRng;
        let result = match self.padding {
            KeyWrapPadding::OaepSha256 => {
                self.private_key
                    .decrypt_blinded(&mut rng, Oaep::new::<Sha256>(), wrapped)
            }
            KeyWrapPadding::Pkcs1v15 => {
                self.private_key
                    .decrypt_blinded(&mut rng, Pkcs1v15Encrypt, wrapped)
            }
        };
        result.map_err(|_| EnvelopeError::KeyUnwrapFailure)
    }
}

fn open_gcm<C: Aead + KeyInit>(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = C::new_from_slice(key).map_err(|_| EnvelopeError::KeyUnwrapFailure)?;
    let (nonce, ciphertext) = sealed.split_at(GCM_NONCE_LEN);
    cipher
        .decrypt(Nonce::<C>::from_slice(nonce), ciphertext)
        .map_err(|_| EnvelopeError::PayloadDecryptFailure)
}

impl EnvelopeCipher for RsaAesGcmCipher {
    fn open(&self, envelope: &str) -> Result<Vec<u8>, EnvelopeError> {
        if envelope.is_empty() {
            return Err(EnvelopeError::EmptyBody);
        }
        let envelope = Envelope::parse(envelope, self.max_envelope_bytes)?;

        let key = self.unwrap_key(&envelope.wrapped_key)?;
        if envelope.sealed_payload.len() < GCM_NONCE_LEN + GCM_TAG_LEN {
            return Err(EnvelopeError::PayloadDecryptFailure);
        }
        let plaintext = match key.len() {
            16 => open_gcm::<Aes128Gcm>(&key, &envelope.sealed_payload)?,
            32 => open_gcm::<Aes256Gcm>(&key, &envelope.sealed_payload)?,
            _ => return Err(EnvelopeError::KeyUnwrapFailure),
        };

        serde_json::from_slice::<serde::de::IgnoredAny>(&plaintext)
            .map_err(|_| EnvelopeError::NotJson)?;
        Ok(plaintext)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("key wrap failed: {0}")]
    Wrap(#[from] rsa::Error),
    #[error("payload encryption failed")]
    Encrypt,
}

/// Client side of the protocol: AES-256-GCM under a fresh key, key wrapped
/// with `public_key`, result in `<hex>:<hex>` form.
pub fn seal_envelope(
    public_key: &RsaPublicKey,
    padding: KeyWrapPadding,
    plaintext: &[u8],
) -> Result<String, SealError> {
    let mut rng = OsRng;
    let mut key = [0u8; 32];
    rng.fill_bytes(&mut key);
    let mut nonce = [0u8; GCM_NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SealError::Encrypt)?;
    let ciphertext = cipher
        .encrypt(Nonce::<Aes256Gcm>::from_slice(&nonce), plaintext)
        .map_err(|_| SealError::Encrypt)?;

    let wrapped_key = match padding {
        KeyWrapPadding::OaepSha256 => public_key.encrypt(&mut rng, Oaep::new::<Sha256>(), &key)?,
        KeyWrapPadding::Pkcs1v15 => public_key.encrypt(&mut rng, Pkcs1v15Encrypt, &key)?,
    };

    let mut sealed_payload = Vec::with_capacity(GCM_NONCE_LEN + ciphertext.len());
    sealed_payload.extend_from_slice(&nonce);
    sealed_payload.extend_from_slice(&ciphertext);

    Ok(Envelope {
        wrapped_key,
        sealed_payload,
    }
    .encode())
}
