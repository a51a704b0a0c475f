use crate::domain_model::EnvelopeFormatIssue;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("request body is empty")]
    EmptyBody,
    #[error("invalid encrypted data format: {0}")]
    MalformedEnvelope(String),
    #[error("failed to decrypt data, invalid or corrupted data")]
    KeyUnwrapFailure,
    #[error("failed to decrypt data, invalid or corrupted data")]
    PayloadDecryptFailure,
    #[error("decrypted data is not valid JSON")]
    NotJson,
}

impl From<EnvelopeFormatIssue> for EnvelopeError {
    fn from(issue: EnvelopeFormatIssue) -> Self {
        EnvelopeError::MalformedEnvelope(issue.to_string())
    }
}

impl EnvelopeError {
    /// Stable label for logs; the Display text is what clients see.
    pub fn kind(&self) -> &'static str {
        match self {
            EnvelopeError::EmptyBody => "empty_body",
            EnvelopeError::MalformedEnvelope(_) => "malformed_envelope",
            EnvelopeError::KeyUnwrapFailure => "key_unwrap_failure",
            EnvelopeError::PayloadDecryptFailure => "payload_decrypt_failure",
            EnvelopeError::NotJson => "not_json",
        }
    }
}

pub trait EnvelopeCipher: Send + Sync {
    /// Unwrap `<hex(enc_key)>:<hex(enc_payload)>` into the JSON bytes it carries.
    fn open(&self, envelope: &str) -> Result<Vec<u8>, EnvelopeError>;
}
