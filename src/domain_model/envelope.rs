use std::fmt;

pub const ENVELOPE_SEPARATOR: char = ':';

/// Why an envelope string was rejected before any decryption was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeFormatIssue {
    TooLarge,
    PartCount,
    EmptyPart,
    KeyNotHex,
    PayloadNotHex,
}

impl fmt::Display for EnvelopeFormatIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EnvelopeFormatIssue::TooLarge => "encrypted data exceeds the size limit",
            EnvelopeFormatIssue::PartCount => {
                "expected format: <encrypted_key_hex>:<encrypted_data_hex>"
            }
            EnvelopeFormatIssue::EmptyPart => "encrypted key and data must both be present",
            EnvelopeFormatIssue::KeyNotHex => "encrypted key is not a valid hex string",
            EnvelopeFormatIssue::PayloadNotHex => "encrypted data is not a valid hex string",
        };
        f.write_str(text)
    }
}

/// The two ciphertexts carried by `<hex(enc_key)>:<hex(enc_payload)>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub wrapped_key: Vec<u8>,
    pub sealed_payload: Vec<u8>,
}

impl Envelope {
    pub fn parse(input: &str, max_len: usize) -> Result<Self, EnvelopeFormatIssue> {
        if input.len() > max_len {
            return Err(EnvelopeFormatIssue::TooLarge);
        }

        let mut parts = input.split(ENVELOPE_SEPARATOR);
        let (key_hex, payload_hex) = match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(payload), None) => (key, payload),
            _ => return Err(EnvelopeFormatIssue::PartCount),
        };
        if key_hex.is_empty() || payload_hex.is_empty() {
            return Err(EnvelopeFormatIssue::EmptyPart);
        }

        let wrapped_key = hex::decode(key_hex).map_err(|_| EnvelopeFormatIssue::KeyNotHex)?;
        let sealed_payload =
            hex::decode(payload_hex).map_err(|_| EnvelopeFormatIssue::PayloadNotHex)?;

        Ok(Envelope {
            wrapped_key,
            sealed_payload,
        })
    }

    pub fn encode(&self) -> String {
        format!(
            "{}{}{}",
            hex::encode(&self.wrapped_key),
            ENVELOPE_SEPARATOR,
            hex::encode(&self.sealed_payload)
        )
    }
}
