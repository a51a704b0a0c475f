use crate::application_port::{EnvelopeCipher, EnvelopeError};
use crate::logger::*;
use serde::Deserialize;
use std::sync::Arc;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, reject};

/// A body the gateway refused to decrypt. Answered as `400 {"error": ...}`.
#[derive(Debug)]
pub struct GatewayRejection(pub EnvelopeError);

impl reject::Reject for GatewayRejection {}

#[derive(Debug, Deserialize)]
struct EncryptedBody {
    #[serde(default)]
    data: Option<String>,
}

/// Yields the request body with any `{"data": "<envelope>"}` wrapper opened.
///
/// Bodies that are not declared as JSON pass through untouched; JSON bodies
/// must carry an envelope, and the downstream handler only ever sees the
/// decrypted bytes.
pub fn decrypted_body(
    cipher: Arc<dyn EnvelopeCipher>,
    body_limit_bytes: u64,
) -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<String>("content-type")
        .and(warp::body::content_length_limit(body_limit_bytes))
        .and(warp::body::bytes())
        .and_then(move |content_type: Option<String>, body: Bytes| {
            let cipher = cipher.clone();
            async move {
                if !is_json(content_type.as_deref()) {
                    return Ok(body);
                }
                match open_body(cipher.as_ref(), &body) {
                    Ok(plaintext) => Ok(Bytes::from(plaintext)),
                    Err(e) => {
                        warn!(kind = e.kind(), body_len = body.len(), "encrypted body rejected");
                        Err(reject::custom(GatewayRejection(e)))
                    }
                }
            }
        })
}

pub fn open_body(cipher: &dyn EnvelopeCipher, body: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(EnvelopeError::EmptyBody);
    }
    let wrapper: EncryptedBody = serde_json::from_slice(body).map_err(|_| {
        EnvelopeError::MalformedEnvelope("expected a JSON object with a 'data' field".into())
    })?;
    let envelope = wrapper.data.unwrap_or_default();
    if envelope.is_empty() {
        return Err(EnvelopeError::EmptyBody);
    }

    let plaintext = cipher.open(&envelope)?;
    debug!(
        envelope_len = envelope.len(),
        plaintext_len = plaintext.len(),
        "request body decrypted"
    );
    Ok(plaintext)
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
