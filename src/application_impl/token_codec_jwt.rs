use crate::application_port::{CodecError, TokenCodec};
use crate::domain_model::*;
use crate::infra_keys::SigningSecret;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub leeway_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    kind: TokenKind,
    jti: String,
    iat: i64,
    exp: i64,
    iss: String,
    aud: String,
}

/// HS256 JWS tokens: `base64url(header).base64url(claims).base64url(mac)`.
pub struct JwtHs256Codec {
    cfg: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig, secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = cfg.leeway_secs;
        validation.set_audience(&[cfg.audience.clone()]);
        validation.set_issuer(&[cfg.issuer.clone()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            cfg,
        }
    }

    #[inline]
    fn timestamp(secs: i64) -> Result<DateTime<Utc>, CodecError> {
        DateTime::<Utc>::from_timestamp(secs, 0).ok_or(CodecError::Malformed)
    }
}

impl TokenCodec for JwtHs256Codec {
    fn encode(&self, claims: &TokenClaims) -> Result<SignedToken, CodecError> {
        let wire = WireClaims {
            sub: claims.subject.to_string(),
            kind: claims.kind,
            jti: claims.token_id.0.clone(),
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &wire, &self.encoding_key)
            .map_err(|_| CodecError::Signing)?;
        Ok(SignedToken(token))
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, CodecError> {
        let data = decode::<WireClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => CodecError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => CodecError::Malformed,
                _ => CodecError::InvalidSignature,
            },
        )?;

        let wire = data.claims;
        let subject = wire
            .sub
            .parse::<PrincipalId>()
            .map_err(|_| CodecError::Malformed)?;
        Ok(TokenClaims {
            subject,
            kind: wire.kind,
            token_id: TokenId(wire.jti),
            issued_at: Self::timestamp(wire.iat)?,
            expires_at: Self::timestamp(wire.exp)?,
        })
    }
}
