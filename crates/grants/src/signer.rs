//! Grant signer & verifier (component A): EdDSA (Ed25519) over a compact
//! JWT-shaped token. Signing keys are loaded once at process start and never
//! mutated in place — rotation means restarting with new key material, which
//! matches the documented invariant that rotation replaces the entire key
//! atomically.

use {
    base64::{Engine as _, engine::general_purpose::STANDARD},
    jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode},
    pulsegate_common::{Signer, SignerError, VerifyError},
    pulsegate_protocol::{Grant, TopicGrant},
    serde::{Deserialize, Serialize},
    std::time::{SystemTime, UNIX_EPOCH},
};

#[derive(Debug, Serialize, Deserialize)]
struct GrantClaims {
    project_id: String,
    channel: String,
    topics: Vec<TopicGrant>,
    user_id: String,
    iat: i64,
    exp: i64,
}

impl From<&Grant> for GrantClaims {
    fn from(g: &Grant) -> Self {
        Self {
            project_id: g.project_id.clone(),
            channel: g.channel.clone(),
            topics: g.topics.clone(),
            user_id: g.user_id.clone(),
            iat: g.issued_at,
            exp: g.expires_at,
        }
    }
}

impl From<GrantClaims> for Grant {
    fn from(c: GrantClaims) -> Self {
        Self {
            project_id: c.project_id,
            channel: c.channel,
            topics: c.topics,
            user_id: c.user_id,
            issued_at: c.iat,
            expires_at: c.exp,
        }
    }
}

/// EdDSA signer/verifier over PKCS8/SPKI DER-encoded Ed25519 key material,
/// base64-encoded in configuration. Either half may be absent: a
/// verify-only deployment at the channel edge only needs `decoding_key`; the
/// grant issuance service needs `encoding_key`.
pub struct EdDsaSigner {
    encoding_key: Option<EncodingKey>,
    decoding_key: Option<DecodingKey>,
}

impl EdDsaSigner {
    pub fn from_base64(signing_key_b64: Option<&str>, verify_key_b64: Option<&str>) -> Result<Self, SignerError> {
        let encoding_key = signing_key_b64
            .map(|b64| {
                let der = STANDARD
                    .decode(b64)
                    .map_err(|e| SignerError::Internal(format!("signing key is not valid base64: {e}")))?;
                Ok::<_, SignerError>(EncodingKey::from_ed_der(&der))
            })
            .transpose()?;
        let decoding_key = verify_key_b64
            .map(|b64| {
                let der = STANDARD
                    .decode(b64)
                    .map_err(|e| SignerError::Internal(format!("verify key is not valid base64: {e}")))?;
                Ok::<_, SignerError>(DecodingKey::from_ed_der(&der))
            })
            .transpose()?;
        Ok(Self { encoding_key, decoding_key })
    }
}

impl Signer for EdDsaSigner {
    fn sign(&self, grant: &Grant) -> Result<String, SignerError> {
        let key = self.encoding_key.as_ref().ok_or(SignerError::SignerConfig)?;
        let header = Header::new(Algorithm::EdDSA);
        let claims = GrantClaims::from(grant);
        encode(&header, &claims, key).map_err(|e| SignerError::Internal(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<Grant, VerifyError> {
        let key = self.decoding_key.as_ref().ok_or(VerifyError::Malformed)?;
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.validate_exp = true;
        validation.required_spec_claims.clear();

        let data = decode::<GrantClaims>(token, key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => VerifyError::Expired,
                ErrorKind::InvalidSignature => VerifyError::BadSignature,
                _ => VerifyError::Malformed,
            }
        })?;

        Ok(Grant::from(data.claims))
    }
}

/// Unix seconds, used to stamp `issued_at` when minting a grant.
#[must_use]
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
