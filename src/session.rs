use super::crypto;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// HMAC-secured bearer token, signed by $SESSION_SECRET.
///
/// Only the user id travels in the token; everything else about the user is
/// looked up again when the token is presented, so a deleted account stops
/// authenticating immediately.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Uuid,
    /// Unix timestamp, seconds
    pub created_at: i64,
}

impl Session {
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            created_at: now.timestamp(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.timestamp() - self.created_at >= ttl.num_seconds()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session")]
    Malformed,
    #[error("cannot base64 decode the digest")]
    DigestEncoding,
    #[error("failed to validate session signature")]
    BadSignature,
    #[error("cannot base64 decode session string")]
    PayloadEncoding,
    #[error("cannot deserialize session JSON")]
    PayloadJson,
}

pub fn serialize_session(
    session: &Session,
    secret: &[u8],
) -> serde_json::Result<String> {
    let json_bytes = serde_json::to_vec(session)?;
    let b64 = general_purpose::STANDARD_NO_PAD.encode(json_bytes);
    let raw_digest = crypto::get_digest(secret, b64.as_bytes());
    let digest = general_purpose::STANDARD_NO_PAD.encode(raw_digest);

    Ok(format!("{}:{}", b64, digest))
}

pub fn deserialize_session(
    token: &str,
    secret: &[u8],
) -> Result<Session, SessionError> {
    let (b64_json, b64_digest) =
        token.split_once(':').ok_or(SessionError::Malformed)?;
    if b64_digest.contains(':') {
        return Err(SessionError::Malformed);
    }
    let digest = general_purpose::STANDARD_NO_PAD
        .decode(b64_digest)
        .map_err(|_| SessionError::DigestEncoding)?;

    if !crypto::is_valid(secret, b64_json.as_bytes(), &digest) {
        return Err(SessionError::BadSignature);
    }
    let json_bytes = general_purpose::STANDARD_NO_PAD
        .decode(b64_json)
        .map_err(|_| SessionError::PayloadEncoding)?;

    serde_json::from_slice(&json_bytes).map_err(|_| SessionError::PayloadJson)
}
