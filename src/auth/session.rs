//! Session management
//!
//! Uses HMAC-signed tokens carried in a cookie or a Bearer header.
//! No server-side session storage needed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::UpsertUser;

/// Identity claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Stable subject id, used as the user id
    #[serde(rename = "sub")]
    pub user_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` lasting `max_age_seconds`.
    pub fn new(user_id: impl Into<String>, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            email: None,
            first_name: None,
            last_name: None,
            profile_image_url: None,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Claims to copy onto the user row
    pub fn to_upsert(&self) -> UpsertUser {
        UpsertUser {
            id: self.user_id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            profile_image_url: self.profile_image_url.clone(),
        }
    }
}

type HmacSha256 = hmac::Hmac<sha2::Sha256>;

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(
    session: &Session,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::Mac;

    let payload =
        serde_json::to_string(session).map_err(|e| crate::error::AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// `InvalidSignature` when the signature does not match, `Unauthorized`
/// when the token is malformed or expired.
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::Mac;

    let (payload_b64, signature_b64) = token
        .split_once('.')
        .ok_or(crate::error::AppError::Unauthorized)?;
    if signature_b64.contains('.') {
        return Err(crate::error::AppError::Unauthorized);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;
    mac.verify_slice(&signature)
        .map_err(|_| crate::error::AppError::InvalidSignature)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;
    let session: Session =
        serde_json::from_slice(&payload_bytes).map_err(|_| crate::error::AppError::Unauthorized)?;

    if session.is_expired() {
        return Err(crate::error::AppError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn token_round_trips_claims() {
        let mut session = Session::new("user-1", 3600);
        session.email = Some("alice@example.com".to_string());

        let token = create_session_token(&session, SECRET).unwrap();
        let decoded = verify_session_token(&token, SECRET).unwrap();

        assert_eq!(decoded.user_id, "user-1");
        assert_eq!(decoded.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn claims_use_sub_for_user_id() {
        let session = Session::new("user-1", 3600);
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["sub"], "user-1");
        assert!(json.get("expiresAt").is_some());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = create_session_token(&Session::new("user-1", 3600), SECRET).unwrap();
        let forged_payload = {
            use base64::{Engine as _, engine::general_purpose};
            let forged = serde_json::to_string(&Session::new("user-2", 3600)).unwrap();
            general_purpose::URL_SAFE_NO_PAD.encode(forged)
        };
        let signature = token.split_once('.').unwrap().1;
        let forged_token = format!("{}.{}", forged_payload, signature);

        let error = verify_session_token(&forged_token, SECRET).unwrap_err();
        assert!(matches!(error, AppError::InvalidSignature));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_session_token(&Session::new("user-1", -10), SECRET).unwrap();
        let error = verify_session_token(&token, SECRET).unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(verify_session_token("not-a-token", SECRET).is_err());
        assert!(verify_session_token("a.b.c", SECRET).is_err());
    }
}
