//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.
//!
//! The payload names the signed-in identity as `<provider>:<provider_user_id>`
//! and every request re-derives the local user from it through the
//! identity service.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::data::{Provider, User};
use crate::error::AppError;
use crate::service::IdentityService;

type HmacSha256 = Hmac<Sha256>;

/// Session cookie name
pub const SESSION_COOKIE: &str = "session";

/// User session data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Serialized identity, see [`serialize_identity`]
    pub identity: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user` lasting `max_age_seconds`
    ///
    /// # Errors
    /// `Config` if the expiry is not a representable timestamp.
    pub fn for_user(user: &User, max_age_seconds: i64) -> Result<Self, AppError> {
        let now = Utc::now();
        let expires_at = Duration::try_seconds(max_age_seconds)
            .and_then(|max_age| now.checked_add_signed(max_age))
            .ok_or_else(|| {
                AppError::Config(format!("session max age {max_age_seconds}s is out of range"))
            })?;

        Ok(Self {
            identity: serialize_identity(user),
            created_at: now,
            expires_at,
        })
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Serialize a user to its session identity string
pub fn serialize_identity(user: &User) -> String {
    format!("{}:{}", user.provider, user.provider_user_id)
}

/// Split an identity string on its first `:`
///
/// # Errors
/// `IdentityNotFound` if the separator is missing, the provider is
/// unknown or the provider user id is empty.
pub fn parse_identity(identity: &str) -> Result<(Provider, &str), AppError> {
    let (provider, provider_user_id) = identity
        .split_once(':')
        .ok_or(AppError::IdentityNotFound)?;
    let provider: Provider = provider.parse().map_err(|_| AppError::IdentityNotFound)?;
    if provider_user_id.is_empty() {
        return Err(AppError::IdentityNotFound);
    }
    Ok((provider, provider_user_id))
}

/// Materialize the user named by a session identity string.
///
/// Goes through find-or-create, so a well-formed identity without a row
/// provisions a fresh user.
pub async fn deserialize_identity(
    identity: &str,
    identities: &IdentityService,
) -> Result<User, AppError> {
    let (provider, provider_user_id) = parse_identity(identity)?;
    identities
        .resolve(provider, provider_user_id, None, None)
        .await
}

/// Create a signed token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn sign_payload<T: Serialize>(payload: &T, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(payload).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify a signed token and decode its payload
///
/// # Errors
/// `InvalidSignature` on a bad MAC, `Unauthorized` on a malformed token
pub fn verify_payload<T: for<'de> Deserialize<'de>>(
    token: &str,
    secret: &str,
) -> Result<T, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    if signature_b64.contains('.') {
        return Err(AppError::Unauthorized);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| AppError::InvalidSignature)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;

    serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)
}

/// Create a signed session token
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    sign_payload(session, secret)
}

/// Verify and decode a session token, rejecting expired sessions
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    let session: Session = verify_payload(token, secret)?;

    if session.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(session)
}
