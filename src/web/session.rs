//! Bearer access tokens (HS256 JWT) and the authenticated-user extractor.

use crate::db;
use crate::domain::access::Actor;
use crate::domain::models::{User, UserRole};
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("unsupported token algorithm")]
    Algorithm,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
    #[error("signing key rejected")]
    Key,
    #[error("token lifetime out of range")]
    Lifetime,
}

#[derive(Deserialize)]
struct JoseHeader {
    alg: String,
}

fn mac_for(key: &[u8], signing_input: &str) -> Result<HmacSha256, SessionError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Key)?;
    mac.update(signing_input.as_bytes());
    Ok(mac)
}

pub fn sign_claims(claims: &Claims, key: &[u8]) -> Result<String, SessionError> {
    let payload = serde_json::to_vec(claims).map_err(|_| SessionError::Invalid)?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let sig = mac_for(key, &signing_input)?.finalize().into_bytes();
    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(sig)))
}

pub fn issue_token(
    user_id: Uuid,
    role: UserRole,
    key: &[u8],
    ttl_minutes: i64,
) -> Result<String, SessionError> {
    let now = Utc::now();
    let expires = Duration::try_minutes(ttl_minutes)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(SessionError::Lifetime)?;
    let claims = Claims {
        sub: user_id,
        role,
        iat: now.timestamp(),
        exp: expires.timestamp(),
    };
    sign_claims(&claims, key)
}

pub fn verify_token(token: &str, key: &[u8]) -> Result<Claims, SessionError> {
    verify_token_at(token, key, Utc::now().timestamp())
}

fn verify_token_at(token: &str, key: &[u8], now: i64) -> Result<Claims, SessionError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SessionError::Invalid);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header).map_err(|_| SessionError::Invalid)?;
    let jose: JoseHeader =
        serde_json::from_slice(&header_bytes).map_err(|_| SessionError::Invalid)?;
    if jose.alg != "HS256" {
        return Err(SessionError::Algorithm);
    }

    let sig_bytes = URL_SAFE_NO_PAD.decode(sig).map_err(|_| SessionError::Invalid)?;
    let signing_input = format!("{header}.{payload}");
    mac_for(key, &signing_input)?
        .verify_slice(&sig_bytes)
        .map_err(|_| SessionError::Signature)?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| SessionError::Invalid)?;
    let claims: Claims =
        serde_json::from_slice(&payload_bytes).map_err(|_| SessionError::Invalid)?;
    if now >= claims.exp {
        return Err(SessionError::Expired);
    }
    Ok(claims)
}

pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authenticated caller, reloaded from storage on every request so that role
/// changes and deactivation take effect before the token expires.
pub struct CurrentUser {
    pub actor: Actor,
    pub user: User,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared_state = SharedState::from_ref(state);

        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let claims = verify_token(token, &shared_state.config.jwt_secret).map_err(|e| {
            tracing::warn!("Token verification failed: {}", e);
            AppError::Unauthorized("invalid or expired token".to_string())
        })?;

        let Some(user) = db::find_user_by_id(&shared_state.pool, claims.sub).await? else {
            tracing::warn!("Token subject {} no longer exists", claims.sub);
            return Err(AppError::Unauthorized("invalid or expired token".to_string()));
        };

        if !user.is_active {
            return Err(AppError::Forbidden("account is inactive".to_string()));
        }

        Ok(CurrentUser {
            actor: Actor::new(user.id, user.role),
            user: user.profile(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn issued_token_verifies_with_same_key() {
        let id = Uuid::new_v4();
        let token = issue_token(id, UserRole::Panel, KEY, 60).unwrap();
        let claims = verify_token(&token, KEY).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, UserRole::Panel);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn oversized_lifetime_is_an_error() {
        let err = issue_token(Uuid::new_v4(), UserRole::Hr, KEY, i64::MAX / 2).unwrap_err();
        assert!(matches!(err, SessionError::Lifetime));
    }

    #[test]
    fn token_has_three_url_safe_segments() {
        let token = issue_token(Uuid::new_v4(), UserRole::Hr, KEY, 5).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('=') && !token.contains('+') && !token.contains('/'));
    }

    #[test]
    fn other_key_fails_signature() {
        let token = issue_token(Uuid::new_v4(), UserRole::Hr, KEY, 5).unwrap();
        let err = verify_token(&token, b"another-secret-another-secret-00").unwrap_err();
        assert!(matches!(err, SessionError::Signature));
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let token = issue_token(Uuid::new_v4(), UserRole::Employee, KEY, 5).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = Claims {
            sub: Uuid::new_v4(),
            role: UserRole::Hr,
            iat: 0,
            exp: i64::MAX,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(matches!(verify_token(&tampered, KEY), Err(SessionError::Signature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: UserRole::Manager,
            iat: 1_000,
            exp: 2_000,
        };
        let token = sign_claims(&claims, KEY).unwrap();
        assert!(verify_token_at(&token, KEY, 1_999).is_ok());
        assert!(matches!(verify_token_at(&token, KEY, 2_000), Err(SessionError::Expired)));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(verify_token("abc", KEY), Err(SessionError::Invalid)));
        assert!(matches!(verify_token("a.b.c.d", KEY), Err(SessionError::Invalid)));
    }

    #[test]
    fn bearer_scheme_is_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&headers), Some("abc.def.ghi"));

        headers.insert("authorization", HeaderValue::from_static("bearer xyz"));
        assert_eq!(extract_token(&headers), Some("xyz"));

        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_token(&headers), None);
    }
}
