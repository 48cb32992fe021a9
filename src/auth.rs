use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::AuthConfig;

pub const AUTH_COOKIE_NAME: &str = "jwt-ouzi";

type HmacSha256 = Hmac<Sha256>;

/// Identity attached to authenticated requests by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    /// Copy of `users.level_update` at issue time.
    pub level: i64,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("token revoked")]
    TokenRevoked,
    #[error("missing JWT_SECRET")]
    MissingSecret,
    #[error("invalid JWT_EXPIRES_IN")]
    InvalidExpiresIn,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("new password must differ from the old one")]
    SamePassword,
    #[error("user not found")]
    UserNotFound,
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("user store failure")]
    Store(#[source] sqlx::Error),
}

/// HS256 signer/verifier built once from configuration.
#[derive(Clone)]
pub struct JwtKeys {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, AuthError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }
        if ttl <= Duration::zero() {
            return Err(AuthError::InvalidExpiresIn);
        }
        Ok(Self {
            secret: secret.to_vec(),
            ttl,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let secret = config.jwt_secret.as_deref().ok_or(AuthError::MissingSecret)?;
        Self::new(secret, parse_expires_in(&config.jwt_expires_in)?)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, user_id: &str, level: i64) -> Result<(String, DateTime<Utc>), AuthError> {
        self.sign_at(user_id, level, Utc::now())
    }

    fn sign_at(
        &self,
        user_id: &str,
        level: i64,
        issued_at: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(AuthError::InvalidExpiresIn)?;
        let claims = Claims {
            id: user_id.to_string(),
            level,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let header = serde_json::json!({ "alg": "HS256", "typ": "JWT" });
        let header_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).map_err(|_| AuthError::InvalidToken)?);
        let payload_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).map_err(|_| AuthError::InvalidToken)?);
        let signing_input = format!("{header_b64}.{payload_b64}");

        let signature = self.mac(&signing_input)?.finalize().into_bytes();
        let token = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature));
        Ok((token, expires_at))
    }

    /// Checks structure, algorithm, signature and expiry. Does not consult the user store.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };

        let decode = |part: &str| {
            URL_SAFE_NO_PAD
                .decode(part.as_bytes())
                .map_err(|_| AuthError::InvalidToken)
        };

        let header: serde_json::Value =
            serde_json::from_slice(&decode(header_b64)?).map_err(|_| AuthError::InvalidToken)?;
        if header.get("alg").and_then(|alg| alg.as_str()) != Some("HS256") {
            return Err(AuthError::InvalidToken);
        }

        self.mac(&format!("{header_b64}.{payload_b64}"))?
            .verify_slice(&decode(sig_b64)?)
            .map_err(|_| AuthError::InvalidToken)?;

        let claims: Claims =
            serde_json::from_slice(&decode(payload_b64)?).map_err(|_| AuthError::InvalidToken)?;
        if now.timestamp() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    fn mac(&self, input: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| AuthError::MissingSecret)?;
        mac.update(input.as_bytes());
        Ok(mac)
    }
}

/// Accepts `60s`, `15m`, `24h`, `7d`.
pub fn parse_expires_in(value: &str) -> Result<Duration, AuthError> {
    let value = value.trim();
    if value.len() < 2 || !value.is_ascii() {
        return Err(AuthError::InvalidExpiresIn);
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: i64 = digits.parse().map_err(|_| AuthError::InvalidExpiresIn)?;
    if amount <= 0 {
        return Err(AuthError::InvalidExpiresIn);
    }

    let duration = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        _ => None,
    };
    duration.ok_or(AuthError::InvalidExpiresIn)
}

/// Bearer header first, then the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    get_cookie(headers, AUTH_COOKIE_NAME)
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{AUTH_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.num_seconds()
    )
}

pub fn expired_session_cookie() -> String {
    format!("{AUTH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret", Duration::hours(1)).unwrap()
    }

    #[test]
    fn signed_token_verifies() {
        let (token, expires_at) = keys().sign("user-1", 3).unwrap();
        let claims = keys().verify(&token).unwrap();
        assert_eq!(claims.id, "user-1");
        assert_eq!(claims.level, 3);
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(2);
        let (token, _) = keys().sign_at("user-1", 0, issued).unwrap();
        assert!(matches!(keys().verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let (token, _) = keys().sign("user-1", 0).unwrap();

        let other = JwtKeys::new("other-secret", Duration::hours(1)).unwrap();
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"id":"admin","level":0,"iat":0,"exp":9999999999}"#);
        parts[1] = &forged;
        assert!(matches!(keys().verify(&parts.join(".")), Err(AuthError::InvalidToken)));

        assert!(keys().verify("a.b").is_err());
        assert!(keys().verify(&format!("{token}.extra")).is_err());
    }

    #[test]
    fn expires_in_units() {
        assert_eq!(parse_expires_in("24h").unwrap(), Duration::hours(24));
        assert_eq!(parse_expires_in("15m").unwrap(), Duration::minutes(15));
        assert!(parse_expires_in("0h").is_err());
        assert!(parse_expires_in("h").is_err());
        assert!(parse_expires_in("10w").is_err());
    }

    #[test]
    fn token_from_bearer_or_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; jwt-ouzi=cookie-token"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-token"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(extract_token(&headers).as_deref(), Some("header-token"));

        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
