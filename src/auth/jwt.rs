use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{
    config::JwtConfig,
    error::{ApiError, AuthError},
    state::AppState,
    users::repo::User,
};

/// JWT payload. The subject claim is the user's normalized email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    /// Sign a token with an explicit TTL. Negative TTLs produce an
    /// already-expired token, which the expiry tests rely on.
    pub fn sign_with_ttl(&self, subject: &str, ttl: TimeDuration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %subject, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, subject: &str) -> anyhow::Result<String> {
        self.sign_with_ttl(
            subject,
            TimeDuration::seconds(self.access_ttl.as_secs() as i64),
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            }
        })?;
        debug!(subject = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Extractor for authenticated routes: validates the bearer token and
/// resolves the subject claim to a stored user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::InvalidToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AuthError::InvalidToken)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token)?;

        // Signature valid but the user may have been removed since issuance.
        let user = User::find_by_email(&state.db, &claims.sub)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let token = keys.sign_access("a@x.com").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "a@x.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn expired_token_is_distinguished() {
        let keys = make_keys();
        let token = keys
            .sign_with_ttl("a@x.com", TimeDuration::minutes(-2))
            .expect("sign");
        assert_eq!(keys.verify(&token).unwrap_err(), AuthError::ExpiredToken);
    }

    #[tokio::test]
    async fn corrupted_signature_is_invalid() {
        let keys = make_keys();
        let token = keys.sign_access("a@x.com").expect("sign");
        let mut corrupted = token[..token.len() - 2].to_string();
        corrupted.push_str("xx");
        assert_eq!(keys.verify(&corrupted).unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn token_signed_with_other_key_is_invalid() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"some-other-secret"),
            decoding: DecodingKey::from_secret(b"some-other-secret"),
            issuer: keys.issuer.clone(),
            audience: keys.audience.clone(),
            access_ttl: keys.access_ttl,
        };
        let token = other.sign_access("a@x.com").expect("sign");
        assert_eq!(keys.verify(&token).unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let keys = make_keys();
        assert_eq!(keys.verify("not-a-jwt").unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn extractor_rejects_missing_and_malformed_headers() {
        let state = AppState::fake();

        let (mut parts, _) = axum::http::Request::builder()
            .uri("/bills/")
            .body(())
            .unwrap()
            .into_parts();
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("missing header must be rejected");
        assert!(matches!(err, ApiError::Auth(AuthError::InvalidToken)));

        let (mut parts, _) = axum::http::Request::builder()
            .uri("/bills/")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap()
            .into_parts();
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("non-bearer scheme must be rejected");
        assert!(matches!(err, ApiError::Auth(AuthError::InvalidToken)));
    }
}
