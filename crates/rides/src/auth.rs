//! Bearer-token verification for the routes API.
//!
//! Tokens are HS256 JWTs whose `sub` is the user id. Issuing tokens (sign-up,
//! password login, Apple ID) happens elsewhere; `create_token` exists for
//! tests and tooling.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::errors::AppError;

const TOKEN_TTL: Duration = Duration::days(7);

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub exp: i64,  // expiration timestamp
    pub iat: i64,  // issued at
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

pub fn create_token(keys: &AuthKeys, user_id: Uuid) -> Result<String, AppError> {
    let now = OffsetDateTime::now_utc();
    let exp = now + TOKEN_TTL;

    let claims = Claims {
        sub: user_id,
        exp: exp.unix_timestamp(),
        iat: now.unix_timestamp(),
    };

    encode(&Header::default(), &claims, &keys.encoding).map_err(|_| AppError::Internal)
}

pub fn verify_token(keys: &AuthKeys, token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(token, &keys.decoding, &Validation::default())
        .map_err(|_| AppError::Unauthorized)?;
    Ok(token_data.claims)
}

// Extractor for the authenticated user. Requires `AuthKeys` as an extension.
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let keys = parts.extensions.get::<AuthKeys>().ok_or_else(|| {
            tracing::error!("AuthKeys extension missing from router");
            AppError::Internal
        })?;

        let bearer = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(AppError::Unauthorized)?;

        let claims = verify_token(keys, bearer.token())?;
        Ok(AuthUser(claims))
    }
}
