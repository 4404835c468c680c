//! Session token verification and the role extractors built on it.
//!
//! Tokens are HS256 JWTs carrying `sub` (the principal id) and `role`. Each
//! role reads its own cookie (`user_token`, `vendor_token`, `admin_token`)
//! and falls back to an `Authorization: Bearer` header.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use domain::{UserId, VendorId};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;

/// Code attached to 401 responses on buyer endpoints.
pub const AUTH_REQUIRED: &str = "AUTH_REQUIRED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Vendor,
    Admin,
}

impl Role {
    fn cookie_name(self) -> &'static str {
        match self {
            Role::User => "user_token",
            Role::Vendor => "vendor_token",
            Role::Admin => "admin_token",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken { code: Option<&'static str> },

    #[error("Invalid or expired token")]
    InvalidToken {
        code: Option<&'static str>,
        #[source]
        source: Option<jsonwebtoken::errors::Error>,
    },

    #[error("Access denied: {required} role required")]
    WrongRole { required: &'static str },
}

struct KeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct JwtKeys(Arc<KeysInner>);

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self(Arc::new(KeysInner {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::default(),
        }))
    }

    /// Issues a token for `sub` acting as `role`.
    pub fn issue(
        &self,
        sub: impl Into<String>,
        role: Role,
        expires_in: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.into(),
            role,
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        };
        encode(&Header::default(), &claims, &self.0.encoding)
    }

    /// Verifies signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.0.decoding, &self.0.validation).map(|data| data.claims)
    }
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtKeys(..)")
    }
}

fn cookie_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reads and verifies the caller's token for `role`.
fn authenticate(
    parts: &Parts,
    keys: &JwtKeys,
    role: Role,
    code: Option<&'static str>,
) -> Result<Claims, AuthError> {
    let token = cookie_value(parts, role.cookie_name())
        .or_else(|| bearer_token(parts))
        .ok_or(AuthError::MissingToken { code })?;

    let claims = keys.verify(token).map_err(|e| AuthError::InvalidToken {
        code,
        source: Some(e),
    })?;

    if claims.role != role {
        return Err(AuthError::WrongRole {
            required: role.as_str(),
        });
    }
    Ok(claims)
}

/// An authenticated buyer.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

/// An authenticated vendor.
#[derive(Debug, Clone, Copy)]
pub struct AuthVendor(pub VendorId);

/// An authenticated administrator, identified by the token subject.
#[derive(Debug, Clone)]
pub struct AuthAdmin(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let code = Some(AUTH_REQUIRED);
        let claims = authenticate(parts, &keys, Role::User, code)?;
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidToken { code, source: None })?;
        Ok(AuthUser(user_id))
    }
}

impl<S> FromRequestParts<S> for AuthVendor
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let claims = authenticate(parts, &keys, Role::Vendor, None)?;
        let vendor_id = claims.sub.parse().map_err(|_| AuthError::InvalidToken {
            code: None,
            source: None,
        })?;
        Ok(AuthVendor(vendor_id))
    }
}

impl<S> FromRequestParts<S> for AuthAdmin
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let claims = authenticate(parts, &keys, Role::Admin, None)?;
        Ok(AuthAdmin(claims.sub))
    }
}
