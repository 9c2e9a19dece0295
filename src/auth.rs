//! Session resolution. Mutations receive the resolved `Session` as an explicit argument.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::entities::user;
use crate::error::AppError;

/// The acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i32,
    pub username: String,
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub user_id: i32,
    pub exp: usize,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// `None` when the caller is not authenticated.
    async fn resolve_session(&self) -> Option<Session>;
}

/// Resolves the session from an HS256 bearer token.
pub struct JwtSessionProvider {
    secret: String,
    token: Option<String>,
}

impl JwtSessionProvider {
    pub fn new(secret: impl Into<String>, token: Option<String>) -> Self {
        Self {
            secret: secret.into(),
            token,
        }
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn resolve_session(&self) -> Option<Session> {
        let token = self.token.as_deref()?;
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        ) {
            Ok(token_data) => Some(Session {
                user_id: token_data.claims.user_id,
                username: token_data.claims.sub,
            }),
            Err(e) => {
                warn!(error = ?e, "Rejected session token.");
                None
            }
        }
    }
}

pub fn issue_token(user: &user::Model, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
    let expiration = (Utc::now() + Duration::hours(ttl_hours)).timestamp() as usize;
    let claims = Claims {
        sub: user.username.clone(),
        user_id: user.id,
        exp: expiration,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

/// Unwraps the session or fails with `Unauthorized`.
pub fn require_session(session: Option<&Session>) -> Result<&Session, AppError> {
    session.ok_or_else(|| AppError::Unauthorized("You must be signed in.".to_string()))
}
