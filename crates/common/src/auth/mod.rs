//! Authentication and persistence-context resolution
//!
//! Provides:
//! - JWT token generation and validation
//! - Bearer / guest-header extraction into a [`PersistenceContext`]
//! - The fail-fast identity guard used by the generation endpoints
//!
//! A valid bearer token always wins over a guest header, so a login
//! transition immediately switches the persistence target. The mode is
//! resolved fresh on every request and never cached.

use crate::errors::{AppError, Result};
use crate::store::PersistenceContext;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Maximum accepted length of a guest context id
const MAX_GUEST_ID_LEN: usize = 64;

/// A verified authenticated identity
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    /// Verified email claim; billing operations key on this, never on
    /// client-supplied addresses
    pub email: String,
}

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Which persistence arm this request operates against
    pub persistence: PersistenceContext,

    /// Present only for authenticated requests
    pub identity: Option<Identity>,

    /// Request ID for tracing
    pub request_id: String,
}

impl AuthContext {
    pub fn is_guest(&self) -> bool {
        matches!(self.persistence, PersistenceContext::Local { .. })
    }

    /// The verified identity, or 401 when the request is guest-scoped
    pub fn require_identity(&self) -> Result<&Identity> {
        self.identity.as_ref().ok_or_else(|| AppError::Unauthorized {
            message: "This operation requires an authenticated account".to_string(),
        })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Verified email address
    pub email: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }

    /// Validate a token into an [`Identity`]
    pub fn identity_from_token(&self, token: &str) -> Result<Identity> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
        Ok(Identity {
            user_id,
            email: claims.email,
        })
    }
}

/// Extract the bearer token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Guest ids become file names in the local store, so restrict them to a
/// safe character set
pub fn validate_guest_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_GUEST_ID_LEN {
        return Err(AppError::Unauthorized {
            message: "Invalid guest context id".to_string(),
        });
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Unauthorized {
            message: "Invalid guest context id".to_string(),
        });
    }
    Ok(())
}

/// Auth state shared with the extractors
#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtManager>,
    pub guest_header: String,
}

fn request_id_from(parts: &Parts) -> String {
    parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn bearer_from(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
        .map(String::from)
}

/// Axum extractor for AuthContext.
///
/// Resolution order: a bearer token, when present, must be valid and yields
/// the remote arm; with no bearer, a guest header yields the local arm;
/// neither is a 401. An invalid bearer is rejected outright rather than
/// silently downgraded to guest.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth_state = AuthState::from_ref(state);
        let request_id = request_id_from(parts);

        if let Some(token) = bearer_from(parts) {
            let identity = auth_state.jwt.identity_from_token(&token)?;
            return Ok(AuthContext {
                persistence: PersistenceContext::Remote {
                    user_id: identity.user_id,
                },
                identity: Some(identity),
                request_id,
            });
        }

        let guest_id = parts
            .headers
            .get(auth_state.guest_header.to_lowercase().as_str())
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing bearer credential or guest context".to_string(),
            })?;

        validate_guest_id(&guest_id)?;

        Ok(AuthContext {
            persistence: PersistenceContext::Local { guest_id },
            identity: None,
            request_id,
        })
    }
}

/// Optional identity for the generation endpoints, which carry a
/// `guestMode` flag in the request body instead of a guest header.
///
/// An unusable bearer resolves to `None`; [`authorize_generation`] then
/// rejects the request before any paid model call when guest mode is off.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth_state = AuthState::from_ref(state);

        let identity = match bearer_from(parts) {
            Some(token) => match auth_state.jwt.identity_from_token(&token) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    tracing::warn!(error = %e, "Rejecting unusable bearer token");
                    None
                }
            },
            None => None,
        };

        Ok(MaybeIdentity(identity))
    }
}

/// Fail-fast guard for the generation endpoints: when guest mode is off,
/// an authenticated identity must be present before any model call is made
pub fn authorize_generation(guest_mode: bool, identity: &Option<Identity>) -> Result<()> {
    if guest_mode || identity.is_some() {
        Ok(())
    } else {
        Err(AppError::Unauthorized {
            message: "Missing or invalid bearer credential".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("abc123"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let user_id = Uuid::new_v4();
        let token = manager.generate_token(user_id, "learner@example.com").unwrap();
        let identity = manager.identity_from_token(&token).unwrap();

        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.email, "learner@example.com");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = JwtManager::new("secret_a", 3600);
        let other = JwtManager::new("secret_b", 3600);

        let token = manager
            .generate_token(Uuid::new_v4(), "learner@example.com")
            .unwrap();

        assert!(matches!(
            other.identity_from_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_guest_id_validation() {
        assert!(validate_guest_id("guest-123_abc").is_ok());
        assert!(validate_guest_id("").is_err());
        assert!(validate_guest_id("../../etc/passwd").is_err());
        assert!(validate_guest_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_generation_guard() {
        let identity = Some(Identity {
            user_id: Uuid::new_v4(),
            email: "learner@example.com".into(),
        });

        assert!(authorize_generation(true, &None).is_ok());
        assert!(authorize_generation(false, &identity).is_ok());
        assert!(authorize_generation(false, &None).is_err());
    }
}
