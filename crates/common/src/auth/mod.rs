//! Authentication and authorization utilities
//!
//! The identity collaborator is external; this module only validates the
//! bearer token it issued and exposes the resulting `(user_id, scopes)`
//! pair to handlers. Named scopes act as capability tokens gating
//! individual operations.

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Capability scopes understood by the rating engine
pub mod scopes {
    pub const COMMENT_REVIEW: &str = "rating.comment.review";
    pub const COMMENT_DELETE: &str = "rating.comment.delete";
    pub const COMMENT_IMPORT: &str = "rating.comment.import";
    pub const LECTURER_CREATE: &str = "rating.lecturer.create";
    pub const LECTURER_UPDATE: &str = "rating.lecturer.update";
    pub const LECTURER_DELETE: &str = "rating.lecturer.delete";
}

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: i64,

    /// Granted permission scopes
    pub scopes: Vec<String>,
}

impl AuthContext {
    /// Check if the context has a specific scope
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Require a specific scope, failing with `ForbiddenAction` otherwise
    pub fn require_scope(&self, scope: &str, object: &'static str) -> Result<()> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(AppError::ForbiddenAction { object })
        }
    }
}

/// Optional authentication: yields `None` when no Authorization header is
/// present, but still rejects malformed tokens.
#[derive(Debug, Clone)]
pub struct MaybeAuth(pub Option<AuthContext>);

/// JWT claims structure issued by the identity service
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Granted scopes
    #[serde(default)]
    pub scopes: Vec<String>,
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

    /// Generate a new token (used by tooling and tests)
    pub fn generate_token(&self, user_id: i64, scopes: Vec<String>) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            scopes,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a token into an auth context
    pub fn validate_token(&self, token: &str) -> Result<AuthContext> {
        let claims = decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized {
                message: format!("Invalid bearer token: {}", e),
            })?;

        let user_id = claims.sub.parse::<i64>().map_err(|_| AppError::Unauthorized {
            message: "Invalid subject claim".to_string(),
        })?;

        Ok(AuthContext {
            user_id,
            scopes: claims.scopes,
        })
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

fn bearer_from_parts(parts: &Parts) -> Result<Option<&str>> {
    let Some(value) = parts.headers.get("authorization") else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AppError::Unauthorized {
        message: "Malformed Authorization header".to_string(),
    })?;
    extract_bearer(value).map(Some).ok_or_else(|| AppError::Unauthorized {
        message: "Authorization header must use the Bearer scheme".to_string(),
    })
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let token = bearer_from_parts(parts)?.ok_or_else(|| AppError::Unauthorized {
            message: "Missing Authorization header".to_string(),
        })?;
        let jwt = Arc::<JwtManager>::from_ref(state);
        jwt.validate_token(token)
    }
}

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        match bearer_from_parts(parts)? {
            None => Ok(MaybeAuth(None)),
            Some(token) => {
                let jwt = Arc::<JwtManager>::from_ref(state);
                Ok(MaybeAuth(Some(jwt.validate_token(token)?)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("abc.def"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let scopes = vec![scopes::COMMENT_REVIEW.to_string()];

        let token = manager.generate_token(1234, scopes.clone()).unwrap();
        let ctx = manager.validate_token(&token).unwrap();

        assert_eq!(ctx.user_id, 1234);
        assert_eq!(ctx.scopes, scopes);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = JwtManager::new("secret_a", 3600);
        let other = JwtManager::new("secret_b", 3600);

        let token = manager.generate_token(1, vec![]).unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_require_scope() {
        let ctx = AuthContext {
            user_id: 7,
            scopes: vec![scopes::COMMENT_IMPORT.to_string()],
        };
        assert!(ctx.has_scope(scopes::COMMENT_IMPORT));
        assert!(ctx.require_scope(scopes::COMMENT_REVIEW, "Comment").is_err());
    }
}
