use super::config::JwtConfig;
use crate::errors::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("Token subject is not a user id: {0}")]
    InvalidSubject(String),
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Encode(e) => AppError::InternalServerError(format!("Token signing failed: {e}")),
            JwtError::Invalid(_) | JwtError::InvalidSubject(_) => {
                AppError::Unauthorized("Invalid token".to_string())
            }
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,   // User ID
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidSubject(self.sub.clone()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// A signed token plus its lifetime, as returned by the login endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// HS256 token issuer and verifier.
#[derive(Clone)]
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            expiration_secs: config.expiration_secs,
        }
    }

    pub fn create_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: &str,
    ) -> Result<IssuedToken, JwtError> {
        self.create_token_with_ttl(user_id, email, role, self.expiration_secs)
    }

    fn create_token_with_ttl(
        &self,
        user_id: Uuid,
        email: &str,
        role: &str,
        ttl_seconds: i64,
    ) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encode)?;

        Ok(IssuedToken {
            token,
            expires_in: ttl_seconds,
        })
    }

    /// Verify signature and expiry, returning the decoded claims.
    pub fn verify_token(&self, token: &str) -> Result<JwtClaims, JwtError> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(JwtError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new("this-is-a-valid-secret-with-32-chars!").unwrap())
    }

    #[test]
    fn test_token_carries_identity() {
        let auth = auth();
        let id = Uuid::now_v7();
        let issued = auth.create_token(id, "ann@example.com", "admin").unwrap();
        assert_eq!(issued.expires_in, 86_400);

        let claims = auth.verify_token(&issued.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), id);
        assert_eq!(claims.email, "ann@example.com");
        assert!(claims.is_admin());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = auth();
        let issued = auth
            .create_token_with_ttl(Uuid::now_v7(), "ann@example.com", "user", -3600)
            .unwrap();
        assert!(matches!(
            auth.verify_token(&issued.token),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let other =
            JwtAuth::new(&JwtConfig::new("another-valid-secret-that-is-long-enough").unwrap());
        let issued = other
            .create_token(Uuid::now_v7(), "ann@example.com", "user")
            .unwrap();
        assert!(auth().verify_token(&issued.token).is_err());
    }

    #[test]
    fn test_non_uuid_subject() {
        let claims = JwtClaims {
            sub: "42".to_string(),
            email: "ann@example.com".to_string(),
            role: "user".to_string(),
            exp: 0,
            iat: 0,
            jti: String::new(),
        };
        assert!(matches!(claims.user_id(), Err(JwtError::InvalidSubject(_))));
        assert!(!claims.is_admin());
    }
}
