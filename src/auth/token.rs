//! JWT token issuance and verification.
//!
//! Tokens are HS256-signed and carry the caller's subject-id, email and
//! role. Expiry is always validated on the way in.

use crate::auth::identity::{Identity, Role};
use crate::domain::User;
use crate::error::{ApiError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Claims carried by an issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued at (unix timestamp)
    pub iat: u64,
    /// Expiration time (unix timestamp)
    pub exp: u64,
    /// JWT ID (unique identifier)
    pub jti: String,
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a token for a user.
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = current_timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.ttl.as_secs(),
            jti: generate_jti(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to encode token: {e}")))
    }

    /// Verify a token and resolve the identity it carries.
    ///
    /// Any decode failure — bad signature, malformed token, expired `exp` —
    /// maps to a 401, never a 500.
    pub fn verify(&self, token: &str) -> Result<Identity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

        Ok(Identity {
            subject: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn generate_jti() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user(role: Role) -> User {
        User {
            id: "user-123".to_string(),
            email: "test@example.com".to_string(),
            name: "Test User".to_string(),
            phone: None,
            role,
            created_at: Utc::now(),
        }
    }

    fn test_issuer() -> TokenIssuer {
        TokenIssuer::new(
            "test-secret-key-32-bytes-long!!",
            Duration::from_secs(60 * 60),
        )
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let issuer = test_issuer();
        let token = issuer.issue(&test_user(Role::Tenant)).unwrap();

        let identity = issuer.verify(&token).unwrap();
        assert_eq!(identity.subject, "user-123");
        assert_eq!(identity.email, "test@example.com");
        assert_eq!(identity.role, Role::Tenant);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = test_issuer().issue(&test_user(Role::Admin)).unwrap();
        let other = TokenIssuer::new("another-secret-key-32-bytes!!!!", Duration::from_secs(60));

        let err = other.verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = test_issuer().verify("not-a-token").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = current_timestamp();
        let claims = Claims {
            sub: "user-123".to_string(),
            email: "test@example.com".to_string(),
            role: Role::Tenant,
            iat: now - 7200,
            exp: now - 3600,
            jti: generate_jti(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-32-bytes-long!!"),
        )
        .unwrap();

        let err = test_issuer().verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
