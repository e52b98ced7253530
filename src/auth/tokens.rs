//! Bearer token issuance and verification (HS256)

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use super::Claims;
use crate::domain::User;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Signs and verifies bearer tokens with a shared secret.
///
/// Built once from configuration and held in the application state.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl_seconds: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, issuer: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl_seconds,
        }
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.ttl_seconds,
            user_type: user.user_type,
            is_admin: user.is_admin(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_in: self.ttl_seconds,
        })
    }

    /// Verify signature, expiry and issuer, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    /// User id carried in a verified token's subject.
    pub fn subject(claims: &Claims) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Invalid("bad subject".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentStatus, UserType};

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "bidder@example.com".into(),
            password_hash: String::new(),
            user_type: UserType::Business,
            admin_type: None,
            is_verified: true,
            document_status: DocumentStatus::Verified,
            document_rejection_reason: None,
            permissions: Default::default(),
            verification_token: None,
            verification_token_expires: None,
            reset_code_hash: None,
            reset_code_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let issuer = TokenIssuer::new("test-secret", "tenderhub", 3600);
        let user = user();
        let issued = issuer.issue(&user).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(TokenIssuer::subject(&claims).unwrap(), user.id);
        assert_eq!(claims.user_type, UserType::Business);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issued = TokenIssuer::new("one", "tenderhub", 3600).issue(&user()).unwrap();
        let result = TokenIssuer::new("two", "tenderhub", 3600).verify(&issued.token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new("test-secret", "tenderhub", -3600);
        let issued = issuer.issue(&user()).unwrap();
        assert!(matches!(issuer.verify(&issued.token), Err(TokenError::Expired)));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let issued = TokenIssuer::new("s", "someone-else", 3600).issue(&user()).unwrap();
        assert!(TokenIssuer::new("s", "tenderhub", 3600).verify(&issued.token).is_err());
    }
}
