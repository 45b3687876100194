//! Token decoding/verification (HS256).
//!
//! Signature verification is isolated behind [`JwtValidator`] so the API
//! middleware stays testable with a stub and the algorithm can change without
//! touching transport code.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token could not be decoded or its signature is invalid")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// HS256 (shared-secret) validator.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time-window checks run against our own claims (issued_at/expires_at)
        // so the caller controls `now`.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Sign claims with an HS256 shared secret.
///
/// Used by dev tooling and integration tests to mint tokens the
/// [`Hs256JwtValidator`] accepts.
pub fn issue_token(secret: impl AsRef<[u8]>, claims: &JwtClaims) -> Result<String, TokenError> {
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PrincipalId, Role};
    use chrono::Duration;
    use foodflow_core::AggregateId;

    fn test_claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: PrincipalId::new(),
            roles: vec![Role::enterprise_user()],
            enterprise_ids: vec![AggregateId::new()],
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::hours(1),
        }
    }

    #[test]
    fn round_trips_signed_claims() {
        let now = Utc::now();
        let claims = test_claims(now);
        let token = issue_token(b"test-secret", &claims).unwrap();

        let validator = Hs256JwtValidator::new(b"test-secret");
        let decoded = validator.validate(&token, now).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let now = Utc::now();
        let token = issue_token(b"secret-a", &test_claims(now)).unwrap();

        let validator = Hs256JwtValidator::new(b"secret-b");
        assert!(matches!(
            validator.validate(&token, now),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let now = Utc::now();
        let mut claims = test_claims(now);
        claims.expires_at = now - Duration::minutes(1);
        let token = issue_token(b"test-secret", &claims).unwrap();

        let validator = Hs256JwtValidator::new(b"test-secret");
        assert!(matches!(
            validator.validate(&token, now),
            Err(TokenError::Claims(TokenValidationError::Expired))
        ));
    }
}
