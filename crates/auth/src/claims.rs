use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use foodflow_core::AggregateId;

use crate::{AccessScope, PrincipalId, Role};

/// JWT claims model (transport-agnostic).
///
/// The minimal set of claims the platform expects once a token has been
/// decoded/verified by whatever transport/security layer is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    /// Roles granted to the principal.
    pub roles: Vec<Role>,

    /// Enterprises the principal manages (ignored for site administrators).
    pub enterprise_ids: Vec<AggregateId>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    /// Derive the caller's enterprise scope from roles + memberships.
    pub fn access_scope(&self) -> AccessScope {
        if self.roles.iter().any(Role::is_site_admin) {
            AccessScope::All
        } else {
            AccessScope::enterprises(self.enterprise_ids.iter().copied())
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature verification / decoding
/// lives in the [`crate::jwt`] module.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_valid_between(issued: DateTime<Utc>, expires: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: PrincipalId::new(),
            roles: vec![Role::enterprise_user()],
            enterprise_ids: vec![],
            issued_at: issued,
            expires_at: expires,
        }
    }

    #[test]
    fn accepts_claims_inside_window() {
        let now = Utc::now();
        let claims = claims_valid_between(now - Duration::hours(1), now + Duration::hours(1));
        assert_eq!(validate_claims(&claims, now), Ok(()));
    }

    #[test]
    fn rejects_expired_claims() {
        let now = Utc::now();
        let claims = claims_valid_between(now - Duration::hours(2), now - Duration::hours(1));
        assert_eq!(validate_claims(&claims, now), Err(TokenValidationError::Expired));
    }

    #[test]
    fn rejects_claims_from_the_future() {
        let now = Utc::now();
        let claims = claims_valid_between(now + Duration::hours(1), now + Duration::hours(2));
        assert_eq!(validate_claims(&claims, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn rejects_inverted_time_window() {
        let now = Utc::now();
        let claims = claims_valid_between(now + Duration::hours(1), now - Duration::hours(1));
        assert_eq!(
            validate_claims(&claims, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn site_admin_claims_scope_to_all() {
        let mut claims = claims_valid_between(Utc::now(), Utc::now() + Duration::hours(1));
        claims.roles = vec![Role::site_admin()];
        claims.enterprise_ids = vec![AggregateId::new()];
        assert!(claims.access_scope().is_all());
    }

    #[test]
    fn enterprise_user_claims_scope_to_their_enterprises() {
        let e1 = AggregateId::new();
        let mut claims = claims_valid_between(Utc::now(), Utc::now() + Duration::hours(1));
        claims.enterprise_ids = vec![e1];

        let scope = claims.access_scope();
        assert!(scope.includes(e1));
        assert!(!scope.includes(AggregateId::new()));
    }
}
