//! `foodflow-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. It models who
//! a caller is (principal + roles) and which enterprises they may act for
//! (scope); the API layer enforces these checks before dispatching commands.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;
pub mod scope;

pub use authorize::{AuthzError, ensure_in_scope, ensure_site_admin};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator, TokenError, issue_token};
pub use principal::PrincipalId;
pub use roles::Role;
pub use scope::AccessScope;
