//! Request-level authorization checks.
//!
//! Pure delegations into `foodflow-auth`; handlers map the errors to 403.

use foodflow_auth::AuthzError;
use foodflow_core::AggregateId;

use crate::context::AuthContext;

/// Require the site administrator role.
pub fn require_site_admin(ctx: &AuthContext) -> Result<(), AuthzError> {
    foodflow_auth::ensure_site_admin(ctx.roles())
}

/// Require that the caller may act on behalf of `enterprise` (e.g. register
/// an exchange for it, grant a relationship from it).
pub fn require_acting_for(ctx: &AuthContext, enterprise: AggregateId) -> Result<(), AuthzError> {
    foodflow_auth::ensure_in_scope(ctx.scope(), enterprise)
}
