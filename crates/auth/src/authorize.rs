use thiserror::Error;

use foodflow_core::AggregateId;

use crate::{AccessScope, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: site administrator role required")]
    SiteAdminRequired,

    #[error("forbidden: not permitted to act for enterprise {0}")]
    OutOfScope(AggregateId),
}

/// Require the site administrator role.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn ensure_site_admin(roles: &[Role]) -> Result<(), AuthzError> {
    if roles.iter().any(Role::is_site_admin) {
        Ok(())
    } else {
        Err(AuthzError::SiteAdminRequired)
    }
}

/// Require that the caller's scope covers the given enterprise.
///
/// Used wherever a request acts *on behalf of* an enterprise (e.g. selecting
/// it as the parent of a relationship grant).
pub fn ensure_in_scope(scope: &AccessScope, enterprise: AggregateId) -> Result<(), AuthzError> {
    if scope.includes(enterprise) {
        Ok(())
    } else {
        Err(AuthzError::OutOfScope(enterprise))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_admin_check_requires_the_role() {
        assert_eq!(
            ensure_site_admin(&[Role::enterprise_user()]),
            Err(AuthzError::SiteAdminRequired)
        );
        assert_eq!(
            ensure_site_admin(&[Role::enterprise_user(), Role::site_admin()]),
            Ok(())
        );
    }

    #[test]
    fn scope_check_rejects_foreign_enterprise() {
        let mine = AggregateId::new();
        let foreign = AggregateId::new();
        let scope = AccessScope::enterprises([mine]);

        assert_eq!(ensure_in_scope(&scope, mine), Ok(()));
        assert_eq!(
            ensure_in_scope(&scope, foreign),
            Err(AuthzError::OutOfScope(foreign))
        );
        assert_eq!(ensure_in_scope(&AccessScope::all(), foreign), Ok(()));
    }
}
