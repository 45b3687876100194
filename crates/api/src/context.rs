use foodflow_auth::{AccessScope, PrincipalId, Role};

/// Authenticated caller context attached to every protected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    principal_id: PrincipalId,
    roles: Vec<Role>,
    scope: AccessScope,
}

impl AuthContext {
    pub fn new(principal_id: PrincipalId, roles: Vec<Role>, scope: AccessScope) -> Self {
        Self {
            principal_id,
            roles,
            scope,
        }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// The enterprises this caller may act for (admins: all).
    pub fn scope(&self) -> &AccessScope {
        &self.scope
    }
}
