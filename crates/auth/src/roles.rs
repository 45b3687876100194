use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role name granted to a site administrator (sees and manages everything).
pub const SITE_ADMIN: &str = "site_admin";

/// Role name granted to a regular enterprise user (scoped by their
/// enterprises).
pub const ENTERPRISE_USER: &str = "enterprise_user";

/// Role identifier.
///
/// Roles are opaque strings at this layer; the well-known ones are the two
/// constants above. Mapping roles to finer-grained policy is the caller's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn site_admin() -> Self {
        Self::new(SITE_ADMIN)
    }

    pub fn enterprise_user() -> Self {
        Self::new(ENTERPRISE_USER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_site_admin(&self) -> bool {
        self.as_str() == SITE_ADMIN
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
