use std::collections::BTreeSet;

use foodflow_core::AggregateId;

/// The set of enterprises a caller may act for.
///
/// A site administrator gets `All`; an enterprise user gets the enterprises
/// they manage. Visibility and eligibility rules throughout the platform take
/// a scope rather than a raw user, keeping those rules pure and testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// Unrestricted (site administrator).
    All,
    /// Restricted to the given enterprises.
    Enterprises(BTreeSet<AggregateId>),
}

impl AccessScope {
    pub fn all() -> Self {
        AccessScope::All
    }

    pub fn enterprises(ids: impl IntoIterator<Item = AggregateId>) -> Self {
        AccessScope::Enterprises(ids.into_iter().collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, AccessScope::All)
    }

    /// Whether the scope allows acting for the given enterprise.
    pub fn includes(&self, enterprise: AggregateId) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Enterprises(set) => set.contains(&enterprise),
        }
    }

    /// The explicit enterprise set, or `None` for an unrestricted scope.
    pub fn enterprise_ids(&self) -> Option<&BTreeSet<AggregateId>> {
        match self {
            AccessScope::All => None,
            AccessScope::Enterprises(set) => Some(set),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_scope_includes_everything() {
        let scope = AccessScope::all();
        assert!(scope.is_all());
        assert!(scope.includes(AggregateId::new()));
        assert!(scope.enterprise_ids().is_none());
    }

    #[test]
    fn restricted_scope_includes_only_its_enterprises() {
        let mine = AggregateId::new();
        let other = AggregateId::new();
        let scope = AccessScope::enterprises([mine]);

        assert!(!scope.is_all());
        assert!(scope.includes(mine));
        assert!(!scope.includes(other));
        assert_eq!(scope.enterprise_ids().unwrap().len(), 1);
    }
}
