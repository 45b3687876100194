//! Visibility and eligibility rules for the relationship admin screens.
//!
//! Pure functions over registry state and an [`AccessScope`], shared by the
//! aggregate-side queries and the read-model projection so the rules exist in
//! exactly one place.

use std::collections::BTreeSet;

use foodflow_auth::AccessScope;
use foodflow_enterprises::EnterpriseId;

use crate::permission::Permission;
use crate::registry::RelationshipRecord;

/// Relationships the caller may see: every edge touching their scope.
///
/// A site administrator (unrestricted scope) sees all of them.
pub fn visible_relationships<'a>(
    records: impl IntoIterator<Item = &'a RelationshipRecord>,
    scope: &AccessScope,
) -> Vec<&'a RelationshipRecord> {
    records
        .into_iter()
        .filter(|r| scope.includes(r.parent.0) || scope.includes(r.child.0))
        .collect()
}

/// Enterprises the caller may select as `parent` when creating a grant.
///
/// Restricted to the caller's own enterprises: granting on behalf of an
/// enterprise you do not control is not a thing.
pub fn eligible_parents(
    scope: &AccessScope,
    all_enterprises: &[EnterpriseId],
) -> Vec<EnterpriseId> {
    all_enterprises
        .iter()
        .copied()
        .filter(|e| scope.includes(e.0))
        .collect()
}

/// Enterprises selectable as `child`: anyone on the platform.
pub fn eligible_children(all_enterprises: &[EnterpriseId]) -> Vec<EnterpriseId> {
    all_enterprises.to_vec()
}

/// Parents that grant `permission` to `child` (reverse lookup for admin
/// screens like "who lets me add them to an order cycle").
pub fn parents_granting<'a>(
    records: impl IntoIterator<Item = &'a RelationshipRecord>,
    child: EnterpriseId,
    permission: Permission,
) -> BTreeSet<EnterpriseId> {
    records
        .into_iter()
        .filter(|r| r.child == child && r.permissions.contains(&permission))
        .map(|r| r.parent)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RelationshipId;
    use foodflow_core::AggregateId;

    fn enterprise() -> EnterpriseId {
        EnterpriseId::new(AggregateId::new())
    }

    fn record(parent: EnterpriseId, child: EnterpriseId, permissions: &[Permission]) -> RelationshipRecord {
        RelationshipRecord {
            relationship_id: RelationshipId::new(AggregateId::new()),
            parent,
            child,
            permissions: permissions.iter().copied().collect(),
        }
    }

    #[test]
    fn scoped_user_sees_only_edges_touching_their_enterprises() {
        let d1 = enterprise();
        let d2 = enterprise();
        let d3 = enterprise();

        // The bidirectional fixture: d1→d2, d2→d1 visible; d2→d3 not.
        let records = vec![record(d1, d2, &[]), record(d2, d1, &[]), record(d2, d3, &[])];
        let scope = AccessScope::enterprises([d1.0]);

        let visible = visible_relationships(&records, &scope);
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|r| r.parent == d1 || r.child == d1));

        let admin_visible = visible_relationships(&records, &AccessScope::all());
        assert_eq!(admin_visible.len(), 3);
    }

    #[test]
    fn eligible_parents_are_the_callers_enterprises() {
        let d1 = enterprise();
        let d2 = enterprise();
        let d3 = enterprise();
        let all = vec![d1, d2, d3];

        let scope = AccessScope::enterprises([d1.0]);
        assert_eq!(eligible_parents(&scope, &all), vec![d1]);
        assert_eq!(eligible_parents(&AccessScope::all(), &all), all);

        // Children are unrestricted.
        assert_eq!(eligible_children(&all), all);
    }

    #[test]
    fn parents_granting_filters_by_child_and_permission() {
        let hub = enterprise();
        let producer_a = enterprise();
        let producer_b = enterprise();

        let records = vec![
            record(producer_a, hub, &[Permission::AddToOrderCycle]),
            record(producer_b, hub, &[Permission::ManageProducts]),
            record(producer_b, producer_a, &[Permission::AddToOrderCycle]),
        ];

        let granting = parents_granting(&records, hub, Permission::AddToOrderCycle);
        assert_eq!(granting, BTreeSet::from([producer_a]));
    }
}
