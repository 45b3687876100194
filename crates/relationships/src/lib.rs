//! `foodflow-relationships` — directed permission grants between enterprises.
//!
//! A relationship `parent → child` says "parent permits child to ...", with
//! the permissions drawn from a closed set. At most one relationship exists
//! per ordered pair; the reverse direction is an independent grant. The
//! registry aggregate serializes all mutations through one stream so the
//! uniqueness rule holds under concurrent creation.

pub mod permission;
pub mod registry;
pub mod visibility;

pub use permission::Permission;
pub use registry::{
    CreateRelationship, DeleteRelationship, RelationshipCreated, RelationshipDeleted,
    RelationshipError, RelationshipEvent, RelationshipId, RelationshipPermissionsUpdated,
    RelationshipRecord, RelationshipRegistry, RelationshipRegistryCommand, UpdatePermissions,
};
pub use visibility::{eligible_children, eligible_parents, parents_granting, visible_relationships};
