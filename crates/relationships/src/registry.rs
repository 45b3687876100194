use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use foodflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use foodflow_enterprises::EnterpriseId;
use foodflow_events::Event;

use crate::permission::Permission;

/// Relationship identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(pub AggregateId);

impl RelationshipId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Errors specific to relationship management.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelationshipError {
    /// The ordered `(parent, child)` pair already has a relationship.
    ///
    /// Recoverable and user-facing; the attempted create leaves stored state
    /// untouched. The message is surfaced verbatim in the admin form.
    #[error("That relationship is already established.")]
    DuplicateRelationship,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RelationshipError> for DomainError {
    fn from(value: RelationshipError) -> Self {
        match value {
            RelationshipError::DuplicateRelationship => {
                DomainError::invariant("That relationship is already established.")
            }
            RelationshipError::Domain(e) => e,
        }
    }
}

/// One stored grant: parent permits child the listed permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub relationship_id: RelationshipId,
    pub parent: EnterpriseId,
    pub child: EnterpriseId,
    pub permissions: BTreeSet<Permission>,
}

/// Aggregate root: the relationship registry.
///
/// All relationships live in one aggregate. That is deliberate: funnelling
/// every create through a single stream makes the ordered-pair uniqueness
/// check safe under concurrent requests: the event store's optimistic
/// version check turns a race into a retry, and the retry sees the winner.
/// The registry exists implicitly; there is no "create registry" command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRegistry {
    id: RelationshipId,
    records: BTreeMap<RelationshipId, RelationshipRecord>,
    pairs: BTreeMap<(EnterpriseId, EnterpriseId), RelationshipId>,
    version: u64,
}

impl RelationshipRegistry {
    /// Registry instance addressed by a well-known stream id.
    pub fn empty(id: RelationshipId) -> Self {
        Self {
            id,
            records: BTreeMap::new(),
            pairs: BTreeMap::new(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> RelationshipId {
        self.id
    }

    /// All stored relationships, ordered by id.
    pub fn records(&self) -> impl Iterator<Item = &RelationshipRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, relationship_id: RelationshipId) -> Option<&RelationshipRecord> {
        self.records.get(&relationship_id)
    }

    /// Look up the relationship for an ordered pair, if any.
    pub fn find_by_pair(
        &self,
        parent: EnterpriseId,
        child: EnterpriseId,
    ) -> Option<&RelationshipRecord> {
        self.pairs
            .get(&(parent, child))
            .and_then(|id| self.records.get(id))
    }
}

impl AggregateRoot for RelationshipRegistry {
    type Id = RelationshipId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateRelationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRelationship {
    pub relationship_id: RelationshipId,
    pub parent: EnterpriseId,
    pub child: EnterpriseId,
    pub permissions: BTreeSet<Permission>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdatePermissions.
///
/// Replaces the permission set wholesale: whatever boxes are checked at
/// submit time is the stored set, regardless of the clicks in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePermissions {
    pub relationship_id: RelationshipId,
    pub permissions: BTreeSet<Permission>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteRelationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRelationship {
    pub relationship_id: RelationshipId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipRegistryCommand {
    CreateRelationship(CreateRelationship),
    UpdatePermissions(UpdatePermissions),
    DeleteRelationship(DeleteRelationship),
}

/// Event: RelationshipCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipCreated {
    pub relationship_id: RelationshipId,
    pub parent: EnterpriseId,
    pub child: EnterpriseId,
    pub permissions: BTreeSet<Permission>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RelationshipPermissionsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipPermissionsUpdated {
    pub relationship_id: RelationshipId,
    pub permissions: BTreeSet<Permission>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RelationshipDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDeleted {
    pub relationship_id: RelationshipId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipEvent {
    RelationshipCreated(RelationshipCreated),
    RelationshipPermissionsUpdated(RelationshipPermissionsUpdated),
    RelationshipDeleted(RelationshipDeleted),
}

impl Event for RelationshipEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RelationshipEvent::RelationshipCreated(_) => "relationships.relationship.created",
            RelationshipEvent::RelationshipPermissionsUpdated(_) => {
                "relationships.relationship.permissions_updated"
            }
            RelationshipEvent::RelationshipDeleted(_) => "relationships.relationship.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RelationshipEvent::RelationshipCreated(e) => e.occurred_at,
            RelationshipEvent::RelationshipPermissionsUpdated(e) => e.occurred_at,
            RelationshipEvent::RelationshipDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for RelationshipRegistry {
    type Command = RelationshipRegistryCommand;
    type Event = RelationshipEvent;
    type Error = RelationshipError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RelationshipEvent::RelationshipCreated(e) => {
                self.records.insert(
                    e.relationship_id,
                    RelationshipRecord {
                        relationship_id: e.relationship_id,
                        parent: e.parent,
                        child: e.child,
                        permissions: e.permissions.clone(),
                    },
                );
                self.pairs.insert((e.parent, e.child), e.relationship_id);
            }
            RelationshipEvent::RelationshipPermissionsUpdated(e) => {
                if let Some(record) = self.records.get_mut(&e.relationship_id) {
                    record.permissions = e.permissions.clone();
                }
            }
            RelationshipEvent::RelationshipDeleted(e) => {
                if let Some(record) = self.records.remove(&e.relationship_id) {
                    self.pairs.remove(&(record.parent, record.child));
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RelationshipRegistryCommand::CreateRelationship(cmd) => self.handle_create(cmd),
            RelationshipRegistryCommand::UpdatePermissions(cmd) => self.handle_update(cmd),
            RelationshipRegistryCommand::DeleteRelationship(cmd) => self.handle_delete(cmd),
        }
    }
}

impl RelationshipRegistry {
    fn handle_create(
        &self,
        cmd: &CreateRelationship,
    ) -> Result<Vec<RelationshipEvent>, RelationshipError> {
        if cmd.parent == cmd.child {
            return Err(RelationshipError::Domain(DomainError::validation(
                "an enterprise cannot hold a relationship with itself",
            )));
        }

        // Ordered pair: (child, parent) is a distinct, independent grant.
        if self.pairs.contains_key(&(cmd.parent, cmd.child)) {
            return Err(RelationshipError::DuplicateRelationship);
        }

        if self.records.contains_key(&cmd.relationship_id) {
            return Err(RelationshipError::Domain(DomainError::conflict(
                "relationship id already in use",
            )));
        }

        Ok(vec![RelationshipEvent::RelationshipCreated(RelationshipCreated {
            relationship_id: cmd.relationship_id,
            parent: cmd.parent,
            child: cmd.child,
            permissions: cmd.permissions.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(
        &self,
        cmd: &UpdatePermissions,
    ) -> Result<Vec<RelationshipEvent>, RelationshipError> {
        let record = self
            .records
            .get(&cmd.relationship_id)
            .ok_or(RelationshipError::Domain(DomainError::NotFound))?;

        // Submitting the already-stored set is a no-op.
        if record.permissions == cmd.permissions {
            return Ok(vec![]);
        }

        Ok(vec![RelationshipEvent::RelationshipPermissionsUpdated(
            RelationshipPermissionsUpdated {
                relationship_id: cmd.relationship_id,
                permissions: cmd.permissions.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_delete(
        &self,
        cmd: &DeleteRelationship,
    ) -> Result<Vec<RelationshipEvent>, RelationshipError> {
        if !self.records.contains_key(&cmd.relationship_id) {
            return Err(RelationshipError::Domain(DomainError::NotFound));
        }

        Ok(vec![RelationshipEvent::RelationshipDeleted(RelationshipDeleted {
            relationship_id: cmd.relationship_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
