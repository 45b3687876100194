use serde_json::Value as JsonValue;
use thiserror::Error;

use foodflow_auth::AccessScope;
use foodflow_events::EventEnvelope;
use foodflow_relationships::{
    Permission, RelationshipEvent, RelationshipId, RelationshipRecord, visible_relationships,
};

use crate::projections::cursors::{CursorDecision, CursorError, StreamCursors};
use crate::read_model::ReadModelStore;

#[derive(Debug, Error)]
pub enum RelationshipProjectionError {
    #[error("failed to deserialize relationship event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Relationship listing projection.
///
/// The read model rows are [`RelationshipRecord`]s keyed by id; scoping for
/// the admin listing goes through the same visibility rule the domain crate
/// defines, so the projection cannot drift from it.
#[derive(Debug)]
pub struct RelationshipsProjection<S>
where
    S: ReadModelStore<RelationshipId, RelationshipRecord>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> RelationshipsProjection<S>
where
    S: ReadModelStore<RelationshipId, RelationshipRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, relationship_id: &RelationshipId) -> Option<RelationshipRecord> {
        self.store.get(relationship_id)
    }

    pub fn list(&self) -> Vec<RelationshipRecord> {
        self.store.list()
    }

    /// Relationships visible to the given scope (admin: all).
    pub fn visible_for(&self, scope: &AccessScope) -> Vec<RelationshipRecord> {
        let all = self.store.list();
        visible_relationships(&all, scope).into_iter().cloned().collect()
    }

    /// Parents granting `permission` to `child` (reverse lookup).
    pub fn parents_granting(
        &self,
        child: foodflow_enterprises::EnterpriseId,
        permission: Permission,
    ) -> Vec<foodflow_enterprises::EnterpriseId> {
        let all = self.store.list();
        foodflow_relationships::parents_granting(&all, child, permission)
            .into_iter()
            .collect()
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), RelationshipProjectionError> {
        if envelope.aggregate_type() != "relationships.registry" {
            return Ok(());
        }

        match self.cursors.decide(envelope.aggregate_id(), envelope.sequence_number())? {
            CursorDecision::Skip => return Ok(()),
            CursorDecision::Apply => {}
        }

        let event: RelationshipEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| RelationshipProjectionError::Deserialize(e.to_string()))?;

        match event {
            RelationshipEvent::RelationshipCreated(e) => {
                self.store.upsert(
                    e.relationship_id,
                    RelationshipRecord {
                        relationship_id: e.relationship_id,
                        parent: e.parent,
                        child: e.child,
                        permissions: e.permissions,
                    },
                );
            }
            RelationshipEvent::RelationshipPermissionsUpdated(e) => {
                if let Some(mut record) = self.store.get(&e.relationship_id) {
                    record.permissions = e.permissions;
                    self.store.upsert(e.relationship_id, record);
                }
            }
            RelationshipEvent::RelationshipDeleted(e) => {
                self.store.remove(&e.relationship_id);
            }
        }

        self.cursors.advance(envelope.aggregate_id(), envelope.sequence_number());

        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), RelationshipProjectionError> {
        self.store.clear();
        self.cursors.clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
