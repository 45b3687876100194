use serde_json::Value as JsonValue;
use thiserror::Error;

use foodflow_enterprises::{EnterpriseEvent, EnterpriseId, SellsScope};
use foodflow_events::EventEnvelope;

use crate::projections::cursors::{CursorDecision, CursorError, StreamCursors};
use crate::read_model::ReadModelStore;

/// Queryable enterprise directory: the parties of the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterpriseReadModel {
    pub enterprise_id: EnterpriseId,
    pub name: String,
    pub sells: SellsScope,
    pub is_primary_producer: bool,
    pub email: Option<String>,
    pub fee_count: usize,
}

#[derive(Debug, Error)]
pub enum EnterpriseProjectionError {
    #[error("failed to deserialize enterprise event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Enterprise directory projection.
#[derive(Debug)]
pub struct EnterpriseDirectoryProjection<S>
where
    S: ReadModelStore<EnterpriseId, EnterpriseReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> EnterpriseDirectoryProjection<S>
where
    S: ReadModelStore<EnterpriseId, EnterpriseReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, enterprise_id: &EnterpriseId) -> Option<EnterpriseReadModel> {
        self.store.get(enterprise_id)
    }

    pub fn list(&self) -> Vec<EnterpriseReadModel> {
        self.store.list()
    }

    /// Simple name search (case-insensitive substring).
    pub fn search_by_name(&self, query: &str) -> Vec<EnterpriseReadModel> {
        let q = query.to_lowercase();
        self.list()
            .into_iter()
            .filter(|rm| rm.name.to_lowercase().contains(&q))
            .collect()
    }

    /// Apply a published envelope into the projection.
    ///
    /// Ignores non-enterprise aggregates (the bus is shared across modules);
    /// idempotent for at-least-once delivery.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), EnterpriseProjectionError> {
        if envelope.aggregate_type() != "enterprises.enterprise" {
            return Ok(());
        }

        match self.cursors.decide(envelope.aggregate_id(), envelope.sequence_number())? {
            CursorDecision::Skip => return Ok(()),
            CursorDecision::Apply => {}
        }

        let event: EnterpriseEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| EnterpriseProjectionError::Deserialize(e.to_string()))?;

        match event {
            EnterpriseEvent::EnterpriseRegistered(e) => {
                self.store.upsert(
                    e.enterprise_id,
                    EnterpriseReadModel {
                        enterprise_id: e.enterprise_id,
                        name: e.name,
                        sells: e.sells,
                        is_primary_producer: e.is_primary_producer,
                        email: e.contact.email,
                        fee_count: 0,
                    },
                );
            }
            EnterpriseEvent::EnterpriseProfileUpdated(e) => {
                if let Some(mut rm) = self.store.get(&e.enterprise_id) {
                    rm.name = e.name;
                    rm.email = e.contact.email;
                    self.store.upsert(e.enterprise_id, rm);
                }
            }
            EnterpriseEvent::EnterpriseFeeDefined(e) => {
                if let Some(mut rm) = self.store.get(&e.enterprise_id) {
                    rm.fee_count += 1;
                    self.store.upsert(e.enterprise_id, rm);
                }
            }
        }

        self.cursors.advance(envelope.aggregate_id(), envelope.sequence_number());

        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), EnterpriseProjectionError> {
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
