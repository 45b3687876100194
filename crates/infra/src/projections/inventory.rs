use serde_json::Value as JsonValue;
use thiserror::Error;

use foodflow_catalog::VariantId;
use foodflow_enterprises::EnterpriseId;
use foodflow_events::EventEnvelope;
use foodflow_inventory::{
    InventoryItemEvent, InventoryItemId, StockPolicy, VariantOverrideEvent, VariantOverrideId,
};

use crate::projections::cursors::{CursorDecision, CursorError, StreamCursors};
use crate::read_model::ReadModelStore;

/// Queryable variant-override read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOverrideReadModel {
    pub override_id: VariantOverrideId,
    pub variant_id: VariantId,
    pub hub: EnterpriseId,
    pub price: Option<u64>,
    pub stock: StockPolicy,
    pub resettable: bool,
}

/// Queryable inventory-item read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItemReadModel {
    pub item_id: InventoryItemId,
    pub enterprise: EnterpriseId,
    pub variant_id: VariantId,
    pub visible: bool,
}

#[derive(Debug, Error)]
pub enum InventoryProjectionError {
    #[error("failed to deserialize inventory event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Variant-override listing projection.
#[derive(Debug)]
pub struct VariantOverridesProjection<S>
where
    S: ReadModelStore<VariantOverrideId, VariantOverrideReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> VariantOverridesProjection<S>
where
    S: ReadModelStore<VariantOverrideId, VariantOverrideReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, override_id: &VariantOverrideId) -> Option<VariantOverrideReadModel> {
        self.store.get(override_id)
    }

    pub fn list(&self) -> Vec<VariantOverrideReadModel> {
        self.store.list()
    }

    /// Overrides held by one hub.
    pub fn list_by_hub(&self, hub: EnterpriseId) -> Vec<VariantOverrideReadModel> {
        self.list().into_iter().filter(|rm| rm.hub == hub).collect()
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), InventoryProjectionError> {
        if envelope.aggregate_type() != "inventory.variant_override" {
            return Ok(());
        }

        match self.cursors.decide(envelope.aggregate_id(), envelope.sequence_number())? {
            CursorDecision::Skip => return Ok(()),
            CursorDecision::Apply => {}
        }

        let event: VariantOverrideEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| InventoryProjectionError::Deserialize(e.to_string()))?;

        match event {
            VariantOverrideEvent::VariantOverrideCreated(e) => {
                self.store.upsert(
                    e.override_id,
                    VariantOverrideReadModel {
                        override_id: e.override_id,
                        variant_id: e.variant_id,
                        hub: e.hub,
                        price: e.price,
                        stock: e.stock,
                        resettable: e.resettable,
                    },
                );
            }
            VariantOverrideEvent::OverridePriceSet(e) => {
                if let Some(mut rm) = self.store.get(&e.override_id) {
                    rm.price = e.price;
                    self.store.upsert(e.override_id, rm);
                }
            }
            VariantOverrideEvent::StockPolicySet(e) => {
                if let Some(mut rm) = self.store.get(&e.override_id) {
                    rm.stock = e.stock;
                    self.store.upsert(e.override_id, rm);
                }
            }
            VariantOverrideEvent::StockReduced(e) => {
                if let Some(mut rm) = self.store.get(&e.override_id) {
                    rm.stock = StockPolicy::Limited { count: e.remaining };
                    self.store.upsert(e.override_id, rm);
                }
            }
            VariantOverrideEvent::StockReset(e) => {
                if let Some(mut rm) = self.store.get(&e.override_id) {
                    rm.stock = StockPolicy::Limited { count: e.count };
                    self.store.upsert(e.override_id, rm);
                }
            }
        }

        self.cursors.advance(envelope.aggregate_id(), envelope.sequence_number());

        Ok(())
    }
}

/// Inventory-item listing projection.
#[derive(Debug)]
pub struct InventoryItemsProjection<S>
where
    S: ReadModelStore<InventoryItemId, InventoryItemReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> InventoryItemsProjection<S>
where
    S: ReadModelStore<InventoryItemId, InventoryItemReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, item_id: &InventoryItemId) -> Option<InventoryItemReadModel> {
        self.store.get(item_id)
    }

    pub fn list(&self) -> Vec<InventoryItemReadModel> {
        self.store.list()
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), InventoryProjectionError> {
        if envelope.aggregate_type() != "inventory.item" {
            return Ok(());
        }

        match self.cursors.decide(envelope.aggregate_id(), envelope.sequence_number())? {
            CursorDecision::Skip => return Ok(()),
            CursorDecision::Apply => {}
        }

        let event: InventoryItemEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| InventoryProjectionError::Deserialize(e.to_string()))?;

        match event {
            InventoryItemEvent::InventoryItemCreated(e) => {
                self.store.upsert(
                    e.item_id,
                    InventoryItemReadModel {
                        item_id: e.item_id,
                        enterprise: e.enterprise,
                        variant_id: e.variant_id,
                        visible: e.visible,
                    },
                );
            }
            InventoryItemEvent::InventoryItemVisibilityChanged(e) => {
                if let Some(mut rm) = self.store.get(&e.item_id) {
                    rm.visible = e.visible;
                    self.store.upsert(e.item_id, rm);
                }
            }
        }

        self.cursors.advance(envelope.aggregate_id(), envelope.sequence_number());

        Ok(())
    }
}
