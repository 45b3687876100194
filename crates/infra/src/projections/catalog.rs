use serde_json::Value as JsonValue;
use thiserror::Error;

use foodflow_catalog::{ProductEvent, ProductId, VariantId, VariantStock};
use foodflow_enterprises::EnterpriseId;
use foodflow_events::EventEnvelope;

use crate::projections::cursors::{CursorDecision, CursorError, StreamCursors};
use crate::read_model::ReadModelStore;

/// One variant row in the product read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSummary {
    pub variant_id: VariantId,
    pub unit_name: String,
    pub price: u64,
    pub stock: VariantStock,
}

/// Queryable product catalog read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductReadModel {
    pub product_id: ProductId,
    pub supplier: EnterpriseId,
    pub name: String,
    pub variants: Vec<VariantSummary>,
}

#[derive(Debug, Error)]
pub enum CatalogProjectionError {
    #[error("failed to deserialize product event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Product catalog projection.
#[derive(Debug)]
pub struct ProductCatalogProjection<S>
where
    S: ReadModelStore<ProductId, ProductReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> ProductCatalogProjection<S>
where
    S: ReadModelStore<ProductId, ProductReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, product_id: &ProductId) -> Option<ProductReadModel> {
        self.store.get(product_id)
    }

    pub fn list(&self) -> Vec<ProductReadModel> {
        self.store.list()
    }

    /// Products supplied by one enterprise.
    pub fn list_by_supplier(&self, supplier: EnterpriseId) -> Vec<ProductReadModel> {
        self.list()
            .into_iter()
            .filter(|rm| rm.supplier == supplier)
            .collect()
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), CatalogProjectionError> {
        if envelope.aggregate_type() != "catalog.product" {
            return Ok(());
        }

        match self.cursors.decide(envelope.aggregate_id(), envelope.sequence_number())? {
            CursorDecision::Skip => return Ok(()),
            CursorDecision::Apply => {}
        }

        let event: ProductEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| CatalogProjectionError::Deserialize(e.to_string()))?;

        match event {
            ProductEvent::ProductCreated(e) => {
                self.store.upsert(
                    e.product_id,
                    ProductReadModel {
                        product_id: e.product_id,
                        supplier: e.supplier,
                        name: e.name,
                        variants: vec![VariantSummary {
                            variant_id: e.master.variant_id,
                            unit_name: e.master.unit_name,
                            price: e.master.price,
                            stock: e.master.stock,
                        }],
                    },
                );
            }
            ProductEvent::VariantAdded(e) => {
                if let Some(mut rm) = self.store.get(&e.product_id) {
                    rm.variants.push(VariantSummary {
                        variant_id: e.variant.variant_id,
                        unit_name: e.variant.unit_name,
                        price: e.variant.price,
                        stock: e.variant.stock,
                    });
                    self.store.upsert(e.product_id, rm);
                }
            }
            ProductEvent::VariantStockSet(e) => {
                if let Some(mut rm) = self.store.get(&e.product_id) {
                    if let Some(v) = rm.variants.iter_mut().find(|v| v.variant_id == e.variant_id) {
                        v.stock = e.stock;
                    }
                    self.store.upsert(e.product_id, rm);
                }
            }
        }

        self.cursors.advance(envelope.aggregate_id(), envelope.sequence_number());

        Ok(())
    }
}
