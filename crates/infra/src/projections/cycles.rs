use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use foodflow_catalog::VariantId;
use foodflow_cycles::{OrderCycleEvent, OrderCycleId, ExchangeId, OrderWindow, WindowState};
use foodflow_enterprises::{EnterpriseId, FeeId};
use foodflow_events::EventEnvelope;

use crate::projections::cursors::{CursorDecision, CursorError, StreamCursors};
use crate::read_model::ReadModelStore;

/// One exchange row in the cycle read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSummary {
    pub exchange_id: ExchangeId,
    pub incoming: bool,
    /// The non-coordinator endpoint (supplier or distributor).
    pub counterparty: EnterpriseId,
    pub variants: BTreeSet<VariantId>,
    pub fees: Vec<FeeId>,
}

/// Queryable order-cycle read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCycleReadModel {
    pub cycle_id: OrderCycleId,
    pub name: String,
    pub coordinator: EnterpriseId,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub exchanges: Vec<ExchangeSummary>,
}

impl OrderCycleReadModel {
    pub fn window_state(&self, now: DateTime<Utc>) -> WindowState {
        OrderWindow::new(self.opens_at, self.closes_at).state_at(now)
    }

    /// Union of variants on all incoming exchanges (the outgoing pool).
    pub fn incoming_variant_union(&self) -> BTreeSet<VariantId> {
        self.exchanges
            .iter()
            .filter(|ex| ex.incoming)
            .flat_map(|ex| ex.variants.iter().copied())
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum CycleProjectionError {
    #[error("failed to deserialize order cycle event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Order-cycle listing projection.
#[derive(Debug)]
pub struct OrderCyclesProjection<S>
where
    S: ReadModelStore<OrderCycleId, OrderCycleReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> OrderCyclesProjection<S>
where
    S: ReadModelStore<OrderCycleId, OrderCycleReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, cycle_id: &OrderCycleId) -> Option<OrderCycleReadModel> {
        self.store.get(cycle_id)
    }

    pub fn list(&self) -> Vec<OrderCycleReadModel> {
        self.store.list()
    }

    /// Cycles currently open for ordering.
    pub fn open_at(&self, now: DateTime<Utc>) -> Vec<OrderCycleReadModel> {
        self.list()
            .into_iter()
            .filter(|rm| {
                matches!(rm.window_state(now), WindowState::Open | WindowState::Undated)
            })
            .collect()
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), CycleProjectionError> {
        if envelope.aggregate_type() != "cycles.order_cycle" {
            return Ok(());
        }

        match self.cursors.decide(envelope.aggregate_id(), envelope.sequence_number())? {
            CursorDecision::Skip => return Ok(()),
            CursorDecision::Apply => {}
        }

        let event: OrderCycleEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| CycleProjectionError::Deserialize(e.to_string()))?;

        match event {
            OrderCycleEvent::OrderCycleCreated(e) => {
                self.store.upsert(
                    e.cycle_id,
                    OrderCycleReadModel {
                        cycle_id: e.cycle_id,
                        name: e.name,
                        coordinator: e.coordinator,
                        opens_at: e.orders_open_at,
                        closes_at: e.orders_close_at,
                        exchanges: Vec::new(),
                    },
                );
            }
            OrderCycleEvent::IncomingExchangeAdded(e) => {
                if let Some(mut rm) = self.store.get(&e.cycle_id) {
                    rm.exchanges.push(ExchangeSummary {
                        exchange_id: e.exchange_id,
                        incoming: true,
                        counterparty: e.sender,
                        variants: BTreeSet::new(),
                        fees: Vec::new(),
                    });
                    self.store.upsert(e.cycle_id, rm);
                }
            }
            OrderCycleEvent::OutgoingExchangeAdded(e) => {
                if let Some(mut rm) = self.store.get(&e.cycle_id) {
                    rm.exchanges.push(ExchangeSummary {
                        exchange_id: e.exchange_id,
                        incoming: false,
                        counterparty: e.receiver,
                        variants: BTreeSet::new(),
                        fees: Vec::new(),
                    });
                    self.store.upsert(e.cycle_id, rm);
                }
            }
            OrderCycleEvent::ExchangeVariantAttached(e) => {
                if let Some(mut rm) = self.store.get(&e.cycle_id) {
                    if let Some(ex) = rm
                        .exchanges
                        .iter_mut()
                        .find(|ex| ex.exchange_id == e.exchange_id)
                    {
                        ex.variants.insert(e.variant_id);
                    }
                    self.store.upsert(e.cycle_id, rm);
                }
            }
            OrderCycleEvent::ExchangeFeeAttached(e) => {
                if let Some(mut rm) = self.store.get(&e.cycle_id) {
                    if let Some(ex) = rm
                        .exchanges
                        .iter_mut()
                        .find(|ex| ex.exchange_id == e.exchange_id)
                    {
                        if !ex.fees.contains(&e.fee_id) {
                            ex.fees.push(e.fee_id);
                        }
                    }
                    self.store.upsert(e.cycle_id, rm);
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
    ) -> Result<(), CycleProjectionError> {
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
