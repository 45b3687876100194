use serde_json::Value as JsonValue;
use thiserror::Error;

use foodflow_cycles::OrderCycleId;
use foodflow_enterprises::EnterpriseId;
use foodflow_events::EventEnvelope;
use foodflow_subscriptions::{
    CustomerId, ScheduleEvent, ScheduleId, SubscriptionEvent, SubscriptionId, SubscriptionStatus,
};

use crate::projections::cursors::{CursorDecision, CursorError, StreamCursors};
use crate::read_model::ReadModelStore;

/// Queryable schedule read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleReadModel {
    pub schedule_id: ScheduleId,
    pub name: String,
    pub order_cycles: Vec<OrderCycleId>,
}

/// Queryable subscription read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionReadModel {
    pub subscription_id: SubscriptionId,
    pub shop: EnterpriseId,
    pub customer: CustomerId,
    pub schedule_id: ScheduleId,
    pub status: SubscriptionStatus,
    pub line_item_count: usize,
    pub proxy_order_count: usize,
}

#[derive(Debug, Error)]
pub enum SubscriptionProjectionError {
    #[error("failed to deserialize subscription event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Schedule listing projection.
#[derive(Debug)]
pub struct SchedulesProjection<S>
where
    S: ReadModelStore<ScheduleId, ScheduleReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> SchedulesProjection<S>
where
    S: ReadModelStore<ScheduleId, ScheduleReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, schedule_id: &ScheduleId) -> Option<ScheduleReadModel> {
        self.store.get(schedule_id)
    }

    pub fn list(&self) -> Vec<ScheduleReadModel> {
        self.store.list()
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), SubscriptionProjectionError> {
        if envelope.aggregate_type() != "subscriptions.schedule" {
            return Ok(());
        }

        match self.cursors.decide(envelope.aggregate_id(), envelope.sequence_number())? {
            CursorDecision::Skip => return Ok(()),
            CursorDecision::Apply => {}
        }

        let event: ScheduleEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| SubscriptionProjectionError::Deserialize(e.to_string()))?;

        match event {
            ScheduleEvent::ScheduleCreated(e) => {
                self.store.upsert(
                    e.schedule_id,
                    ScheduleReadModel {
                        schedule_id: e.schedule_id,
                        name: e.name,
                        order_cycles: e.order_cycles,
                    },
                );
            }
            ScheduleEvent::ScheduleOrderCycleAdded(e) => {
                if let Some(mut rm) = self.store.get(&e.schedule_id) {
                    rm.order_cycles.push(e.order_cycle_id);
                    self.store.upsert(e.schedule_id, rm);
                }
            }
            ScheduleEvent::ScheduleOrderCycleRemoved(e) => {
                if let Some(mut rm) = self.store.get(&e.schedule_id) {
                    rm.order_cycles.retain(|id| *id != e.order_cycle_id);
                    self.store.upsert(e.schedule_id, rm);
                }
            }
        }

        self.cursors.advance(envelope.aggregate_id(), envelope.sequence_number());

        Ok(())
    }
}

/// Subscription listing projection.
#[derive(Debug)]
pub struct SubscriptionsProjection<S>
where
    S: ReadModelStore<SubscriptionId, SubscriptionReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> SubscriptionsProjection<S>
where
    S: ReadModelStore<SubscriptionId, SubscriptionReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, subscription_id: &SubscriptionId) -> Option<SubscriptionReadModel> {
        self.store.get(subscription_id)
    }

    pub fn list(&self) -> Vec<SubscriptionReadModel> {
        self.store.list()
    }

    /// Subscriptions held by one shop.
    pub fn list_by_shop(&self, shop: EnterpriseId) -> Vec<SubscriptionReadModel> {
        self.list().into_iter().filter(|rm| rm.shop == shop).collect()
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), SubscriptionProjectionError> {
        if envelope.aggregate_type() != "subscriptions.subscription" {
            return Ok(());
        }

        match self.cursors.decide(envelope.aggregate_id(), envelope.sequence_number())? {
            CursorDecision::Skip => return Ok(()),
            CursorDecision::Apply => {}
        }

        let event: SubscriptionEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| SubscriptionProjectionError::Deserialize(e.to_string()))?;

        match event {
            SubscriptionEvent::SubscriptionCreated(e) => {
                self.store.upsert(
                    e.subscription_id,
                    SubscriptionReadModel {
                        subscription_id: e.subscription_id,
                        shop: e.shop,
                        customer: e.customer,
                        schedule_id: e.schedule_id,
                        status: SubscriptionStatus::Active,
                        line_item_count: 0,
                        proxy_order_count: 0,
                    },
                );
            }
            SubscriptionEvent::SubscriptionLineItemAdded(e) => {
                if let Some(mut rm) = self.store.get(&e.subscription_id) {
                    rm.line_item_count += 1;
                    self.store.upsert(e.subscription_id, rm);
                }
            }
            SubscriptionEvent::ProxyOrderGenerated(e) => {
                if let Some(mut rm) = self.store.get(&e.subscription_id) {
                    rm.proxy_order_count += 1;
                    self.store.upsert(e.subscription_id, rm);
                }
            }
            SubscriptionEvent::SubscriptionPaused(e) => {
                if let Some(mut rm) = self.store.get(&e.subscription_id) {
                    rm.status = SubscriptionStatus::Paused;
                    self.store.upsert(e.subscription_id, rm);
                }
            }
            SubscriptionEvent::SubscriptionResumed(e) => {
                if let Some(mut rm) = self.store.get(&e.subscription_id) {
                    rm.status = SubscriptionStatus::Active;
                    self.store.upsert(e.subscription_id, rm);
                }
            }
            SubscriptionEvent::SubscriptionCanceled(e) => {
                if let Some(mut rm) = self.store.get(&e.subscription_id) {
                    rm.status = SubscriptionStatus::Canceled;
                    self.store.upsert(e.subscription_id, rm);
                }
            }
        }

        self.cursors.advance(envelope.aggregate_id(), envelope.sequence_number());

        Ok(())
    }
}
