use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use foodflow_catalog::VariantId;
use foodflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use foodflow_cycles::OrderCycleId;
use foodflow_enterprises::EnterpriseId;
use foodflow_events::Event;

use crate::schedule::ScheduleId;

/// Subscription identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub AggregateId);

impl SubscriptionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Customer identifier (customers are managed by an external module).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub AggregateId);

impl CustomerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Proxy order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyOrderId(pub AggregateId);

impl ProxyOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProxyOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Errors specific to subscriptions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// A proxy order was requested for a cycle outside the subscription's
    /// schedule.
    #[error("order cycle is not part of the subscription's schedule")]
    ScheduleMismatch,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<SubscriptionError> for DomainError {
    fn from(value: SubscriptionError) -> Self {
        match value {
            SubscriptionError::ScheduleMismatch => {
                DomainError::invariant("order cycle is not part of the subscription's schedule")
            }
            SubscriptionError::Domain(e) => e,
        }
    }
}

/// Subscription status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Canceled,
}

/// Line item: variant + quantity ordered every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLineItem {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Aggregate root: Subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id: SubscriptionId,
    shop: Option<EnterpriseId>,
    customer: Option<CustomerId>,
    schedule_id: Option<ScheduleId>,
    /// Schedule membership snapshotted at creation; proxy orders are checked
    /// against this set.
    member_cycles: BTreeSet<OrderCycleId>,
    begins_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    line_items: Vec<SubscriptionLineItem>,
    proxy_orders: BTreeMap<OrderCycleId, ProxyOrderId>,
    status: SubscriptionStatus,
    version: u64,
    created: bool,
}

impl Subscription {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SubscriptionId) -> Self {
        Self {
            id,
            shop: None,
            customer: None,
            schedule_id: None,
            member_cycles: BTreeSet::new(),
            begins_at: None,
            ends_at: None,
            line_items: Vec::new(),
            proxy_orders: BTreeMap::new(),
            status: SubscriptionStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SubscriptionId {
        self.id
    }

    pub fn shop(&self) -> Option<EnterpriseId> {
        self.shop
    }

    pub fn customer(&self) -> Option<CustomerId> {
        self.customer
    }

    pub fn schedule_id(&self) -> Option<ScheduleId> {
        self.schedule_id
    }

    pub fn member_cycles(&self) -> &BTreeSet<OrderCycleId> {
        &self.member_cycles
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn line_items(&self) -> &[SubscriptionLineItem] {
        &self.line_items
    }

    /// Proxy orders by cycle (one per member cycle at most).
    pub fn proxy_orders(&self) -> &BTreeMap<OrderCycleId, ProxyOrderId> {
        &self.proxy_orders
    }
}

impl AggregateRoot for Subscription {
    type Id = SubscriptionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSubscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubscription {
    pub subscription_id: SubscriptionId,
    pub shop: EnterpriseId,
    pub customer: CustomerId,
    pub schedule_id: ScheduleId,
    /// The schedule's member cycles at creation time.
    pub schedule_cycles: Vec<OrderCycleId>,
    pub begins_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineItem {
    pub subscription_id: SubscriptionId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: GenerateProxyOrder (idempotent per cycle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateProxyOrder {
    pub subscription_id: SubscriptionId,
    pub proxy_order_id: ProxyOrderId,
    pub order_cycle_id: OrderCycleId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PauseSubscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseSubscription {
    pub subscription_id: SubscriptionId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResumeSubscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeSubscription {
    pub subscription_id: SubscriptionId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelSubscription (terminal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSubscription {
    pub subscription_id: SubscriptionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionCommand {
    CreateSubscription(CreateSubscription),
    AddLineItem(AddLineItem),
    GenerateProxyOrder(GenerateProxyOrder),
    PauseSubscription(PauseSubscription),
    ResumeSubscription(ResumeSubscription),
    CancelSubscription(CancelSubscription),
}

/// Event: SubscriptionCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCreated {
    pub subscription_id: SubscriptionId,
    pub shop: EnterpriseId,
    pub customer: CustomerId,
    pub schedule_id: ScheduleId,
    pub schedule_cycles: Vec<OrderCycleId>,
    pub begins_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubscriptionLineItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLineItemAdded {
    pub subscription_id: SubscriptionId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProxyOrderGenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyOrderGenerated {
    pub subscription_id: SubscriptionId,
    pub proxy_order_id: ProxyOrderId,
    pub order_cycle_id: OrderCycleId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubscriptionPaused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPaused {
    pub subscription_id: SubscriptionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubscriptionResumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResumed {
    pub subscription_id: SubscriptionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubscriptionCanceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCanceled {
    pub subscription_id: SubscriptionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionEvent {
    SubscriptionCreated(SubscriptionCreated),
    SubscriptionLineItemAdded(SubscriptionLineItemAdded),
    ProxyOrderGenerated(ProxyOrderGenerated),
    SubscriptionPaused(SubscriptionPaused),
    SubscriptionResumed(SubscriptionResumed),
    SubscriptionCanceled(SubscriptionCanceled),
}

impl Event for SubscriptionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SubscriptionEvent::SubscriptionCreated(_) => "subscriptions.subscription.created",
            SubscriptionEvent::SubscriptionLineItemAdded(_) => {
                "subscriptions.subscription.line_item_added"
            }
            SubscriptionEvent::ProxyOrderGenerated(_) => {
                "subscriptions.subscription.proxy_order_generated"
            }
            SubscriptionEvent::SubscriptionPaused(_) => "subscriptions.subscription.paused",
            SubscriptionEvent::SubscriptionResumed(_) => "subscriptions.subscription.resumed",
            SubscriptionEvent::SubscriptionCanceled(_) => "subscriptions.subscription.canceled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SubscriptionEvent::SubscriptionCreated(e) => e.occurred_at,
            SubscriptionEvent::SubscriptionLineItemAdded(e) => e.occurred_at,
            SubscriptionEvent::ProxyOrderGenerated(e) => e.occurred_at,
            SubscriptionEvent::SubscriptionPaused(e) => e.occurred_at,
            SubscriptionEvent::SubscriptionResumed(e) => e.occurred_at,
            SubscriptionEvent::SubscriptionCanceled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Subscription {
    type Command = SubscriptionCommand;
    type Event = SubscriptionEvent;
    type Error = SubscriptionError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SubscriptionEvent::SubscriptionCreated(e) => {
                self.id = e.subscription_id;
                self.shop = Some(e.shop);
                self.customer = Some(e.customer);
                self.schedule_id = Some(e.schedule_id);
                self.member_cycles = e.schedule_cycles.iter().copied().collect();
                self.begins_at = Some(e.begins_at);
                self.ends_at = e.ends_at;
                self.status = SubscriptionStatus::Active;
                self.created = true;
            }
            SubscriptionEvent::SubscriptionLineItemAdded(e) => {
                self.line_items.push(SubscriptionLineItem {
                    variant_id: e.variant_id,
                    quantity: e.quantity,
                });
            }
            SubscriptionEvent::ProxyOrderGenerated(e) => {
                self.proxy_orders.insert(e.order_cycle_id, e.proxy_order_id);
            }
            SubscriptionEvent::SubscriptionPaused(_) => {
                self.status = SubscriptionStatus::Paused;
            }
            SubscriptionEvent::SubscriptionResumed(_) => {
                self.status = SubscriptionStatus::Active;
            }
            SubscriptionEvent::SubscriptionCanceled(_) => {
                self.status = SubscriptionStatus::Canceled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SubscriptionCommand::CreateSubscription(cmd) => self.handle_create(cmd),
            SubscriptionCommand::AddLineItem(cmd) => self.handle_add_line_item(cmd),
            SubscriptionCommand::GenerateProxyOrder(cmd) => self.handle_generate_proxy_order(cmd),
            SubscriptionCommand::PauseSubscription(cmd) => self.handle_pause(cmd),
            SubscriptionCommand::ResumeSubscription(cmd) => self.handle_resume(cmd),
            SubscriptionCommand::CancelSubscription(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Subscription {
    fn ensure_subscription_id(&self, subscription_id: SubscriptionId) -> Result<(), SubscriptionError> {
        if self.id != subscription_id {
            return Err(SubscriptionError::Domain(DomainError::invariant(
                "subscription_id mismatch",
            )));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), SubscriptionError> {
        if !self.created {
            return Err(SubscriptionError::Domain(DomainError::NotFound));
        }
        Ok(())
    }

    fn ensure_not_canceled(&self) -> Result<(), SubscriptionError> {
        if self.status == SubscriptionStatus::Canceled {
            return Err(SubscriptionError::Domain(DomainError::conflict(
                "subscription is canceled",
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateSubscription) -> Result<Vec<SubscriptionEvent>, SubscriptionError> {
        if self.created {
            return Err(SubscriptionError::Domain(DomainError::conflict(
                "subscription already exists",
            )));
        }

        if let Some(ends_at) = cmd.ends_at {
            if ends_at <= cmd.begins_at {
                return Err(SubscriptionError::Domain(DomainError::validation(
                    "ends_at must be after begins_at",
                )));
            }
        }

        Ok(vec![SubscriptionEvent::SubscriptionCreated(SubscriptionCreated {
            subscription_id: cmd.subscription_id,
            shop: cmd.shop,
            customer: cmd.customer,
            schedule_id: cmd.schedule_id,
            schedule_cycles: cmd.schedule_cycles.clone(),
            begins_at: cmd.begins_at,
            ends_at: cmd.ends_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line_item(&self, cmd: &AddLineItem) -> Result<Vec<SubscriptionEvent>, SubscriptionError> {
        self.ensure_exists()?;
        self.ensure_subscription_id(cmd.subscription_id)?;
        self.ensure_not_canceled()?;

        if cmd.quantity == 0 {
            return Err(SubscriptionError::Domain(DomainError::validation(
                "quantity must be positive",
            )));
        }

        if self.line_items.iter().any(|li| li.variant_id == cmd.variant_id) {
            return Err(SubscriptionError::Domain(DomainError::conflict(
                "variant already on subscription",
            )));
        }

        Ok(vec![SubscriptionEvent::SubscriptionLineItemAdded(SubscriptionLineItemAdded {
            subscription_id: cmd.subscription_id,
            variant_id: cmd.variant_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_generate_proxy_order(
        &self,
        cmd: &GenerateProxyOrder,
    ) -> Result<Vec<SubscriptionEvent>, SubscriptionError> {
        self.ensure_exists()?;
        self.ensure_subscription_id(cmd.subscription_id)?;
        self.ensure_not_canceled()?;

        if self.status == SubscriptionStatus::Paused {
            return Err(SubscriptionError::Domain(DomainError::invariant(
                "paused subscription does not generate orders",
            )));
        }

        if !self.member_cycles.contains(&cmd.order_cycle_id) {
            return Err(SubscriptionError::ScheduleMismatch);
        }

        // Idempotent: one proxy order per cycle; regeneration is a no-op.
        if self.proxy_orders.contains_key(&cmd.order_cycle_id) {
            return Ok(vec![]);
        }

        Ok(vec![SubscriptionEvent::ProxyOrderGenerated(ProxyOrderGenerated {
            subscription_id: cmd.subscription_id,
            proxy_order_id: cmd.proxy_order_id,
            order_cycle_id: cmd.order_cycle_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pause(&self, cmd: &PauseSubscription) -> Result<Vec<SubscriptionEvent>, SubscriptionError> {
        self.ensure_exists()?;
        self.ensure_subscription_id(cmd.subscription_id)?;
        self.ensure_not_canceled()?;

        if self.status == SubscriptionStatus::Paused {
            return Err(SubscriptionError::Domain(DomainError::conflict(
                "subscription is already paused",
            )));
        }

        Ok(vec![SubscriptionEvent::SubscriptionPaused(SubscriptionPaused {
            subscription_id: cmd.subscription_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resume(&self, cmd: &ResumeSubscription) -> Result<Vec<SubscriptionEvent>, SubscriptionError> {
        self.ensure_exists()?;
        self.ensure_subscription_id(cmd.subscription_id)?;
        self.ensure_not_canceled()?;

        if self.status != SubscriptionStatus::Paused {
            return Err(SubscriptionError::Domain(DomainError::conflict(
                "subscription is not paused",
            )));
        }

        Ok(vec![SubscriptionEvent::SubscriptionResumed(SubscriptionResumed {
            subscription_id: cmd.subscription_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelSubscription) -> Result<Vec<SubscriptionEvent>, SubscriptionError> {
        self.ensure_exists()?;
        self.ensure_subscription_id(cmd.subscription_id)?;
        self.ensure_not_canceled()?;

        Ok(vec![SubscriptionEvent::SubscriptionCanceled(SubscriptionCanceled {
            subscription_id: cmd.subscription_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodflow_events::execute;

    fn test_subscription_id() -> SubscriptionId {
        SubscriptionId::new(AggregateId::new())
    }

    fn test_cycle_id() -> OrderCycleId {
        OrderCycleId::new(AggregateId::new())
    }

    fn test_variant() -> VariantId {
        VariantId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    /// Explicit builder: an active subscription over the given member cycles.
    fn created_subscription(id: SubscriptionId, cycles: &[OrderCycleId]) -> Subscription {
        let mut subscription = Subscription::empty(id);
        execute(
            &mut subscription,
            &SubscriptionCommand::CreateSubscription(CreateSubscription {
                subscription_id: id,
                shop: EnterpriseId::new(AggregateId::new()),
                customer: CustomerId::new(AggregateId::new()),
                schedule_id: ScheduleId::new(AggregateId::new()),
                schedule_cycles: cycles.to_vec(),
                begins_at: test_time() - chrono::Duration::days(30),
                ends_at: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        subscription
    }

    #[test]
    fn proxy_order_requires_schedule_membership() {
        let id = test_subscription_id();
        let member = test_cycle_id();
        let subscription = created_subscription(id, &[member]);

        let err = subscription
            .handle(&SubscriptionCommand::GenerateProxyOrder(GenerateProxyOrder {
                subscription_id: id,
                proxy_order_id: ProxyOrderId::new(AggregateId::new()),
                order_cycle_id: test_cycle_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, SubscriptionError::ScheduleMismatch);
    }

    #[test]
    fn proxy_order_generation_is_idempotent_per_cycle() {
        let id = test_subscription_id();
        let member = test_cycle_id();
        let mut subscription = created_subscription(id, &[member]);

        let first = ProxyOrderId::new(AggregateId::new());
        let cmd = SubscriptionCommand::GenerateProxyOrder(GenerateProxyOrder {
            subscription_id: id,
            proxy_order_id: first,
            order_cycle_id: member,
            occurred_at: test_time(),
        });
        let events = execute(&mut subscription, &cmd).unwrap();
        assert_eq!(events.len(), 1);

        // Regenerating for the same cycle is a no-op and keeps the original.
        let retry = SubscriptionCommand::GenerateProxyOrder(GenerateProxyOrder {
            subscription_id: id,
            proxy_order_id: ProxyOrderId::new(AggregateId::new()),
            order_cycle_id: member,
            occurred_at: test_time(),
        });
        let events = execute(&mut subscription, &retry).unwrap();
        assert!(events.is_empty());
        assert_eq!(subscription.proxy_orders().get(&member), Some(&first));
    }

    #[test]
    fn one_proxy_order_per_member_cycle() {
        let id = test_subscription_id();
        let cycles = [test_cycle_id(), test_cycle_id()];
        let mut subscription = created_subscription(id, &cycles);

        for cycle in &cycles {
            execute(
                &mut subscription,
                &SubscriptionCommand::GenerateProxyOrder(GenerateProxyOrder {
                    subscription_id: id,
                    proxy_order_id: ProxyOrderId::new(AggregateId::new()),
                    order_cycle_id: *cycle,
                    occurred_at: test_time(),
                }),
            )
            .unwrap();
        }

        assert_eq!(subscription.proxy_orders().len(), 2);
        assert!(cycles.iter().all(|c| subscription.proxy_orders().contains_key(c)));
    }

    #[test]
    fn line_items_require_positive_quantity_and_unique_variant() {
        let id = test_subscription_id();
        let mut subscription = created_subscription(id, &[test_cycle_id()]);
        let variant = test_variant();

        let err = subscription
            .handle(&SubscriptionCommand::AddLineItem(AddLineItem {
                subscription_id: id,
                variant_id: variant,
                quantity: 0,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::Domain(DomainError::Validation(_))));

        let cmd = SubscriptionCommand::AddLineItem(AddLineItem {
            subscription_id: id,
            variant_id: variant,
            quantity: 2,
            occurred_at: test_time(),
        });
        execute(&mut subscription, &cmd).unwrap();

        let err = subscription.handle(&cmd).unwrap_err();
        assert!(matches!(err, SubscriptionError::Domain(DomainError::Conflict(_))));
    }

    #[test]
    fn paused_subscription_does_not_generate_orders() {
        let id = test_subscription_id();
        let member = test_cycle_id();
        let mut subscription = created_subscription(id, &[member]);

        execute(
            &mut subscription,
            &SubscriptionCommand::PauseSubscription(PauseSubscription {
                subscription_id: id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(subscription.status(), SubscriptionStatus::Paused);

        let err = subscription
            .handle(&SubscriptionCommand::GenerateProxyOrder(GenerateProxyOrder {
                subscription_id: id,
                proxy_order_id: ProxyOrderId::new(AggregateId::new()),
                order_cycle_id: member,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            SubscriptionError::Domain(DomainError::InvariantViolation(_))
        ));

        execute(
            &mut subscription,
            &SubscriptionCommand::ResumeSubscription(ResumeSubscription {
                subscription_id: id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(subscription.status(), SubscriptionStatus::Active);
    }

    #[test]
    fn cancel_is_terminal() {
        let id = test_subscription_id();
        let member = test_cycle_id();
        let mut subscription = created_subscription(id, &[member]);

        execute(
            &mut subscription,
            &SubscriptionCommand::CancelSubscription(CancelSubscription {
                subscription_id: id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(subscription.status(), SubscriptionStatus::Canceled);

        for cmd in [
            SubscriptionCommand::PauseSubscription(PauseSubscription {
                subscription_id: id,
                occurred_at: test_time(),
            }),
            SubscriptionCommand::GenerateProxyOrder(GenerateProxyOrder {
                subscription_id: id,
                proxy_order_id: ProxyOrderId::new(AggregateId::new()),
                order_cycle_id: member,
                occurred_at: test_time(),
            }),
            SubscriptionCommand::CancelSubscription(CancelSubscription {
                subscription_id: id,
                occurred_at: test_time(),
            }),
        ] {
            let err = subscription.handle(&cmd).unwrap_err();
            assert!(matches!(err, SubscriptionError::Domain(DomainError::Conflict(_))));
        }
    }

    #[test]
    fn create_rejects_inverted_lifetime() {
        let id = test_subscription_id();
        let subscription = Subscription::empty(id);
        let now = test_time();

        let err = subscription
            .handle(&SubscriptionCommand::CreateSubscription(CreateSubscription {
                subscription_id: id,
                shop: EnterpriseId::new(AggregateId::new()),
                customer: CustomerId::new(AggregateId::new()),
                schedule_id: ScheduleId::new(AggregateId::new()),
                schedule_cycles: vec![],
                begins_at: now,
                ends_at: Some(now - chrono::Duration::days(1)),
                occurred_at: now,
            }))
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::Domain(DomainError::Validation(_))));
    }
}
