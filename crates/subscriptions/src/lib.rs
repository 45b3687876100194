//! `foodflow-subscriptions` — standing orders across order cycles.
//!
//! A schedule names an ordered set of order cycles; a subscription ties a
//! customer to a shop and a schedule, carries its line items, and generates
//! one proxy order per member cycle as each cycle comes around.

pub mod schedule;
pub mod subscription;

pub use schedule::{
    AddScheduleOrderCycle, CreateSchedule, RemoveScheduleOrderCycle, Schedule, ScheduleCommand,
    ScheduleCreated, ScheduleEvent, ScheduleId, ScheduleOrderCycleAdded, ScheduleOrderCycleRemoved,
};
pub use subscription::{
    AddLineItem, CancelSubscription, CreateSubscription, CustomerId, GenerateProxyOrder,
    PauseSubscription, ProxyOrderGenerated, ProxyOrderId, ResumeSubscription, Subscription,
    SubscriptionCanceled, SubscriptionCommand, SubscriptionCreated, SubscriptionError,
    SubscriptionEvent, SubscriptionId, SubscriptionLineItem, SubscriptionLineItemAdded,
    SubscriptionPaused, SubscriptionResumed, SubscriptionStatus,
};
