//! Request/response DTOs and JSON mapping helpers.
//!
//! Ids and closed enums deserialize straight into their domain types; the
//! one deliberate exception is permissions, which arrive as strings and are
//! validated against the closed set at this boundary.

use std::collections::BTreeSet;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use foodflow_catalog::{VariantId, VariantStock};
use foodflow_cycles::OrderCycleId;
use foodflow_enterprises::{ContactInfo, EnterpriseId, FeeId, FeeType, SellsScope};
use foodflow_infra::projections::{
    catalog::ProductReadModel,
    cycles::OrderCycleReadModel,
    enterprises::EnterpriseReadModel,
    inventory::{InventoryItemReadModel, VariantOverrideReadModel},
    subscriptions::{ScheduleReadModel, SubscriptionReadModel},
};
use foodflow_inventory::StockPolicy;
use foodflow_relationships::{Permission, RelationshipRecord};
use foodflow_subscriptions::{CustomerId, ScheduleId};

use crate::app::errors;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterEnterpriseRequest {
    pub name: String,
    pub sells: SellsScope,
    #[serde(default)]
    pub is_primary_producer: bool,
    pub description: Option<String>,
    pub contact: Option<ContactInfo>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEnterpriseProfileRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub contact: Option<ContactInfo>,
}

#[derive(Debug, Deserialize)]
pub struct DefineFeeRequest {
    pub fee_type: FeeType,
    pub name: String,
    pub amount_per_item: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRelationshipRequest {
    pub parent: EnterpriseId,
    pub child: EnterpriseId,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRelationshipPermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderCycleRequest {
    pub name: String,
    pub coordinator: EnterpriseId,
    pub orders_open_at: Option<DateTime<Utc>>,
    pub orders_close_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AddIncomingExchangeRequest {
    pub supplier: EnterpriseId,
    #[serde(default)]
    pub receival_instructions: String,
}

#[derive(Debug, Deserialize)]
pub struct AddOutgoingExchangeRequest {
    pub distributor: EnterpriseId,
    #[serde(default)]
    pub pickup_time: String,
    #[serde(default)]
    pub pickup_instructions: String,
}

#[derive(Debug, Deserialize)]
pub struct AttachVariantRequest {
    pub variant_id: VariantId,
}

#[derive(Debug, Deserialize)]
pub struct AttachFeeRequest {
    pub fee_id: FeeId,
}

#[derive(Debug, Deserialize)]
pub struct NewVariant {
    #[serde(default)]
    pub unit_name: String,
    pub price: u64,
    pub stock: VariantStock,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub supplier: EnterpriseId,
    pub name: String,
    pub master: NewVariant,
}

#[derive(Debug, Deserialize)]
pub struct AddVariantRequest {
    pub variant: NewVariant,
}

#[derive(Debug, Deserialize)]
pub struct SetVariantStockRequest {
    pub variant_id: VariantId,
    pub stock: VariantStock,
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub name: String,
    #[serde(default)]
    pub order_cycles: Vec<OrderCycleId>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleCycleRequest {
    pub order_cycle_id: OrderCycleId,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub shop: EnterpriseId,
    pub customer: CustomerId,
    pub schedule_id: ScheduleId,
    pub begins_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AddLineItemRequest {
    pub variant_id: VariantId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateProxyOrderRequest {
    pub order_cycle_id: OrderCycleId,
}

#[derive(Debug, Deserialize)]
pub struct CreateVariantOverrideRequest {
    pub variant_id: VariantId,
    pub hub: EnterpriseId,
    pub price: Option<u64>,
    pub stock: StockPolicy,
    pub default_stock: Option<u64>,
    #[serde(default)]
    pub resettable: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetOverridePriceRequest {
    pub price: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SetStockPolicyRequest {
    pub stock: StockPolicy,
}

#[derive(Debug, Deserialize)]
pub struct RecordSaleRequest {
    pub quantity: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateInventoryItemRequest {
    pub enterprise: EnterpriseId,
    pub variant_id: VariantId,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SetVisibilityRequest {
    pub visible: bool,
}

/// Validate permission names against the closed set.
pub fn parse_permissions(names: &[String]) -> Result<BTreeSet<Permission>, axum::response::Response> {
    names
        .iter()
        .map(|name| {
            Permission::from_name(name).map_err(|e| {
                errors::json_error(StatusCode::BAD_REQUEST, "unknown_permission", e.to_string())
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

pub fn enterprise_to_json(rm: EnterpriseReadModel) -> JsonValue {
    json!({
        "id": rm.enterprise_id.to_string(),
        "name": rm.name,
        "sells": rm.sells,
        "is_primary_producer": rm.is_primary_producer,
        "email": rm.email,
        "fee_count": rm.fee_count,
    })
}

pub fn relationship_to_json(record: &RelationshipRecord) -> JsonValue {
    json!({
        "id": record.relationship_id.to_string(),
        "parent": record.parent.to_string(),
        "child": record.child.to_string(),
        "permissions": record.permissions.iter().map(|p| p.name()).collect::<Vec<_>>(),
    })
}

pub fn permission_catalog() -> JsonValue {
    json!(
        Permission::ALL
            .iter()
            .map(|p| json!({ "name": p.name(), "label": p.label() }))
            .collect::<Vec<_>>()
    )
}

pub fn cycle_to_json(rm: &OrderCycleReadModel, now: DateTime<Utc>) -> JsonValue {
    json!({
        "id": rm.cycle_id.to_string(),
        "name": rm.name,
        "coordinator": rm.coordinator.to_string(),
        "orders_open_at": rm.opens_at,
        "orders_close_at": rm.closes_at,
        "status": rm.window_state(now),
        "exchanges": rm.exchanges.iter().map(|ex| json!({
            "id": ex.exchange_id.to_string(),
            "incoming": ex.incoming,
            "counterparty": ex.counterparty.to_string(),
            "variants": ex.variants.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            "fees": ex.fees.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
    })
}

pub fn product_to_json(rm: &ProductReadModel) -> JsonValue {
    json!({
        "id": rm.product_id.to_string(),
        "supplier": rm.supplier.to_string(),
        "name": rm.name,
        "variants": rm.variants.iter().map(|v| json!({
            "id": v.variant_id.to_string(),
            "unit_name": v.unit_name,
            "price": v.price,
            "stock": v.stock,
        })).collect::<Vec<_>>(),
    })
}

pub fn schedule_to_json(rm: &ScheduleReadModel) -> JsonValue {
    json!({
        "id": rm.schedule_id.to_string(),
        "name": rm.name,
        "order_cycles": rm.order_cycles.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
    })
}

pub fn subscription_to_json(rm: &SubscriptionReadModel) -> JsonValue {
    json!({
        "id": rm.subscription_id.to_string(),
        "shop": rm.shop.to_string(),
        "customer": rm.customer.to_string(),
        "schedule_id": rm.schedule_id.to_string(),
        "status": rm.status,
        "line_item_count": rm.line_item_count,
        "proxy_order_count": rm.proxy_order_count,
    })
}

pub fn override_to_json(rm: &VariantOverrideReadModel) -> JsonValue {
    json!({
        "id": rm.override_id.to_string(),
        "variant_id": rm.variant_id.to_string(),
        "hub": rm.hub.to_string(),
        "price": rm.price,
        "stock": rm.stock,
        "resettable": rm.resettable,
    })
}

pub fn item_to_json(rm: &InventoryItemReadModel) -> JsonValue {
    json!({
        "id": rm.item_id.to_string(),
        "enterprise": rm.enterprise.to_string(),
        "variant_id": rm.variant_id.to_string(),
        "visible": rm.visible,
    })
}
