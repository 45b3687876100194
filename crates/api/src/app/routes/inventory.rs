use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;
use serde::Deserialize;

use foodflow_core::AggregateId;
use foodflow_enterprises::EnterpriseId;
use foodflow_inventory::{
    CreateInventoryItem, CreateVariantOverride, InventoryItem, InventoryItemCommand,
    InventoryItemId, RecordSale, ResetStock, SetOverridePrice, SetStockPolicy, SetVisibility,
    VariantOverride, VariantOverrideCommand, VariantOverrideId,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::app::routes::common::parse_id;
use crate::authz;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/overrides", post(create_override).get(list_overrides))
        .route("/overrides/:id/price", patch(set_override_price))
        .route("/overrides/:id/stock", patch(set_stock_policy))
        .route("/overrides/:id/sales", post(record_sale))
        .route("/overrides/:id/reset", post(reset_stock))
        .route("/items", post(create_item).get(list_items))
        .route("/items/:id/visibility", patch(set_visibility))
}

const OVERRIDE_TYPE: &str = "inventory.variant_override";
const ITEM_TYPE: &str = "inventory.item";

fn make_override(id: AggregateId) -> VariantOverride {
    VariantOverride::empty(VariantOverrideId::new(id))
}

fn make_item(id: AggregateId) -> InventoryItem {
    InventoryItem::empty(InventoryItemId::new(id))
}

fn require_hub_scope(
    services: &AppServices,
    ctx: &AuthContext,
    override_id: VariantOverrideId,
) -> Result<(), axum::response::Response> {
    let Some(rm) = services.overrides.get(&override_id) else {
        return Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "variant override not found",
        ));
    };
    authz::require_acting_for(ctx, rm.hub.0).map_err(errors::authz_error_to_response)
}

pub async fn create_override(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<dto::CreateVariantOverrideRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require_acting_for(&ctx, body.hub.0) {
        return errors::authz_error_to_response(e);
    }

    let agg = AggregateId::new();
    let override_id = VariantOverrideId::new(agg);

    let cmd = VariantOverrideCommand::CreateVariantOverride(CreateVariantOverride {
        override_id,
        variant_id: body.variant_id,
        hub: body.hub,
        price: body.price,
        stock: body.stock,
        default_stock: body.default_stock,
        resettable: body.resettable,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<VariantOverride>(agg, OVERRIDE_TYPE, cmd, make_override) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": override_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct OverrideListQuery {
    hub: Option<String>,
}

pub async fn list_overrides(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<OverrideListQuery>,
) -> axum::response::Response {
    let overrides = match query.hub.as_deref() {
        Some(raw) => {
            let hub = match parse_id(raw) {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            services.overrides.list_by_hub(EnterpriseId::new(hub))
        }
        None => services.overrides.list(),
    };

    let items = overrides.iter().map(dto::override_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn set_override_price(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetOverridePriceRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let override_id = VariantOverrideId::new(agg);

    if let Err(resp) = require_hub_scope(&services, &ctx, override_id) {
        return resp;
    }

    let cmd = VariantOverrideCommand::SetOverridePrice(SetOverridePrice {
        override_id,
        price: body.price,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<VariantOverride>(agg, OVERRIDE_TYPE, cmd, make_override) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn set_stock_policy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetStockPolicyRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let override_id = VariantOverrideId::new(agg);

    if let Err(resp) = require_hub_scope(&services, &ctx, override_id) {
        return resp;
    }

    let cmd = VariantOverrideCommand::SetStockPolicy(SetStockPolicy {
        override_id,
        stock: body.stock,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<VariantOverride>(agg, OVERRIDE_TYPE, cmd, make_override) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RecordSaleRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let override_id = VariantOverrideId::new(agg);

    if let Err(resp) = require_hub_scope(&services, &ctx, override_id) {
        return resp;
    }

    let cmd = VariantOverrideCommand::RecordSale(RecordSale {
        override_id,
        quantity: body.quantity,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<VariantOverride>(agg, OVERRIDE_TYPE, cmd, make_override) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn reset_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let override_id = VariantOverrideId::new(agg);

    if let Err(resp) = require_hub_scope(&services, &ctx, override_id) {
        return resp;
    }

    let cmd = VariantOverrideCommand::ResetStock(ResetStock {
        override_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<VariantOverride>(agg, OVERRIDE_TYPE, cmd, make_override) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<dto::CreateInventoryItemRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require_acting_for(&ctx, body.enterprise.0) {
        return errors::authz_error_to_response(e);
    }

    let agg = AggregateId::new();
    let item_id = InventoryItemId::new(agg);

    let cmd = InventoryItemCommand::CreateInventoryItem(CreateInventoryItem {
        item_id,
        enterprise: body.enterprise,
        variant_id: body.variant_id,
        visible: body.visible,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<InventoryItem>(agg, ITEM_TYPE, cmd, make_item) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": item_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services.items.list().iter().map(dto::item_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn set_visibility(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetVisibilityRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let item_id = InventoryItemId::new(agg);

    let Some(rm) = services.items.get(&item_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "inventory item not found");
    };
    if let Err(e) = authz::require_acting_for(&ctx, rm.enterprise.0) {
        return errors::authz_error_to_response(e);
    }

    let cmd = InventoryItemCommand::SetVisibility(SetVisibility {
        item_id,
        visible: body.visible,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<InventoryItem>(agg, ITEM_TYPE, cmd, make_item) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
