use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use foodflow_core::AggregateId;
use foodflow_cycles::{
    AddIncomingExchange, AddOutgoingExchange, AttachExchangeFee, AttachExchangeVariant,
    CreateOrderCycle, ExchangeId, OrderCycle, OrderCycleCommand, OrderCycleId,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::app::routes::common::parse_id;
use crate::authz;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order_cycle).get(list_order_cycles))
        .route("/:id", get(get_order_cycle))
        .route("/:id/incoming-exchanges", post(add_incoming_exchange))
        .route("/:id/outgoing-exchanges", post(add_outgoing_exchange))
        .route("/:id/exchanges/:ex/variants", post(attach_variant))
        .route("/:id/exchanges/:ex/fees", post(attach_fee))
        .route("/:id/exchanges/:ex/available-variants", get(available_variants))
}

const CYCLE_TYPE: &str = "cycles.order_cycle";

fn make_cycle(id: AggregateId) -> OrderCycle {
    OrderCycle::empty(OrderCycleId::new(id))
}

/// Resolve the cycle's coordinator from the read model and require the
/// caller to act for it. Exchanges and the cycle itself are the
/// coordinator's to manage.
fn require_coordinator_scope(
    services: &AppServices,
    ctx: &AuthContext,
    cycle_id: OrderCycleId,
) -> Result<(), axum::response::Response> {
    let Some(rm) = services.cycles.get(&cycle_id) else {
        return Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "order cycle not found",
        ));
    };
    authz::require_acting_for(ctx, rm.coordinator.0).map_err(errors::authz_error_to_response)
}

pub async fn create_order_cycle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<dto::CreateOrderCycleRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require_acting_for(&ctx, body.coordinator.0) {
        return errors::authz_error_to_response(e);
    }

    let agg = AggregateId::new();
    let cycle_id = OrderCycleId::new(agg);

    let cmd = OrderCycleCommand::CreateOrderCycle(CreateOrderCycle {
        cycle_id,
        name: body.name,
        coordinator: body.coordinator,
        orders_open_at: body.orders_open_at,
        orders_close_at: body.orders_close_at,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<OrderCycle>(agg, CYCLE_TYPE, cmd, make_cycle) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": cycle_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_order_cycles(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let now = Utc::now();
    let items = services
        .cycles
        .list()
        .iter()
        .map(|rm| dto::cycle_to_json(rm, now))
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_order_cycle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.cycles.get(&OrderCycleId::new(agg)) {
        Some(rm) => (StatusCode::OK, Json(dto::cycle_to_json(&rm, Utc::now()))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "order cycle not found"),
    }
}

pub async fn add_incoming_exchange(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddIncomingExchangeRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cycle_id = OrderCycleId::new(agg);

    if let Err(resp) = require_coordinator_scope(&services, &ctx, cycle_id) {
        return resp;
    }

    let exchange_id = ExchangeId::new(AggregateId::new());
    let cmd = OrderCycleCommand::AddIncomingExchange(AddIncomingExchange {
        cycle_id,
        exchange_id,
        supplier: body.supplier,
        receival_instructions: body.receival_instructions,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<OrderCycle>(agg, CYCLE_TYPE, cmd, make_cycle) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "exchange_id": exchange_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn add_outgoing_exchange(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddOutgoingExchangeRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cycle_id = OrderCycleId::new(agg);

    if let Err(resp) = require_coordinator_scope(&services, &ctx, cycle_id) {
        return resp;
    }

    let exchange_id = ExchangeId::new(AggregateId::new());
    let cmd = OrderCycleCommand::AddOutgoingExchange(AddOutgoingExchange {
        cycle_id,
        exchange_id,
        distributor: body.distributor,
        pickup_time: body.pickup_time,
        pickup_instructions: body.pickup_instructions,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<OrderCycle>(agg, CYCLE_TYPE, cmd, make_cycle) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "exchange_id": exchange_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn attach_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, ex)): Path<(String, String)>,
    Json(body): Json<dto::AttachVariantRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let exchange = match parse_id(&ex) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cycle_id = OrderCycleId::new(agg);

    if let Err(resp) = require_coordinator_scope(&services, &ctx, cycle_id) {
        return resp;
    }

    let cmd = OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
        cycle_id,
        exchange_id: ExchangeId::new(exchange),
        variant_id: body.variant_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<OrderCycle>(agg, CYCLE_TYPE, cmd, make_cycle) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn attach_fee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, ex)): Path<(String, String)>,
    Json(body): Json<dto::AttachFeeRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let exchange = match parse_id(&ex) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cycle_id = OrderCycleId::new(agg);

    if let Err(resp) = require_coordinator_scope(&services, &ctx, cycle_id) {
        return resp;
    }

    let cmd = OrderCycleCommand::AttachExchangeFee(AttachExchangeFee {
        cycle_id,
        exchange_id: ExchangeId::new(exchange),
        fee_id: body.fee_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<OrderCycle>(agg, CYCLE_TYPE, cmd, make_cycle) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// Variants an outgoing exchange may carry: the union of the cycle's
/// incoming exchange variants. Setup code copies from this pool.
pub async fn available_variants(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, ex)): Path<(String, String)>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let exchange = match parse_id(&ex) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let Some(rm) = services.cycles.get(&OrderCycleId::new(agg)) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "order cycle not found");
    };

    let exchange_id = ExchangeId::new(exchange);
    let Some(summary) = rm.exchanges.iter().find(|e| e.exchange_id == exchange_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "exchange not found");
    };

    if summary.incoming {
        return errors::json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invariant_violation",
            "available variants apply to outgoing exchanges",
        );
    }

    let variants = rm
        .incoming_variant_union()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "variants": variants }))).into_response()
}
