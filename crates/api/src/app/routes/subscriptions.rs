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
use foodflow_subscriptions::{
    AddLineItem, AddScheduleOrderCycle, CancelSubscription, CreateSchedule, CreateSubscription,
    GenerateProxyOrder, PauseSubscription, ProxyOrderId, RemoveScheduleOrderCycle,
    ResumeSubscription, Schedule, ScheduleCommand, ScheduleId, Subscription, SubscriptionCommand,
    SubscriptionId,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::app::routes::common::parse_id;
use crate::authz;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_subscription).get(list_subscriptions))
        .route("/:id", get(get_subscription))
        .route("/:id/line-items", post(add_line_item))
        .route("/:id/proxy-orders", post(generate_proxy_order))
        .route("/:id/pause", post(pause))
        .route("/:id/resume", post(resume))
        .route("/:id/cancel", post(cancel))
        .route("/schedules", post(create_schedule).get(list_schedules))
        .route("/schedules/:id", get(get_schedule))
        .route("/schedules/:id/order-cycles", post(add_schedule_cycle))
        .route(
            "/schedules/:id/order-cycles/remove",
            post(remove_schedule_cycle),
        )
}

const SCHEDULE_TYPE: &str = "subscriptions.schedule";
const SUBSCRIPTION_TYPE: &str = "subscriptions.subscription";

fn make_schedule(id: AggregateId) -> Schedule {
    Schedule::empty(ScheduleId::new(id))
}

fn make_subscription(id: AggregateId) -> Subscription {
    Subscription::empty(SubscriptionId::new(id))
}

fn require_shop_scope(
    services: &AppServices,
    ctx: &AuthContext,
    subscription_id: SubscriptionId,
) -> Result<(), axum::response::Response> {
    let Some(rm) = services.subscriptions.get(&subscription_id) else {
        return Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "subscription not found",
        ));
    };
    authz::require_acting_for(ctx, rm.shop.0).map_err(errors::authz_error_to_response)
}

pub async fn create_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateScheduleRequest>,
) -> axum::response::Response {
    let agg = AggregateId::new();
    let schedule_id = ScheduleId::new(agg);

    let cmd = ScheduleCommand::CreateSchedule(CreateSchedule {
        schedule_id,
        name: body.name,
        order_cycles: body.order_cycles,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Schedule>(agg, SCHEDULE_TYPE, cmd, make_schedule) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": schedule_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_schedules(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services
        .schedules
        .list()
        .iter()
        .map(dto::schedule_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.schedules.get(&ScheduleId::new(agg)) {
        Some(rm) => (StatusCode::OK, Json(dto::schedule_to_json(&rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "schedule not found"),
    }
}

pub async fn add_schedule_cycle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ScheduleCycleRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ScheduleCommand::AddScheduleOrderCycle(AddScheduleOrderCycle {
        schedule_id: ScheduleId::new(agg),
        order_cycle_id: body.order_cycle_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Schedule>(agg, SCHEDULE_TYPE, cmd, make_schedule) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn remove_schedule_cycle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ScheduleCycleRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ScheduleCommand::RemoveScheduleOrderCycle(RemoveScheduleOrderCycle {
        schedule_id: ScheduleId::new(agg),
        order_cycle_id: body.order_cycle_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Schedule>(agg, SCHEDULE_TYPE, cmd, make_schedule) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn create_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<dto::CreateSubscriptionRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require_acting_for(&ctx, body.shop.0) {
        return errors::authz_error_to_response(e);
    }

    // Snapshot the schedule's membership for the subscription's lifetime.
    let Some(schedule) = services.schedules.get(&body.schedule_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "schedule not found");
    };

    let agg = AggregateId::new();
    let subscription_id = SubscriptionId::new(agg);

    let cmd = SubscriptionCommand::CreateSubscription(CreateSubscription {
        subscription_id,
        shop: body.shop,
        customer: body.customer,
        schedule_id: body.schedule_id,
        schedule_cycles: schedule.order_cycles,
        begins_at: body.begins_at,
        ends_at: body.ends_at,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Subscription>(agg, SUBSCRIPTION_TYPE, cmd, make_subscription) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": subscription_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_subscriptions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    let items = services
        .subscriptions
        .list()
        .into_iter()
        .filter(|rm| ctx.scope().includes(rm.shop.0))
        .map(|rm| dto::subscription_to_json(&rm))
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.subscriptions.get(&SubscriptionId::new(agg)) {
        Some(rm) if ctx.scope().includes(rm.shop.0) => {
            (StatusCode::OK, Json(dto::subscription_to_json(&rm))).into_response()
        }
        _ => errors::json_error(StatusCode::NOT_FOUND, "not_found", "subscription not found"),
    }
}

pub async fn add_line_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddLineItemRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subscription_id = SubscriptionId::new(agg);

    if let Err(resp) = require_shop_scope(&services, &ctx, subscription_id) {
        return resp;
    }

    let cmd = SubscriptionCommand::AddLineItem(AddLineItem {
        subscription_id,
        variant_id: body.variant_id,
        quantity: body.quantity,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Subscription>(agg, SUBSCRIPTION_TYPE, cmd, make_subscription) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn generate_proxy_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::GenerateProxyOrderRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subscription_id = SubscriptionId::new(agg);

    if let Err(resp) = require_shop_scope(&services, &ctx, subscription_id) {
        return resp;
    }

    let proxy_order_id = ProxyOrderId::new(AggregateId::new());
    let cmd = SubscriptionCommand::GenerateProxyOrder(GenerateProxyOrder {
        subscription_id,
        proxy_order_id,
        order_cycle_id: body.order_cycle_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Subscription>(agg, SUBSCRIPTION_TYPE, cmd, make_subscription) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "proxy_order_id": proxy_order_id.to_string(),
                "events_committed": committed.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

async fn lifecycle(
    services: Arc<AppServices>,
    ctx: AuthContext,
    id: String,
    build: impl FnOnce(SubscriptionId) -> SubscriptionCommand,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subscription_id = SubscriptionId::new(agg);

    if let Err(resp) = require_shop_scope(&services, &ctx, subscription_id) {
        return resp;
    }

    match services.dispatch::<Subscription>(
        agg,
        SUBSCRIPTION_TYPE,
        build(subscription_id),
        make_subscription,
    ) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn pause(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    lifecycle(services, ctx, id, |subscription_id| {
        SubscriptionCommand::PauseSubscription(PauseSubscription {
            subscription_id,
            occurred_at: Utc::now(),
        })
    })
    .await
}

pub async fn resume(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    lifecycle(services, ctx, id, |subscription_id| {
        SubscriptionCommand::ResumeSubscription(ResumeSubscription {
            subscription_id,
            occurred_at: Utc::now(),
        })
    })
    .await
}

pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    lifecycle(services, ctx, id, |subscription_id| {
        SubscriptionCommand::CancelSubscription(CancelSubscription {
            subscription_id,
            occurred_at: Utc::now(),
        })
    })
    .await
}
