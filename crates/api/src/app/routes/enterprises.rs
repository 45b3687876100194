use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use foodflow_core::{AggregateId, UserId};
use foodflow_enterprises::{
    DefineFee, Enterprise, EnterpriseCommand, EnterpriseId, FeeId, RegisterEnterprise,
    UpdateProfile,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::app::routes::common::parse_id;
use crate::authz;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_enterprise).get(list_enterprises))
        .route("/:id", get(get_enterprise).patch(update_enterprise))
        .route("/:id/fees", post(define_fee))
}

fn make_enterprise(id: AggregateId) -> Enterprise {
    Enterprise::empty(EnterpriseId::new(id))
}

pub async fn register_enterprise(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<dto::RegisterEnterpriseRequest>,
) -> axum::response::Response {
    let agg = AggregateId::new();
    let enterprise_id = EnterpriseId::new(agg);
    let owner = UserId::from_uuid(*ctx.principal_id().as_uuid());

    let cmd = EnterpriseCommand::RegisterEnterprise(RegisterEnterprise {
        enterprise_id,
        owner,
        name: body.name,
        sells: body.sells,
        is_primary_producer: body.is_primary_producer,
        description: body.description,
        contact: body.contact,
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch::<Enterprise>(
        agg,
        "enterprises.enterprise",
        cmd,
        make_enterprise,
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": agg.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

pub async fn list_enterprises(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services
        .enterprises
        .list()
        .into_iter()
        .map(dto::enterprise_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_enterprise(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.enterprises.get(&EnterpriseId::new(agg)) {
        Some(rm) => (StatusCode::OK, Json(dto::enterprise_to_json(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "enterprise not found"),
    }
}

pub async fn update_enterprise(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateEnterpriseProfileRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Err(e) = authz::require_acting_for(&ctx, agg) {
        return errors::authz_error_to_response(e);
    }

    let cmd = EnterpriseCommand::UpdateProfile(UpdateProfile {
        enterprise_id: EnterpriseId::new(agg),
        name: body.name,
        description: body.description,
        contact: body.contact,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Enterprise>(agg, "enterprises.enterprise", cmd, make_enterprise) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": agg.to_string(),
                "events_committed": committed.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn define_fee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::DefineFeeRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Err(e) = authz::require_acting_for(&ctx, agg) {
        return errors::authz_error_to_response(e);
    }

    let fee_id = FeeId::new(AggregateId::new());
    let cmd = EnterpriseCommand::DefineFee(DefineFee {
        enterprise_id: EnterpriseId::new(agg),
        fee_id,
        fee_type: body.fee_type,
        name: body.name,
        amount_per_item: body.amount_per_item,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Enterprise>(agg, "enterprises.enterprise", cmd, make_enterprise) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "fee_id": fee_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
