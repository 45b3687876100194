use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use foodflow_catalog::{
    AddVariant, CreateProduct, Product, ProductCommand, ProductId, SetVariantStock, VariantId,
    VariantSpec,
};
use foodflow_core::AggregateId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::app::routes::common::parse_id;
use crate::authz;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product))
        .route("/:id/variants", post(add_variant))
        .route("/:id/stock", post(set_variant_stock))
}

const PRODUCT_TYPE: &str = "catalog.product";

fn make_product(id: AggregateId) -> Product {
    Product::empty(ProductId::new(id))
}

fn to_spec(variant: dto::NewVariant) -> VariantSpec {
    VariantSpec {
        variant_id: VariantId::new(AggregateId::new()),
        unit_name: variant.unit_name,
        price: variant.price,
        stock: variant.stock,
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require_acting_for(&ctx, body.supplier.0) {
        return errors::authz_error_to_response(e);
    }

    let agg = AggregateId::new();
    let product_id = ProductId::new(agg);
    let master = to_spec(body.master);
    let master_variant_id = master.variant_id;

    let cmd = ProductCommand::CreateProduct(CreateProduct {
        product_id,
        supplier: body.supplier,
        name: body.name,
        master,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Product>(agg, PRODUCT_TYPE, cmd, make_product) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": product_id.to_string(),
                "master_variant_id": master_variant_id.to_string(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services
        .catalog
        .list()
        .iter()
        .map(dto::product_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.get(&ProductId::new(agg)) {
        Some(rm) => (StatusCode::OK, Json(dto::product_to_json(&rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
    }
}

fn require_supplier_scope(
    services: &AppServices,
    ctx: &AuthContext,
    product_id: ProductId,
) -> Result<(), axum::response::Response> {
    let Some(rm) = services.catalog.get(&product_id) else {
        return Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "product not found",
        ));
    };
    authz::require_acting_for(ctx, rm.supplier.0).map_err(errors::authz_error_to_response)
}

pub async fn add_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddVariantRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id = ProductId::new(agg);

    if let Err(resp) = require_supplier_scope(&services, &ctx, product_id) {
        return resp;
    }

    let variant = to_spec(body.variant);
    let variant_id = variant.variant_id;

    let cmd = ProductCommand::AddVariant(AddVariant {
        product_id,
        variant,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Product>(agg, PRODUCT_TYPE, cmd, make_product) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "variant_id": variant_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn set_variant_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetVariantStockRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id = ProductId::new(agg);

    if let Err(resp) = require_supplier_scope(&services, &ctx, product_id) {
        return resp;
    }

    let cmd = ProductCommand::SetVariantStock(SetVariantStock {
        product_id,
        variant_id: body.variant_id,
        stock: body.stock,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Product>(agg, PRODUCT_TYPE, cmd, make_product) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": committed.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
