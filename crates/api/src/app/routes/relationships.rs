use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;

use foodflow_core::AggregateId;
use foodflow_relationships::{
    CreateRelationship, DeleteRelationship, RelationshipId, RelationshipRegistry,
    RelationshipRegistryCommand, UpdatePermissions, eligible_children, eligible_parents,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::app::routes::common::parse_id;
use crate::authz;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_relationship).get(list_relationships))
        .route("/options", get(form_options))
        .route("/:id/permissions", put(update_permissions))
        .route("/:id", axum::routing::delete(delete_relationship))
}

const REGISTRY_TYPE: &str = "relationships.registry";

fn make_registry(id: AggregateId) -> RelationshipRegistry {
    RelationshipRegistry::empty(RelationshipId::new(id))
}

/// Listing is scoped: enterprise users see only edges touching their own
/// enterprises; site administrators see everything.
pub async fn list_relationships(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    let items = services
        .relationships
        .visible_for(ctx.scope())
        .iter()
        .map(dto::relationship_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// Selector contents for the creation form: eligible parents (the caller's
/// own enterprises), eligible children (everyone), and the permission
/// catalog with labels.
pub async fn form_options(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    let all: Vec<_> = services
        .enterprises
        .list()
        .into_iter()
        .map(|rm| rm.enterprise_id)
        .collect();

    let parents = eligible_parents(ctx.scope(), &all);
    let children = eligible_children(&all);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "parents": parents.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            "children": children.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            "permissions": dto::permission_catalog(),
        })),
    )
        .into_response()
}

pub async fn create_relationship(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<dto::CreateRelationshipRequest>,
) -> axum::response::Response {
    // A scoped user can only grant on behalf of their own enterprises.
    if let Err(e) = authz::require_acting_for(&ctx, body.parent.0) {
        return errors::authz_error_to_response(e);
    }

    let permissions = match dto::parse_permissions(&body.permissions) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let relationship_id = RelationshipId::new(AggregateId::new());
    let cmd = RelationshipRegistryCommand::CreateRelationship(CreateRelationship {
        relationship_id,
        parent: body.parent,
        child: body.child,
        permissions,
        occurred_at: Utc::now(),
    });

    // Retry on append races so a concurrent duplicate resolves to the
    // user-facing duplicate error, never a silent double-create.
    match services.dispatch_with_retry::<RelationshipRegistry>(
        services.registry_stream(),
        REGISTRY_TYPE,
        cmd,
        make_registry,
    ) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": relationship_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn update_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateRelationshipPermissionsRequest>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let relationship_id = RelationshipId::new(agg);

    // Changing a grant is the parent's move.
    let Some(record) = services.relationships.get(&relationship_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "relationship not found");
    };
    if let Err(e) = authz::require_acting_for(&ctx, record.parent.0) {
        return errors::authz_error_to_response(e);
    }

    let permissions = match dto::parse_permissions(&body.permissions) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let cmd = RelationshipRegistryCommand::UpdatePermissions(UpdatePermissions {
        relationship_id,
        permissions,
        occurred_at: Utc::now(),
    });

    match services.dispatch_with_retry::<RelationshipRegistry>(
        services.registry_stream(),
        REGISTRY_TYPE,
        cmd,
        make_registry,
    ) {
        Ok(committed) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": relationship_id.to_string(),
                "events_committed": committed.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn delete_relationship(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let relationship_id = RelationshipId::new(agg);

    // Either end of the edge may sever it.
    let Some(record) = services.relationships.get(&relationship_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "relationship not found");
    };
    if !ctx.scope().includes(record.parent.0) && !ctx.scope().includes(record.child.0) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", "relationship out of scope");
    }

    let cmd = RelationshipRegistryCommand::DeleteRelationship(DeleteRelationship {
        relationship_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch_with_retry::<RelationshipRegistry>(
        services.registry_stream(),
        REGISTRY_TYPE,
        cmd,
        make_registry,
    ) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
