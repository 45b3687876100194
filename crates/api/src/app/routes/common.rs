use axum::http::StatusCode;

use foodflow_core::AggregateId;

use crate::app::errors;

/// Parse a path segment into an aggregate id, or produce the 400 response.
pub fn parse_id(raw: &str) -> Result<AggregateId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid identifier")
    })
}
