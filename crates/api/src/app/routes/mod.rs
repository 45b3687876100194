use axum::{Router, routing::get};

pub mod common;
pub mod enterprises;
pub mod inventory;
pub mod order_cycles;
pub mod products;
pub mod relationships;
pub mod subscriptions;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .nest("/enterprises", enterprises::router())
        .nest("/relationships", relationships::router())
        .nest("/order-cycles", order_cycles::router())
        .nest("/products", products::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/inventory", inventory::router())
}
