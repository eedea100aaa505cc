//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the directory and the document generator shared by handlers
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices) -> Router {
    let services = Arc::new(services);

    let documents = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::acting_user_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(documents)
        .layer(ServiceBuilder::new())
}
