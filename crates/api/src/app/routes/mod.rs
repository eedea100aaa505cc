use axum::Router;

pub mod invoices;
pub mod system;

/// Router for the document endpoints.
pub fn router() -> Router {
    Router::new().nest("/invoices", invoices::router())
}
