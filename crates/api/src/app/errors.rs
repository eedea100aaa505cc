use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use factoring_core::DomainError;
use factoring_documents::DocumentError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::Unavailable(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
    }
}

pub fn document_error_to_response(err: DocumentError) -> axum::response::Response {
    match err {
        DocumentError::Lookup(e) => domain_error_to_response(e),
        DocumentError::Template(e) => {
            tracing::error!(error = %e, "invoice template failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "template_error", e.to_string())
        }
        DocumentError::Render(e) => {
            tracing::error!(error = %e, "barcode rendering failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "render_error", e.to_string())
        }
        DocumentError::Conversion(e) => {
            tracing::error!(error = %e, "pdf conversion failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "conversion_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
