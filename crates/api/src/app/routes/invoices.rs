use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use factoring_core::InvoiceId;
use factoring_documents::{DocumentResult, InvoiceDocumentGenerator};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActingUser;

const PDF: &str = "application/pdf";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub fn router() -> Router {
    Router::new()
        .route("/:id/pdf", get(invoice_pdf))
        .route("/:id/docx", get(invoice_docx))
}

/// Header-safe file name: path separators, quotes and non-ASCII become `_`.
pub fn file_name(invoice_number: &str, extension: &str) -> String {
    let stem: String = invoice_number
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("{stem}.{extension}")
}

fn attachment(content_type: &str, file_name: &str, body: Vec<u8>) -> axum::response::Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"{file_name}\"")),
        ],
        body,
    )
        .into_response()
}

/// Run a generation on the blocking pool.
async fn generate<T, F>(generator: InvoiceDocumentGenerator, job: F) -> Result<T, axum::response::Response>
where
    T: Send + 'static,
    F: FnOnce(&InvoiceDocumentGenerator) -> DocumentResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || job(&generator)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(errors::document_error_to_response(e)),
        Err(e) => {
            tracing::error!(error = %e, "document generation task failed");
            Err(errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "document generation task failed",
            ))
        }
    }
}

pub async fn invoice_pdf(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(acting): Extension<ActingUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let invoice_id: InvoiceId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let generator = services.generator_for(acting);
    match generate(generator, move |g| g.render_pdf(invoice_id)).await {
        Ok(rendered) => attachment(PDF, &file_name(&rendered.invoice_number, "pdf"), rendered.pdf),
        Err(response) => response,
    }
}

pub async fn invoice_docx(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(acting): Extension<ActingUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let invoice_id: InvoiceId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let generator = services.generator_for(acting);
    match generate(generator, move |g| g.generate_docx(invoice_id)).await {
        Ok(docx) => attachment(DOCX, &file_name(&format!("invoice-{invoice_id}"), "docx"), docx),
        Err(response) => response,
    }
}
