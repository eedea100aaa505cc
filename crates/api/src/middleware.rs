use axum::{http::HeaderMap, middleware::Next, response::Response};

use factoring_core::{DomainError, UserId};

use crate::app::errors;
use crate::context::ActingUser;

pub const USER_HEADER: &str = "x-user-id";

/// Attach an [`ActingUser`] to every request; a malformed header is rejected.
pub async fn acting_user_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match extract_user(req.headers()) {
        Ok(user_id) => {
            req.extensions_mut().insert(ActingUser::new(user_id));
            next.run(req).await
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn extract_user(headers: &HeaderMap) -> Result<Option<UserId>, DomainError> {
    let Some(header) = headers.get(USER_HEADER) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| DomainError::invalid_id("X-User-Id must be ASCII"))?;
    if header.trim().is_empty() {
        return Ok(None);
    }
    header.parse::<UserId>().map(Some)
}
