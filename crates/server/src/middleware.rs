use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use fluxis_deployment::Deployment;

use crate::error::ApiError;

/// Gate applied to every protected route. Extracts the bearer token, strips a
/// `Bearer ` prefix when present, and validates it; a failure short-circuits
/// with 401 and the downstream handler never runs. On success the request
/// passes through unchanged, as the system has a single principal and nothing
/// to attach.
pub async fn auth_gate(
    State(deployment): State<Deployment>,
    request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let token = header.strip_prefix("Bearer ").unwrap_or(header);

    if deployment.auth().validate_access(token) {
        next.run(request).await
    } else {
        ApiError::Unauthorized("invalid or expired bearer token".to_string()).into_response()
    }
}
