use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use fluxis_deployment::Deployment;

use crate::middleware::auth_gate;

pub mod auth;
pub mod health;
pub mod projects;
pub mod statuses;
pub mod tasks;

/// Assembles the application router: public routes first, then everything
/// else behind the auth gate.
pub fn router(deployment: Deployment) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .merge(auth::router());

    let protected = Router::new()
        .merge(projects::router())
        .merge(statuses::router())
        .merge(tasks::router())
        .layer(from_fn_with_state(deployment.clone(), auth_gate));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(deployment)
}

/// Splits a comma-separated query value into trimmed, non-empty parts.
/// Repeated-key query lists are not used; `?ids=a,b` is the wire shape.
pub(crate) fn csv(value: Option<String>) -> Vec<String> {
    value
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
