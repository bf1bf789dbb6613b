use axum::extract::State;
use axum::response::Json as ResponseJson;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};

use fluxis_deployment::Deployment;
use fluxis_services::services::auth::TokenPair;

use crate::error::{ApiError, Json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

pub async fn login(
    State(deployment): State<Deployment>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<TokenPair>, ApiError> {
    let pair = deployment.auth().login(&payload.username, &payload.password)?;
    Ok(ResponseJson(pair))
}

pub async fn refresh(
    State(deployment): State<Deployment>,
    Json(payload): Json<RefreshRequest>,
) -> Result<ResponseJson<RefreshResponse>, ApiError> {
    let access_token = deployment.auth().regenerate_access(&payload.refresh_token)?;
    Ok(ResponseJson(RefreshResponse { access_token }))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}
