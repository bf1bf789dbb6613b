use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json as ResponseJson;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use fluxis_db::models::status::{CreateStatus, ReorderStatuses, Status, UpdateStatus};
use fluxis_deployment::Deployment;

use crate::error::{ApiError, Json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStatusesQuery {
    pub project_id: Option<String>,
}

pub async fn list_statuses(
    State(deployment): State<Deployment>,
    Query(query): Query<ListStatusesQuery>,
) -> Result<ResponseJson<Vec<Status>>, ApiError> {
    let project_id = query
        .project_id
        .ok_or_else(|| ApiError::BadRequest("projectId is required".to_string()))?;
    let statuses = deployment.statuses().list_by_project(&project_id).await?;
    Ok(ResponseJson(statuses))
}

pub async fn get_status(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
) -> Result<ResponseJson<Status>, ApiError> {
    let status = deployment.statuses().get(&id).await?;
    Ok(ResponseJson(status))
}

pub async fn create_status(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateStatus>,
) -> Result<ResponseJson<Status>, ApiError> {
    let status = deployment.statuses().create(payload).await?;
    Ok(ResponseJson(status))
}

pub async fn update_status(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatus>,
) -> Result<ResponseJson<Status>, ApiError> {
    let status = deployment.statuses().update(&id, payload).await?;
    Ok(ResponseJson(status))
}

pub async fn delete_status(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    deployment.statuses().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_statuses(
    State(deployment): State<Deployment>,
    Json(payload): Json<ReorderStatuses>,
) -> Result<ResponseJson<Vec<Status>>, ApiError> {
    let statuses = deployment.statuses().reorder(payload).await?;
    Ok(ResponseJson(statuses))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/statuses", get(list_statuses).post(create_status))
        .route("/statuses/reorder", post(reorder_statuses))
        .route(
            "/statuses/{id}",
            get(get_status).patch(update_status).delete(delete_status),
        )
}
