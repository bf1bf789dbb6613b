use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json as ResponseJson;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use fluxis_db::models::log::Log;
use fluxis_db::models::task::{CreateTask, Task, UpdateTask};
use fluxis_deployment::Deployment;
use fluxis_services::services::tasks::TaskListRequest;
use fluxis_utils::response::Page;

use crate::error::{ApiError, Json};
use crate::routes::csv;
use crate::routes::projects::ListLogsQuery;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub ids: Option<String>,
    pub project_ids: Option<String>,
    pub status_ids: Option<String>,
    pub query: Option<String>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

pub async fn list_tasks(
    State(deployment): State<Deployment>,
    Query(query): Query<ListTasksQuery>,
) -> Result<ResponseJson<Page<Task>>, ApiError> {
    let request = TaskListRequest {
        ids: csv(query.ids),
        project_ids: csv(query.project_ids),
        status_ids: csv(query.status_ids),
        query: query.query,
        page_number: query.page_number,
        page_size: query.page_size,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
    };
    let page = deployment.tasks().list(request).await?;
    Ok(ResponseJson(page))
}

pub async fn get_task(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
) -> Result<ResponseJson<Task>, ApiError> {
    let task = deployment.tasks().get(&id).await?;
    Ok(ResponseJson(task))
}

pub async fn create_task(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<Task>, ApiError> {
    let task = deployment.tasks().create(payload).await?;
    Ok(ResponseJson(task))
}

pub async fn update_task(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<Task>, ApiError> {
    let task = deployment.tasks().update(&id, payload).await?;
    Ok(ResponseJson(task))
}

pub async fn delete_task(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    deployment.tasks().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_task_logs(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
    Query(query): Query<ListLogsQuery>,
) -> Result<ResponseJson<Page<Log>>, ApiError> {
    let page = deployment
        .logs()
        .list_for_task(&id, query.into_request())
        .await?;
    Ok(ResponseJson(page))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/logs", get(list_task_logs))
}
