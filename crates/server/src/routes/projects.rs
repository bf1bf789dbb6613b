use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json as ResponseJson;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use fluxis_db::models::log::Log;
use fluxis_db::models::project::{CreateProject, Project, UpdateProject};
use fluxis_deployment::Deployment;
use fluxis_services::services::logs::LogListRequest;
use fluxis_services::services::projects::ProjectListRequest;
use fluxis_utils::response::Page;

use crate::error::{ApiError, Json};
use crate::routes::csv;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    pub ids: Option<String>,
    pub statuses: Option<String>,
    pub query: Option<String>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogsQuery {
    pub task_ids: Option<String>,
    pub status_ids: Option<String>,
    pub query: Option<String>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListLogsQuery {
    pub(crate) fn into_request(self) -> LogListRequest {
        LogListRequest {
            task_ids: csv(self.task_ids),
            status_ids: csv(self.status_ids),
            query: self.query,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}

pub async fn list_projects(
    State(deployment): State<Deployment>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<ResponseJson<Page<Project>>, ApiError> {
    let request = ProjectListRequest {
        ids: csv(query.ids),
        statuses: csv(query.statuses),
        query: query.query,
        page_number: query.page_number,
        page_size: query.page_size,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
    };
    let page = deployment.projects().list(request).await?;
    Ok(ResponseJson(page))
}

pub async fn get_project(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
) -> Result<ResponseJson<Project>, ApiError> {
    let project = deployment.projects().get(&id).await?;
    Ok(ResponseJson(project))
}

pub async fn create_project(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateProject>,
) -> Result<ResponseJson<Project>, ApiError> {
    let project = deployment.projects().create(payload).await?;
    Ok(ResponseJson(project))
}

pub async fn update_project(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<Project>, ApiError> {
    let project = deployment.projects().update(&id, payload).await?;
    Ok(ResponseJson(project))
}

pub async fn delete_project(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    deployment.projects().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_project_logs(
    State(deployment): State<Deployment>,
    Path(id): Path<String>,
    Query(query): Query<ListLogsQuery>,
) -> Result<ResponseJson<Page<Log>>, ApiError> {
    let page = deployment
        .logs()
        .list_for_project(&id, query.into_request())
        .await?;
    Ok(ResponseJson(page))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/{id}/logs", get(list_project_logs))
}
