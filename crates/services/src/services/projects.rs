//! Project domain service: boundary validation, trigger emission, and the
//! project-scoped log listing.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::SqlitePool;

use fluxis_db::models::project::{
    CreateProject, Project, ProjectFilter, ProjectSortBy, ProjectStatus, UpdateProject,
};
use fluxis_db::search::{Page, SortOrder};

use crate::error::{ServiceError, non_empty, parse_uuid, parse_uuid_list, resolve_page};
use crate::workers::{Trigger, TriggerAction, Worker};

/// Raw listing inputs as bound from the query string; everything is validated
/// here before any of it reaches the data layer.
#[derive(Debug, Clone, Default)]
pub struct ProjectListRequest {
    pub ids: Vec<String>,
    pub statuses: Vec<String>,
    pub query: Option<String>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Clone)]
pub struct ProjectService {
    pool: SqlitePool,
    worker: Arc<Worker>,
}

impl ProjectService {
    pub fn new(pool: SqlitePool, worker: Arc<Worker>) -> Self {
        Self { pool, worker }
    }

    pub async fn get(&self, id: &str) -> Result<Project, ServiceError> {
        let id = parse_uuid(id, "project id")?;
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    pub async fn list(&self, request: ProjectListRequest) -> Result<Page<Project>, ServiceError> {
        let filter = ProjectFilter {
            ids: parse_uuid_list(&request.ids, "ids")?,
            statuses: request
                .statuses
                .iter()
                .map(|value| {
                    ProjectStatus::from_str(value).map_err(|_| {
                        ServiceError::InvalidInput(format!(
                            "status must be one of active, paused, archived; got {value:?}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            query: request.query,
        };
        let page = resolve_page(request.page_number, request.page_size)?;
        let sort_by = ProjectSortBy::from_param(request.sort_by.as_deref());
        let order = SortOrder::from_param(request.sort_order.as_deref());

        Ok(Project::search(&self.pool, &filter, page, sort_by, order).await?)
    }

    pub async fn create(&self, data: CreateProject) -> Result<Project, ServiceError> {
        non_empty(&data.name, "name")?;
        let project = Project::create(&self.pool, &data).await?;
        self.worker
            .enqueue(Trigger::new("project", project.id, TriggerAction::Created));
        Ok(project)
    }

    /// Partial update: only fields present in the payload change, the rest
    /// keep the stored values.
    pub async fn update(&self, id: &str, data: UpdateProject) -> Result<Project, ServiceError> {
        let id = parse_uuid(id, "project id")?;
        let existing = Project::find_by_id(&self.pool, id).await?;

        let name = match data.name {
            Some(name) => {
                non_empty(&name, "name")?;
                name
            }
            None => existing.name,
        };
        let description = data.description.unwrap_or(existing.description);
        let status = data.status.unwrap_or(existing.status);

        let project = Project::update(&self.pool, id, &name, &description, status).await?;
        self.worker
            .enqueue(Trigger::new("project", project.id, TriggerAction::Updated));
        Ok(project)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let id = parse_uuid(id, "project id")?;
        Project::soft_delete(&self.pool, id).await?;
        self.worker
            .enqueue(Trigger::new("project", id, TriggerAction::Deleted));
        Ok(())
    }
}
