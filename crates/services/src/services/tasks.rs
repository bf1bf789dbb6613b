//! Task domain service: boundary validation, cross-project ownership checks,
//! and trigger emission.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use fluxis_db::models::project::Project;
use fluxis_db::models::status::{Status, StatusError};
use fluxis_db::models::task::{CreateTask, Task, TaskFilter, TaskSortBy, UpdateTask};
use fluxis_db::search::{Page, SortOrder};

use crate::error::{ServiceError, non_empty, parse_uuid, parse_uuid_list, resolve_page, validate_priority};
use crate::workers::{Trigger, TriggerAction, Worker};

/// Raw listing inputs as bound from the query string.
#[derive(Debug, Clone, Default)]
pub struct TaskListRequest {
    pub ids: Vec<String>,
    pub project_ids: Vec<String>,
    pub status_ids: Vec<String>,
    pub query: Option<String>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Clone)]
pub struct TaskService {
    pool: SqlitePool,
    worker: Arc<Worker>,
}

impl TaskService {
    pub fn new(pool: SqlitePool, worker: Arc<Worker>) -> Self {
        Self { pool, worker }
    }

    pub async fn get(&self, id: &str) -> Result<Task, ServiceError> {
        let id = parse_uuid(id, "task id")?;
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    pub async fn list(&self, request: TaskListRequest) -> Result<Page<Task>, ServiceError> {
        let filter = TaskFilter {
            ids: parse_uuid_list(&request.ids, "ids")?,
            project_ids: parse_uuid_list(&request.project_ids, "projectIds")?,
            status_ids: parse_uuid_list(&request.status_ids, "statusIds")?,
            query: request.query,
        };
        let page = resolve_page(request.page_number, request.page_size)?;
        let sort_by = TaskSortBy::from_param(request.sort_by.as_deref());
        let order = SortOrder::from_param(request.sort_order.as_deref());

        Ok(Task::search(&self.pool, &filter, page, sort_by, order).await?)
    }

    pub async fn create(&self, data: CreateTask) -> Result<Task, ServiceError> {
        let project_id = parse_uuid(&data.project_id, "projectId")?;
        non_empty(&data.title, "title")?;
        let priority = data.priority.unwrap_or(1);
        validate_priority(priority)?;

        let status_id = match data.status_id.as_deref() {
            None | Some("") => {
                // No explicit column: land the task on the project's default
                // status. The lookup doubles as the project liveness check.
                Project::find_by_id(&self.pool, project_id).await?;
                Status::find_default(&self.pool, project_id)
                    .await
                    .map_err(StatusError::Database)
                    .map_err(ServiceError::from)?
                    .map(|status| status.id)
            }
            Some(raw) => {
                let status_id = parse_uuid(raw, "statusId")?;
                self.check_ownership(project_id, status_id).await?;
                Some(status_id)
            }
        };

        let task = Task::create(
            &self.pool,
            project_id,
            &data.title,
            data.details.as_deref().unwrap_or_default(),
            status_id,
            priority,
            data.due_date,
        )
        .await?;
        self.worker
            .enqueue(Trigger::new("task", task.id, TriggerAction::Created));
        Ok(task)
    }

    /// Partial update. An empty `statusId` clears the column reference; empty
    /// title or details keep the prior values; `projectId` is immutable.
    pub async fn update(&self, id: &str, data: UpdateTask) -> Result<Task, ServiceError> {
        let id = parse_uuid(id, "task id")?;
        let existing = Task::find_by_id(&self.pool, id).await?;

        // Blank strings mean "no change" for both text fields, whitespace
        // included.
        let title = match data.title {
            Some(title) if !title.trim().is_empty() => title,
            _ => existing.title,
        };
        let details = match data.details {
            Some(details) if !details.trim().is_empty() => details,
            _ => existing.details,
        };
        let status_id: Option<Uuid> = match data.status_id.as_deref() {
            None => existing.status_id,
            Some("") => None,
            Some(raw) => {
                let status_id = parse_uuid(raw, "statusId")?;
                self.check_ownership(existing.project_id, status_id).await?;
                Some(status_id)
            }
        };
        let priority = match data.priority {
            Some(priority) => {
                validate_priority(priority)?;
                priority
            }
            None => existing.priority,
        };
        let due_date: Option<DateTime<Utc>> = data.due_date.or(existing.due_date);

        let moved = status_id != existing.status_id;
        let task = Task::update(
            &self.pool,
            id,
            &title,
            &details,
            status_id,
            priority,
            due_date,
        )
        .await?;

        let mut trigger = Trigger::new("task", task.id, TriggerAction::Updated);
        if moved {
            trigger = trigger.with_meta(serde_json::json!({ "statusId": task.status_id }));
        }
        self.worker.enqueue(trigger);
        Ok(task)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let id = parse_uuid(id, "task id")?;
        Task::soft_delete(&self.pool, id).await?;
        self.worker
            .enqueue(Trigger::new("task", id, TriggerAction::Deleted));
        Ok(())
    }

    /// Fetches the project and the status in parallel; the first failure
    /// cancels the sibling lookup. The status must be a live column of the
    /// task's own project.
    async fn check_ownership(&self, project_id: Uuid, status_id: Uuid) -> Result<(), ServiceError> {
        let (project, status) = tokio::try_join!(
            async {
                Project::find_by_id(&self.pool, project_id)
                    .await
                    .map_err(ServiceError::from)
            },
            async {
                Status::find_detail(&self.pool, status_id)
                    .await
                    .map_err(ServiceError::from)
            },
        )?;

        if status.project_id != project.id {
            return Err(ServiceError::InvalidInput(format!(
                "status {status_id} does not belong to project {project_id}"
            )));
        }
        Ok(())
    }
}
