//! Status-column domain service: boundary validation, reorder integrity, and
//! trigger emission.

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::SqlitePool;
use uuid::Uuid;

use fluxis_db::models::project::Project;
use fluxis_db::models::status::{CreateStatus, ReorderStatuses, Status, UpdateStatus};

use crate::error::{ServiceError, non_empty, parse_uuid, parse_uuid_list};
use crate::workers::{Trigger, TriggerAction, Worker};

#[derive(Clone)]
pub struct StatusService {
    pool: SqlitePool,
    worker: Arc<Worker>,
}

impl StatusService {
    pub fn new(pool: SqlitePool, worker: Arc<Worker>) -> Self {
        Self { pool, worker }
    }

    /// Columns of a live project, ordered by position; empty when the project
    /// is absent or soft-deleted.
    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<Status>, ServiceError> {
        let project_id = parse_uuid(project_id, "projectId")?;
        Ok(Status::list_by_project(&self.pool, project_id).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Status, ServiceError> {
        let id = parse_uuid(id, "status id")?;
        Ok(Status::find_detail(&self.pool, id).await?)
    }

    pub async fn create(&self, data: CreateStatus) -> Result<Status, ServiceError> {
        let project_id = parse_uuid(&data.project_id, "projectId")?;
        non_empty(&data.name, "name")?;
        let status = Status::create(&self.pool, project_id, &data.name).await?;
        self.worker
            .enqueue(Trigger::new("status", status.id, TriggerAction::Created));
        Ok(status)
    }

    /// Rename only; position and default flag are managed by reorder and
    /// project creation respectively.
    pub async fn update(&self, id: &str, data: UpdateStatus) -> Result<Status, ServiceError> {
        let id = parse_uuid(id, "status id")?;
        let name = data
            .name
            .ok_or_else(|| ServiceError::InvalidInput("name is required".to_string()))?;
        non_empty(&name, "name")?;
        let status = Status::update(&self.pool, id, &name).await?;
        self.worker
            .enqueue(Trigger::new("status", status.id, TriggerAction::Updated));
        Ok(status)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let id = parse_uuid(id, "status id")?;
        Status::soft_delete(&self.pool, id).await?;
        self.worker
            .enqueue(Trigger::new("status", id, TriggerAction::Deleted));
        Ok(())
    }

    /// Atomic reorder of a project's complete column set. The id list must
    /// contain every live status of the project exactly once; any violation
    /// fails the whole operation before a single position is touched.
    pub async fn reorder(&self, data: ReorderStatuses) -> Result<Vec<Status>, ServiceError> {
        let project_id = parse_uuid(&data.project_id, "projectId")?;
        let ids = parse_uuid_list(&data.status_ids, "statusIds")?;

        Project::find_by_id(&self.pool, project_id).await?;
        let current = Status::list_by_project(&self.pool, project_id).await?;

        if ids.len() != current.len() {
            return Err(ServiceError::InvalidInput(format!(
                "reorder must list all {} statuses of the project, got {}",
                current.len(),
                ids.len()
            )));
        }

        let unique: HashSet<Uuid> = ids.iter().copied().collect();
        if unique.len() != ids.len() {
            return Err(ServiceError::InvalidInput(
                "reorder contains duplicate status ids".to_string(),
            ));
        }

        let current_ids: HashSet<Uuid> = current.iter().map(|status| status.id).collect();
        for id in &ids {
            if !current_ids.contains(id) {
                return Err(ServiceError::InvalidInput(format!(
                    "status {id} does not belong to project {project_id}"
                )));
            }
        }

        Status::reorder(&self.pool, project_id, &ids).await?;
        for id in &ids {
            self.worker
                .enqueue(Trigger::new("status", *id, TriggerAction::Updated));
        }

        Ok(Status::list_by_project(&self.pool, project_id).await?)
    }
}
