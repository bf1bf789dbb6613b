//! Log retrieval. Entries are written by the audit workers; this service only
//! reads, scoped either to a project or to a single task.

use sqlx::SqlitePool;

use fluxis_db::models::log::{Log, LogFilter};
use fluxis_db::models::project::Project;
use fluxis_db::models::task::Task;
use fluxis_db::search::Page;

use crate::error::{ServiceError, parse_uuid, parse_uuid_list, resolve_page};

/// Raw listing inputs as bound from the query string. The sort is fixed to
/// newest first, so there are no sort parameters here.
#[derive(Debug, Clone, Default)]
pub struct LogListRequest {
    pub task_ids: Vec<String>,
    pub status_ids: Vec<String>,
    pub query: Option<String>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Clone)]
pub struct LogService {
    pool: SqlitePool,
}

impl LogService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Logs of a live project; an absent or soft-deleted project is
    /// not-found, consistent with every other read under it.
    pub async fn list_for_project(
        &self,
        project_id: &str,
        request: LogListRequest,
    ) -> Result<Page<Log>, ServiceError> {
        let project_id = parse_uuid(project_id, "project id")?;
        Project::find_by_id(&self.pool, project_id).await?;

        let filter = LogFilter {
            project_id,
            task_ids: parse_uuid_list(&request.task_ids, "taskIds")?,
            status_ids: parse_uuid_list(&request.status_ids, "statusIds")?,
            query: request.query,
        };
        let page = resolve_page(request.page_number, request.page_size)?;

        Ok(Log::search(&self.pool, &filter, page).await?)
    }

    /// Logs of one task: the task resolves to its owning project, then the
    /// project listing runs with the task id pinned.
    pub async fn list_for_task(
        &self,
        task_id: &str,
        request: LogListRequest,
    ) -> Result<Page<Log>, ServiceError> {
        let task_id = parse_uuid(task_id, "task id")?;
        let task = Task::find_by_id(&self.pool, task_id).await?;

        let filter = LogFilter {
            project_id: task.project_id,
            task_ids: vec![task.id],
            status_ids: parse_uuid_list(&request.status_ids, "statusIds")?,
            query: request.query,
        };
        let page = resolve_page(request.page_number, request.page_size)?;

        Ok(Log::search(&self.pool, &filter, page).await?)
    }
}
