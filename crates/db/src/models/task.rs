use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::search::{Page, PageQuery, SortOrder};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Task not found")]
    TaskNotFound,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub details: String,
    pub status_id: Option<Uuid>,
    pub priority: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a new task. `status_id` may be omitted, in which
/// case the project's default column is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub project_id: String,
    pub title: String,
    pub details: Option<String>,
    pub status_id: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update. An empty `status_id` clears the reference; an empty title
/// or details keeps the prior value. `project_id` is not mutable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    pub details: Option<String>,
    pub status_id: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Filter model for the paginated task listing.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub ids: Vec<Uuid>,
    pub project_ids: Vec<Uuid>,
    pub status_ids: Vec<Uuid>,
    pub query: Option<String>,
}

/// Allowlisted sort fields; unknown inputs fall back to creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSortBy {
    Title,
    Priority,
    DueDate,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl TaskSortBy {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("title") => TaskSortBy::Title,
            Some("priority") => TaskSortBy::Priority,
            Some("dueDate") => TaskSortBy::DueDate,
            Some("createdAt") => TaskSortBy::CreatedAt,
            Some("updatedAt") => TaskSortBy::UpdatedAt,
            _ => TaskSortBy::default(),
        }
    }

    /// Due-date sorts keep rows without a due date at the end regardless of
    /// direction, and break ties by descending priority.
    fn order_clause(self, order: SortOrder) -> String {
        match self {
            TaskSortBy::DueDate => format!(
                "(due_date IS NULL) ASC, due_date {}, priority DESC, id ASC",
                order.as_sql()
            ),
            TaskSortBy::Title => format!("title {}, id ASC", order.as_sql()),
            TaskSortBy::Priority => format!("priority {}, id ASC", order.as_sql()),
            TaskSortBy::CreatedAt => format!("created_at {}, id ASC", order.as_sql()),
            TaskSortBy::UpdatedAt => format!("updated_at {}, id ASC", order.as_sql()),
        }
    }
}

const TASK_COLUMNS: &str = "t.id, t.project_id, t.title, t.details, t.status_id, t.priority, \
                            t.due_date, t.created_at, t.updated_at, t.deleted_at";

impl Task {
    /// Returns the row only when both the task and its owning project are
    /// live, which is how a project soft-delete cascades to reads.
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Self, TaskError> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS}
             FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
             WHERE t.id = ? AND t.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(TaskError::TaskNotFound)
    }

    /// Lookup that ignores soft-delete tombstones; used by the audit worker
    /// to attribute a deletion to its project after the fact.
    pub async fn find_by_id_any(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT id, project_id, title, details, status_id, priority, due_date,
                    created_at, updated_at, deleted_at
             FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        project_id: Uuid,
        title: &str,
        details: &str,
        status_id: Option<Uuid>,
        priority: i64,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Self, TaskError> {
        let now = Utc::now();
        Ok(sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (id, project_id, title, details, status_id, priority, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id, project_id, title, details, status_id, priority, due_date, created_at, updated_at, deleted_at",
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(title)
        .bind(details)
        .bind(status_id)
        .bind(priority)
        .bind(due_date)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?)
    }

    /// Writes the final field values; callers overlay partial input over the
    /// existing row first. Bumps `updated_at`.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        title: &str,
        details: &str,
        status_id: Option<Uuid>,
        priority: i64,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Self, TaskError> {
        sqlx::query_as::<_, Task>(
            "UPDATE tasks
             SET title = ?, details = ?, status_id = ?, priority = ?, due_date = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL
               AND project_id IN (SELECT id FROM projects WHERE deleted_at IS NULL)
             RETURNING id, project_id, title, details, status_id, priority, due_date, created_at, updated_at, deleted_at",
        )
        .bind(title)
        .bind(details)
        .bind(status_id)
        .bind(priority)
        .bind(due_date)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(TaskError::TaskNotFound)
    }

    pub async fn soft_delete(pool: &SqlitePool, id: Uuid) -> Result<(), TaskError> {
        let result = sqlx::query(
            "UPDATE tasks SET deleted_at = ?
             WHERE id = ? AND deleted_at IS NULL
               AND project_id IN (SELECT id FROM projects WHERE deleted_at IS NULL)",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TaskError::TaskNotFound);
        }
        Ok(())
    }

    /// Filtered page over tasks of live projects; same CTE shape as the
    /// project search, with the project join folded into the `filtered` set.
    pub async fn search(
        pool: &SqlitePool,
        filter: &TaskFilter,
        page: PageQuery,
        sort_by: TaskSortBy,
        order: SortOrder,
    ) -> Result<Page<Self>, TaskError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "WITH filtered AS (SELECT {TASK_COLUMNS} FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL"
        ));
        push_filters(&mut qb, filter);
        qb.push("), counted AS (SELECT COUNT(*) AS total_count FROM filtered) ");
        qb.push("SELECT filtered.*, counted.total_count FROM filtered CROSS JOIN counted ORDER BY ");
        qb.push(sort_by.order_clause(order));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb.build().fetch_all(pool).await?;
        let total_count = match rows.first() {
            Some(row) => row.try_get::<i64, _>("total_count")?,
            None => Self::count(pool, filter).await?,
        };
        let items = rows
            .iter()
            .map(Task::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total_count, page.page_number, page.page_size))
    }

    async fn count(pool: &SqlitePool, filter: &TaskFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS total_count FROM tasks t
             JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL",
        );
        push_filters(&mut qb, filter);
        let row = qb.build().fetch_one(pool).await?;
        row.try_get("total_count")
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TaskFilter) {
    qb.push(" WHERE t.deleted_at IS NULL");

    if !filter.ids.is_empty() {
        qb.push(" AND t.id IN (");
        let mut ids = qb.separated(", ");
        for id in &filter.ids {
            ids.push_bind(*id);
        }
        qb.push(")");
    }

    if !filter.project_ids.is_empty() {
        qb.push(" AND t.project_id IN (");
        let mut ids = qb.separated(", ");
        for id in &filter.project_ids {
            ids.push_bind(*id);
        }
        qb.push(")");
    }

    if !filter.status_ids.is_empty() {
        qb.push(" AND t.status_id IN (");
        let mut ids = qb.separated(", ");
        for id in &filter.status_ids {
            ids.push_bind(*id);
        }
        qb.push(")");
    }

    if let Some(query) = filter.query.as_deref().filter(|q| !q.is_empty()) {
        let pattern = format!("%{query}%");
        qb.push(" AND (t.title LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR t.details LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}
