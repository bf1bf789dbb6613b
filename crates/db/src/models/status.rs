use chrono::{DateTime, Utc};
use fluxis_utils::slug::slugify;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

/// Columns synthesized for every new project, in position order.
pub const DEFAULT_STATUSES: [(&str, &str, bool); 3] = [
    ("Todo", "todo", true),
    ("In Progress", "in_progress", false),
    ("Done", "done", false),
];

#[derive(Debug, Error)]
pub enum StatusError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Status not found")]
    StatusNotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Reorder conflict: {0}")]
    ReorderConflict(String),
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub slug: String,
    pub position: i64,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a new status column.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatus {
    pub project_id: String,
    pub name: String,
}

/// Rename payload; `position` and `is_default` are not mutable here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub name: Option<String>,
}

/// The complete ordered id list for an atomic reorder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderStatuses {
    pub project_id: String,
    pub status_ids: Vec<String>,
}

const STATUS_COLUMNS: &str =
    "id, project_id, name, slug, position, is_default, created_at, updated_at, deleted_at";

impl Status {
    /// Non-deleted columns of a live project, ordered by position. An absent
    /// or soft-deleted project yields an empty list, not an error.
    pub async fn list_by_project(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, StatusError> {
        Ok(sqlx::query_as::<_, Status>(
            "SELECT s.id, s.project_id, s.name, s.slug, s.position, s.is_default,
                    s.created_at, s.updated_at, s.deleted_at
             FROM statuses s
             JOIN projects p ON p.id = s.project_id AND p.deleted_at IS NULL
             WHERE s.project_id = ? AND s.deleted_at IS NULL
             ORDER BY s.position ASC",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?)
    }

    /// Returns the row only when both the status and its owning project are
    /// live.
    pub async fn find_detail(pool: &SqlitePool, id: Uuid) -> Result<Self, StatusError> {
        sqlx::query_as::<_, Status>(
            "SELECT s.id, s.project_id, s.name, s.slug, s.position, s.is_default,
                    s.created_at, s.updated_at, s.deleted_at
             FROM statuses s
             JOIN projects p ON p.id = s.project_id AND p.deleted_at IS NULL
             WHERE s.id = ? AND s.deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StatusError::StatusNotFound)
    }

    /// Lookup that ignores soft-delete tombstones. Audit writes need the
    /// owning project of a status that was just soft-deleted.
    pub async fn find_by_id_any(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Status>(&format!(
            "SELECT {STATUS_COLUMNS} FROM statuses WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// The project's landing column for tasks created without an explicit
    /// status.
    pub async fn find_default(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Status>(&format!(
            "SELECT {STATUS_COLUMNS} FROM statuses
             WHERE project_id = ? AND is_default = 1 AND deleted_at IS NULL"
        ))
        .bind(project_id)
        .fetch_optional(pool)
        .await
    }

    /// Appends a column after the project's current last position. The guard
    /// subquery makes creation under an absent or soft-deleted project fail
    /// as not-found.
    pub async fn create(
        pool: &SqlitePool,
        project_id: Uuid,
        name: &str,
    ) -> Result<Self, StatusError> {
        let now = Utc::now();
        sqlx::query_as::<_, Status>(
            "INSERT INTO statuses (id, project_id, name, slug, position, is_default, created_at, updated_at)
             SELECT ?, ?, ?, ?,
                    COALESCE((SELECT MAX(position) + 1 FROM statuses
                              WHERE project_id = ? AND deleted_at IS NULL), 0),
                    0, ?, ?
             WHERE EXISTS (SELECT 1 FROM projects WHERE id = ? AND deleted_at IS NULL)
             RETURNING id, project_id, name, slug, position, is_default, created_at, updated_at, deleted_at",
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(name)
        .bind(slugify(name))
        .bind(project_id)
        .bind(now)
        .bind(now)
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StatusError::ProjectNotFound)
    }

    /// Renames the column and re-derives its slug. Bumps `updated_at`.
    pub async fn update(pool: &SqlitePool, id: Uuid, name: &str) -> Result<Self, StatusError> {
        sqlx::query_as::<_, Status>(
            "UPDATE statuses
             SET name = ?, slug = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL
               AND project_id IN (SELECT id FROM projects WHERE deleted_at IS NULL)
             RETURNING id, project_id, name, slug, position, is_default, created_at, updated_at, deleted_at",
        )
        .bind(name)
        .bind(slugify(name))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StatusError::StatusNotFound)
    }

    /// Soft-deletes the column. Tasks keep their reference; their own
    /// reachability is unaffected.
    pub async fn soft_delete(pool: &SqlitePool, id: Uuid) -> Result<(), StatusError> {
        let result = sqlx::query(
            "UPDATE statuses SET deleted_at = ?
             WHERE id = ? AND deleted_at IS NULL
               AND project_id IN (SELECT id FROM projects WHERE deleted_at IS NULL)",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StatusError::StatusNotFound);
        }
        Ok(())
    }

    /// Assigns each id its index as the new position, atomically. Callers
    /// validate that `ids` is the complete non-deleted set for the project;
    /// the per-row guard here turns any race into a rolled-back conflict
    /// rather than a partial reorder.
    pub async fn reorder(
        pool: &SqlitePool,
        project_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), StatusError> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        for (position, id) in ids.iter().enumerate() {
            let result = sqlx::query(
                "UPDATE statuses SET position = ?, updated_at = ?
                 WHERE id = ? AND project_id = ? AND deleted_at IS NULL",
            )
            .bind(position as i64)
            .bind(now)
            .bind(id)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() != 1 {
                return Err(StatusError::ReorderConflict(format!(
                    "status {id} is not a live status of project {project_id}"
                )));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
