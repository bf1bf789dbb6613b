use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::status::DEFAULT_STATUSES;
use crate::search::{Page, PageQuery, SortOrder};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Project not found")]
    ProjectNotFound,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Paused,
    Archived,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a new project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// Partial update; omitted fields keep their prior values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// Filter model for the paginated project listing.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub ids: Vec<Uuid>,
    pub statuses: Vec<ProjectStatus>,
    pub query: Option<String>,
}

/// Allowlisted sort fields. The mapping to physical columns below is the only
/// place a sort identifier is interpolated into SQL; unknown inputs fall back
/// to creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectSortBy {
    Name,
    Status,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl ProjectSortBy {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("name") => ProjectSortBy::Name,
            Some("status") => ProjectSortBy::Status,
            Some("createdAt") => ProjectSortBy::CreatedAt,
            Some("updatedAt") => ProjectSortBy::UpdatedAt,
            _ => ProjectSortBy::default(),
        }
    }

    fn column(self) -> &'static str {
        match self {
            ProjectSortBy::Name => "name",
            ProjectSortBy::Status => "status",
            ProjectSortBy::CreatedAt => "created_at",
            ProjectSortBy::UpdatedAt => "updated_at",
        }
    }

    fn order_clause(self, order: SortOrder) -> String {
        format!("{} {}, id ASC", self.column(), order.as_sql())
    }
}

const PROJECT_COLUMNS: &str = "id, name, description, status, created_at, updated_at, deleted_at";

impl Project {
    /// Returns the row, or not-found when it is absent or soft-deleted.
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Self, ProjectError> {
        sqlx::query_as::<_, Project>(
            "SELECT id, name, description, status, created_at, updated_at, deleted_at
             FROM projects
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ProjectError::ProjectNotFound)
    }

    /// Inserts the project and its three default statuses in one transaction.
    /// Listing statuses right after this returns exactly Todo, In Progress
    /// and Done, with Todo as the default column.
    pub async fn create(pool: &SqlitePool, data: &CreateProject) -> Result<Self, ProjectError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let status = data.status.unwrap_or(ProjectStatus::Active);
        let description = data.description.clone().unwrap_or_default();

        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            "INSERT INTO projects (id, name, description, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, name, description, status, created_at, updated_at, deleted_at",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&description)
        .bind(status)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for (position, (name, slug, is_default)) in DEFAULT_STATUSES.iter().enumerate() {
            sqlx::query(
                "INSERT INTO statuses (id, project_id, name, slug, position, is_default, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(name)
            .bind(slug)
            .bind(position as i64)
            .bind(is_default)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(project)
    }

    /// Writes the final field values; callers overlay partial input over the
    /// existing row first. Bumps `updated_at`.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        name: &str,
        description: &str,
        status: ProjectStatus,
    ) -> Result<Self, ProjectError> {
        sqlx::query_as::<_, Project>(
            "UPDATE projects
             SET name = ?, description = ?, status = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL
             RETURNING id, name, description, status, created_at, updated_at, deleted_at",
        )
        .bind(name)
        .bind(description)
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ProjectError::ProjectNotFound)
    }

    /// Marks the row deleted. A second delete of the same id is not-found,
    /// not an error; children become unreachable through the read filters
    /// without being touched.
    pub async fn soft_delete(pool: &SqlitePool, id: Uuid) -> Result<(), ProjectError> {
        let result = sqlx::query("UPDATE projects SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ProjectError::ProjectNotFound);
        }
        Ok(())
    }

    /// Single round-trip filtered page: a `filtered` CTE carrying the soft
    /// delete and caller filters, a `counted` CTE for the total, then the
    /// ordered window. An out-of-range page returns no rows, so the total is
    /// re-fetched with the same filters to keep the reported count accurate.
    pub async fn search(
        pool: &SqlitePool,
        filter: &ProjectFilter,
        page: PageQuery,
        sort_by: ProjectSortBy,
        order: SortOrder,
    ) -> Result<Page<Self>, ProjectError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "WITH filtered AS (SELECT {PROJECT_COLUMNS} FROM projects"
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
            .map(Project::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total_count, page.page_number, page.page_size))
    }

    async fn count(pool: &SqlitePool, filter: &ProjectFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total_count FROM projects");
        push_filters(&mut qb, filter);
        let row = qb.build().fetch_one(pool).await?;
        row.try_get("total_count")
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProjectFilter) {
    qb.push(" WHERE deleted_at IS NULL");

    if !filter.ids.is_empty() {
        qb.push(" AND id IN (");
        let mut ids = qb.separated(", ");
        for id in &filter.ids {
            ids.push_bind(*id);
        }
        qb.push(")");
    }

    if !filter.statuses.is_empty() {
        qb.push(" AND status IN (");
        let mut statuses = qb.separated(", ");
        for status in &filter.statuses {
            statuses.push_bind(*status);
        }
        qb.push(")");
    }

    if let Some(query) = filter.query.as_deref().filter(|q| !q.is_empty()) {
        let pattern = format!("%{query}%");
        qb.push(" AND (name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR description LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}
