use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::search::{Page, PageQuery};

#[derive(Debug, Error)]
pub enum LogError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Append-only audit record. Rows are never updated or deleted through the
/// API.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub id: Uuid,
    pub project_id: Uuid,
    pub task_id: Option<Uuid>,
    pub status_id: Option<Uuid>,
    pub entry: String,
    pub created_at: DateTime<Utc>,
}

/// Filter model for the paginated log listing. The sort is fixed to newest
/// first.
#[derive(Debug, Clone)]
pub struct LogFilter {
    pub project_id: Uuid,
    pub task_ids: Vec<Uuid>,
    pub status_ids: Vec<Uuid>,
    pub query: Option<String>,
}

const LOG_COLUMNS: &str = "id, project_id, task_id, status_id, entry, created_at";

impl Log {
    pub async fn create(
        pool: &SqlitePool,
        project_id: Uuid,
        task_id: Option<Uuid>,
        status_id: Option<Uuid>,
        entry: &str,
    ) -> Result<Self, LogError> {
        Ok(sqlx::query_as::<_, Log>(
            "INSERT INTO logs (id, project_id, task_id, status_id, entry, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, project_id, task_id, status_id, entry, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(task_id)
        .bind(status_id)
        .bind(entry)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?)
    }

    pub async fn search(
        pool: &SqlitePool,
        filter: &LogFilter,
        page: PageQuery,
    ) -> Result<Page<Self>, LogError> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("WITH filtered AS (SELECT {LOG_COLUMNS} FROM logs"));
        push_filters(&mut qb, filter);
        qb.push("), counted AS (SELECT COUNT(*) AS total_count FROM filtered) ");
        qb.push(
            "SELECT filtered.*, counted.total_count FROM filtered CROSS JOIN counted \
             ORDER BY created_at DESC, id ASC",
        );
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
            .map(Log::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total_count, page.page_number, page.page_size))
    }

    async fn count(pool: &SqlitePool, filter: &LogFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total_count FROM logs");
        push_filters(&mut qb, filter);
        let row = qb.build().fetch_one(pool).await?;
        row.try_get("total_count")
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &LogFilter) {
    qb.push(" WHERE project_id = ");
    qb.push_bind(filter.project_id);

    if !filter.task_ids.is_empty() {
        qb.push(" AND task_id IN (");
        let mut ids = qb.separated(", ");
        for id in &filter.task_ids {
            ids.push_bind(*id);
        }
        qb.push(")");
    }

    if !filter.status_ids.is_empty() {
        qb.push(" AND status_id IN (");
        let mut ids = qb.separated(", ");
        for id in &filter.status_ids {
            ids.push_bind(*id);
        }
        qb.push(")");
    }

    if let Some(query) = filter.query.as_deref().filter(|q| !q.is_empty()) {
        qb.push(" AND entry LIKE ");
        qb.push_bind(format!("%{query}%"));
    }
}
