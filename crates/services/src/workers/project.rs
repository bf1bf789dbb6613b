//! Audit worker for project mutations.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use uuid::Uuid;

use fluxis_db::models::log::Log;
use fluxis_db::models::project::Project;

use super::{Trigger, TriggerAction, TriggerHandler};

/// Diffs the cached snapshot of a project against its current row and emits
/// audit log entries. All data-access failures are swallowed: a row that
/// disappeared between enqueue and handling simply drops the trigger.
pub struct ProjectWorker {
    pool: SqlitePool,
    cache: RwLock<HashMap<Uuid, Project>>,
}

impl ProjectWorker {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn on_created(&self, id: Uuid) {
        let Ok(project) = Project::find_by_id(&self.pool, id).await else {
            return;
        };
        self.append(id, "project.created").await;
        self.cache.write().await.insert(id, project);
    }

    async fn on_updated(&self, id: Uuid) {
        let Ok(current) = Project::find_by_id(&self.pool, id).await else {
            return;
        };
        let previous = self.cache.read().await.get(&id).cloned();

        if let Some(previous) = previous {
            let mut changed = Vec::new();
            if previous.name != current.name {
                changed.push("name");
            }
            if previous.description != current.description {
                changed.push("description");
            }
            if previous.status != current.status {
                changed.push("status");
            }
            if !changed.is_empty() {
                let entry = format!("project.updated:{}", changed.join(","));
                self.append(id, &entry).await;
            }
        }
        // First observation after a restart caches without logging a diff.
        self.cache.write().await.insert(id, current);
    }

    async fn on_deleted(&self, id: Uuid) {
        self.append(id, "project.deleted").await;
        self.cache.write().await.remove(&id);
    }

    async fn append(&self, project_id: Uuid, entry: &str) {
        if let Err(err) = Log::create(&self.pool, project_id, None, None, entry).await {
            tracing::debug!("skipping {entry} log for project {project_id}: {err}");
        }
    }
}

#[async_trait]
impl TriggerHandler for ProjectWorker {
    async fn handle(&self, trigger: Trigger) {
        match trigger.action {
            TriggerAction::Created => self.on_created(trigger.id).await,
            TriggerAction::Updated => self.on_updated(trigger.id).await,
            TriggerAction::Deleted => self.on_deleted(trigger.id).await,
        }
    }
}
