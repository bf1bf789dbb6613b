//! Audit worker for task mutations.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use uuid::Uuid;

use fluxis_db::models::log::Log;
use fluxis_db::models::task::Task;

use super::{Trigger, TriggerAction, TriggerHandler};

pub struct TaskWorker {
    pool: SqlitePool,
    cache: RwLock<HashMap<Uuid, Task>>,
}

impl TaskWorker {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn on_created(&self, id: Uuid) {
        let Ok(task) = Task::find_by_id(&self.pool, id).await else {
            return;
        };
        self.append(task.project_id, id, None, "task.created").await;
        self.cache.write().await.insert(id, task);
    }

    async fn on_updated(&self, id: Uuid) {
        let Ok(current) = Task::find_by_id(&self.pool, id).await else {
            return;
        };
        let previous = self.cache.read().await.get(&id).cloned();

        if let Some(previous) = previous {
            let mut changed = Vec::new();
            if previous.title != current.title {
                changed.push("title");
            }
            if previous.details != current.details {
                changed.push("details");
            }
            if previous.status_id != current.status_id {
                changed.push("status_id");
            }
            if previous.priority != current.priority {
                changed.push("priority");
            }
            if previous.due_date != current.due_date {
                changed.push("due_date");
            }
            if !changed.is_empty() {
                let entry = format!("task.updated:{}", changed.join(","));
                self.append(current.project_id, id, None, &entry).await;
            }
            // A moved task gets its own entry so the column change is
            // discoverable from the log stream alone.
            if previous.status_id != current.status_id {
                self.append(
                    current.project_id,
                    id,
                    current.status_id,
                    "task.status_changed",
                )
                .await;
            }
        }
        self.cache.write().await.insert(id, current);
    }

    async fn on_deleted(&self, id: Uuid) {
        let project_id = match self.cache.read().await.get(&id) {
            Some(task) => Some(task.project_id),
            None => Task::find_by_id_any(&self.pool, id)
                .await
                .ok()
                .flatten()
                .map(|task| task.project_id),
        };
        let Some(project_id) = project_id else {
            return;
        };
        self.append(project_id, id, None, "task.deleted").await;
        self.cache.write().await.remove(&id);
    }

    async fn append(&self, project_id: Uuid, task_id: Uuid, status_id: Option<Uuid>, entry: &str) {
        if let Err(err) = Log::create(&self.pool, project_id, Some(task_id), status_id, entry).await
        {
            tracing::debug!("skipping {entry} log for task {task_id}: {err}");
        }
    }
}

#[async_trait]
impl TriggerHandler for TaskWorker {
    async fn handle(&self, trigger: Trigger) {
        match trigger.action {
            TriggerAction::Created => self.on_created(trigger.id).await,
            TriggerAction::Updated => self.on_updated(trigger.id).await,
            TriggerAction::Deleted => self.on_deleted(trigger.id).await,
        }
    }
}
