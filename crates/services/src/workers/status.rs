//! Audit worker for status-column mutations.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use uuid::Uuid;

use fluxis_db::models::log::Log;
use fluxis_db::models::status::Status;

use super::{Trigger, TriggerAction, TriggerHandler};

pub struct StatusWorker {
    pool: SqlitePool,
    cache: RwLock<HashMap<Uuid, Status>>,
}

impl StatusWorker {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn on_created(&self, id: Uuid) {
        let Ok(status) = Status::find_detail(&self.pool, id).await else {
            return;
        };
        self.append(status.project_id, id, "status.created").await;
        self.cache.write().await.insert(id, status);
    }

    async fn on_updated(&self, id: Uuid) {
        let Ok(current) = Status::find_detail(&self.pool, id).await else {
            return;
        };
        let previous = self.cache.read().await.get(&id).cloned();

        if let Some(previous) = previous {
            let mut changed = Vec::new();
            if previous.name != current.name {
                changed.push("name");
            }
            if previous.position != current.position {
                changed.push("position");
            }
            if previous.is_default != current.is_default {
                changed.push("is_default");
            }
            if !changed.is_empty() {
                let entry = format!("status.updated:{}", changed.join(","));
                self.append(current.project_id, id, &entry).await;
            }
        }
        self.cache.write().await.insert(id, current);
    }

    async fn on_deleted(&self, id: Uuid) {
        // The row is already tombstoned; take the owning project from the
        // cache, or from an unfiltered read on a cache miss.
        let project_id = match self.cache.read().await.get(&id) {
            Some(status) => Some(status.project_id),
            None => Status::find_by_id_any(&self.pool, id)
                .await
                .ok()
                .flatten()
                .map(|status| status.project_id),
        };
        let Some(project_id) = project_id else {
            return;
        };
        self.append(project_id, id, "status.deleted").await;
        self.cache.write().await.remove(&id);
    }

    async fn append(&self, project_id: Uuid, status_id: Uuid, entry: &str) {
        if let Err(err) = Log::create(&self.pool, project_id, None, Some(status_id), entry).await {
            tracing::debug!("skipping {entry} log for status {status_id}: {err}");
        }
    }
}

#[async_trait]
impl TriggerHandler for StatusWorker {
    async fn handle(&self, trigger: Trigger) {
        match trigger.action {
            TriggerAction::Created => self.on_created(trigger.id).await,
            TriggerAction::Updated => self.on_updated(trigger.id).await,
            TriggerAction::Deleted => self.on_deleted(trigger.id).await,
        }
    }
}
