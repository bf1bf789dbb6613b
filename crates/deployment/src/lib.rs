//! Startup wiring: configuration, the database pool, the audit workers, and
//! the domain services, bundled into the state handed to every request
//! handler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use fluxis_db::DbService;
use fluxis_services::services::auth::{AdminCredentials, AuthService, TokenService};
use fluxis_services::services::logs::LogService;
use fluxis_services::services::projects::ProjectService;
use fluxis_services::services::statuses::StatusService;
use fluxis_services::services::tasks::TaskService;
use fluxis_services::workers::{
    DEFAULT_BATCH_INTERVAL, ProjectWorker, StatusWorker, TaskWorker, Worker,
};

/// Process configuration; every value is required at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub admin_username: String,
    pub admin_password: String,
    pub token_secret: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            port: require("PORT")?.parse().context("PORT must be a number")?,
            admin_username: require("ADMIN_USERNAME")?,
            admin_password: require("ADMIN_PASSWORD")?,
            token_secret: require("TOKEN_SECRET")?,
        })
    }
}

fn require(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

/// The three audit workers, stopped together on shutdown.
pub struct WorkerSet {
    pub project: Arc<Worker>,
    pub status: Arc<Worker>,
    pub task: Arc<Worker>,
}

impl WorkerSet {
    pub async fn stop_all(&self) {
        tokio::join!(self.project.stop(), self.status.stop(), self.task.stop());
    }
}

#[derive(Clone)]
pub struct Deployment {
    db: DbService,
    auth: AuthService,
    projects: ProjectService,
    statuses: StatusService,
    tasks: TaskService,
    logs: LogService,
    workers: Arc<WorkerSet>,
    shutdown: CancellationToken,
}

impl Deployment {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_batch_interval(config, DEFAULT_BATCH_INTERVAL).await
    }

    /// Wires the full stack; the interval is injectable so tests can run the
    /// workers on a tight cadence.
    pub async fn with_batch_interval(
        config: Config,
        batch_interval: Duration,
    ) -> anyhow::Result<Self> {
        let db = DbService::new(&config.database_url).await?;
        let shutdown = CancellationToken::new();

        let project_worker = Worker::spawn(
            "project",
            ProjectWorker::new(db.pool.clone()),
            batch_interval,
            &shutdown,
        );
        let status_worker = Worker::spawn(
            "status",
            StatusWorker::new(db.pool.clone()),
            batch_interval,
            &shutdown,
        );
        let task_worker = Worker::spawn(
            "task",
            TaskWorker::new(db.pool.clone()),
            batch_interval,
            &shutdown,
        );

        tracing::debug!("audit workers started with a {batch_interval:?} batch interval");

        let auth = AuthService::new(
            AdminCredentials {
                username: config.admin_username.clone(),
                password: config.admin_password.clone(),
            },
            TokenService::new(&config.token_secret),
        );

        Ok(Self {
            projects: ProjectService::new(db.pool.clone(), project_worker.clone()),
            statuses: StatusService::new(db.pool.clone(), status_worker.clone()),
            tasks: TaskService::new(db.pool.clone(), task_worker.clone()),
            logs: LogService::new(db.pool.clone()),
            workers: Arc::new(WorkerSet {
                project: project_worker,
                status: status_worker,
                task: task_worker,
            }),
            auth,
            db,
            shutdown,
        })
    }

    pub fn db(&self) -> &DbService {
        &self.db
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn projects(&self) -> &ProjectService {
        &self.projects
    }

    pub fn statuses(&self) -> &StatusService {
        &self.statuses
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    pub fn logs(&self) -> &LogService {
        &self.logs
    }

    pub fn workers(&self) -> &WorkerSet {
        &self.workers
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancels the lifecycle token and waits for every worker to drain.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.workers.stop_all().await;
    }
}
