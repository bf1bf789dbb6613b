//! Integration tests for the audit workers: interval batching, dedup within a
//! window, status-change entries, and drain-on-stop.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use fluxis_db::DbService;
use fluxis_db::models::log::{Log, LogFilter};
use fluxis_db::models::project::CreateProject;
use fluxis_db::models::task::{CreateTask, UpdateTask};
use fluxis_db::search::PageQuery;
use fluxis_services::services::projects::ProjectService;
use fluxis_services::services::statuses::StatusService;
use fluxis_services::services::tasks::TaskService;
use fluxis_services::workers::{
    ProjectWorker, StatusWorker, TaskWorker, Trigger, TriggerAction, Worker,
};
use uuid::Uuid;

const INTERVAL: Duration = Duration::from_millis(100);

struct Ctx {
    db: DbService,
    projects: ProjectService,
    statuses: StatusService,
    tasks: TaskService,
    project_worker: Arc<Worker>,
    _temp: TempDir,
}

async fn setup(interval: Duration) -> Ctx {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("test.sqlite");
    let db = DbService::new(&format!("sqlite://{}", db_path.display()))
        .await
        .unwrap();

    let lifecycle = CancellationToken::new();
    let project_worker = Worker::spawn(
        "project",
        ProjectWorker::new(db.pool.clone()),
        interval,
        &lifecycle,
    );
    let status_worker = Worker::spawn(
        "status",
        StatusWorker::new(db.pool.clone()),
        interval,
        &lifecycle,
    );
    let task_worker = Worker::spawn(
        "task",
        TaskWorker::new(db.pool.clone()),
        interval,
        &lifecycle,
    );

    Ctx {
        projects: ProjectService::new(db.pool.clone(), project_worker.clone()),
        statuses: StatusService::new(db.pool.clone(), status_worker),
        tasks: TaskService::new(db.pool.clone(), task_worker),
        project_worker,
        db,
        _temp: temp,
    }
}

async fn entries_matching(ctx: &Ctx, project_id: Uuid, needle: &str) -> Vec<String> {
    Log::search(
        &ctx.db.pool,
        &LogFilter {
            project_id,
            task_ids: Vec::new(),
            status_ids: Vec::new(),
            query: Some(needle.to_string()),
        },
        PageQuery::default(),
    )
    .await
    .unwrap()
    .items
    .into_iter()
    .map(|log| log.entry)
    .collect()
}

fn new_project(name: &str) -> CreateProject {
    CreateProject {
        name: name.to_string(),
        description: None,
        status: None,
    }
}

#[tokio::test]
async fn two_updates_in_one_window_log_once() {
    let ctx = setup(INTERVAL).await;
    let project = ctx.projects.create(new_project("Batched")).await.unwrap();
    let id = project.id.to_string();

    // Let the created trigger flush so the worker has a cached snapshot.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(
        entries_matching(&ctx, project.id, "project.created").await.len(),
        1
    );

    let rename = |name: &str| fluxis_db::models::project::UpdateProject {
        name: Some(name.to_string()),
        description: None,
        status: None,
    };
    ctx.projects.update(&id, rename("N1")).await.unwrap();
    ctx.projects.update(&id, rename("N2")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    let updates = entries_matching(&ctx, project.id, "project.updated").await;
    assert_eq!(updates, vec!["project.updated:name".to_string()]);
}

#[tokio::test]
async fn update_then_delete_in_one_window_keeps_the_last_action() {
    let ctx = setup(Duration::from_millis(200)).await;
    let project = ctx.projects.create(new_project("LastWins")).await.unwrap();
    let id = project.id.to_string();

    tokio::time::sleep(Duration::from_millis(450)).await;

    ctx.projects
        .update(
            &id,
            fluxis_db::models::project::UpdateProject {
                name: Some("renamed".to_string()),
                description: None,
                status: None,
            },
        )
        .await
        .unwrap();
    ctx.projects.delete(&id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(entries_matching(&ctx, project.id, "project.updated").await.is_empty());
    assert_eq!(
        entries_matching(&ctx, project.id, "project.deleted").await.len(),
        1
    );
}

#[tokio::test]
async fn moving_a_task_logs_a_status_change() {
    let ctx = setup(INTERVAL).await;
    let project = ctx.projects.create(new_project("Moves")).await.unwrap();
    let columns = ctx
        .statuses
        .list_by_project(&project.id.to_string())
        .await
        .unwrap();

    let task = ctx
        .tasks
        .create(CreateTask {
            project_id: project.id.to_string(),
            title: "Movable".to_string(),
            details: None,
            status_id: Some(columns[0].id.to_string()),
            priority: None,
            due_date: None,
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;

    ctx.tasks
        .update(
            &task.id.to_string(),
            UpdateTask {
                title: None,
                details: None,
                status_id: Some(columns[1].id.to_string()),
                priority: None,
                due_date: None,
            },
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    let moved = entries_matching(&ctx, project.id, "task.status_changed").await;
    assert_eq!(moved.len(), 1);
    let updated = entries_matching(&ctx, project.id, "task.updated").await;
    assert_eq!(updated, vec!["task.updated:status_id".to_string()]);

    // The status-change entry references the new column.
    let logs = Log::search(
        &ctx.db.pool,
        &LogFilter {
            project_id: project.id,
            task_ids: vec![task.id],
            status_ids: Vec::new(),
            query: Some("status_changed".to_string()),
        },
        PageQuery::default(),
    )
    .await
    .unwrap();
    assert_eq!(logs.items[0].status_id, Some(columns[1].id));
}

#[tokio::test]
async fn status_lifecycle_is_logged_with_references() {
    let ctx = setup(INTERVAL).await;
    let project = ctx.projects.create(new_project("Columns")).await.unwrap();

    let review = ctx
        .statuses
        .create(fluxis_db::models::status::CreateStatus {
            project_id: project.id.to_string(),
            name: "Review".to_string(),
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    ctx.statuses.delete(&review.id.to_string()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    let created = Log::search(
        &ctx.db.pool,
        &LogFilter {
            project_id: project.id,
            task_ids: Vec::new(),
            status_ids: vec![review.id],
            query: None,
        },
        PageQuery::default(),
    )
    .await
    .unwrap();
    let entries: Vec<&str> = created.items.iter().map(|log| log.entry.as_str()).collect();
    assert!(entries.contains(&"status.created"));
    assert!(entries.contains(&"status.deleted"));
}

#[tokio::test]
async fn stop_flushes_pending_triggers_without_waiting() {
    // An hour-long interval: nothing would flush before the stop call.
    let ctx = setup(Duration::from_secs(3600)).await;
    let project = ctx.projects.create(new_project("Drained")).await.unwrap();

    ctx.project_worker.stop().await;

    assert_eq!(
        entries_matching(&ctx, project.id, "project.created").await.len(),
        1
    );

    // Enqueueing after stop is a silent no-op.
    ctx.project_worker.enqueue(Trigger::new(
        "project",
        project.id,
        TriggerAction::Updated,
    ));
    assert_eq!(ctx.project_worker.dropped_total(), 0);
    assert_eq!(
        entries_matching(&ctx, project.id, "project.updated").await.len(),
        0
    );
}
