//! Generic trigger queue with periodic batched handling.
//!
//! Services enqueue a [`Trigger`] for every successful mutation; a background
//! loop drains the queue on a fixed interval, deduplicates by
//! `resource:id` (last action wins within a window), and hands each survivor
//! to the worker's handler. Enqueueing never blocks the request path: a full
//! queue drops the trigger.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub mod project;
pub mod status;
pub mod task;

pub use project::ProjectWorker;
pub use status::StatusWorker;
pub use task::TaskWorker;

pub const TRIGGER_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_BATCH_INTERVAL: Duration = Duration::from_secs(10);

/// A mutation observed by a service, queued for audit logging.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub resource: &'static str,
    pub id: Uuid,
    pub action: TriggerAction,
    pub meta: Option<serde_json::Value>,
}

impl Trigger {
    pub fn new(resource: &'static str, id: Uuid, action: TriggerAction) -> Self {
        Self {
            resource,
            id,
            action,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }

    fn dedup_key(&self) -> (&'static str, Uuid) {
        (self.resource, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    Created,
    Updated,
    Deleted,
}

#[async_trait]
pub trait TriggerHandler: Send + Sync + 'static {
    async fn handle(&self, trigger: Trigger);
}

/// Handle to one background worker loop. The loop is the only consumer of the
/// channel and invokes the handler serially; there are never concurrent
/// handler invocations for one worker.
pub struct Worker {
    name: &'static str,
    tx: mpsc::Sender<Trigger>,
    stopped: AtomicBool,
    dropped: AtomicU64,
    shutdown: CancellationToken,
    join: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Starts the loop as a child of `lifecycle`: cancelling the lifecycle
    /// token makes the loop drain its queue, run a final handler pass, and
    /// exit.
    pub fn spawn<H: TriggerHandler>(
        name: &'static str,
        handler: H,
        interval: Duration,
        lifecycle: &CancellationToken,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(TRIGGER_QUEUE_CAPACITY);
        let shutdown = lifecycle.child_token();
        let join = tokio::spawn(run_loop(name, handler, rx, interval, shutdown.clone()));

        Arc::new(Self {
            name,
            tx,
            stopped: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            shutdown,
            join: tokio::sync::Mutex::new(Some(join)),
        })
    }

    /// Queues a trigger without blocking. No-op once stopped; when the queue
    /// is saturated the trigger is dropped, trading coverage for never
    /// stalling a request.
    pub fn enqueue(&self, trigger: Trigger) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        if let Err(TrySendError::Full(trigger) | TrySendError::Closed(trigger)) =
            self.tx.try_send(trigger)
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                "{} worker queue saturated, dropping {:?} trigger for {}",
                self.name,
                trigger.action,
                trigger.id
            );
        }
    }

    /// Count of triggers dropped because the queue was stopped or full.
    pub fn dropped_total(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops accepting triggers, flushes everything still queued through one
    /// final handler pass, and returns once the loop has exited.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.cancel();
        let handle = self.join.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::error!("{} worker loop failed to join: {err}", self.name);
            }
        }
    }
}

async fn run_loop<H: TriggerHandler>(
    name: &'static str,
    handler: H,
    mut rx: mpsc::Receiver<Trigger>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval fires immediately; consume it so the
    // first batch waits a full window.
    tick.tick().await;

    loop {
        let draining = tokio::select! {
            _ = tick.tick() => false,
            _ = shutdown.cancelled() => true,
        };

        let mut batch: HashMap<(&'static str, Uuid), Trigger> = HashMap::new();
        while let Ok(trigger) = rx.try_recv() {
            batch.insert(trigger.dedup_key(), trigger);
        }

        for (_, trigger) in batch {
            handler.handle(trigger).await;
        }

        if draining {
            tracing::debug!("{name} worker drained, exiting");
            break;
        }
    }
}
