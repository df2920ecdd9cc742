// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Controller registration and the run loop that owns watches and workers.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::ScopeRouter;
use crate::controllers::observer::{ErrorObserver, LogObserver};
use crate::controllers::registry::{Action, Controller};
use crate::error::Result;
use crate::types::{EventKind, ResourceEvent, ResourceKind};

#[derive(Debug, Clone)]
struct WorkItem {
    kind: ResourceKind,
    event: ResourceEvent,
}

struct Worker {
    controller: Arc<dyn Controller>,
    tx: mpsc::UnboundedSender<WorkItem>,
    rx: mpsc::UnboundedReceiver<WorkItem>,
}

/// Attaches controllers to the scope router and runs them until cancelled.
pub struct Manager {
    router: Arc<ScopeRouter>,
    workers: Vec<Worker>,
    observer: Arc<dyn ErrorObserver>,
    drain_timeout: Duration,
}

impl Manager {
    pub fn new(router: Arc<ScopeRouter>, drain_timeout: Duration) -> Self {
        Self {
            router,
            workers: Vec::new(),
            observer: Arc::new(LogObserver),
            drain_timeout,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Subscribe `controller` to each of its kinds. Events are queued so the
    /// delivering watch never waits on a reconciliation.
    pub fn register(&mut self, controller: Arc<dyn Controller>) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel();

        for kind in controller.kinds() {
            let queue = tx.clone();
            let item_kind = kind.clone();
            self.router.subscribe(&kind, move |event| {
                // Only fails once the worker has stopped during shutdown
                let _ = queue.send(WorkItem {
                    kind: item_kind.clone(),
                    event: event.clone(),
                });
            })?;
        }

        info!(controller = %controller.name(), "Registered controller");
        self.workers.push(Worker { controller, tx, rx });
        Ok(())
    }

    /// Start all workers and watches, then block until `cancel` fires.
    ///
    /// On shutdown watches are stopped in reverse start order, workers stop
    /// taking new items, and in-flight reconciliations get up to the drain
    /// timeout to finish.
    #[instrument(skip_all)]
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let Manager {
            router,
            workers,
            observer,
            drain_timeout,
        } = self;

        let mut worker_handles = Vec::with_capacity(workers.len());
        for worker in workers {
            debug!(controller = %worker.controller.name(), "Starting worker");
            worker_handles.push(tokio::spawn(run_worker(
                worker,
                router.clone(),
                observer.clone(),
                cancel.clone(),
            )));
        }

        let mut watches = Vec::new();
        for watch in router.watches() {
            let kind = watch.kind().clone();
            let token = CancellationToken::new();
            let handle = tokio::spawn(watch.run(token.clone()));
            watches.push((kind, token, handle));
        }

        info!(
            watches = watches.len(),
            controllers = worker_handles.len(),
            "Manager started"
        );

        cancel.cancelled().await;
        info!("Shutdown requested, stopping watches");

        for (kind, token, handle) in watches.into_iter().rev() {
            token.cancel();
            if let Err(e) = handle.await {
                warn!(%kind, error = %e, "Watch task ended abnormally");
            }
        }

        match tokio::time::timeout(drain_timeout, join_all(worker_handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        warn!(error = %e, "Worker task ended abnormally");
                    }
                }
                info!("All reconciliations finished");
            }
            Err(_) => warn!(
                timeout_secs = drain_timeout.as_secs(),
                "Drain timeout elapsed with reconciliations still running"
            ),
        }

        Ok(())
    }
}

async fn run_worker(
    worker: Worker,
    router: Arc<ScopeRouter>,
    observer: Arc<dyn ErrorObserver>,
    cancel: CancellationToken,
) {
    let Worker {
        controller,
        tx,
        mut rx,
    } = worker;

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = rx.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let key = &item.event.record.key;
        let action = match controller.reconcile(&item.kind, &item.event).await {
            Ok(action) => {
                debug!(controller = %controller.name(), kind = %item.kind, %key, "Reconciled");
                action
            }
            Err(e) => {
                observer.reconcile_failed(controller.name(), &item.kind, key, &e);
                controller.error_policy(&item.event, &e)
            }
        };

        if let Action::Requeue(delay) = action {
            schedule_requeue(item, delay, tx.clone(), router.clone(), cancel.clone());
        }
    }

    debug!(controller = %controller.name(), "Worker stopped");
}

fn schedule_requeue(
    item: WorkItem,
    delay: Duration,
    tx: mpsc::UnboundedSender<WorkItem>,
    router: Arc<ScopeRouter>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                if let Some(item) = refresh(&router, item) {
                    let _ = tx.send(item);
                }
            }
        }
    });
}

/// Requeued items carry the latest cached state. Objects that disappeared
/// since are dropped unless the original event was their deletion.
fn refresh(router: &ScopeRouter, item: WorkItem) -> Option<WorkItem> {
    let record = &item.event.record;
    match router.get(&item.kind, record.namespace(), record.name()) {
        Ok(current) => Some(WorkItem {
            event: ResourceEvent::new(EventKind::Updated, current),
            kind: item.kind,
        }),
        Err(_) if item.event.kind == EventKind::Deleted => Some(item),
        Err(_) => None,
    }
}
