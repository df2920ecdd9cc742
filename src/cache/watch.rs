// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Long-lived watch feeding one kind's store, restarted with backoff.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::router::KindCache;
use crate::constants::watch::{BACKOFF_INITIAL_MS, BACKOFF_MAX_MS};
use crate::kubernetes::{ClusterApi, WatchEvent};
use crate::types::{ObjectRecord, ResourceKind, Scope};

/// Reconnection backoff for failed watches.
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(BACKOFF_INITIAL_MS),
            max_delay: Duration::from_millis(BACKOFF_MAX_MS),
            multiplier: 2.0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    pub(crate) fn new(config: BackoffConfig) -> Self {
        let current = config.initial_delay;
        Self { config, current }
    }

    /// Next delay with 0.5x-1.5x jitter, never above the cap.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let delay = Duration::from_secs_f64(self.current.as_secs_f64() * jitter)
            .min(self.config.max_delay);

        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.config.multiplier)
                .min(self.config.max_delay.as_secs_f64()),
        );
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.config.initial_delay;
    }
}

/// A subscription to one kind within one scope.
pub struct ResourceWatch {
    cache: Arc<KindCache>,
    cluster: Arc<dyn ClusterApi>,
    backoff: BackoffConfig,
}

impl ResourceWatch {
    pub(crate) fn new(
        cache: Arc<KindCache>,
        cluster: Arc<dyn ClusterApi>,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            cache,
            cluster,
            backoff,
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.cache.info().kind
    }

    pub fn scope(&self) -> &Scope {
        self.cache.scope()
    }

    /// Drive the watch until `cancel` fires. Every (re)connection starts
    /// with a full listing that is diffed against the store.
    #[instrument(skip_all, fields(kind = %self.kind(), scope = %self.scope()))]
    pub async fn run(self, cancel: CancellationToken) {
        let mut backoff = Backoff::new(self.backoff.clone());
        info!("Starting watch");

        loop {
            let mut stream = self.cluster.watch(self.cache.info(), self.cache.scope());
            let mut listing: Option<Vec<ObjectRecord>> = None;

            let failure = loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Watch stopped");
                        return;
                    }
                    next = stream.next() => next,
                };

                match next {
                    Some(Ok(WatchEvent::InitStarted)) => listing = Some(Vec::new()),
                    Some(Ok(WatchEvent::InitApply(record))) => match listing.as_mut() {
                        Some(listed) => listed.push(record),
                        None => self.cache.upsert(record),
                    },
                    Some(Ok(WatchEvent::InitDone)) => {
                        let listed = listing.take().unwrap_or_default();
                        debug!(count = listed.len(), "Initial listing complete");
                        self.cache.resync(listed);
                        backoff.reset();
                    }
                    Some(Ok(WatchEvent::Apply(record))) => self.cache.upsert(record),
                    Some(Ok(WatchEvent::Delete(record))) => self.cache.delete(record),
                    Some(Err(e)) => break Some(e),
                    None => break None,
                }
            };

            let delay = backoff.next_delay();
            match failure {
                Some(e) => warn!(
                    error = %e,
                    delay_ms = delay.as_millis(),
                    "Watch failed, reconnecting"
                ),
                None => debug!(delay_ms = delay.as_millis(), "Watch stream ended, reconnecting"),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Watch stopped");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
