// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Delegating cache: one store and one watch per kind, each in the scope the
//! policy assigns to that kind.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::cache::store::{NamespaceFilter, ScopedStore};
use crate::cache::watch::{BackoffConfig, ResourceWatch};
use crate::error::{ControllerError, Result};
use crate::kubernetes::ClusterApi;
use crate::types::{
    EventKind, KindInfo, ObjectKey, ObjectRecord, ResourceEvent, ResourceKind, Schema, Scope,
    ScopePolicy,
};

/// Callback invoked for every change of a subscribed kind.
pub type EventHandler = Arc<dyn Fn(&ResourceEvent) + Send + Sync>;

/// Store and subscribers of a single kind.
///
/// `handlers` doubles as the delivery lock: applying an event and notifying
/// subscribers happen under it, so a new subscriber's snapshot replay can
/// never interleave with live delivery. Reads only take the store lock.
pub(crate) struct KindCache {
    info: KindInfo,
    scope: Scope,
    store: RwLock<ScopedStore>,
    handlers: Mutex<Vec<EventHandler>>,
    watched: AtomicBool,
}

impl KindCache {
    fn new(info: KindInfo, scope: Scope) -> Self {
        let store = ScopedStore::new(info.kind.clone(), scope.clone());
        Self {
            info,
            scope,
            store: RwLock::new(store),
            handlers: Mutex::new(Vec::new()),
            watched: AtomicBool::new(false),
        }
    }

    /// True for the first caller only; a kind is fed by a single watch.
    fn claim_watch(&self) -> bool {
        !self.watched.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn info(&self) -> &KindInfo {
        &self.info
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn upsert(&self, record: ObjectRecord) {
        self.deliver(|store| store.upsert(record).into_iter().collect());
    }

    pub(crate) fn delete(&self, record: ObjectRecord) {
        self.deliver(|store| store.delete(record).into_iter().collect());
    }

    pub(crate) fn resync(&self, listed: Vec<ObjectRecord>) {
        self.deliver(|store| store.resync(listed));
    }

    fn deliver(&self, apply: impl FnOnce(&mut ScopedStore) -> Vec<ResourceEvent>) {
        let handlers = self.handlers();
        let events = apply(&mut self.write_store());

        for event in &events {
            debug!(kind = %self.info.kind, key = %event.record.key, event = ?event.kind, "Delivering event");
            for handler in handlers.iter() {
                handler(event);
            }
        }
    }

    fn subscribe(&self, handler: EventHandler) {
        let mut handlers = self.handlers();
        let snapshot = self.read_store().list(&NamespaceFilter::All);

        for record in snapshot {
            handler(&ResourceEvent::new(EventKind::Added, record));
        }
        handlers.push(handler);
    }

    fn handlers(&self) -> MutexGuard<'_, Vec<EventHandler>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_store(&self) -> RwLockReadGuard<'_, ScopedStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, ScopedStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Scope-aware cache routing reads and subscriptions to per-kind stores.
pub struct ScopeRouter {
    caches: BTreeMap<ResourceKind, Arc<KindCache>>,
    cluster: Arc<dyn ClusterApi>,
    backoff: BackoffConfig,
}

impl ScopeRouter {
    /// Build one store per registered kind, scoped according to `policy`.
    pub fn new(schema: &Schema, policy: &ScopePolicy, cluster: Arc<dyn ClusterApi>) -> Self {
        let caches = policy
            .partition(schema.kinds())
            .into_iter()
            .filter_map(|(kind, scope)| {
                let info = schema.get(&kind)?.clone();
                // Cluster-scoped resources have no namespace to restrict to
                let scope = if info.namespaced { scope } else { Scope::Cluster };
                info!(%kind, %scope, "Registered cache");
                Some((kind, Arc::new(KindCache::new(info, scope))))
            })
            .collect();

        Self {
            caches,
            cluster,
            backoff: BackoffConfig::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = &ResourceKind> {
        self.caches.keys()
    }

    pub fn scope_of(&self, kind: &ResourceKind) -> Result<&Scope> {
        Ok(self.cache(kind)?.scope())
    }

    pub fn get(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ObjectRecord> {
        let key = ObjectKey::new(namespace, name);
        self.cache(kind)?
            .read_store()
            .get(&key)
            .ok_or_else(|| ControllerError::NotFound {
                kind: kind.clone(),
                key: key.to_string(),
            })
    }

    pub fn list(&self, kind: &ResourceKind, filter: &NamespaceFilter) -> Result<Vec<ObjectRecord>> {
        Ok(self.cache(kind)?.read_store().list(filter))
    }

    /// Register `handler` for every change of `kind`. The handler first
    /// receives one `Added` event per object already cached, then live events.
    ///
    /// Handlers run on the watch task of their kind and must not block for
    /// long or call `subscribe` for the same kind.
    pub fn subscribe<F>(&self, kind: &ResourceKind, handler: F) -> Result<()>
    where
        F: Fn(&ResourceEvent) + Send + Sync + 'static,
    {
        self.cache(kind)?.subscribe(Arc::new(handler));
        debug!(%kind, "Subscriber registered");
        Ok(())
    }

    /// Watches for every kind not yet being watched, in a stable order.
    /// Each kind hands out its watch once for the lifetime of the router.
    pub fn watches(&self) -> Vec<ResourceWatch> {
        self.caches
            .values()
            .filter(|cache| cache.claim_watch())
            .map(|cache| self.build_watch(cache))
            .collect()
    }

    pub fn watch_for(&self, kind: &ResourceKind) -> Result<ResourceWatch> {
        let cache = self.cache(kind)?;
        if !cache.claim_watch() {
            return Err(ControllerError::WatchError(format!(
                "{} is already being watched",
                kind
            )));
        }
        Ok(self.build_watch(cache))
    }

    fn build_watch(&self, cache: &Arc<KindCache>) -> ResourceWatch {
        ResourceWatch::new(cache.clone(), self.cluster.clone(), self.backoff.clone())
    }

    pub(crate) fn cache(&self, kind: &ResourceKind) -> Result<&Arc<KindCache>> {
        self.caches
            .get(kind)
            .ok_or_else(|| ControllerError::UnknownKind(kind.clone()))
    }
}
