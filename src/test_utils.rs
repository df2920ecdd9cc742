// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mocked Kubernetes HTTP endpoint and an in-memory cluster.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use tower::Service;

use crate::error::{ControllerError, Result};
use crate::kubernetes::{ClusterApi, WatchEvent};
use crate::types::schema::enmasse;
use crate::types::{KindInfo, ObjectKey, ObjectRecord, ResourceKind, Schema, Scope};

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(("GET".to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let (status, body) = self
            .find_response(req.method().as_str(), req.uri().path())
            .unwrap_or_else(|| (404, not_found_json("resource", req.uri().path())));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

pub fn enmasse_schema() -> Schema {
    let mut schema = Schema::new();
    enmasse::add_to_schema(&mut schema).unwrap();
    schema
}

/// A generic namespaced object at the given resource version.
pub fn record_of(namespace: &str, name: &str, resource_version: u64) -> ObjectRecord {
    ObjectRecord::new(
        ObjectKey::new(Some(namespace), name),
        resource_version,
        json!({
            "metadata": {
                "name": name,
                "namespace": namespace,
                "resourceVersion": resource_version.to_string()
            }
        }),
    )
}

/// An Address object at the given resource version.
pub fn address_record(namespace: &str, name: &str, resource_version: u64) -> ObjectRecord {
    ObjectRecord::new(
        ObjectKey::new(Some(namespace), name),
        resource_version,
        address_json(namespace, name, "queue", "standard-small-queue"),
    )
}

pub fn address_json(namespace: &str, name: &str, type_: &str, plan: &str) -> Value {
    json!({
        "apiVersion": "enmasse.io/v1beta1",
        "kind": "Address",
        "metadata": {"name": name, "namespace": namespace},
        "spec": {"address": name, "type": type_, "plan": plan}
    })
}

/// In-memory cluster with scripted watch streams.
pub struct FakeCluster {
    objects: Mutex<BTreeMap<ResourceKind, BTreeMap<ObjectKey, ObjectRecord>>>,
    watches: Mutex<HashMap<ResourceKind, VecDeque<UnboundedReceiver<Result<WatchEvent>>>>>,
    failing: Mutex<HashSet<ObjectKey>>,
    marker: Mutex<Option<String>>,
    stopped: Arc<Mutex<Vec<ResourceKind>>>,
    next_version: AtomicU64,
    writes: AtomicUsize,
}

/// Records the kind of a watch stream when the stream is dropped.
struct StopRecorder {
    kind: ResourceKind,
    stopped: Arc<Mutex<Vec<ResourceKind>>>,
}

impl StopRecorder {
    fn touch(&self) {}
}

impl Drop for StopRecorder {
    fn drop(&mut self) {
        self.stopped.lock().unwrap().push(self.kind.clone());
    }
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            watches: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            marker: Mutex::new(None),
            stopped: Arc::new(Mutex::new(Vec::new())),
            next_version: AtomicU64::new(100),
            writes: AtomicUsize::new(0),
        }
    }

    /// Store an object, assigning it a fresh resource version.
    pub fn insert(&self, kind: &ResourceKind, mut payload: Value) -> ObjectRecord {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        payload["metadata"]["resourceVersion"] = json!(version.to_string());
        let record = ObjectRecord::from_payload(payload).unwrap();
        self.objects
            .lock()
            .unwrap()
            .entry(kind.clone())
            .or_default()
            .insert(record.key.clone(), record.clone());
        record
    }

    pub fn objects(&self, kind: &ResourceKind) -> Vec<ObjectRecord> {
        self.objects
            .lock()
            .unwrap()
            .get(kind)
            .map(|objects| objects.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Queue a watch stream for `kind`; the next `watch` call consumes it.
    pub fn push_watch(&self, kind: &ResourceKind) -> UnboundedSender<Result<WatchEvent>> {
        let (tx, rx) = unbounded();
        self.watches
            .lock()
            .unwrap()
            .entry(kind.clone())
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn fail_replace(&self, key: ObjectKey) {
        self.failing.lock().unwrap().insert(key);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn marker(&self) -> Option<String> {
        self.marker.lock().unwrap().clone()
    }

    /// Kinds whose watch stream was dropped, in drop order.
    pub fn stopped_watches(&self) -> Vec<ResourceKind> {
        self.stopped.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterApi for FakeCluster {
    fn list<'a>(
        &'a self,
        kind: &'a KindInfo,
        scope: &'a Scope,
    ) -> BoxFuture<'a, Result<Vec<ObjectRecord>>> {
        let records = self
            .objects(&kind.kind)
            .into_iter()
            .filter(|r| scope.admits(r.namespace()))
            .collect();
        async move { Ok(records) }.boxed()
    }

    fn watch(&self, kind: &KindInfo, _scope: &Scope) -> BoxStream<'static, Result<WatchEvent>> {
        let next = self
            .watches
            .lock()
            .unwrap()
            .get_mut(&kind.kind)
            .and_then(VecDeque::pop_front);
        let events = match next {
            Some(rx) => rx.boxed(),
            None => stream::pending().boxed(),
        };
        let recorder = StopRecorder {
            kind: kind.kind.clone(),
            stopped: self.stopped.clone(),
        };
        events
            .map(move |event| {
                recorder.touch();
                event
            })
            .boxed()
    }

    fn replace<'a>(
        &'a self,
        kind: &'a KindInfo,
        record: &'a ObjectRecord,
    ) -> BoxFuture<'a, Result<ObjectRecord>> {
        async move {
            if self.failing.lock().unwrap().contains(&record.key) {
                return Err(ControllerError::InvalidObject(format!(
                    "admission denied for {}",
                    record.key
                )));
            }

            let mut objects = self.objects.lock().unwrap();
            let stored = objects
                .get_mut(&kind.kind)
                .and_then(|o| o.get_mut(&record.key))
                .ok_or_else(|| ControllerError::NotFound {
                    kind: kind.kind.clone(),
                    key: record.key.to_string(),
                })?;
            if stored.resource_version != record.resource_version {
                return Err(ControllerError::InvalidObject(format!("conflict on {}", record.key)));
            }

            let version = self.next_version.fetch_add(1, Ordering::SeqCst);
            let mut payload = record.payload.clone();
            payload["metadata"]["resourceVersion"] = json!(version.to_string());
            *stored = ObjectRecord::new(record.key.clone(), version, payload);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(stored.clone())
        }
        .boxed()
    }

    fn read_marker<'a>(&'a self, _namespace: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        let marker = self.marker();
        async move { Ok(marker) }.boxed()
    }

    fn write_marker<'a>(
        &'a self,
        _namespace: &'a str,
        version: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        *self.marker.lock().unwrap() = Some(version.to_string());
        async move { Ok(()) }.boxed()
    }
}
