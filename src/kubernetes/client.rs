// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! kube-rs backed implementation of [`ClusterApi`].

use std::collections::BTreeMap;

use futures::future::{self, BoxFuture};
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{DynamicObject, ListParams, ObjectMeta, Patch, PatchParams, PostParams},
    Api, Client,
};
use kube_runtime::watcher::{self, Event};
use tracing::{debug, info, warn};

use crate::constants::{upgrade, watch, OPERATOR_NAME};
use crate::error::{ControllerError, Result};
use crate::kubernetes::api::{ClusterApi, WatchEvent};
use crate::types::{KindInfo, ObjectRecord, Scope};

#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn scoped_api(&self, kind: &KindInfo, scope: &Scope) -> Api<DynamicObject> {
        let ar = kind.api_resource();
        match scope {
            Scope::Namespace(ns) if kind.namespaced => {
                Api::namespaced_with(self.client.clone(), ns, &ar)
            }
            _ => Api::all_with(self.client.clone(), &ar),
        }
    }

    fn object_api(&self, kind: &KindInfo, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = kind.api_resource();
        match namespace {
            Some(ns) if kind.namespaced => Api::namespaced_with(self.client.clone(), ns, &ar),
            _ => Api::all_with(self.client.clone(), &ar),
        }
    }
}

fn to_record(obj: DynamicObject) -> Result<ObjectRecord> {
    let payload = serde_json::to_value(&obj)
        .map_err(|e| ControllerError::InvalidObject(format!("Failed to serialize object: {}", e)))?;
    ObjectRecord::from_payload(payload)
}

/// An object that cannot be indexed is skipped so the rest of the stream,
/// including the end of an initial listing, still gets through.
fn watched_record(obj: DynamicObject) -> Option<ObjectRecord> {
    let name = obj.metadata.name.clone().unwrap_or_default();
    match to_record(obj) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(%name, error = %e, "Skipping unusable object from watch");
            None
        }
    }
}

fn to_watch_event(event: Event<DynamicObject>) -> Option<WatchEvent> {
    Some(match event {
        Event::Init => WatchEvent::InitStarted,
        Event::InitApply(obj) => WatchEvent::InitApply(watched_record(obj)?),
        Event::InitDone => WatchEvent::InitDone,
        Event::Apply(obj) => WatchEvent::Apply(watched_record(obj)?),
        Event::Delete(obj) => WatchEvent::Delete(watched_record(obj)?),
    })
}

impl ClusterApi for KubeClusterApi {
    fn list<'a>(
        &'a self,
        kind: &'a KindInfo,
        scope: &'a Scope,
    ) -> BoxFuture<'a, Result<Vec<ObjectRecord>>> {
        async move {
            let api = self.scoped_api(kind, scope);
            let list = api.list(&ListParams::default()).await?;
            debug!(kind = %kind.kind, %scope, count = list.items.len(), "Listed objects");
            list.items.into_iter().map(to_record).collect()
        }
        .boxed()
    }

    fn watch(&self, kind: &KindInfo, scope: &Scope) -> BoxStream<'static, Result<WatchEvent>> {
        let api = self.scoped_api(kind, scope);
        let config = watcher::Config::default().timeout(watch::TIMEOUT_SECS);

        watcher::watcher(api, config)
            .filter_map(|event| {
                future::ready(match event {
                    Ok(event) => to_watch_event(event).map(Ok),
                    Err(e) => Some(Err(ControllerError::WatchError(e.to_string()))),
                })
            })
            .boxed()
    }

    fn replace<'a>(
        &'a self,
        kind: &'a KindInfo,
        record: &'a ObjectRecord,
    ) -> BoxFuture<'a, Result<ObjectRecord>> {
        async move {
            let mut obj: DynamicObject = serde_json::from_value(record.payload.clone())
                .map_err(|e| {
                    ControllerError::InvalidObject(format!("{} is not a valid object: {}", record.key, e))
                })?;
            obj.metadata.resource_version = Some(record.resource_version.to_string());

            let api = self.object_api(kind, record.namespace());
            let pp = PostParams {
                field_manager: Some(OPERATOR_NAME.to_string()),
                ..Default::default()
            };
            let replaced = api.replace(record.name(), &pp, &obj).await?;
            to_record(replaced)
        }
        .boxed()
    }

    fn read_marker<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        async move {
            let configmaps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
            let marker = configmaps.get_opt(upgrade::MARKER_NAME).await?;

            Ok(marker
                .and_then(|cm| cm.data)
                .and_then(|data| data.get(upgrade::MARKER_VERSION_KEY).cloned()))
        }
        .boxed()
    }

    fn write_marker<'a>(
        &'a self,
        namespace: &'a str,
        version: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let configmaps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
            let marker = ConfigMap {
                metadata: ObjectMeta {
                    name: Some(upgrade::MARKER_NAME.to_string()),
                    namespace: Some(namespace.to_string()),
                    ..Default::default()
                },
                data: Some(BTreeMap::from([(
                    upgrade::MARKER_VERSION_KEY.to_string(),
                    version.to_string(),
                )])),
                ..Default::default()
            };

            let pp = PatchParams::apply(OPERATOR_NAME).force();
            configmaps
                .patch(upgrade::MARKER_NAME, &pp, &Patch::Apply(&marker))
                .await?;

            info!("Upgrade marker {}/{} written", namespace, upgrade::MARKER_NAME);
            Ok(())
        }
        .boxed()
    }
}
