// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The slice of the cluster API the cache and upgrade gate depend on.

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{KindInfo, ObjectRecord, Scope};

/// One item of a watch stream.
///
/// A stream always opens with a list phase (`InitStarted`, zero or more
/// `InitApply`, `InitDone`) before live `Apply`/`Delete` events follow.
#[derive(Clone, Debug, PartialEq)]
pub enum WatchEvent {
    InitStarted,
    InitApply(ObjectRecord),
    InitDone,
    Apply(ObjectRecord),
    Delete(ObjectRecord),
}

pub trait ClusterApi: Send + Sync {
    /// List every object of `kind` visible under `scope`.
    fn list<'a>(
        &'a self,
        kind: &'a KindInfo,
        scope: &'a Scope,
    ) -> BoxFuture<'a, Result<Vec<ObjectRecord>>>;

    /// Open a list-then-watch stream. Errors end the useful life of the
    /// stream; callers reopen it to resynchronize.
    fn watch(&self, kind: &KindInfo, scope: &Scope) -> BoxStream<'static, Result<WatchEvent>>;

    /// Replace an object, guarded by the record's resource version.
    fn replace<'a>(
        &'a self,
        kind: &'a KindInfo,
        record: &'a ObjectRecord,
    ) -> BoxFuture<'a, Result<ObjectRecord>>;

    /// Version recorded by a completed upgrade, if any.
    fn read_marker<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    fn write_marker<'a>(&'a self, namespace: &'a str, version: &'a str)
        -> BoxFuture<'a, Result<()>>;
}
