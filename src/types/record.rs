// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object snapshots and the events delivered to subscribers.

use std::fmt;

use serde_json::Value;

use crate::error::{ControllerError, Result};

/// Identity of an object within a store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A versioned snapshot of one resource instance.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectRecord {
    pub key: ObjectKey,
    pub resource_version: u64,
    pub deleted: bool,
    pub payload: Value,
}

impl ObjectRecord {
    pub fn new(key: ObjectKey, resource_version: u64, payload: Value) -> Self {
        Self {
            key,
            resource_version,
            deleted: false,
            payload,
        }
    }

    /// Build a record from a serialized Kubernetes object.
    pub fn from_payload(payload: Value) -> Result<Self> {
        let metadata = payload
            .get("metadata")
            .ok_or_else(|| ControllerError::InvalidObject("object has no metadata".to_string()))?;

        let name = metadata
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ControllerError::InvalidObject("object has no name".to_string()))?;
        let namespace = metadata.get("namespace").and_then(Value::as_str);

        let resource_version = metadata
            .get("resourceVersion")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ControllerError::InvalidObject(format!("object {} has no resourceVersion", name))
            })?
            .parse::<u64>()
            .map_err(|e| {
                ControllerError::InvalidObject(format!("object {} has invalid resourceVersion: {}", name, e))
            })?;

        Ok(Self::new(
            ObjectKey::new(namespace, name),
            resource_version,
            payload,
        ))
    }

    pub fn namespace(&self) -> Option<&str> {
        self.key.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub(crate) fn into_tombstone(mut self) -> Self {
        self.deleted = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Updated,
    Deleted,
}

/// A change notification for one object of one kind.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceEvent {
    pub kind: EventKind,
    pub record: ObjectRecord,
}

impl ResourceEvent {
    pub fn new(kind: EventKind, record: ObjectRecord) -> Self {
        Self { kind, record }
    }
}
