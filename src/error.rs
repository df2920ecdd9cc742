// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

use crate::types::ResourceKind;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Schema registration failed: {0}")]
    SchemaError(String),

    #[error("Resource kind {0} is not registered")]
    UnknownKind(ResourceKind),

    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: String },

    #[error("Invalid object: {0}")]
    InvalidObject(String),

    #[error("Watch failed: {0}")]
    WatchError(String),

    #[error("Failed to migrate {kind} {key}: {reason}")]
    MigrationError {
        kind: ResourceKind,
        key: String,
        reason: String,
    },

    #[error("Reconciliation failed: {0}")]
    ReconcileError(String),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
