// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use tracing::error;

use crate::error::ControllerError;
use crate::types::{ObjectKey, ResourceKind};

/// Receives reconciliation failures so they are surfaced, never dropped.
pub trait ErrorObserver: Send + Sync {
    fn reconcile_failed(
        &self,
        controller: &str,
        kind: &ResourceKind,
        key: &ObjectKey,
        error: &ControllerError,
    );
}

/// Reports failures through the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ErrorObserver for LogObserver {
    fn reconcile_failed(
        &self,
        controller: &str,
        kind: &ResourceKind,
        key: &ObjectKey,
        error: &ControllerError,
    ) {
        error!(
            %controller,
            %kind,
            %key,
            error = %error,
            "Reconciliation error"
        );
    }
}
