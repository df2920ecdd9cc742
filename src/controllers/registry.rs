// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The contract between the manager and the reconcilers it drives.

use std::time::Duration;

use futures::future::BoxFuture;

use crate::error::{ControllerError, Result};
use crate::types::{ResourceEvent, ResourceKind};

/// What to do with an object after a reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Reconcile the object again after the delay.
    Requeue(Duration),
    /// Wait for the next change of the object.
    AwaitChange,
}

impl Action {
    pub fn requeue(delay: Duration) -> Self {
        Action::Requeue(delay)
    }

    pub fn await_change() -> Self {
        Action::AwaitChange
    }
}

/// A reconciler driven by change events of one or more kinds.
pub trait Controller: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Kinds this controller subscribes to.
    fn kinds(&self) -> Vec<ResourceKind>;

    fn reconcile<'a>(
        &'a self,
        kind: &'a ResourceKind,
        event: &'a ResourceEvent,
    ) -> BoxFuture<'a, Result<Action>>;

    /// Decide how to retry after `reconcile` failed.
    fn error_policy(&self, _event: &ResourceEvent, _error: &ControllerError) -> Action {
        Action::requeue(Duration::from_secs(60))
    }
}
