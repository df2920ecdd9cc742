// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Audit controller - logs every observed change of the watched kinds.

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::info;

use crate::controllers::registry::{Action, Controller};
use crate::error::Result;
use crate::types::{EventKind, ResourceEvent, ResourceKind};

pub struct AuditController {
    kinds: Vec<ResourceKind>,
}

impl AuditController {
    pub fn new(kinds: Vec<ResourceKind>) -> Self {
        Self { kinds }
    }
}

impl Controller for AuditController {
    fn name(&self) -> &str {
        "audit"
    }

    fn kinds(&self) -> Vec<ResourceKind> {
        self.kinds.clone()
    }

    fn reconcile<'a>(
        &'a self,
        kind: &'a ResourceKind,
        event: &'a ResourceEvent,
    ) -> BoxFuture<'a, Result<Action>> {
        async move {
            let verb = match event.kind {
                EventKind::Added => "added",
                EventKind::Updated => "updated",
                EventKind::Deleted => "deleted",
            };
            info!(
                %kind,
                key = %event.record.key,
                resource_version = event.record.resource_version,
                "Object {}",
                verb
            );

            // Wait for the next change - the watch reports every update and deletion
            Ok(Action::await_change())
        }
        .boxed()
    }
}
