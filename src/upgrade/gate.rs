// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One-time migration of persisted objects, run before any controller starts.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::{ControllerError, Result};
use crate::kubernetes::ClusterApi;
use crate::types::{KindInfo, ObjectRecord, ResourceKind, Schema, Scope};
use crate::upgrade::migrations::Migration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The marker was already present; nothing was touched.
    AlreadyUpgraded { version: String },
    /// All objects were migrated and the marker written.
    Migrated { migrated: usize },
}

pub struct UpgradeGate {
    cluster: Arc<dyn ClusterApi>,
    schema: Schema,
    marker_namespace: String,
    version: String,
    migrations: Vec<Box<dyn Migration>>,
}

impl UpgradeGate {
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        schema: Schema,
        marker_namespace: &str,
        version: &str,
    ) -> Self {
        Self {
            cluster,
            schema,
            marker_namespace: marker_namespace.to_string(),
            version: version.to_string(),
            migrations: Vec::new(),
        }
    }

    pub fn with_migrations(mut self, migrations: Vec<Box<dyn Migration>>) -> Self {
        self.migrations = migrations;
        self
    }

    /// Migrate every object that needs it, then record completion.
    ///
    /// All transformations are computed before anything is written, and the
    /// marker is only written once every object has been persisted. On error
    /// the marker stays unset and the process must not start reconciling.
    #[instrument(skip(self), fields(namespace = %self.marker_namespace))]
    pub async fn check_upgrade(&self) -> Result<UpgradeOutcome> {
        if let Some(version) = self.cluster.read_marker(&self.marker_namespace).await? {
            info!("Upgrade already completed by version {}", version);
            return Ok(UpgradeOutcome::AlreadyUpgraded { version });
        }

        info!("No upgrade marker found, checking objects for migration");

        let mut pending = Vec::new();
        for (kind, steps) in self.steps_by_kind() {
            let info = self.kind_info(kind)?;
            let records = self.cluster.list(info, &Scope::Cluster).await?;
            debug!(%kind, count = records.len(), "Checking objects");

            for record in records {
                if let Some(migrated) = migrate_record(&record, &steps)? {
                    pending.push((info, migrated));
                }
            }
        }

        info!("Migrating {} objects", pending.len());
        for (info, record) in &pending {
            self.cluster
                .replace(info, record)
                .await
                .map_err(|e| ControllerError::MigrationError {
                    kind: info.kind.clone(),
                    key: record.key.to_string(),
                    reason: e.to_string(),
                })?;
            debug!(kind = %info.kind, key = %record.key, "Migrated object");
        }

        self.cluster
            .write_marker(&self.marker_namespace, &self.version)
            .await?;
        info!("Upgrade to version {} completed", self.version);

        Ok(UpgradeOutcome::Migrated {
            migrated: pending.len(),
        })
    }

    fn steps_by_kind(&self) -> BTreeMap<&ResourceKind, Vec<&dyn Migration>> {
        let mut steps: BTreeMap<&ResourceKind, Vec<&dyn Migration>> = BTreeMap::new();
        for migration in &self.migrations {
            steps
                .entry(migration.kind())
                .or_default()
                .push(migration.as_ref());
        }
        steps
    }

    fn kind_info(&self, kind: &ResourceKind) -> Result<&KindInfo> {
        self.schema.get(kind).ok_or_else(|| {
            ControllerError::SchemaError(format!("migration targets unregistered kind {}", kind))
        })
    }
}

/// Apply every step in order; `None` when the object is already current.
fn migrate_record(record: &ObjectRecord, steps: &[&dyn Migration]) -> Result<Option<ObjectRecord>> {
    let mut payload = record.payload.clone();
    let mut changed = false;

    for step in steps {
        let migrated = step.migrate(&payload).map_err(|reason| ControllerError::MigrationError {
            kind: step.kind().clone(),
            key: record.key.to_string(),
            reason: format!("{}: {}", step.name(), reason),
        })?;
        if let Some(migrated) = migrated {
            payload = migrated;
            changed = true;
        }
    }

    Ok(changed.then(|| ObjectRecord {
        payload,
        ..record.clone()
    }))
}
