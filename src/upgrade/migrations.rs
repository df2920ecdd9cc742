// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object transformations applied by the upgrade gate.

use serde_json::Value;

use crate::constants::upgrade::LEGACY_SCHEMA_ANNOTATION;
use crate::types::schema::enmasse;
use crate::types::ResourceKind;

/// A deterministic, idempotent rewrite of objects of one kind.
pub trait Migration: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> &ResourceKind;

    /// Returns the rewritten object, or `None` when it is already current.
    fn migrate(&self, object: &Value) -> Result<Option<Value>, String>;
}

/// Lower-cases and trims string fields of `spec` and strips the legacy
/// schema annotation.
pub struct NormalizeSpec {
    name: String,
    kind: ResourceKind,
    fields: Vec<&'static str>,
}

impl NormalizeSpec {
    pub fn new(kind: ResourceKind, fields: Vec<&'static str>) -> Self {
        Self {
            name: format!("normalize-{}", kind.kind.to_lowercase()),
            kind,
            fields,
        }
    }
}

impl Migration for NormalizeSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    fn migrate(&self, object: &Value) -> Result<Option<Value>, String> {
        let mut migrated = object.clone();

        if let Some(spec) = migrated.get_mut("spec") {
            let spec = spec
                .as_object_mut()
                .ok_or_else(|| "spec is not an object".to_string())?;

            for field in &self.fields {
                let Some(value) = spec.get_mut(*field) else {
                    continue;
                };
                let current = value
                    .as_str()
                    .ok_or_else(|| format!("spec.{} is not a string", field))?;
                let normalized = current.trim().to_lowercase();
                if normalized.is_empty() {
                    return Err(format!("spec.{} is empty", field));
                }
                *value = Value::String(normalized);
            }
        }

        if let Some(annotations) = migrated
            .pointer_mut("/metadata/annotations")
            .and_then(Value::as_object_mut)
        {
            annotations.remove(LEGACY_SCHEMA_ANNOTATION);
        }

        Ok((migrated != *object).then_some(migrated))
    }
}

/// Migrations shipped with this release.
pub fn default_migrations() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(NormalizeSpec::new(enmasse::address_space(), vec!["type", "plan"])),
        Box::new(NormalizeSpec::new(enmasse::address(), vec!["type", "plan"])),
    ]
}
