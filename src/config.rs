// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::env;
use std::time::Duration;

use crate::constants::{env as vars, DEFAULT_DRAIN_TIMEOUT_SECS, DEFAULT_OPERATOR_NAMESPACE};
use crate::error::{ControllerError, Result};
use crate::types::schema::enmasse;
use crate::types::{ResourceKind, Schema, ScopePolicy};

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace to watch, empty meaning all namespaces
    pub namespace: String,
    /// Namespace holding operator-owned state such as the upgrade marker
    pub operator_namespace: String,
    /// Kinds observed cluster-wide regardless of `namespace`
    pub cluster_wide_kinds: Vec<ResourceKind>,
    pub drain_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let namespace = lookup(vars::NAMESPACE).unwrap_or_default().trim().to_string();

        let operator_namespace = lookup(vars::OPERATOR_NAMESPACE)
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or_else(|| {
                if namespace.is_empty() {
                    DEFAULT_OPERATOR_NAMESPACE.to_string()
                } else {
                    namespace.clone()
                }
            });

        let cluster_wide_kinds = match lookup(vars::CLUSTER_WIDE_KINDS) {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<ResourceKind>>>()?,
            None => default_cluster_wide_kinds(),
        };

        let drain_timeout = match lookup(vars::DRAIN_TIMEOUT_SECS) {
            Some(v) => v.trim().parse::<u64>().map_err(|e| {
                ControllerError::ConfigError(format!("{} must be a number of seconds: {}", vars::DRAIN_TIMEOUT_SECS, e))
            })?,
            None => DEFAULT_DRAIN_TIMEOUT_SECS,
        };

        Ok(Config {
            namespace,
            operator_namespace,
            cluster_wide_kinds,
            drain_timeout: Duration::from_secs(drain_timeout),
        })
    }

    /// Build the scope policy, rejecting cluster-wide kinds the schema does not know.
    pub fn scope_policy(&self, schema: &Schema) -> Result<ScopePolicy> {
        if let Some(unknown) = self.cluster_wide_kinds.iter().find(|k| !schema.contains(k)) {
            return Err(ControllerError::ConfigError(format!(
                "cluster-wide kind {} is not registered",
                unknown
            )));
        }
        Ok(ScopePolicy::new(
            &self.namespace,
            self.cluster_wide_kinds.iter().cloned(),
        ))
    }
}

/// Kinds whose consumers have to reason across namespaces.
fn default_cluster_wide_kinds() -> Vec<ResourceKind> {
    vec![
        enmasse::messaging_user(),
        enmasse::address_space(),
        enmasse::address(),
        enmasse::iot_project(),
    ]
}
