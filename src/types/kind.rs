// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource kinds, scopes and the static scope policy.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use kube::core::GroupVersionKind;

use crate::error::ControllerError;

/// A resource type identified by group, version and kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl ResourceKind {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(&self.group, &self.version, &self.kind)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.kind)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

/// Parses `group/version/Kind`, or `version/Kind` for the core group.
impl FromStr for ResourceKind {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        let kind = match parts.as_slice() {
            [group, version, kind] => ResourceKind::new(group, version, kind),
            [version, kind] => ResourceKind::new("", version, kind),
            _ => {
                return Err(ControllerError::ConfigError(format!(
                    "Invalid resource kind '{}', expected group/version/Kind",
                    s
                )))
            }
        };

        if kind.version.is_empty() || kind.kind.is_empty() {
            return Err(ControllerError::ConfigError(format!(
                "Invalid resource kind '{}', version and kind must not be empty",
                s
            )));
        }
        Ok(kind)
    }
}

/// Visibility boundary under which a kind is observed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Namespace(String),
    Cluster,
}

impl Scope {
    /// Scope derived from the operating namespace, where empty means all namespaces.
    pub fn from_namespace(namespace: &str) -> Self {
        if namespace.is_empty() {
            Scope::Cluster
        } else {
            Scope::Namespace(namespace.to_string())
        }
    }

    /// Whether an object living in `namespace` is visible under this scope.
    pub fn admits(&self, namespace: Option<&str>) -> bool {
        match self {
            Scope::Cluster => true,
            Scope::Namespace(ns) => namespace == Some(ns.as_str()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Namespace(ns) => write!(f, "namespace/{}", ns),
            Scope::Cluster => write!(f, "cluster"),
        }
    }
}

/// Kind to scope assignment, fixed once the router is built.
#[derive(Clone, Debug)]
pub struct ScopePolicy {
    default_scope: Scope,
    cluster_wide: BTreeSet<ResourceKind>,
}

impl ScopePolicy {
    pub fn new(namespace: &str, cluster_wide: impl IntoIterator<Item = ResourceKind>) -> Self {
        Self {
            default_scope: Scope::from_namespace(namespace),
            cluster_wide: cluster_wide.into_iter().collect(),
        }
    }

    pub fn scope_for(&self, kind: &ResourceKind) -> Scope {
        if self.cluster_wide.contains(kind) {
            Scope::Cluster
        } else {
            self.default_scope.clone()
        }
    }

    /// Resolve the scope of every kind in `kinds`.
    pub fn partition<'a>(
        &self,
        kinds: impl IntoIterator<Item = &'a ResourceKind>,
    ) -> BTreeMap<ResourceKind, Scope> {
        kinds
            .into_iter()
            .map(|k| (k.clone(), self.scope_for(k)))
            .collect()
    }

    pub fn cluster_wide(&self) -> impl Iterator<Item = &ResourceKind> {
        self.cluster_wide.iter()
    }
}
