// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Registry of the resource kinds this operator knows how to watch.

use std::collections::BTreeMap;

use kube::api::ApiResource;

use crate::error::{ControllerError, Result};
use crate::types::ResourceKind;

/// API details needed to talk to the cluster about a kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindInfo {
    pub kind: ResourceKind,
    pub plural: String,
    pub namespaced: bool,
}

impl KindInfo {
    pub fn namespaced(group: &str, version: &str, kind: &str, plural: &str) -> Self {
        Self {
            kind: ResourceKind::new(group, version, kind),
            plural: plural.to_string(),
            namespaced: true,
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(&self.kind.gvk(), &self.plural)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Schema {
    kinds: BTreeMap<ResourceKind, KindInfo>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind; registering the same kind twice is a conflict.
    pub fn register(&mut self, info: KindInfo) -> Result<()> {
        if self.kinds.contains_key(&info.kind) {
            return Err(ControllerError::SchemaError(format!(
                "{} is already registered",
                info.kind
            )));
        }
        if info.plural.is_empty() {
            return Err(ControllerError::SchemaError(format!(
                "{} has no plural name",
                info.kind
            )));
        }
        self.kinds.insert(info.kind.clone(), info);
        Ok(())
    }

    pub fn get(&self, kind: &ResourceKind) -> Option<&KindInfo> {
        self.kinds.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &ResourceKind> {
        self.kinds.keys()
    }

    pub fn contains(&self, kind: &ResourceKind) -> bool {
        self.kinds.contains_key(kind)
    }
}

pub mod enmasse {
    use super::*;

    pub fn messaging_user() -> ResourceKind {
        ResourceKind::new("user.enmasse.io", "v1beta1", "MessagingUser")
    }

    pub fn address_space() -> ResourceKind {
        ResourceKind::new("enmasse.io", "v1beta1", "AddressSpace")
    }

    pub fn address() -> ResourceKind {
        ResourceKind::new("enmasse.io", "v1beta1", "Address")
    }

    pub fn iot_project() -> ResourceKind {
        ResourceKind::new("iot.enmasse.io", "v1alpha1", "IoTProject")
    }

    /// Register the EnMasse custom resources.
    pub fn add_to_schema(schema: &mut Schema) -> Result<()> {
        schema.register(KindInfo::namespaced(
            "user.enmasse.io",
            "v1beta1",
            "MessagingUser",
            "messagingusers",
        ))?;
        schema.register(KindInfo::namespaced(
            "enmasse.io",
            "v1beta1",
            "AddressSpace",
            "addressspaces",
        ))?;
        schema.register(KindInfo::namespaced(
            "enmasse.io",
            "v1beta1",
            "Address",
            "addresses",
        ))?;
        schema.register(KindInfo::namespaced(
            "iot.enmasse.io",
            "v1alpha1",
            "IoTProject",
            "iotprojects",
        ))?;
        Ok(())
    }
}
