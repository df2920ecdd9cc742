// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster API access: the trait the core depends on and its kube-rs implementation.

pub mod api;
pub mod client;

pub use api::{ClusterApi, WatchEvent};
pub use client::KubeClusterApi;
