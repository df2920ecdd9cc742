// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Environment variables read by the operator
pub mod env {
    /// Namespace to watch, empty for all namespaces
    pub const NAMESPACE: &str = "NAMESPACE";
    /// Namespace the operator itself lives in (holds the upgrade marker)
    pub const OPERATOR_NAMESPACE: &str = "OPERATOR_NAMESPACE";
    /// Comma-separated `group/version/Kind` list always watched cluster-wide
    pub const CLUSTER_WIDE_KINDS: &str = "CLUSTER_WIDE_KINDS";
    /// Upper bound on waiting for in-flight reconciliations at shutdown
    pub const DRAIN_TIMEOUT_SECS: &str = "DRAIN_TIMEOUT_SECS";
}

/// The operator name used as field manager and in log output
pub const OPERATOR_NAME: &str = "enmasse-controller-manager";

pub const DEFAULT_OPERATOR_NAMESPACE: &str = "enmasse-infra";

pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

/// Upgrade marker configuration
pub mod upgrade {
    /// Name of the ConfigMap recording a completed upgrade
    pub const MARKER_NAME: &str = "enmasse-controller-manager-upgrade";
    /// ConfigMap key holding the version that performed the upgrade
    pub const MARKER_VERSION_KEY: &str = "version";
    /// Annotation carried by objects written by older releases
    pub const LEGACY_SCHEMA_ANNOTATION: &str = "enmasse.io/legacy-schema";
}

/// Watch reconnection configuration
pub mod watch {
    /// Initial backoff in milliseconds after a failed watch
    pub const BACKOFF_INITIAL_MS: u64 = 500;
    /// Maximum backoff in milliseconds (exponential backoff cap)
    pub const BACKOFF_MAX_MS: u64 = 30_000;
    /// Server-side watch timeout, below the client read timeout of 30s
    pub const TIMEOUT_SECS: u32 = 25;
}

/// Object cache configuration
pub mod cache {
    /// Deletions remembered per store between full listings
    pub const MAX_TOMBSTONES: usize = 1024;
}
