// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Scope-aware object cache fed by resource watches.

pub mod router;
pub mod store;
pub mod watch;

pub use router::{EventHandler, ScopeRouter};
pub use store::{NamespaceFilter, ScopedStore};
pub use watch::{BackoffConfig, ResourceWatch};
