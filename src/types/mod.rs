// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Core value types shared by the cache, upgrade gate and controllers.

pub mod kind;
pub mod record;
pub mod schema;

pub use kind::{ResourceKind, Scope, ScopePolicy};
pub use record::{EventKind, ObjectKey, ObjectRecord, ResourceEvent};
pub use schema::{KindInfo, Schema};
