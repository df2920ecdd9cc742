// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Startup upgrade gate and the migrations it applies.

pub mod gate;
pub mod migrations;

pub use gate::{UpgradeGate, UpgradeOutcome};
pub use migrations::{default_migrations, Migration, NormalizeSpec};
