// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Controller registration and the run loop.

pub mod audit;
pub mod manager;
pub mod observer;
pub mod registry;

pub use audit::AuditController;
pub use manager::Manager;
pub use observer::{ErrorObserver, LogObserver};
pub use registry::{Action, Controller};
