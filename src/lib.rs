//! `agentsync` — declarative reconciliation engine for agent-platform
//! tenants described by layered Git manifests.
//!
//! Pipeline: [`loader`] reads base/org/project manifest layers, [`merge`]
//! resolves them into one desired state, [`diff`] compares desired state
//! against the live remote tenant, [`reconcile`] turns diff output into a
//! plan, and [`apply`] executes it. [`upgrade`] and [`batch`] layer
//! role-based agent upgrades on top of the same `agentsync_api::ApiClient`
//! boundary.

pub mod apply;
pub mod batch;
pub mod config;
pub mod diff;
pub mod error;
pub mod loader;
pub mod merge;
pub mod metadata;
pub mod model;
pub mod reconcile;
pub mod tag;
pub mod telemetry;
pub mod upgrade;
