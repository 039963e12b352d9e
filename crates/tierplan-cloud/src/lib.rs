//! tierplan provisioning boundary
//!
//! This crate sits between the planner and whatever actually creates cloud
//! resources. It lists the resources a [`ClusterPlan`](tierplan_planner::ClusterPlan)
//! declares and applies them through a [`Provisioner`] implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  tierplan CLI                    │
//! │              (tierplan plan/validate)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │ ClusterPlan
//! ┌─────────────────▼───────────────────────────────┐
//! │                tierplan-cloud                    │
//! │  ┌──────────────────┐  ┌─────────────────────┐  │
//! │  │ actions(plan)    │  │ apply(provisioner)  │  │
//! │  └──────────────────┘  └──────────┬──────────┘  │
//! └───────────────────────────────────┼─────────────┘
//!                                     │
//!                       ┌─────────────▼─────────────┐
//!                       │  trait Provisioner { .. } │
//!                       └───────────────────────────┘
//! ```

pub mod action;
pub mod apply;
pub mod error;
pub mod provider;

// Re-exports
pub use action::{Action, PlanSummary, ResourceType, actions};
pub use apply::{ActionResult, ApplyResult, apply};
pub use error::{ProvisioningError, Result};
pub use provider::{
    LoadBalancerBinding, ProvisionedDatabase, ProvisionedGroup, ProvisionedInstance, Provisioner,
};
