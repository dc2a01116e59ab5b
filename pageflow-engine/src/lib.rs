//! Pageflow engine - navigation lifecycle orchestration.
//!
//! This crate provides the orchestration core of pageflow:
//! - Navigation state with the fixed stage sequence
//! - Stage bus for ordered, awaited listener chains
//! - Run-queue serializing concurrent navigations
//! - Document reconciler (head diff, body swap, script replay)
//! - Readiness waits (DOM parsed, UI visible, resources loaded)
//! - Default router and history coordinator

#![warn(missing_docs)]

pub mod chain;
pub mod config;
pub mod engine;
pub mod history;
pub mod queue;
pub mod reconcile;
pub mod router;
pub mod state;
pub mod wait;

pub use chain::{ChainAck, Listener, StageBus, StageMap};
pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};
pub use history::Target;
pub use queue::RunQueue;
pub use reconcile::{MergeReport, Reconciler, ReplayedNode};
pub use router::{DefaultRouter, RouteFuture, Router};
pub use state::NavigationState;
pub use wait::Readiness;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::chain::{ChainAck, Listener, StageBus, StageFn, StageFuture, StageMap};
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Engine, EngineBuilder};
    pub use crate::history::Target;
    pub use crate::queue::RunQueue;
    pub use crate::reconcile::{MergeReport, Reconciler, ReplayedNode};
    pub use crate::router::{DefaultRouter, RouteFuture, Router};
    pub use crate::state::{ChainRecord, NavigationState};
    pub use crate::wait::Readiness;

    pub use pageflow_core::prelude::*;
}
