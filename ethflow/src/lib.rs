//! # Ethflow
//!
//! ETL orchestration for the Ethereum phishing graph dataset.
//!
//! Ethflow loads a serialized transaction multigraph from disk, derives two
//! flat tables from it, and persists them into an embedded file-backed
//! warehouse. Pipelines are exposed through a flow registry so the CLI can
//! discover, deploy, and run them against an external orchestration server:
//!
//! - **Configuration resolution**: environment variables with
//!   container-aware path defaults
//! - **Dataset loading**: binary-encoded directed multigraph deserialization
//! - **Warehouse writes**: atomic table replacement with bounded lock retry
//! - **Flow registry**: provider-based discovery, alias resolution, and
//!   per-item deployment and dispatch
//! - **Remote queries**: republishing warehouse samples into a distributed
//!   compute session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ethflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = Arc::new(Config::from_env());
//! ensure_directories(&config)?;
//!
//! let entries = discover(builtin_providers(), &config);
//! let outcome = run_flow(&entries, "kaggle_data_prep");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod compute;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod errors;
pub mod flows;
pub mod orchestrator;
pub mod registry;
pub mod warehouse;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::compute::ComputeSession;
    pub use crate::config::{ensure_directories, Config};
    pub use crate::dataset::{load_graph, AccountNode, TransactionGraph, Transfer};
    pub use crate::dispatch::{deploy_all, list_remote, run_flow, DeployOutcome, RunOutcome};
    pub use crate::errors::EthflowError;
    pub use crate::flows::{builtin_providers, Flow, FlowProvider};
    pub use crate::orchestrator::{DeploymentSpec, DeploymentTarget, OrchestratorClient};
    pub use crate::registry::{discover, resolve, FlowEntry};
    pub use crate::warehouse::{RetryPolicy, Warehouse};
}
