//! Pipeline definitions.
//!
//! A flow is a named, ordered sequence of tasks executed sequentially for
//! side effect. Flows identify themselves with three names: the declared
//! display name, the source module base name, and the symbol name within
//! that module; the registry matches user input against all of them.
//!
//! Flows register through compiled-in providers rather than runtime
//! reflection: a provider is a plain constructor the registry calls during
//! discovery, and a provider failure is isolated to that provider.

mod kaggle_data_prep;

pub use kaggle_data_prep::EtlPipeline;

use crate::config::Config;
use crate::errors::EthflowError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span};

/// A pipeline entry point.
///
/// The contract is deliberately narrow: a flow exposes its names and a
/// zero-argument invocation. Whatever the flow needs (configuration,
/// warehouse handles) is captured at construction time.
pub trait Flow: Send + Sync {
    /// Declared display name, distinct from the implementation identifier.
    fn name(&self) -> &str;

    /// Base name of the source module providing the flow.
    fn module(&self) -> &str;

    /// Symbol name of the flow within its module.
    fn symbol(&self) -> &str;

    /// Runs the flow synchronously on the calling thread.
    ///
    /// Tasks execute strictly in order; the first task failure aborts the
    /// remaining tasks of this run only.
    fn run(&self) -> Result<(), EthflowError>;
}

/// Constructor the registry calls during discovery.
pub type FlowProvider = fn(&Arc<Config>) -> Result<Arc<dyn Flow>, EthflowError>;

/// The compiled-in flow providers, in registration order.
#[must_use]
pub fn builtin_providers() -> &'static [FlowProvider] {
    &[kaggle_data_prep::provider]
}

/// Runs one named task under a tracing span with duration reporting.
///
/// Errors propagate unchanged so the enclosing flow aborts its remaining
/// tasks.
pub(crate) fn run_task<T>(
    name: &str,
    task: impl FnOnce() -> Result<T, EthflowError>,
) -> Result<T, EthflowError> {
    let span = info_span!("task", task = name);
    let _guard = span.enter();
    let started = Instant::now();

    match task() {
        Ok(value) => {
            info!(elapsed = ?started.elapsed(), "task completed");
            Ok(value)
        }
        Err(err) => {
            error!(error = %err, "task failed");
            Err(err)
        }
    }
}
