//! The Kaggle data-preparation flow.
//!
//! Schema guard, dataset load, account write, transaction write — in that
//! order, with no branching and no retries at this level (lock retries live
//! in the warehouse connection layer).

use super::{run_task, Flow};
use crate::config::Config;
use crate::dataset;
use crate::errors::EthflowError;
use crate::warehouse::Warehouse;
use std::sync::Arc;
use tracing::info;

/// ETL pipeline loading the graph dataset into the warehouse staging
/// tables.
pub struct EtlPipeline {
    config: Arc<Config>,
}

impl EtlPipeline {
    /// Creates the pipeline over the given configuration.
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn warehouse(&self) -> Warehouse {
        Warehouse::new(&self.config.warehouse_path)
    }
}

/// Registry provider for [`EtlPipeline`].
pub(super) fn provider(config: &Arc<Config>) -> Result<Arc<dyn Flow>, EthflowError> {
    Ok(Arc::new(EtlPipeline::new(Arc::clone(config))))
}

impl Flow for EtlPipeline {
    fn name(&self) -> &str {
        "kaggle_data_prep"
    }

    fn module(&self) -> &str {
        "kaggle_data_prep"
    }

    fn symbol(&self) -> &str {
        "etl_pipeline"
    }

    fn run(&self) -> Result<(), EthflowError> {
        info!(flow = self.name(), "starting ETL pipeline");
        let warehouse = self.warehouse();

        run_task("create_staging_schema", || warehouse.ensure_staging_schema())?;

        let graph = run_task("load_ethereum", || {
            dataset::load_graph(&self.config.dataset_path())
        })?;

        run_task("save_ethereum_account_into_wh", || {
            warehouse.write_accounts(&graph)
        })?;

        run_task("save_transaction_into_wh", || {
            warehouse.write_transactions(&graph)
        })?;

        info!(flow = self.name(), "pipeline completed");
        Ok(())
    }
}
