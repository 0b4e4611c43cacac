//! Republishes a warehouse sample into a distributed compute session.
//!
//! Opens the warehouse read-only, pulls a bounded sample of transaction
//! rows, publishes them as the `metrics` view, runs a pass-through query,
//! and renders the result. Both the connection and the session are
//! released on every exit path.

use anyhow::Result;
use ethflow::compute::ComputeSession;
use ethflow::config::Config;
use ethflow::warehouse::Warehouse;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const SAMPLE_LIMIT: u32 = 10;

fn main() -> Result<()> {
    let config = Config::from_env();
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("Running warehouse queries through the compute session...");

    // The read-only connection is scoped to the sample pull.
    let warehouse = Warehouse::new(&config.warehouse_path);
    let sample = warehouse.sample_transactions(SAMPLE_LIMIT)?;

    let mut session = ComputeSession::connect(&config.compute)?;
    let queried = session
        .create_view("metrics", sample)
        .and_then(|()| session.sql("SELECT * FROM metrics"));

    // Release the session before inspecting the query result so a failed
    // query still cleans up.
    if let Err(err) = session.stop() {
        warn!(error = %err, "failed to stop compute session");
    }
    let rows = queried?;

    for row in &rows {
        println!("{row}");
    }
    println!("All compute operations completed ({} rows)", rows.len());
    Ok(())
}
