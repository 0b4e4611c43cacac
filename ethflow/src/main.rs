//! CLI for managing flows and deployments.
//!
//! Discovers every registered flow and exposes it without a hard-coded
//! dispatch list:
//!
//! ```text
//! ethflow deploy-all     Deploy all flows (auto-discovered)
//! ethflow list           List flows and deployments
//! ethflow run <flow>     Run a specific flow
//! ```

use anyhow::Result;
use ethflow::config::{ensure_directories, Config};
use ethflow::dispatch::{self, DeployOutcome, RunOutcome};
use ethflow::flows::builtin_providers;
use ethflow::orchestrator::OrchestratorClient;
use ethflow::registry::{discover, FlowEntry};
use std::env;
use std::sync::Arc;

const USAGE: &str = "\
ethflow - ETL orchestration for the Ethereum phishing graph dataset

Usage:
    ethflow deploy-all     Deploy all flows (auto-discovered)
    ethflow list           List flows, deployments, and recent runs
    ethflow run <flow>     Run a specific flow by name

Flows are matched by declared name, symbol name, module name, or the
hyphenated deployment name; underscores and hyphens are interchangeable.";

fn main() -> Result<()> {
    let config = Arc::new(Config::from_env());
    init_tracing(&config);
    ensure_directories(&config)?;

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("deploy-all") => deploy_all(&config),
        Some("list") => list(&config),
        Some("run") => match args.get(2) {
            Some(name) => {
                run(&config, name);
                Ok(())
            }
            None => {
                println!("{USAGE}");
                Ok(())
            }
        },
        _ => {
            println!("{USAGE}");
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn discovered(config: &Arc<Config>) -> Vec<FlowEntry> {
    let entries = discover(builtin_providers(), config);
    for entry in &entries {
        println!(
            "  Found flow: {} ({}.{})",
            entry.display_name, entry.module, entry.symbol
        );
    }
    entries
}

fn deploy_all(config: &Arc<Config>) -> Result<()> {
    let entries = discovered(config);
    if entries.is_empty() {
        println!("No flows registered");
        return Ok(());
    }
    println!("Found {} flow(s) to deploy...", entries.len());

    let client = OrchestratorClient::new(&config.orchestrator_api_url);
    let outcomes = dispatch::deploy_all(&entries, &client);
    for DeployOutcome {
        deployment_name,
        flow_name,
        result,
    } in &outcomes
    {
        match result {
            Ok(()) => println!("Deployed: {deployment_name} ({flow_name})"),
            Err(err) => println!("Failed to deploy {deployment_name}: {err}"),
        }
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed == 0 {
        println!("All flows deployed");
    } else {
        println!("{failed} deployment(s) failed, see above");
    }
    Ok(())
}

fn list(config: &Arc<Config>) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_api_url);
    let runtime = tokio::runtime::Runtime::new()?;
    let overview = runtime.block_on(dispatch::list_remote(&client))?;

    println!("FLOWS ({} total):", overview.flows.len());
    for flow in &overview.flows {
        println!("  - {}", flow.name);
    }

    println!("\nDEPLOYMENTS ({} total):", overview.deployments.len());
    for deployment in &overview.deployments {
        println!("  - {}", deployment.name);
    }

    if !overview.recent_runs.is_empty() {
        println!("\nRECENT RUNS:");
        for run in &overview.recent_runs {
            let state = run.state_name.as_deref().unwrap_or("unknown");
            println!("  - {} ({state})", run.name);
        }
    }
    Ok(())
}

fn run(config: &Arc<Config>, name: &str) {
    let entries = discovered(config);
    match dispatch::run_flow(&entries, name) {
        RunOutcome::Completed { flow } => {
            println!("Flow '{flow}' completed successfully");
        }
        RunOutcome::Failed { flow, error } => {
            // Flow failure is reported but does not change the process
            // exit code.
            println!("Flow '{flow}' failed: {error}");
        }
        RunOutcome::NotFound { query, known } => {
            println!("Flow '{query}' not found. Available flows:");
            for alias in known {
                println!("  - {alias}");
            }
        }
    }
}
