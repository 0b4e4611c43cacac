//! Deployment and dispatch over the flow registry.
//!
//! Every operation here follows the same failure policy: discovery results
//! are processed per item, one bad flow never blocks the others, and flow
//! failures are caught at this boundary and reported as explicit outcome
//! values instead of propagating.

use crate::errors::EthflowError;
use crate::orchestrator::{DeploymentSpec, DeploymentTarget, OrchestratorClient};
use crate::orchestrator::{RemoteDeployment, RemoteFlow, RemoteFlowRun};
use crate::registry::{resolve, FlowEntry};
use tracing::{error, info};

/// Page size for the recent-runs listing.
pub const RECENT_RUNS_LIMIT: u32 = 5;

/// Per-item result of a deployment batch.
#[derive(Debug)]
pub struct DeployOutcome {
    /// Derived deployment name that was submitted.
    pub deployment_name: String,
    /// Declared name of the flow behind it.
    pub flow_name: String,
    /// Submission result; an error here never aborted the batch.
    pub result: Result<(), EthflowError>,
}

/// Result of a single dispatch request.
#[derive(Debug)]
pub enum RunOutcome {
    /// The flow ran to completion.
    Completed {
        /// Declared name of the flow that ran.
        flow: String,
    },
    /// The flow was found but its invocation failed.
    Failed {
        /// Declared name of the failing flow.
        flow: String,
        /// The caught failure.
        error: EthflowError,
    },
    /// Nothing matched the requested name.
    NotFound {
        /// The name the user asked for.
        query: String,
        /// Every alias the registry knows, for suggestions.
        known: Vec<String>,
    },
}

/// Snapshot of the orchestration server's state for the listing command.
#[derive(Debug)]
pub struct RemoteOverview {
    /// Flows known to the server.
    pub flows: Vec<RemoteFlow>,
    /// Deployments registered with the server.
    pub deployments: Vec<RemoteDeployment>,
    /// Recent execution records, newest first, at most
    /// [`RECENT_RUNS_LIMIT`].
    pub recent_runs: Vec<RemoteFlowRun>,
}

/// Builds a deployment descriptor for one registry entry.
#[must_use]
pub fn deployment_spec(entry: &FlowEntry) -> DeploymentSpec {
    DeploymentSpec {
        name: entry.deployment_name(),
        flow_name: entry.display_name.clone(),
        tags: entry.tags(),
        description: format!("Auto-deployed from {}", entry.module),
    }
}

/// Submits a deployment for every discovered entry.
///
/// Submissions are isolated per item: a failure is recorded in that item's
/// [`DeployOutcome`] and the batch continues.
pub fn deploy_all(entries: &[FlowEntry], target: &dyn DeploymentTarget) -> Vec<DeployOutcome> {
    entries
        .iter()
        .map(|entry| {
            let spec = deployment_spec(entry);
            let result = target.submit(&spec);
            match &result {
                Ok(()) => info!(deployment = %spec.name, "deployed flow"),
                Err(err) => error!(deployment = %spec.name, error = %err, "deployment failed"),
            }
            DeployOutcome {
                deployment_name: spec.name,
                flow_name: entry.display_name.clone(),
                result,
            }
        })
        .collect()
}

/// Resolves and invokes one flow synchronously on the calling thread.
///
/// Best-effort report, never crash: resolution misses and invocation
/// failures both come back as [`RunOutcome`] values.
#[must_use]
pub fn run_flow(entries: &[FlowEntry], query: &str) -> RunOutcome {
    let entry = match resolve(entries, query) {
        Ok(entry) => entry,
        Err(EthflowError::FlowNotFound { query, known }) => {
            return RunOutcome::NotFound { query, known };
        }
        Err(err) => {
            // resolve only fails with FlowNotFound; anything else is still
            // reported rather than propagated.
            return RunOutcome::NotFound {
                query: query.to_string(),
                known: vec![err.to_string()],
            };
        }
    };

    info!(
        flow = %entry.display_name,
        module = %entry.module,
        symbol = %entry.symbol,
        "running flow"
    );
    match entry.flow.run() {
        Ok(()) => RunOutcome::Completed {
            flow: entry.display_name.clone(),
        },
        Err(err) => {
            error!(flow = %entry.display_name, error = %err, "flow failed");
            RunOutcome::Failed {
                flow: entry.display_name.clone(),
                error: err,
            }
        }
    }
}

/// Reads flows, deployments, and recent runs from the orchestration server.
///
/// Read-only; the crate's only asynchronous operation.
pub async fn list_remote(client: &OrchestratorClient) -> Result<RemoteOverview, EthflowError> {
    let flows = client.read_flows().await?;
    let deployments = client.read_deployments().await?;
    let recent_runs = client.read_flow_runs(RECENT_RUNS_LIMIT).await?;
    Ok(RemoteOverview {
        flows,
        deployments,
        recent_runs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::flows::{Flow, FlowProvider};
    use crate::registry::discover;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubFlow {
        name: &'static str,
        module: &'static str,
        symbol: &'static str,
        fail: bool,
    }

    impl Flow for StubFlow {
        fn name(&self) -> &str {
            self.name
        }

        fn module(&self) -> &str {
            self.module
        }

        fn symbol(&self) -> &str {
            self.symbol
        }

        fn run(&self) -> Result<(), EthflowError> {
            if self.fail {
                Err(EthflowError::flow_execution(self.name, "task exploded"))
            } else {
                Ok(())
            }
        }
    }

    fn ok_provider(_: &Arc<Config>) -> Result<Arc<dyn Flow>, EthflowError> {
        Ok(Arc::new(StubFlow {
            name: "kaggle_data_prep",
            module: "kaggle_data_prep",
            symbol: "etl_pipeline",
            fail: false,
        }))
    }

    fn failing_flow_provider(_: &Arc<Config>) -> Result<Arc<dyn Flow>, EthflowError> {
        Ok(Arc::new(StubFlow {
            name: "broken_flow",
            module: "broken",
            symbol: "broken_pipeline",
            fail: true,
        }))
    }

    fn test_entries(providers: Vec<FlowProvider>) -> Vec<FlowEntry> {
        let vars: HashMap<&str, &str> = HashMap::new();
        let get = move |key: &str| vars.get(key).map(|v| (*v).to_string());
        let config = Arc::new(Config::resolve(
            &get,
            PathBuf::from("/tmp/ethflow-tests"),
            false,
        ));
        discover(&providers, &config)
    }

    /// Deployment target that rejects a configured deployment name.
    struct FlakyTarget {
        reject: &'static str,
        submitted: AtomicUsize,
    }

    impl DeploymentTarget for FlakyTarget {
        fn submit(&self, spec: &DeploymentSpec) -> Result<(), EthflowError> {
            self.submitted.fetch_add(1, Ordering::SeqCst);
            if spec.name.contains(self.reject) {
                Err(EthflowError::Submission {
                    deployment: spec.name.clone(),
                    message: "server said no".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_deployment_spec_derivation() {
        let entries = test_entries(vec![ok_provider]);
        let spec = deployment_spec(&entries[0]);

        assert_eq!(spec.name, "kaggle-data-prep-etl-pipeline");
        assert_eq!(spec.flow_name, "kaggle_data_prep");
        assert_eq!(spec.tags, vec!["kaggle", "data", "prep", "etl"]);
        assert_eq!(spec.description, "Auto-deployed from kaggle_data_prep");
    }

    #[test]
    fn test_deploy_all_continues_past_failures() {
        let entries = test_entries(vec![failing_flow_provider, ok_provider]);
        let target = FlakyTarget {
            reject: "broken",
            submitted: AtomicUsize::new(0),
        };

        let outcomes = deploy_all(&entries, &target);

        // Both entries were submitted despite the first one failing.
        assert_eq!(target.submitted.load(Ordering::SeqCst), 2);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());
    }

    #[test]
    fn test_run_flow_completed() {
        let entries = test_entries(vec![ok_provider]);
        match run_flow(&entries, "etl_pipeline") {
            RunOutcome::Completed { flow } => assert_eq!(flow, "kaggle_data_prep"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_run_flow_failure_is_caught() {
        let entries = test_entries(vec![failing_flow_provider]);
        match run_flow(&entries, "broken_flow") {
            RunOutcome::Failed { flow, error } => {
                assert_eq!(flow, "broken_flow");
                assert!(matches!(error, EthflowError::FlowExecution { .. }));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_run_flow_not_found_carries_suggestions() {
        let entries = test_entries(vec![ok_provider]);
        match run_flow(&entries, "no_such_flow") {
            RunOutcome::NotFound { query, known } => {
                assert_eq!(query, "no_such_flow");
                assert!(known.contains(&"kaggle_data_prep".to_string()));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    /// Spawns a one-shot HTTP listener answering the three listing
    /// endpoints with canned JSON. Returns the API root URL.
    fn spawn_stub_orchestrator() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming().take(3) {
                let mut stream = stream.unwrap();
                let head = read_request(&mut stream);
                let body = if head.starts_with("POST /api/flows/filter") {
                    r#"[{"id":"9cf2d8b6-6e5c-4f6e-9ad1-000000000001","name":"kaggle_data_prep"}]"#
                } else if head.starts_with("POST /api/deployments/filter") {
                    r#"[{"id":"9cf2d8b6-6e5c-4f6e-9ad1-000000000002","name":"kaggle-data-prep-etl-pipeline"}]"#
                } else {
                    r#"[{"id":"9cf2d8b6-6e5c-4f6e-9ad1-000000000003","name":"gentle-otter","state_name":"Completed"}]"#
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        format!("http://{addr}/api")
    }

    /// Reads one request through the end of its body; returns the head.
    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            assert!(n > 0, "connection closed mid-request");
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "connection closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }
        head
    }

    #[test]
    fn test_list_remote_reads_flows_deployments_and_runs() {
        let client = OrchestratorClient::new(spawn_stub_orchestrator());

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let overview = runtime.block_on(list_remote(&client)).unwrap();

        assert_eq!(overview.flows.len(), 1);
        assert_eq!(overview.flows[0].name, "kaggle_data_prep");
        assert_eq!(
            overview.deployments[0].name,
            "kaggle-data-prep-etl-pipeline"
        );
        assert_eq!(
            overview.recent_runs[0].state_name.as_deref(),
            Some("Completed")
        );
    }
}
