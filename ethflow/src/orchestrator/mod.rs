//! Client for the external workflow-orchestration server.
//!
//! The server is an opaque collaborator: it schedules and tracks pipeline
//! runs and exposes a REST API. Deployment submission is synchronous; the
//! remote-listing reads are the crate's only asynchronous calls. No timeout
//! is applied, so a hung server blocks the caller.

use crate::errors::EthflowError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A deployment descriptor derived from a discovered flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentSpec {
    /// Derived deployment name (`module-symbol`, hyphenated).
    pub name: String,
    /// Declared name of the flow being deployed.
    pub flow_name: String,
    /// Derived tags: split components of the module and symbol names.
    pub tags: Vec<String>,
    /// Human-readable provenance note.
    pub description: String,
}

/// A flow known to the orchestration server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFlow {
    /// Server-assigned identifier.
    pub id: Uuid,
    /// Flow name.
    pub name: String,
}

/// A deployment registered with the orchestration server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDeployment {
    /// Server-assigned identifier.
    pub id: Uuid,
    /// Deployment name.
    pub name: String,
}

/// One execution record from the orchestration server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFlowRun {
    /// Server-assigned identifier.
    pub id: Uuid,
    /// Run name.
    pub name: String,
    /// Name of the run's terminal or current state.
    pub state_name: Option<String>,
}

/// Anything deployments can be submitted to.
///
/// Seam for dispatch tests; [`OrchestratorClient`] is the production
/// implementation.
pub trait DeploymentTarget {
    /// Submits one deployment descriptor.
    fn submit(&self, spec: &DeploymentSpec) -> Result<(), EthflowError>;
}

/// REST client over the configured orchestrator API URL.
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    api_url: String,
    blocking: reqwest::blocking::Client,
    client: reqwest::Client,
}

impl OrchestratorClient {
    /// Creates a client for the API rooted at `api_url`.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            blocking: reqwest::blocking::Client::new(),
            client: reqwest::Client::new(),
        }
    }

    /// The API root this client talks to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Reads all flows known to the server.
    pub async fn read_flows(&self) -> Result<Vec<RemoteFlow>, EthflowError> {
        let flows = self
            .client
            .post(format!("{}/flows/filter", self.api_url))
            .json(&serde_json::json!({}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(flows)
    }

    /// Reads all deployments registered with the server.
    pub async fn read_deployments(&self) -> Result<Vec<RemoteDeployment>, EthflowError> {
        let deployments = self
            .client
            .post(format!("{}/deployments/filter", self.api_url))
            .json(&serde_json::json!({}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(deployments)
    }

    /// Reads a bounded page of recent execution records.
    pub async fn read_flow_runs(&self, limit: u32) -> Result<Vec<RemoteFlowRun>, EthflowError> {
        let runs = self
            .client
            .post(format!("{}/flow_runs/filter", self.api_url))
            .json(&serde_json::json!({ "limit": limit }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(runs)
    }
}

impl DeploymentTarget for OrchestratorClient {
    fn submit(&self, spec: &DeploymentSpec) -> Result<(), EthflowError> {
        self.blocking
            .post(format!("{}/deployments/", self.api_url))
            .json(spec)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| EthflowError::Submission {
                deployment: spec.name.clone(),
                message: err.to_string(),
            })?;
        Ok(())
    }
}
