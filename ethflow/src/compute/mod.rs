//! Client for the distributed compute session.
//!
//! The compute engine is an opaque collaborator reached through its HTTP
//! gateway: open a session, publish rows as a named view, run a
//! pass-through query, and close the session. When the force-local flag is
//! set or no master is configured, an in-process local session answers the
//! same narrow interface so the query utility works on a developer machine
//! without a cluster.

use crate::config::ComputeConfig;
use crate::errors::EthflowError;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Deserialize)]
struct SessionCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    rows: Vec<serde_json::Value>,
}

/// A handle to one compute session, local or remote.
#[derive(Debug)]
pub enum ComputeSession {
    /// In-process session; views live in memory and queries pass rows
    /// through unchanged.
    Local {
        /// Published views by name.
        views: HashMap<String, Vec<serde_json::Value>>,
    },
    /// Session opened against the compute master's HTTP gateway.
    Remote {
        /// Blocking HTTP client.
        client: reqwest::blocking::Client,
        /// Gateway base URL.
        gateway: String,
        /// Server-assigned session identifier.
        session_id: String,
    },
}

impl ComputeSession {
    /// Opens a session according to the compute configuration.
    ///
    /// The force-local flag or a missing master URL selects the local
    /// session.
    pub fn connect(config: &ComputeConfig) -> Result<Self, EthflowError> {
        match (&config.master_url, config.force_local) {
            (Some(master), false) => {
                let gateway = gateway_url(master);
                info!(master = %master, "connecting to compute cluster");
                let client = reqwest::blocking::Client::new();
                let created: SessionCreated = client
                    .post(format!("{gateway}/sessions"))
                    .json(&serde_json::json!({
                        "app_name": config.app_name,
                        "executor_memory": config.executor_memory,
                        "executor_cores": config.executor_cores,
                    }))
                    .send()
                    .and_then(reqwest::blocking::Response::error_for_status)
                    .map_err(|err| EthflowError::compute(err.to_string()))?
                    .json()
                    .map_err(|err| EthflowError::compute(err.to_string()))?;
                Ok(Self::Remote {
                    client,
                    gateway,
                    session_id: created.id,
                })
            }
            _ => {
                info!("running compute session in local mode");
                Ok(Self::Local {
                    views: HashMap::new(),
                })
            }
        }
    }

    /// Publishes rows as the named view, replacing any previous contents.
    pub fn create_view(
        &mut self,
        name: &str,
        rows: Vec<serde_json::Value>,
    ) -> Result<(), EthflowError> {
        match self {
            Self::Local { views } => {
                views.insert(name.to_string(), rows);
                Ok(())
            }
            Self::Remote {
                client,
                gateway,
                session_id,
            } => {
                client
                    .post(format!("{gateway}/sessions/{session_id}/views"))
                    .json(&serde_json::json!({ "name": name, "rows": rows }))
                    .send()
                    .and_then(reqwest::blocking::Response::error_for_status)
                    .map_err(|err| EthflowError::compute(err.to_string()))?;
                Ok(())
            }
        }
    }

    /// Runs a SQL query in the session and returns its rows.
    ///
    /// The local session answers pass-through queries only
    /// (`SELECT * FROM <view>`).
    pub fn sql(&self, query: &str) -> Result<Vec<serde_json::Value>, EthflowError> {
        match self {
            Self::Local { views } => {
                let view = passthrough_view(query).ok_or_else(|| {
                    EthflowError::compute(format!(
                        "local session supports pass-through queries only: {query}"
                    ))
                })?;
                views.get(view).cloned().ok_or_else(|| {
                    EthflowError::compute(format!("unknown view '{view}'"))
                })
            }
            Self::Remote {
                client,
                gateway,
                session_id,
            } => {
                let response: QueryResponse = client
                    .post(format!("{gateway}/sessions/{session_id}/sql"))
                    .json(&serde_json::json!({ "query": query }))
                    .send()
                    .and_then(reqwest::blocking::Response::error_for_status)
                    .map_err(|err| EthflowError::compute(err.to_string()))?
                    .json()
                    .map_err(|err| EthflowError::compute(err.to_string()))?;
                Ok(response.rows)
            }
        }
    }

    /// Closes the session.
    ///
    /// The local session has nothing to release; the remote session is
    /// deleted on the gateway.
    pub fn stop(self) -> Result<(), EthflowError> {
        match self {
            Self::Local { .. } => Ok(()),
            Self::Remote {
                client,
                gateway,
                session_id,
            } => {
                client
                    .delete(format!("{gateway}/sessions/{session_id}"))
                    .send()
                    .and_then(reqwest::blocking::Response::error_for_status)
                    .map_err(|err| EthflowError::compute(err.to_string()))?;
                info!(session = %session_id, "stopped compute session");
                Ok(())
            }
        }
    }
}

/// Derives the HTTP gateway URL from the configured master URL.
///
/// Master URLs use the `spark://` scheme; the gateway listens on the same
/// host and port over HTTP.
fn gateway_url(master: &str) -> String {
    master
        .strip_prefix("spark://")
        .map_or_else(|| master.trim_end_matches('/').to_string(), |rest| {
            format!("http://{}", rest.trim_end_matches('/'))
        })
}

/// Extracts the view name from a `SELECT * FROM <view>` query.
fn passthrough_view(query: &str) -> Option<&str> {
    let trimmed = query.trim().trim_end_matches(';');
    let rest = trimmed.strip_prefix("SELECT")?.trim_start();
    let rest = rest.strip_prefix('*')?.trim_start();
    let rest = rest.strip_prefix("FROM")?.trim_start();
    let view = rest.split_whitespace().next()?;
    if rest.trim() == view {
        Some(view)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn local_config() -> ComputeConfig {
        ComputeConfig {
            master_url: Some("spark://localhost:7077".to_string()),
            force_local: true,
            app_name: "test".to_string(),
            executor_memory: "1g".to_string(),
            executor_cores: 1,
        }
    }

    #[test]
    fn test_force_local_overrides_master() {
        let session = ComputeSession::connect(&local_config()).unwrap();
        assert!(matches!(session, ComputeSession::Local { .. }));
    }

    #[test]
    fn test_missing_master_selects_local() {
        let config = ComputeConfig {
            master_url: None,
            force_local: false,
            ..local_config()
        };
        let session = ComputeSession::connect(&config).unwrap();
        assert!(matches!(session, ComputeSession::Local { .. }));
    }

    #[test]
    fn test_local_passthrough_query() {
        let mut session = ComputeSession::connect(&local_config()).unwrap();
        let rows = vec![serde_json::json!({ "amount": 10.0 })];
        session.create_view("metrics", rows.clone()).unwrap();

        assert_eq!(session.sql("SELECT * FROM metrics").unwrap(), rows);
        assert_eq!(session.sql("  SELECT * FROM metrics; ").unwrap(), rows);
    }

    #[test]
    fn test_local_rejects_non_passthrough() {
        let session = ComputeSession::connect(&local_config()).unwrap();
        assert!(session.sql("SELECT amount FROM metrics").is_err());
        assert!(session.sql("SELECT * FROM metrics WHERE amount > 1").is_err());
    }

    #[test]
    fn test_gateway_url_from_spark_scheme() {
        assert_eq!(
            gateway_url("spark://spark-master:7077"),
            "http://spark-master:7077"
        );
        assert_eq!(
            gateway_url("http://gateway:8998/"),
            "http://gateway:8998"
        );
    }
}
