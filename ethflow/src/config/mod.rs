//! Centralized configuration resolved from environment variables.
//!
//! Every value follows the same precedence: explicit environment variable,
//! else an environment-appropriate computed default, else a hard-coded
//! default. Containerized runs (detected through the `RUNNING_IN_CONTAINER`
//! flag or the `/app` mount point) root their data paths at `/data`; local
//! runs root them at the project directory.
//!
//! Construction has no side effects. Directory creation is an explicit
//! [`ensure_directories`] call made once by each binary entry point.

use crate::errors::EthflowError;
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File name of the serialized graph dataset inside the dataset cache.
pub const DATASET_FILENAME: &str = "MulDiGraph.bin";

/// Resolved configuration shared by every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the process is running inside a managed container.
    pub running_in_container: bool,
    /// Project root directory; `/app` inside a container.
    pub project_root: PathBuf,
    /// Warehouse file name (`WAREHOUSE_FILENAME`).
    pub warehouse_filename: String,
    /// Warehouse database name (`WAREHOUSE_DATABASE`).
    pub warehouse_database: String,
    /// Absolute path of the warehouse file.
    pub warehouse_path: PathBuf,
    /// Raw data directory (`DATA_RAW_PATH`).
    pub data_raw_path: PathBuf,
    /// Processed data directory (`DATA_PROCESSED_PATH`).
    pub data_processed_path: PathBuf,
    /// Dataset cache directory (`KAGGLE_DATA_PATH`).
    pub dataset_cache_path: PathBuf,
    /// Orchestration server API URL (`ORCHESTRATOR_API_URL`).
    pub orchestrator_api_url: String,
    /// Orchestration server bind host (`ORCHESTRATOR_HOST`).
    pub orchestrator_host: String,
    /// Orchestration server port (`ORCHESTRATOR_PORT`).
    pub orchestrator_port: u16,
    /// Distributed compute session settings.
    pub compute: ComputeConfig,
    /// Log level filter (`LOG_LEVEL`).
    pub log_level: String,
    /// Log directory (`LOG_PATH`).
    pub log_path: PathBuf,
    /// Container network name (`DOCKER_NETWORK`).
    pub network_name: String,
}

/// Settings for the distributed compute session.
#[derive(Debug, Clone)]
pub struct ComputeConfig {
    /// Compute master URL (`SPARK_MASTER`); `None` forces local mode.
    pub master_url: Option<String>,
    /// Force-local flag (`SPARK_LOCAL`).
    pub force_local: bool,
    /// Application name reported to the master (`SPARK_APP_NAME`).
    pub app_name: String,
    /// Executor memory request (`SPARK_EXECUTOR_MEMORY`).
    pub executor_memory: String,
    /// Executor core count request (`SPARK_EXECUTOR_CORES`).
    pub executor_cores: u32,
}

impl Config {
    /// Resolves the configuration from the process environment.
    ///
    /// Unset or malformed variables fall back to their defaults; this never
    /// fails.
    #[must_use]
    pub fn from_env() -> Self {
        let running_in_container = detect_container(&env_var);
        let project_root = if running_in_container {
            PathBuf::from("/app")
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        };
        Self::resolve(&env_var, project_root, running_in_container)
    }

    /// Resolves every value from a variable lookup.
    ///
    /// Split out of [`Config::from_env`] so tests can supply variables
    /// without mutating the process environment.
    pub(crate) fn resolve(
        get: &dyn Fn(&str) -> Option<String>,
        project_root: PathBuf,
        running_in_container: bool,
    ) -> Self {
        let data_base = if running_in_container {
            PathBuf::from("/data")
        } else {
            project_root.clone()
        };

        let warehouse_filename =
            get("WAREHOUSE_FILENAME").unwrap_or_else(|| "itmx_kaggle.db".to_string());
        let warehouse_database =
            get("WAREHOUSE_DATABASE").unwrap_or_else(|| "itmx_kaggle".to_string());
        let warehouse_path = if running_in_container {
            Path::new("/data/warehouse").join(&warehouse_filename)
        } else {
            project_root.join("data").join(&warehouse_filename)
        };

        let data_raw_path = resolve_dir(
            get("DATA_RAW_PATH"),
            running_in_container,
            &project_root,
            &data_base.join("raw"),
            &project_root.join("data").join("raw"),
        );
        let data_processed_path = resolve_dir(
            get("DATA_PROCESSED_PATH"),
            running_in_container,
            &project_root,
            &data_base.join("processed"),
            &project_root.join("data").join("processed"),
        );
        let dataset_cache_path = resolve_dir(
            get("KAGGLE_DATA_PATH"),
            running_in_container,
            &project_root,
            &data_base.join("raw").join("kaggle"),
            &project_root.join("data").join("raw").join("kaggle"),
        );
        let log_path = resolve_dir(
            get("LOG_PATH"),
            running_in_container,
            &project_root,
            &data_base.join("logs"),
            &project_root.join("logs"),
        );

        Self {
            running_in_container,
            project_root,
            warehouse_filename,
            warehouse_database,
            warehouse_path,
            data_raw_path,
            data_processed_path,
            dataset_cache_path,
            orchestrator_api_url: get("ORCHESTRATOR_API_URL")
                .unwrap_or_else(|| "http://localhost:4200/api".to_string()),
            orchestrator_host: get("ORCHESTRATOR_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            orchestrator_port: get("ORCHESTRATOR_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(4200),
            compute: ComputeConfig {
                master_url: get("SPARK_MASTER"),
                force_local: get("SPARK_LOCAL")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
                app_name: get("SPARK_APP_NAME")
                    .unwrap_or_else(|| "ITMX_Kaggle_Pipeline".to_string()),
                executor_memory: get("SPARK_EXECUTOR_MEMORY").unwrap_or_else(|| "2g".to_string()),
                executor_cores: get("SPARK_EXECUTOR_CORES")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2),
            },
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_path,
            network_name: get("DOCKER_NETWORK").unwrap_or_else(|| "pipeline-network".to_string()),
        }
    }

    /// Absolute path of the serialized graph dataset file.
    #[must_use]
    pub fn dataset_path(&self) -> PathBuf {
        self.dataset_cache_path.join(DATASET_FILENAME)
    }
}

/// Resolves a directory setting, making relative values absolute against the
/// environment-appropriate root.
///
/// Containerized runs ignore relative overrides and keep the mounted
/// default so data always lands under `/data`.
fn resolve_dir(
    value: Option<String>,
    running_in_container: bool,
    project_root: &Path,
    container_default: &Path,
    local_default: &Path,
) -> PathBuf {
    match value {
        Some(v) if Path::new(&v).is_absolute() => PathBuf::from(v),
        Some(v) if !running_in_container => project_root.join(v),
        Some(_) | None => {
            if running_in_container {
                container_default.to_path_buf()
            } else {
                local_default.to_path_buf()
            }
        }
    }
}

/// Detects whether the process runs inside a managed container.
///
/// An explicit `RUNNING_IN_CONTAINER` variable wins; otherwise the presence
/// of the `/app` mount point with the working directory under it is the
/// signal.
fn detect_container(get: &dyn Fn(&str) -> Option<String>) -> bool {
    if let Some(flag) = get("RUNNING_IN_CONTAINER") {
        return flag.eq_ignore_ascii_case("true") || flag == "1";
    }
    Path::new("/app").exists()
        && env::current_dir().is_ok_and(|cwd| cwd.starts_with("/app"))
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Creates the raw, processed, dataset-cache, and log directories.
///
/// Idempotent; existing directories are left untouched. Emits a non-fatal
/// warning when the expected dataset file is absent so pipeline startup is
/// not blocked by the check alone.
pub fn ensure_directories(config: &Config) -> Result<(), EthflowError> {
    std::fs::create_dir_all(&config.data_raw_path)?;
    std::fs::create_dir_all(&config.data_processed_path)?;
    std::fs::create_dir_all(&config.dataset_cache_path)?;
    std::fs::create_dir_all(&config.log_path)?;

    let dataset = config.dataset_path();
    if !dataset.exists() {
        warn!(path = %dataset.display(), "dataset file not found; load tasks will fail until it is present");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |key| vars.get(key).map(|v| (*v).to_string())
    }

    #[test]
    fn test_defaults_local() {
        let get = lookup(HashMap::new());
        let config = Config::resolve(&get, PathBuf::from("/home/dev/ethflow"), false);

        assert_eq!(config.warehouse_filename, "itmx_kaggle.db");
        assert_eq!(
            config.warehouse_path,
            PathBuf::from("/home/dev/ethflow/data/itmx_kaggle.db")
        );
        assert_eq!(
            config.dataset_cache_path,
            PathBuf::from("/home/dev/ethflow/data/raw/kaggle")
        );
        assert_eq!(config.orchestrator_api_url, "http://localhost:4200/api");
        assert_eq!(config.orchestrator_port, 4200);
        assert_eq!(config.compute.executor_cores, 2);
        assert!(!config.compute.force_local);
    }

    #[test]
    fn test_defaults_container() {
        let get = lookup(HashMap::new());
        let config = Config::resolve(&get, PathBuf::from("/app"), true);

        assert_eq!(
            config.warehouse_path,
            PathBuf::from("/data/warehouse/itmx_kaggle.db")
        );
        assert_eq!(config.data_raw_path, PathBuf::from("/data/raw"));
        assert_eq!(
            config.dataset_cache_path,
            PathBuf::from("/data/raw/kaggle")
        );
        assert_eq!(config.log_path, PathBuf::from("/data/logs"));
    }

    #[test]
    fn test_env_variable_precedence() {
        let get = lookup(HashMap::from([
            ("WAREHOUSE_FILENAME", "test.db"),
            ("ORCHESTRATOR_PORT", "9999"),
            ("SPARK_LOCAL", "TRUE"),
            ("KAGGLE_DATA_PATH", "/mnt/datasets/kaggle"),
        ]));
        let config = Config::resolve(&get, PathBuf::from("/home/dev/ethflow"), false);

        assert_eq!(config.warehouse_filename, "test.db");
        assert_eq!(
            config.warehouse_path,
            PathBuf::from("/home/dev/ethflow/data/test.db")
        );
        assert_eq!(config.orchestrator_port, 9999);
        assert!(config.compute.force_local);
        assert_eq!(
            config.dataset_cache_path,
            PathBuf::from("/mnt/datasets/kaggle")
        );
    }

    #[test]
    fn test_relative_override_resolves_against_project_root() {
        let get = lookup(HashMap::from([("DATA_RAW_PATH", "incoming/raw")]));
        let config = Config::resolve(&get, PathBuf::from("/home/dev/ethflow"), false);
        assert_eq!(
            config.data_raw_path,
            PathBuf::from("/home/dev/ethflow/incoming/raw")
        );

        // Containerized runs keep the mounted default for relative values.
        let get = lookup(HashMap::from([("DATA_RAW_PATH", "incoming/raw")]));
        let config = Config::resolve(&get, PathBuf::from("/app"), true);
        assert_eq!(config.data_raw_path, PathBuf::from("/data/raw"));
    }

    #[test]
    fn test_malformed_numeric_falls_back() {
        let get = lookup(HashMap::from([
            ("ORCHESTRATOR_PORT", "not-a-port"),
            ("SPARK_EXECUTOR_CORES", "many"),
        ]));
        let config = Config::resolve(&get, PathBuf::from("/tmp/proj"), false);

        assert_eq!(config.orchestrator_port, 4200);
        assert_eq!(config.compute.executor_cores, 2);
    }

    #[test]
    fn test_dataset_path_under_cache() {
        let get = lookup(HashMap::new());
        let config = Config::resolve(&get, PathBuf::from("/tmp/proj"), false);
        assert_eq!(
            config.dataset_path(),
            PathBuf::from("/tmp/proj/data/raw/kaggle/MulDiGraph.bin")
        );
    }

    #[test]
    fn test_ensure_directories_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let get = lookup(HashMap::new());
        let config = Config::resolve(&get, temp.path().to_path_buf(), false);

        ensure_directories(&config).unwrap();
        ensure_directories(&config).unwrap();

        assert!(config.data_raw_path.is_dir());
        assert!(config.data_processed_path.is_dir());
        assert!(config.dataset_cache_path.is_dir());
        assert!(config.log_path.is_dir());
    }
}
