//! The embedded analytical warehouse.
//!
//! A single file-backed store holding the staging tables. Connections are
//! scoped: acquired immediately before use and released on every exit path.
//! The store is a single-writer resource, so connection-level lock conflicts
//! are retried with a fixed attempt count and a fixed delay (no jitter, no
//! exponential back-off); exhausted retries propagate
//! [`EthflowError::LockContention`].

mod writer;

pub use writer::{ACCOUNT_TABLE, TRANSACTION_TABLE};

use crate::dataset::TransactionGraph;
use crate::errors::EthflowError;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Fixed retry budget for warehouse lock conflicts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total connection attempts, including the first.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Handle to the warehouse file.
///
/// Cheap to construct; no connection is held between operations.
#[derive(Debug, Clone)]
pub struct Warehouse {
    path: PathBuf,
    retry: RetryPolicy,
}

impl Warehouse {
    /// Creates a handle for the store at `path` with the default retry
    /// budget.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry budget.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Path of the warehouse file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Create-if-absent guard for the staging tables.
    pub fn ensure_staging_schema(&self) -> Result<(), EthflowError> {
        self.with_connection(false, |conn| writer::ensure_staging_schema(conn))
    }

    /// Replaces the account table with one row per graph node.
    ///
    /// Runs the schema guard first, then swaps the table contents inside a
    /// single transaction. Returns the post-write row count.
    pub fn write_accounts(&self, graph: &TransactionGraph) -> Result<usize, EthflowError> {
        self.with_connection(false, |conn| {
            writer::ensure_staging_schema(conn)?;
            writer::write_accounts(conn, graph)
        })
    }

    /// Replaces the transaction table with one row per distinct ordered
    /// node pair.
    ///
    /// Only the first parallel edge between a pair is captured; see
    /// [`writer::write_transactions`]. Returns the post-write row count.
    pub fn write_transactions(&self, graph: &TransactionGraph) -> Result<usize, EthflowError> {
        self.with_connection(false, |conn| {
            writer::ensure_staging_schema(conn)?;
            writer::write_transactions(conn, graph)
        })
    }

    /// Pulls a bounded sample of transaction rows over a read-only
    /// connection.
    pub fn sample_transactions(&self, limit: u32) -> Result<Vec<serde_json::Value>, EthflowError> {
        self.with_connection(true, |conn| writer::sample_transactions(conn, limit))
    }

    /// Runs `op` with a scoped connection, retrying lock conflicts.
    ///
    /// The connection is dropped on every exit path before this returns.
    /// Non-lock errors propagate immediately; lock conflicts surviving the
    /// whole budget are wrapped in [`EthflowError::LockContention`].
    pub fn with_connection<T>(
        &self,
        read_only: bool,
        op: impl Fn(&mut Connection) -> Result<T, EthflowError>,
    ) -> Result<T, EthflowError> {
        let mut attempt = 1;
        loop {
            let result = self.connect(read_only).and_then(|mut conn| op(&mut conn));
            match result {
                Err(err) if err.is_lock_conflict() => {
                    if attempt < self.retry.attempts {
                        warn!(
                            attempt,
                            budget = self.retry.attempts,
                            delay = ?self.retry.delay,
                            "warehouse lock conflict, retrying"
                        );
                        std::thread::sleep(self.retry.delay);
                        attempt += 1;
                    } else {
                        return Err(EthflowError::LockContention {
                            attempts: attempt,
                            message: err.to_string(),
                        });
                    }
                }
                other => return other,
            }
        }
    }

    fn connect(&self, read_only: bool) -> Result<Connection, EthflowError> {
        if read_only {
            Ok(Connection::open_with_flags(
                &self.path,
                OpenFlags::SQLITE_OPEN_READ_ONLY,
            )?)
        } else {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Connection::open(&self.path)?)
        }
    }
}
