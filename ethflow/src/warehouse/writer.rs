//! Table shaping and replacement for the staging tables.
//!
//! SQLite has no schema namespaces, so the staging namespace of the
//! warehouse is rendered as quoted dotted identifiers; the store stays a
//! single file and downstream readers address the tables by the same
//! qualified names.

use crate::dataset::TransactionGraph;
use crate::errors::EthflowError;
use chrono::Utc;
use petgraph::visit::EdgeRef;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use tracing::info;

/// Qualified identifier of the account master table.
pub const ACCOUNT_TABLE: &str = "\"staging.mst_eth_account\"";

/// Qualified identifier of the transaction table.
pub const TRANSACTION_TABLE: &str = "\"staging.eth_transaction\"";

/// Creates the staging tables if they are absent.
pub(crate) fn ensure_staging_schema(conn: &Connection) -> Result<(), EthflowError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {ACCOUNT_TABLE} (\
             account_id TEXT NOT NULL,\
             is_phishing INTEGER NOT NULL,\
             data_ts TEXT NOT NULL\
         );\
         CREATE TABLE IF NOT EXISTS {TRANSACTION_TABLE} (\
             from_account TEXT NOT NULL,\
             to_account TEXT NOT NULL,\
             amount REAL NOT NULL,\
             transaction_ts REAL NOT NULL,\
             data_ts TEXT NOT NULL\
         );"
    ))?;
    Ok(())
}

/// Replaces the account table: one row per graph node, projected to
/// `(account_id, is_phishing, data_ts)`.
///
/// The drop, create, and inserts share one transaction so readers observe
/// either the old contents or the new, never a mix.
pub(crate) fn write_accounts(
    conn: &mut Connection,
    graph: &TransactionGraph,
) -> Result<usize, EthflowError> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {ACCOUNT_TABLE};\
         CREATE TABLE {ACCOUNT_TABLE} (\
             account_id TEXT NOT NULL,\
             is_phishing INTEGER NOT NULL,\
             data_ts TEXT NOT NULL\
         );"
    ))?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {ACCOUNT_TABLE} (account_id, is_phishing, data_ts) VALUES (?1, ?2, ?3)"
        ))?;
        for node in graph.node_weights() {
            stmt.execute(params![node.address, node.is_phishing(), now])?;
        }
    }
    let count = table_count(&tx, ACCOUNT_TABLE)?;
    tx.commit()?;

    info!(rows = count, table = "staging.mst_eth_account", "replaced account table");
    Ok(count)
}

/// Replaces the transaction table: one row per distinct ordered node pair
/// with at least one edge, projected to
/// `(from_account, to_account, amount, transaction_ts, data_ts)`.
///
/// Only the first parallel edge between a pair is captured; further edges
/// between the same pair are dropped. This fidelity loss is inherited from
/// the source pipeline and covered by a test.
pub(crate) fn write_transactions(
    conn: &mut Connection,
    graph: &TransactionGraph,
) -> Result<usize, EthflowError> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {TRANSACTION_TABLE};\
         CREATE TABLE {TRANSACTION_TABLE} (\
             from_account TEXT NOT NULL,\
             to_account TEXT NOT NULL,\
             amount REAL NOT NULL,\
             transaction_ts REAL NOT NULL,\
             data_ts TEXT NOT NULL\
         );"
    ))?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {TRANSACTION_TABLE} \
             (from_account, to_account, amount, transaction_ts, data_ts) \
             VALUES (?1, ?2, ?3, ?4, ?5)"
        ))?;
        let mut seen = HashSet::new();
        for edge in graph.edge_references() {
            if seen.insert((edge.source(), edge.target())) {
                let transfer = edge.weight();
                stmt.execute(params![
                    graph[edge.source()].address,
                    graph[edge.target()].address,
                    transfer.amount,
                    transfer.timestamp,
                    now,
                ])?;
            }
        }
    }
    let count = table_count(&tx, TRANSACTION_TABLE)?;
    tx.commit()?;

    info!(rows = count, table = "staging.eth_transaction", "replaced transaction table");
    Ok(count)
}

/// Pulls up to `limit` transaction rows as JSON objects for republication
/// into a compute session.
pub(crate) fn sample_transactions(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<serde_json::Value>, EthflowError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT from_account, to_account, amount, transaction_ts, data_ts \
         FROM {TRANSACTION_TABLE} LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(serde_json::json!({
                "from_account": row.get::<_, String>(0)?,
                "to_account": row.get::<_, String>(1)?,
                "amount": row.get::<_, f64>(2)?,
                "transaction_ts": row.get::<_, f64>(3)?,
                "data_ts": row.get::<_, String>(4)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn table_count(conn: &Connection, table: &str) -> Result<usize, EthflowError> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(count).unwrap_or(0))
}
