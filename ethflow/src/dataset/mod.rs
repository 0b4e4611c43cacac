//! The serialized transaction-graph dataset.
//!
//! The dataset is an externally produced directed multigraph: nodes are
//! accounts carrying a 0/1 phishing flag (`isp`), edges are transfers
//! carrying an amount and a timestamp. Parallel edges between the same
//! ordered pair are expected and preserved. Loading performs no
//! transformation; shaping happens in the warehouse writer.

use crate::errors::EthflowError;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// A node of the dataset: one Ethereum account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountNode {
    /// Account address; unique within a dataset.
    pub address: String,
    /// Raw phishing flag from the source dataset, 0 or 1.
    pub isp: u8,
}

impl AccountNode {
    /// Creates a new account node.
    #[must_use]
    pub fn new(address: impl Into<String>, isp: u8) -> Self {
        Self {
            address: address.into(),
            isp,
        }
    }

    /// Whether the source dataset flags this account as phishing.
    #[must_use]
    pub fn is_phishing(&self) -> bool {
        self.isp == 1
    }
}

/// An edge of the dataset: one transfer between two accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Transfer amount.
    pub amount: f64,
    /// Transfer timestamp as seconds since the epoch.
    pub timestamp: f64,
}

impl Transfer {
    /// Creates a new transfer edge.
    #[must_use]
    pub fn new(amount: f64, timestamp: f64) -> Self {
        Self { amount, timestamp }
    }
}

/// The in-memory dataset: a directed multigraph of transfers.
pub type TransactionGraph = DiGraph<AccountNode, Transfer>;

/// Deserializes the graph dataset from a binary-encoded file.
///
/// Pure load step. An absent file fails with [`EthflowError::MissingInput`];
/// an unreadable or malformed one fails with
/// [`EthflowError::Deserialization`], both naming the path.
pub fn load_graph(path: &Path) -> Result<TransactionGraph, EthflowError> {
    if !path.exists() {
        return Err(EthflowError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|err| EthflowError::Deserialization {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let graph: TransactionGraph = bincode::deserialize_from(BufReader::new(file)).map_err(
        |err| EthflowError::Deserialization {
            path: path.to_path_buf(),
            message: err.to_string(),
        },
    )?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "loaded transaction graph"
    );
    Ok(graph)
}

/// Serializes a graph dataset to a binary-encoded file.
///
/// Counterpart of [`load_graph`], used by fixtures and local dataset
/// preparation.
pub fn save_graph(path: &Path, graph: &TransactionGraph) -> Result<(), EthflowError> {
    let file = File::create(path)?;
    bincode::serialize_into(BufWriter::new(file), graph).map_err(|err| {
        EthflowError::Deserialization {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })
}

/// The three-node dataset used across the warehouse tests: `A` is a flagged
/// account, `A -> B` has a parallel edge, `B -> C` is single.
#[cfg(test)]
pub(crate) fn sample_graph() -> TransactionGraph {
    let mut graph = TransactionGraph::new();
    let a = graph.add_node(AccountNode::new("A", 1));
    let b = graph.add_node(AccountNode::new("B", 0));
    let c = graph.add_node(AccountNode::new("C", 0));
    graph.add_edge(a, b, Transfer::new(10.0, 100.0));
    graph.add_edge(a, b, Transfer::new(20.0, 200.0));
    graph.add_edge(b, c, Transfer::new(5.0, 50.0));
    graph
}
