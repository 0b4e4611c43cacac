//! Flow discovery and name resolution.
//!
//! The registry decouples the set of available flows from any hard-coded
//! dispatch list: providers declare flows, discovery walks the provider
//! list and builds entries fresh on every invocation, and resolution
//! matches user-supplied names against every alias an entry answers to.
//! Nothing here is persisted; an entry's lifetime is one CLI invocation.

use crate::config::Config;
use crate::errors::EthflowError;
use crate::flows::{Flow, FlowProvider};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// One discovered flow.
#[derive(Clone)]
pub struct FlowEntry {
    /// Declared display name.
    pub display_name: String,
    /// Base name of the providing module.
    pub module: String,
    /// Symbol name within the module.
    pub symbol: String,
    /// The flow itself.
    pub flow: Arc<dyn Flow>,
}

impl FlowEntry {
    /// Derived deployment name: module and symbol joined with a hyphen,
    /// underscores normalized to hyphens.
    #[must_use]
    pub fn deployment_name(&self) -> String {
        format!("{}-{}", self.module, self.symbol).replace('_', "-")
    }

    /// Derived deployment tags: the module's underscore-separated
    /// components plus the leading component of the symbol.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.module.split('_').map(str::to_string).collect();
        if let Some(first) = self.symbol.split('_').next() {
            tags.push(first.to_string());
        }
        tags
    }

    /// Every name this entry answers to, for not-found suggestions.
    ///
    /// Covers the same set [`resolve`] matches: declared name, symbol,
    /// module, and both compound spellings.
    #[must_use]
    pub fn aliases(&self) -> Vec<String> {
        vec![
            self.display_name.clone(),
            self.symbol.clone(),
            self.module.clone(),
            format!("{}_{}", self.module, self.symbol),
            self.deployment_name(),
        ]
    }
}

impl std::fmt::Debug for FlowEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEntry")
            .field("display_name", &self.display_name)
            .field("module", &self.module)
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

/// Builds the registry by walking `providers` in order.
///
/// Discovery is max-effort: a provider that fails to construct its flow is
/// logged and skipped without aborting the rest, and a `(module, symbol)`
/// pair that is already registered is skipped rather than registered twice
/// under names it cannot resolve unambiguously. Ordering follows the
/// provider list; callers requiring a different determinism must sort the
/// result explicitly.
#[must_use]
pub fn discover(providers: &[FlowProvider], config: &Arc<Config>) -> Vec<FlowEntry> {
    let mut entries = Vec::new();
    let mut registered: HashSet<(String, String)> = HashSet::new();

    for provider in providers {
        let flow = match provider(config) {
            Ok(flow) => flow,
            Err(err) => {
                warn!(error = %err, "flow provider failed, skipping");
                continue;
            }
        };

        let key = (flow.module().to_string(), flow.symbol().to_string());
        if !registered.insert(key) {
            warn!(
                module = flow.module(),
                symbol = flow.symbol(),
                "flow already registered, skipping duplicate"
            );
            continue;
        }

        debug!(
            name = flow.name(),
            module = flow.module(),
            symbol = flow.symbol(),
            "found flow"
        );
        entries.push(FlowEntry {
            display_name: flow.name().to_string(),
            module: flow.module().to_string(),
            symbol: flow.symbol().to_string(),
            flow,
        });
    }
    entries
}

/// Resolves a user-supplied name to a discovered entry.
///
/// Matches are case-sensitive and tried per entry in this order: declared
/// name, symbol name, module name, hyphenated `module-symbol` compound,
/// underscored compound, the query with hyphens swapped to underscores
/// against the symbol, and the query with underscores swapped to hyphens
/// against the declared name. The first matching entry wins.
///
/// No match fails with [`EthflowError::FlowNotFound`] carrying every known
/// alias so the caller can print suggestions.
pub fn resolve<'a>(entries: &'a [FlowEntry], query: &str) -> Result<&'a FlowEntry, EthflowError> {
    for entry in entries {
        let deployment_name = entry.deployment_name();
        let compound = format!("{}_{}", entry.module, entry.symbol);

        if query == entry.display_name
            || query == entry.symbol
            || query == entry.module
            || query == deployment_name
            || query == compound
            || query.replace('-', "_") == entry.symbol
            || query.replace('_', "-") == entry.display_name
        {
            return Ok(entry);
        }
    }

    Err(EthflowError::FlowNotFound {
        query: query.to_string(),
        known: entries.iter().flat_map(FlowEntry::aliases).collect(),
    })
}
