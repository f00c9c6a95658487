//! Capability Registry
//!
//! Flat, static table from `(action group, api path)` to an [`Operation`].
//! Built once at startup and never mutated.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use ops_core::{Error, Result};

use crate::operation::{ActionGroup, Category, Operation};
use crate::params::ParamSpec;

/// Static definition binding an API path to its parameter contract
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegistryEntry {
    pub operation: Operation,
    pub action_group: ActionGroup,
    pub api_path: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub params: &'static [ParamSpec],
}

impl From<Operation> for RegistryEntry {
    fn from(operation: Operation) -> Self {
        Self {
            operation,
            action_group: operation.action_group(),
            api_path: operation.api_path(),
            name: operation.tool_name(),
            description: operation.description(),
            category: operation.category(),
            params: operation.params(),
        }
    }
}

/// Exact-match lookup table over every [`Operation`]
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    entries: HashMap<ActionGroup, HashMap<&'static str, RegistryEntry>>,
}

impl CapabilityRegistry {
    /// Registry holding the full operation catalog
    pub fn new() -> Self {
        let mut entries: HashMap<ActionGroup, HashMap<&'static str, RegistryEntry>> = HashMap::new();
        for entry in Operation::ALL.into_iter().map(RegistryEntry::from) {
            entries
                .entry(entry.action_group)
                .or_default()
                .insert(entry.api_path, entry);
        }
        let registry = Self { entries };
        debug!("Capability registry built with {} entries", registry.len());
        registry
    }

    /// Resolve an action group and path. No prefix or fuzzy matching.
    pub fn resolve(&self, action_group: &str, api_path: &str) -> Result<&RegistryEntry> {
        let group: ActionGroup = action_group.parse().map_err(|_| Error::UnknownActionGroup {
            action_group: action_group.to_string(),
            api_path: api_path.to_string(),
        })?;

        self.entries
            .get(&group)
            .and_then(|paths| paths.get(api_path))
            .ok_or_else(|| Error::unknown_operation(action_group, api_path))
    }

    pub fn get(&self, operation: Operation) -> Option<&RegistryEntry> {
        self.entries
            .get(&operation.action_group())
            .and_then(|paths| paths.get(operation.api_path()))
    }

    /// All entries in catalog order
    pub fn list(&self) -> Vec<&RegistryEntry> {
        Operation::ALL
            .iter()
            .filter_map(|op| self.get(*op))
            .collect()
    }

    /// Entries grouped by category, in catalog order within each group
    pub fn by_category(&self) -> Vec<(Category, Vec<&RegistryEntry>)> {
        Category::ALL
            .into_iter()
            .map(|category| {
                let entries = self
                    .list()
                    .into_iter()
                    .filter(|e| e.category == category)
                    .collect();
                (category, entries)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_operation_resolves() {
        let registry = CapabilityRegistry::new();
        assert_eq!(registry.len(), Operation::ALL.len());
        for op in Operation::ALL {
            let entry = registry
                .resolve(op.action_group().as_str(), op.api_path())
                .unwrap();
            assert_eq!(entry.operation, op);
        }
    }

    #[test]
    fn test_unknown_path_in_known_group() {
        let registry = CapabilityRegistry::new();
        let err = registry
            .resolve("kubernetes-operations", "/kubectl/exec")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownOperation { ref api_path, .. } if api_path == "/kubectl/exec"));
    }

    #[test]
    fn test_path_from_other_group_does_not_match() {
        let registry = CapabilityRegistry::new();
        assert!(registry
            .resolve("aws-operations", "/kubectl/pod-health")
            .is_err());
    }

    #[test]
    fn test_no_prefix_matching() {
        let registry = CapabilityRegistry::new();
        assert!(registry.resolve("aws-operations", "/tools/list/").is_err());
        assert!(registry.resolve("aws-operations", "/tools").is_err());
    }

    #[test]
    fn test_unknown_group() {
        let registry = CapabilityRegistry::new();
        let err = registry.resolve("db-operations", "/tools/list").unwrap_err();
        assert!(matches!(err, Error::UnknownActionGroup { ref api_path, .. } if api_path == "/tools/list"));
        assert!(err.to_string().contains("db-operations"));
        assert!(err.to_string().contains("/tools/list"));
    }

    #[test]
    fn test_resolve_accepts_borrowed_path() {
        let registry = CapabilityRegistry::new();
        let path = String::from("/kubectl/pod-health");
        let entry = registry.resolve("kubernetes-operations", &path).unwrap();
        assert_eq!(entry.operation, Operation::PodHealth);
    }

    #[test]
    fn test_by_category_covers_catalog() {
        let registry = CapabilityRegistry::new();
        let total: usize = registry.by_category().iter().map(|(_, e)| e.len()).sum();
        assert_eq!(total, registry.len());
    }
}
