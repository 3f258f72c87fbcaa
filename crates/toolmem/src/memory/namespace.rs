//! Namespace generation
//!
//! Every stored tool invocation gets its own namespace. Generators are
//! injected into the memory so tests can pin the sequence.

use dashmap::DashMap;
use uuid::Uuid;

use crate::memory::tool::{SubtaskRef, ToolDescriptor};

/// Mints namespace identifiers for stored tool outputs
pub trait NamespaceGenerator: Send + Sync {
    /// Next namespace for an invocation of `tool` from `subtask`
    fn next_namespace(
        &self,
        memory_id: &str,
        tool: &ToolDescriptor,
        subtask: &SubtaskRef,
    ) -> String;

    /// Account for namespaces already present in a reopened store
    fn resume(&self, _memory_id: &str, _existing: &[String]) {}
}

/// Per-tool monotonic counter.
///
/// Produces `{memory_id}.{tool}.{subtask}.{n}` where `n` counts invocations
/// of that tool, starting at the seed.
#[derive(Debug)]
pub struct CounterNamespaces {
    seed: u64,
    counters: DashMap<String, u64>,
}

impl CounterNamespaces {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start every tool's counter at `seed`
    pub fn starting_at(seed: u64) -> Self {
        Self {
            seed,
            counters: DashMap::new(),
        }
    }

    fn bump(&self, tool_name: &str) -> u64 {
        let mut counter = self
            .counters
            .entry(tool_name.to_string())
            .or_insert(self.seed);
        let current = *counter;
        *counter += 1;
        current
    }

    /// Raise `tool_name`'s counter so the next value is above `used`
    fn advance_past(&self, tool_name: &str, used: u64) {
        let mut counter = self
            .counters
            .entry(tool_name.to_string())
            .or_insert(self.seed);
        *counter = (*counter).max(used.saturating_add(1));
    }
}

/// Split `{memory_id}.{tool}.{subtask}.{n}` into tool name and `n`
fn parse_counted(memory_id: &str, namespace: &str) -> Option<(String, u64)> {
    let rest = namespace.strip_prefix(memory_id)?.strip_prefix('.')?;
    let (scoped, n) = rest.rsplit_once('.')?;
    let n = n.parse().ok()?;
    let (tool, _subtask) = scoped.split_once('.')?;
    Some((tool.to_string(), n))
}

impl Default for CounterNamespaces {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceGenerator for CounterNamespaces {
    fn next_namespace(
        &self,
        memory_id: &str,
        tool: &ToolDescriptor,
        subtask: &SubtaskRef,
    ) -> String {
        let n = self.bump(&tool.name);
        format!("{memory_id}.{}.{}.{n}", tool.name, subtask.id)
    }

    fn resume(&self, memory_id: &str, existing: &[String]) {
        for (tool, n) in existing.iter().filter_map(|ns| parse_counted(memory_id, ns)) {
            self.advance_past(&tool, n);
        }
    }
}

/// Random namespaces: `{memory_id}.{tool}.{uuid}`
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidNamespaces;

impl NamespaceGenerator for UuidNamespaces {
    fn next_namespace(
        &self,
        memory_id: &str,
        tool: &ToolDescriptor,
        _subtask: &SubtaskRef,
    ) -> String {
        format!("{memory_id}.{}.{}", tool.name, Uuid::new_v4().simple())
    }
}
