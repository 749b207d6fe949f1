// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use crate::config::ConfigFile;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Tasks listed in this task's `after`.
    deps: Vec<String>,
    /// Tasks that list this one in their `after`.
    dependents: Vec<String>,
}

/// In-memory task graph keyed by task name.
///
/// Acyclicity is checked in `config::validate`; here we only keep adjacency
/// for scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<String, DagNode>,
}

impl DagGraph {
    /// Build from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::from_edges(
            cfg.tasks()
                .iter()
                .map(|(name, task)| (name.clone(), task.after.clone())),
        )
    }

    /// Build from `(task, after)` pairs. Dependencies naming unknown tasks
    /// are dropped.
    pub fn from_edges(edges: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        let mut nodes: HashMap<String, DagNode> = edges
            .into_iter()
            .map(|(name, deps)| {
                (
                    name,
                    DagNode {
                        deps,
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        let mut names: Vec<String> = nodes.keys().cloned().collect();
        names.sort();
        for name in names {
            let deps = nodes.get(&name).map(|n| n.deps.clone()).unwrap_or_default();
            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        let known: Vec<String> = nodes.keys().cloned().collect();
        for node in nodes.values_mut() {
            node.deps.retain(|d| known.contains(d));
        }

        Self { nodes }
    }

    /// All task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<&str> = self.nodes.keys().map(|s| s.as_str()).collect();
        names.sort();
        names.into_iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Task names in dependency order (every task after all of its `after`
    /// entries).
    pub fn topological_order(&self) -> Vec<String> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut index = HashMap::new();
        for name in self.tasks() {
            index.insert(name, graph.add_node(name));
        }
        for name in self.tasks() {
            for dep in self.dependencies_of(name) {
                if let (Some(&from), Some(&to)) = (index.get(dep.as_str()), index.get(name)) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(|ix| graph[ix].to_string()).collect(),
            // Validated configs have no cycles; fall back to name order.
            Err(_) => self.tasks().map(str::to_string).collect(),
        }
    }
}
