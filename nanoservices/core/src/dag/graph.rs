use std::collections::{HashMap, HashSet, VecDeque};

use crate::dag::node::TaskNode;

/// Errors that make a set of task nodes unusable as a run graph. All of
/// them are caught at build time; the executor never re-validates.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate task name: {0}")]
    DuplicateTask(String),

    #[error("task `{task}` depends on unknown task `{upstream}`")]
    UnknownUpstream { task: String, upstream: String },

    #[error("cycle detected involving tasks: {0:?}")]
    CycleDetected(Vec<String>),
}

/// A validated, acyclic run graph: nodes plus upstream/downstream adjacency.
#[derive(Debug)]
pub struct RunGraph {
    name: String,
    nodes: HashMap<String, TaskNode>,
    dependencies: HashMap<String, HashSet<String>>,
    dependents: HashMap<String, HashSet<String>>,
    /// Topological order, kept for deterministic reporting.
    order: Vec<String>,
}

impl RunGraph {
    /// Validate a node set into a run graph: names must be unique, every
    /// upstream reference must resolve, and the upstream relation must be
    /// acyclic (Kahn's algorithm).
    pub fn build(name: impl Into<String>, nodes: Vec<TaskNode>) -> Result<Self, GraphError> {
        let mut node_map: HashMap<String, TaskNode> = HashMap::new();
        for node in nodes {
            if node_map.contains_key(&node.name) {
                return Err(GraphError::DuplicateTask(node.name));
            }
            node_map.insert(node.name.clone(), node);
        }

        let mut dependencies: HashMap<String, HashSet<String>> = HashMap::new();
        let mut dependents: HashMap<String, HashSet<String>> = HashMap::new();

        for node in node_map.values() {
            for upstream in &node.upstream {
                if !node_map.contains_key(upstream) {
                    return Err(GraphError::UnknownUpstream {
                        task: node.name.clone(),
                        upstream: upstream.clone(),
                    });
                }
                dependents
                    .entry(upstream.clone())
                    .or_default()
                    .insert(node.name.clone());
            }
            dependencies.insert(node.name.clone(), node.upstream.clone());
            dependents.entry(node.name.clone()).or_default();
        }

        // Kahn's algorithm doubles as the cycle check: anything left with a
        // positive in-degree sits on a cycle.
        let mut in_degree: HashMap<String, usize> = node_map
            .keys()
            .map(|name| (name.clone(), dependencies[name].len()))
            .collect();

        let mut queue: VecDeque<String> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| name.clone())
            .collect();

        let mut order = Vec::with_capacity(node_map.len());
        while let Some(task) = queue.pop_front() {
            if let Some(children) = dependents.get(&task) {
                for child in children {
                    let deg = in_degree.get_mut(child).expect("child is a known node");
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(child.clone());
                    }
                }
            }
            order.push(task);
        }

        if order.len() != node_map.len() {
            let mut remaining: Vec<String> = in_degree
                .into_iter()
                .filter(|(_, deg)| *deg > 0)
                .map(|(name, _)| name)
                .collect();
            remaining.sort();
            return Err(GraphError::CycleDetected(remaining));
        }

        Ok(Self {
            name: name.into(),
            nodes: node_map,
            dependencies,
            dependents,
            order,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    /// Node names in a valid execution order.
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    pub fn dependencies(&self, name: &str) -> Option<&HashSet<String>> {
        self.dependencies.get(name)
    }

    pub fn dependents(&self, name: &str) -> Option<&HashSet<String>> {
        self.dependents.get(name)
    }

    /// Every node reachable downstream of `name`, excluding `name` itself.
    pub fn transitive_dependents(&self, name: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(name);

        while let Some(current) = queue.pop_front() {
            if let Some(children) = self.dependents.get(current) {
                for child in children {
                    if seen.insert(child.clone()) {
                        queue.push_back(child.as_str());
                    }
                }
            }
        }
        seen
    }
}
