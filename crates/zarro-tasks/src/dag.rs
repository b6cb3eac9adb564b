//! Task DAG construction and management

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{info, instrument};

use crate::registry::TaskRegistry;
use crate::task::{TaskAction, TaskDefinition};

/// A node in the task execution DAG
#[derive(Debug, Clone)]
pub struct TaskNode {
    /// Task name
    pub name: String,
    /// The task definition
    pub definition: TaskDefinition,
    /// Tasks that must complete before this one
    pub dependencies: BTreeSet<String>,
    /// Tasks waiting on this one
    pub dependents: BTreeSet<String>,
    /// Execution wave (tasks in the same wave can run in parallel)
    pub wave: usize,
    /// Position in declaration order, dependencies first
    pub order: usize,
}

/// Directed acyclic graph of tasks to execute
#[derive(Debug, Clone)]
pub struct TaskDag {
    /// All nodes in the DAG
    nodes: BTreeMap<String, TaskNode>,
    /// Tasks grouped by execution wave (wave 0 runs first, then wave 1, etc.)
    waves: Vec<Vec<String>>,
    /// Topologically sorted task order
    sorted_order: Vec<String>,
}

impl TaskDag {
    /// Build the execution DAG for the requested tasks.
    ///
    /// Every task reachable through `depends_on` is included. Dependencies of
    /// a task run in the order they are listed unless the task is marked
    /// `parallel`; the requested tasks themselves run in the order given.
    #[instrument(skip_all, fields(requested = ?requested))]
    pub fn build(registry: &TaskRegistry, requested: &[String]) -> Result<Self, DagError> {
        let mut closure = Closure::default();
        for name in requested {
            closure.visit(registry, name, None)?;
        }

        let mut dependencies: BTreeMap<String, BTreeSet<String>> = closure
            .order
            .iter()
            .map(|name| (name.clone(), BTreeSet::new()))
            .collect();

        for name in &closure.order {
            let definition = &closure.definitions[name];
            for dep in &definition.depends_on {
                if let Some(deps) = dependencies.get_mut(name) {
                    deps.insert(dep.clone());
                }
            }
            if !definition.parallel {
                chain_in_series(&mut dependencies, &definition.depends_on);
            }
        }
        let mut top_level: Vec<String> = Vec::new();
        for name in requested {
            if !top_level.contains(name) {
                top_level.push(name.clone());
            }
        }
        chain_in_series(&mut dependencies, &top_level);

        let mut nodes: BTreeMap<String, TaskNode> = BTreeMap::new();
        for (order, name) in closure.order.iter().enumerate() {
            nodes.insert(
                name.clone(),
                TaskNode {
                    name: name.clone(),
                    definition: closure.definitions[name].clone(),
                    dependencies: dependencies.remove(name).unwrap_or_default(),
                    dependents: BTreeSet::new(),
                    wave: 0,
                    order,
                },
            );
        }

        // Build reverse dependency map (dependents)
        let all_deps: Vec<(String, BTreeSet<String>)> = nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.dependencies.clone()))
            .collect();

        for (name, deps) in &all_deps {
            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.insert(name.clone());
                }
            }
        }

        let sorted_order = Self::topological_sort(&nodes)?;
        let waves = Self::compute_waves(&nodes, &sorted_order);

        for (wave_idx, wave_tasks) in waves.iter().enumerate() {
            for name in wave_tasks {
                if let Some(node) = nodes.get_mut(name) {
                    node.wave = wave_idx;
                }
            }
        }

        info!(
            task_count = nodes.len(),
            wave_count = waves.len(),
            "task DAG built"
        );

        Ok(Self {
            nodes,
            waves,
            sorted_order,
        })
    }

    /// Topological sort using Kahn's algorithm. Ready tasks are taken in
    /// declaration order.
    #[instrument(skip_all, fields(node_count = nodes.len()))]
    fn topological_sort(nodes: &BTreeMap<String, TaskNode>) -> Result<Vec<String>, DagError> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut ready: BTreeSet<(usize, &str)> = BTreeSet::new();
        let mut sorted: Vec<String> = Vec::new();

        for (name, node) in nodes {
            let degree = node
                .dependencies
                .iter()
                .filter(|d| nodes.contains_key(*d))
                .count();
            in_degree.insert(name.as_str(), degree);
            if degree == 0 {
                ready.insert((node.order, name.as_str()));
            }
        }

        while let Some((order, name)) = ready.iter().next().copied() {
            ready.remove(&(order, name));
            sorted.push(name.to_string());

            if let Some(node) = nodes.get(name) {
                for dependent in &node.dependents {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            ready.insert((nodes[dependent].order, dependent.as_str()));
                        }
                    }
                }
            }
        }

        if sorted.len() != nodes.len() {
            let in_sorted: HashSet<_> = sorted.iter().collect();
            let cyclic: Vec<&str> = nodes
                .keys()
                .filter(|name| !in_sorted.contains(name))
                .map(String::as_str)
                .collect();
            return Err(DagError::CyclicDependency(cyclic.join(", ")));
        }

        Ok(sorted)
    }

    /// Compute execution waves (groups of tasks that can run in parallel)
    #[instrument(skip_all, fields(node_count = nodes.len()))]
    fn compute_waves(nodes: &BTreeMap<String, TaskNode>, sorted: &[String]) -> Vec<Vec<String>> {
        let mut wave_map: BTreeMap<&str, usize> = BTreeMap::new();

        for name in sorted {
            if let Some(node) = nodes.get(name) {
                let wave = node
                    .dependencies
                    .iter()
                    .filter_map(|dep| wave_map.get(dep.as_str()))
                    .max()
                    .map(|w| w + 1)
                    .unwrap_or(0);
                wave_map.insert(name.as_str(), wave);
            }
        }

        if wave_map.is_empty() {
            return Vec::new();
        }
        let max_wave = wave_map.values().max().copied().unwrap_or(0);
        let mut waves: Vec<Vec<String>> = vec![Vec::new(); max_wave + 1];

        for name in sorted {
            if let Some(&wave) = wave_map.get(name.as_str()) {
                waves[wave].push(name.clone());
            }
        }

        waves
    }

    /// Get a specific task node
    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name)
    }

    /// Get execution waves
    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    /// Get the total number of tasks
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the DAG is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get topologically sorted order
    pub fn sorted(&self) -> &[String] {
        &self.sorted_order
    }

    /// Get a human-readable summary of the execution plan
    pub fn execution_plan(&self) -> String {
        let mut plan = String::new();
        for (i, wave) in self.waves.iter().enumerate() {
            plan.push_str(&format!("Wave {} ({} tasks):\n", i, wave.len()));
            for name in wave {
                if let Some(node) = self.nodes.get(name) {
                    let action = match &node.definition.action {
                        TaskAction::None => "<dependencies only>".to_string(),
                        TaskAction::Shell(lines) => lines.join(" && "),
                        TaskAction::Commands(_) => format!("<{}>", node.definition.source),
                    };
                    if node.dependencies.is_empty() {
                        plan.push_str(&format!("  {} -> {}\n", name, action));
                    } else {
                        let deps: Vec<&str> =
                            node.dependencies.iter().map(String::as_str).collect();
                        plan.push_str(&format!(
                            "  {} -> {} (after: {})\n",
                            name,
                            action,
                            deps.join(", ")
                        ));
                    }
                }
            }
        }
        plan
    }
}

/// Depth-first walk collecting every task needed by the request
#[derive(Default)]
struct Closure {
    order: Vec<String>,
    definitions: BTreeMap<String, TaskDefinition>,
    visiting: Vec<String>,
}

impl Closure {
    fn visit(
        &mut self,
        registry: &TaskRegistry,
        name: &str,
        required_by: Option<&str>,
    ) -> Result<(), DagError> {
        if self.definitions.contains_key(name) {
            return Ok(());
        }
        if let Some(start) = self.visiting.iter().position(|n| n == name) {
            let mut cycle = self.visiting[start..].to_vec();
            cycle.push(name.to_string());
            return Err(DagError::CyclicDependency(cycle.join(" -> ")));
        }

        let definition = registry.get(name).ok_or_else(|| DagError::TaskNotFound {
            name: name.to_string(),
            required_by: required_by.map(str::to_string),
        })?;

        self.visiting.push(name.to_string());
        for dep in &definition.depends_on {
            self.visit(registry, dep, Some(name))?;
        }
        self.visiting.pop();

        self.order.push(name.to_string());
        self.definitions.insert(name.to_string(), definition.clone());
        Ok(())
    }
}

/// Make each entry of `names` wait for the one before it, unless that would
/// close a cycle
fn chain_in_series(dependencies: &mut BTreeMap<String, BTreeSet<String>>, names: &[String]) {
    for pair in names.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if previous == current || waits_for(dependencies, previous, current) {
            continue;
        }
        if let Some(deps) = dependencies.get_mut(current) {
            deps.insert(previous.clone());
        }
    }
}

/// Whether `task` transitively depends on `target`
fn waits_for(dependencies: &BTreeMap<String, BTreeSet<String>>, task: &str, target: &str) -> bool {
    let mut stack = vec![task];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(deps) = dependencies.get(current) {
            for dep in deps {
                if dep == target {
                    return true;
                }
                stack.push(dep);
            }
        }
    }
    false
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(task) => format!(" (required by '{}')", task),
        None => String::new(),
    }
}

/// Errors during DAG construction
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// Cyclic dependency detected
    #[error("Cyclic dependency detected among tasks: {0}")]
    CyclicDependency(String),

    /// Task not registered
    #[error("Task '{name}' is not defined{}", required_by_suffix(.required_by))]
    TaskNotFound {
        name: String,
        required_by: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(tasks: &[(&str, &[&str], bool)]) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for (name, deps, parallel) in tasks {
            let mut definition = TaskDefinition::new(*name)
                .with_shell(format!("echo {}", name))
                .with_parallel(*parallel);
            definition.depends_on = deps.iter().map(|d| d.to_string()).collect();
            registry.register(definition);
        }
        registry
    }

    fn request(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_closure_includes_dependencies() {
        let registry = registry(&[
            ("build", &[], false),
            ("test", &["build"], false),
            ("lint", &[], false),
        ]);
        let dag = TaskDag::build(&registry, &request(&["test"])).unwrap();

        assert_eq!(dag.len(), 2);
        assert_eq!(dag.sorted(), &["build", "test"]);
        assert_eq!(dag.get("test").unwrap().wave, 1);
        assert!(dag.get("lint").is_none());
    }

    #[test]
    fn test_dependencies_run_in_listed_order() {
        let registry = registry(&[
            ("build", &[], false),
            ("test", &["build"], false),
            ("pack", &["build"], false),
            ("push", &["pack"], false),
            ("release", &["test", "pack", "push"], false),
        ]);
        let dag = TaskDag::build(&registry, &request(&["release"])).unwrap();

        assert_eq!(dag.sorted(), &["build", "test", "pack", "push", "release"]);
        assert!(dag.get("pack").unwrap().dependencies.contains("test"));
        assert_eq!(dag.waves().len(), 5);
    }

    #[test]
    fn test_parallel_dependencies_share_a_wave() {
        let registry = registry(&[
            ("lint", &[], false),
            ("test", &[], false),
            ("ci", &["lint", "test"], true),
        ]);
        let dag = TaskDag::build(&registry, &request(&["ci"])).unwrap();

        assert_eq!(dag.get("lint").unwrap().wave, 0);
        assert_eq!(dag.get("test").unwrap().wave, 0);
        assert_eq!(dag.get("ci").unwrap().wave, 1);
    }

    #[test]
    fn test_series_edge_never_creates_cycle() {
        // pack already waits for build, so build cannot also wait for pack
        let registry = registry(&[
            ("build", &[], false),
            ("pack", &["build"], false),
            ("all", &["pack", "build"], false),
        ]);
        let dag = TaskDag::build(&registry, &request(&["all"])).unwrap();
        assert_eq!(dag.sorted(), &["build", "pack", "all"]);
    }

    #[test]
    fn test_requested_tasks_run_in_order() {
        let registry = registry(&[("clean", &[], false), ("build", &[], false)]);
        let dag = TaskDag::build(&registry, &request(&["clean", "build", "clean"])).unwrap();
        assert_eq!(dag.sorted(), &["clean", "build"]);
        assert!(dag.get("build").unwrap().dependencies.contains("clean"));
    }

    #[test]
    fn test_unknown_task() {
        let registry = registry(&[("build", &[], false)]);
        let err = TaskDag::build(&registry, &request(&["deploy"])).unwrap_err();
        assert_eq!(err.to_string(), "Task 'deploy' is not defined");
    }

    #[test]
    fn test_unknown_dependency_names_requester() {
        let registry = registry(&[("docs", &["site"], false)]);
        let err = TaskDag::build(&registry, &request(&["docs"])).unwrap_err();
        assert!(matches!(
            &err,
            DagError::TaskNotFound { name, required_by: Some(by) } if name == "site" && by == "docs"
        ));
        assert!(err.to_string().contains("required by 'docs'"));
    }

    #[test]
    fn test_cycle_detected() {
        let registry = registry(&[
            ("a", &["b"], false),
            ("b", &["c"], false),
            ("c", &["a"], false),
        ]);
        let err = TaskDag::build(&registry, &request(&["a"])).unwrap_err();
        match err {
            DagError::CyclicDependency(cycle) => assert_eq!(cycle, "a -> b -> c -> a"),
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn test_execution_plan_output() {
        let registry = registry(&[("build", &[], false), ("test", &["build"], false)]);
        let dag = TaskDag::build(&registry, &request(&["test"])).unwrap();
        let plan = dag.execution_plan();

        assert!(plan.contains("Wave 0 (1 tasks):"));
        assert!(plan.contains("  build -> echo build"));
        assert!(plan.contains("  test -> echo test (after: build)"));
    }
}
