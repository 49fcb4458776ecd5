//! Dependency-ordered execution of named phases.

use crate::error::BootstrapError;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tokio::task::{Id, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub type PhaseFuture<T> = Pin<Box<dyn Future<Output = Result<T, BootstrapError>> + Send + 'static>>;

/// Results handed to a phase, keyed by phase name.
pub type PhaseResults<T> = BTreeMap<String, T>;

type PhaseFn<T> = Box<dyn FnOnce(PhaseResults<T>) -> PhaseFuture<T> + Send>;

struct Phase<T> {
    name: String,
    depends_on: Vec<String>,
    run: PhaseFn<T>,
}

/// A set of named phases with declared dependencies.
///
/// [`TaskGraph::run`] starts every phase once all of its dependencies finished,
/// running independent phases concurrently. A phase receives the results of
/// its direct and transitive dependencies. After the first failure no further
/// phase starts; phases already running are allowed to settle, then the first
/// error is returned.
///
/// ```rust
/// use hooklift_kernel::graph::TaskGraph;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), hooklift_kernel::BootstrapError> {
/// let results = TaskGraph::new()
///     .phase("left", &[], |_| async { Ok(1_u32) })
///     .phase("right", &["left"], |deps| async move { Ok(deps["left"] + 1) })
///     .run()
///     .await?;
/// assert_eq!(results["right"], 2);
/// # Ok(())
/// # }
/// ```
pub struct TaskGraph<T> {
    phases: Vec<Phase<T>>,
}

impl<T> Default for TaskGraph<T> {
    fn default() -> Self {
        Self { phases: Vec::new() }
    }
}

impl<T> fmt::Debug for TaskGraph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for phase in &self.phases {
            map.entry(&phase.name, &phase.depends_on);
        }
        map.finish()
    }
}

impl<T: Clone + Send + 'static> TaskGraph<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase<F, Fut>(mut self, name: &str, depends_on: &[&str], run: F) -> Self
    where
        F: FnOnce(PhaseResults<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BootstrapError>> + Send + 'static,
    {
        self.phases.push(Phase {
            name: name.to_owned(),
            depends_on: depends_on.iter().map(|&dep| dep.to_owned()).collect(),
            run: Box::new(move |results| -> PhaseFuture<T> { Box::pin(run(results)) }),
        });
        self
    }

    /// Runs every phase and returns all results.
    ///
    /// # Errors
    /// * [`BootstrapError::Graph`] for a duplicate phase, an unknown dependency,
    ///   a cycle or a panicking phase.
    /// * The first error any phase returned.
    pub async fn run(self) -> Result<PhaseResults<T>, BootstrapError> {
        let nodes: Vec<(&str, Vec<&str>)> = self
            .phases
            .iter()
            .map(|p| (p.name.as_str(), p.depends_on.iter().map(String::as_str).collect()))
            .collect();
        let order = topological_order(&nodes)?;
        let inputs = transitive_inputs(&nodes, &order);

        let mut waiting: Vec<(Phase<T>, BTreeSet<String>)> =
            self.phases.into_iter().zip(inputs).collect();
        let mut results = PhaseResults::new();
        let mut running: BTreeMap<Id, String> = BTreeMap::new();
        let mut set = JoinSet::new();
        let mut failure: Option<BootstrapError> = None;

        start_ready(&mut waiting, &results, &mut set, &mut running);

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, (name, outcome))) => {
                    running.remove(&id);
                    match outcome {
                        Ok(value) => {
                            results.insert(name, value);
                        },
                        Err(err) => {
                            warn!(phase = %name, error = %err, "Phase failed");
                            failure.get_or_insert(err);
                        },
                    }
                },
                Err(err) => {
                    let name = running.remove(&err.id()).unwrap_or_default();
                    warn!(phase = %name, error = %err, "Phase aborted");
                    failure.get_or_insert_with(|| {
                        BootstrapError::graph(format!("phase `{name}` did not complete: {err}"))
                    });
                },
            }

            if failure.is_none() {
                start_ready(&mut waiting, &results, &mut set, &mut running);
            }
        }

        if let Some(err) = failure {
            if !waiting.is_empty() {
                let skipped: Vec<&str> = waiting.iter().map(|(p, _)| p.name.as_str()).collect();
                debug!(skipped = ?skipped, "Phases not started after failure");
            }
            return Err(err);
        }

        Ok(results)
    }
}

fn start_ready<T: Clone + Send + 'static>(
    waiting: &mut Vec<(Phase<T>, BTreeSet<String>)>,
    results: &PhaseResults<T>,
    set: &mut JoinSet<(String, Result<T, BootstrapError>)>,
    running: &mut BTreeMap<Id, String>,
) {
    let mut index = 0;
    while index < waiting.len() {
        if !waiting[index].0.depends_on.iter().all(|dep| results.contains_key(dep)) {
            index += 1;
            continue;
        }

        let (phase, inputs) = waiting.remove(index);
        let deps = inputs
            .iter()
            .filter_map(|name| results.get(name).map(|value| (name.clone(), value.clone())))
            .collect();
        let name = phase.name;
        let future = (phase.run)(deps);

        debug!(phase = %name, "Phase started");
        let label = name.clone();
        let handle = set.spawn(async move {
            let started = Instant::now();
            let outcome = future.await;
            if outcome.is_ok() {
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                info!(phase = %label, elapsed_ms, "Phase completed");
            }
            (label, outcome)
        });
        running.insert(handle.id(), name);
    }
}

/// Orders `nodes` so every node follows its dependencies (Kahn's algorithm).
///
/// Ties keep declaration order, so the result is deterministic.
///
/// # Errors
/// Returns [`BootstrapError::Graph`] for a duplicate name, an unknown dependency
/// or a cycle.
pub fn topological_order<'a, D>(nodes: &'a [(&'a str, D)]) -> Result<Vec<&'a str>, BootstrapError>
where
    D: AsRef<[&'a str]>,
{
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    for &(name, _) in nodes {
        if in_degree.insert(name, 0).is_some() {
            return Err(BootstrapError::graph(format!("`{name}` is declared twice")));
        }
    }

    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, deps) in nodes {
        let name = *name;
        for &dep in deps.as_ref() {
            if !in_degree.contains_key(dep) {
                return Err(BootstrapError::graph(format!("`{name}` depends on unknown `{dep}`")));
            }
            dependents.entry(dep).or_default().push(name);
            *in_degree.entry(name).or_default() += 1;
        }
    }

    let mut queue: VecDeque<&str> =
        nodes.iter().map(|(name, _)| *name).filter(|name| in_degree[name] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(name) = queue.pop_front() {
        order.push(name);
        for &dependent in dependents.get(name).into_iter().flatten() {
            let degree = in_degree.entry(dependent).or_default();
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if order.len() < nodes.len() {
        let stuck: Vec<&str> =
            nodes.iter().map(|(name, _)| *name).filter(|name| !order.contains(name)).collect();
        return Err(BootstrapError::graph(format!("dependency cycle between {}", stuck.join(", "))));
    }

    Ok(order)
}

/// For every node, in declaration order, the names of all its ancestors.
fn transitive_inputs<'a, D: AsRef<[&'a str]>>(
    nodes: &'a [(&'a str, D)],
    order: &[&str],
) -> Vec<BTreeSet<String>> {
    let declared: BTreeMap<&str, &[&str]> =
        nodes.iter().map(|(name, deps)| (*name, deps.as_ref())).collect();
    let mut ancestors: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();

    for &name in order {
        let mut set = BTreeSet::new();
        for &dep in declared.get(name).copied().unwrap_or_default() {
            set.insert(dep.to_owned());
            if let Some(inherited) = ancestors.get(dep) {
                set.extend(inherited.iter().cloned());
            }
        }
        ancestors.insert(name, set);
    }

    nodes.iter().map(|(name, _)| ancestors.remove(name).unwrap_or_default()).collect()
}
