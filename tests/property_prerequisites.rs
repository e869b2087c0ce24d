mod common;

use std::collections::{HashMap, HashSet};

use common::{Recorder, recording_orchestrator};
use proptest::prelude::*;

// Strategy to generate a valid task graph.
// We ensure acyclicity by only allowing task N to depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut seen = HashSet::new();
                    let deps = potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i.max(1))
                        .filter(|d| seen.insert(*d))
                        .map(|d| format!("task_{d}"))
                        .collect();
                    (format!("task_{i}"), deps)
                })
                .collect()
        })
    })
}

fn reachable(graph: &HashMap<String, Vec<String>>, target: &str, out: &mut HashSet<String>) {
    if !out.insert(target.to_string()) {
        return;
    }
    for dep in &graph[target] {
        reachable(graph, dep, out);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_reachable_prerequisite_runs_exactly_once(
        tasks in dag_strategy(12),
        pick in any::<usize>(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        let owned: Vec<(String, Vec<&str>)> = tasks
            .iter()
            .map(|(name, deps)| (name.clone(), deps.iter().map(String::as_str).collect()))
            .collect();
        let definitions: Vec<(&str, &[&str])> = owned
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.as_slice()))
            .collect();

        let recorder = Recorder::new();
        let orch = recording_orchestrator(&recorder, ".", &definitions);
        let target = tasks[pick % tasks.len()].0.clone();

        rt.block_on(orch.run(&target)).unwrap();

        let graph: HashMap<String, Vec<String>> = tasks.iter().cloned().collect();
        let mut expected = HashSet::new();
        reachable(&graph, &target, &mut expected);

        let executed = recorder.executed();
        let unique: HashSet<String> = executed.iter().cloned().collect();
        prop_assert_eq!(executed.len(), unique.len());
        prop_assert_eq!(unique, expected);

        // Every task runs after all of its prerequisites.
        let position: HashMap<&str, usize> =
            executed.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();
        for task in &executed {
            for dep in &graph[task] {
                prop_assert!(position[dep.as_str()] < position[task.as_str()]);
            }
        }
        prop_assert_eq!(executed.last(), Some(&target));
    }
}
