mod common;

use std::time::Duration;

use common::{
    ConfigFileBuilder, ProjectDir, Recorder, init_tracing, recording_orchestrator,
    recording_table, settle, wait_until,
};
use tokio::sync::mpsc;
use webdag::engine::{Orchestrator, OrchestratorOptions};

const SCRIPT_TASKS: &[(&str, &[&str])] = &[("ts-lint", &[]), ("ts", &[]), ("js-bundle", &["ts"])];

#[tokio::test]
async fn matching_change_runs_bound_tasks_once() {
    init_tracing();
    let project = ProjectDir::sample();
    let recorder = Recorder::new();
    let orch = recording_orchestrator(&recorder, project.path(), SCRIPT_TASKS);

    let binding = orch.bind("src/**/*.ts", &["ts-lint", "js-bundle"]).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = orch.listen(binding, rx);

    tx.send(vec![project.path().join("src/app/main.ts")]).unwrap();

    assert!(wait_until(Duration::from_secs(5), || recorder.count("js-bundle") == 1).await);
    settle().await;
    assert_eq!(recorder.executed(), vec!["ts-lint", "ts", "js-bundle"]);

    drop(tx);
    listener.await.unwrap();
}

#[tokio::test]
async fn one_batch_with_several_files_is_one_run() {
    init_tracing();
    let project = ProjectDir::sample();
    let recorder = Recorder::new();
    let orch = recording_orchestrator(&recorder, project.path(), SCRIPT_TASKS);

    let binding = orch.bind("src/**/*.ts", &["js-bundle"]).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = orch.listen(binding, rx);

    tx.send(vec![
        project.path().join("src/app/main.ts"),
        project.path().join("src/app/greet.ts"),
    ])
    .unwrap();
    drop(tx);
    listener.await.unwrap();

    assert_eq!(recorder.executed(), vec!["ts", "js-bundle"]);
}

#[tokio::test]
async fn non_matching_paths_are_ignored() {
    init_tracing();
    let project = ProjectDir::sample();
    let recorder = Recorder::new();
    let orch = recording_orchestrator(&recorder, project.path(), SCRIPT_TASKS);

    let binding = orch.bind("src/**/*.ts", &["ts-lint"]).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = orch.listen(binding, rx);

    tx.send(vec![project.path().join("src/styles/app.scss")]).unwrap();
    tx.send(vec![project.path().join("assets/index.html")]).unwrap();
    tx.send(vec!["elsewhere/main.ts".into()]).unwrap();
    drop(tx);
    listener.await.unwrap();

    assert!(recorder.executed().is_empty());
}

#[tokio::test]
async fn failing_task_stops_the_sequence_but_not_the_listener() {
    init_tracing();
    let project = ProjectDir::sample();
    let recorder = Recorder::new();
    let table = recording_table(
        &recorder,
        &[("scss-lint", &[]), ("sass", &[])],
        &["scss-lint"],
    );
    let orch = Orchestrator::new(table, OrchestratorOptions::new(project.path()));

    let binding = orch.bind("src/**/*.scss", &["scss-lint", "sass"]).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = orch.listen(binding, rx);

    tx.send(vec![project.path().join("src/styles/app.scss")]).unwrap();
    tx.send(vec![project.path().join("src/styles/app.scss")]).unwrap();
    drop(tx);
    listener.await.unwrap();

    assert_eq!(recorder.executed(), vec!["scss-lint", "scss-lint"]);
}

#[tokio::test]
async fn content_hashing_skips_unchanged_saves() {
    init_tracing();
    let project = ProjectDir::sample();
    let recorder = Recorder::new();
    let cfg = ConfigFileBuilder::new().use_hash(true).build(project.path());
    let options = OrchestratorOptions {
        root: cfg.root().to_path_buf(),
        use_hash: cfg.watch.use_hash,
    };
    let orch = Orchestrator::new(recording_table(&recorder, SCRIPT_TASKS, &[]), options);

    let binding = orch.bind("src/**/*.ts", &["ts"]).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = orch.listen(binding, rx);
    let main = project.path().join("src/app/main.ts");

    tx.send(vec![main.clone()]).unwrap();
    assert!(wait_until(Duration::from_secs(5), || recorder.count("ts") == 1).await);

    // Same bytes again: skipped.
    tx.send(vec![main.clone()]).unwrap();
    settle().await;
    assert_eq!(recorder.count("ts"), 1);

    project.file("src/app/main.ts", "console.log('changed');\n");
    tx.send(vec![main]).unwrap();
    drop(tx);
    listener.await.unwrap();

    assert_eq!(recorder.count("ts"), 2);
}

#[tokio::test]
async fn watching_registers_background_work() {
    init_tracing();
    let project = ProjectDir::sample();
    let recorder = Recorder::new();
    let orch = recording_orchestrator(&recorder, project.path(), SCRIPT_TASKS);

    assert!(!orch.has_background());
    orch.watch("src/**/*.ts", &["ts-lint"]).unwrap();
    assert!(orch.has_background());

    assert!(orch.watch("src/**/*.ts", &["missing"]).is_err());
}
