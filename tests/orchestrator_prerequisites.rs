mod common;

use common::{Recorder, init_tracing, recording_orchestrator, recording_table};
use webdag::action::Action;
use webdag::dag::TaskRegistry;
use webdag::engine::{Orchestrator, OrchestratorOptions};
use webdag::errors::WebdagError;

#[tokio::test]
async fn diamond_runs_shared_prerequisite_once() {
    init_tracing();
    let recorder = Recorder::new();
    let orch = recording_orchestrator(
        &recorder,
        ".",
        &[
            ("base", &[]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("top", &["left", "right"]),
        ],
    );

    let report = orch.run("top").await.unwrap();

    assert_eq!(recorder.executed(), vec!["base", "left", "right", "top"]);
    assert_eq!(report.executed, recorder.executed());
    assert_eq!(recorder.count("base"), 1);
}

#[tokio::test]
async fn every_invocation_starts_fresh() {
    init_tracing();
    let recorder = Recorder::new();
    let orch = recording_orchestrator(&recorder, ".", &[("ts", &[]), ("js-bundle", &["ts"])]);

    orch.run("js-bundle").await.unwrap();
    orch.run("js-bundle").await.unwrap();

    assert_eq!(recorder.executed(), vec!["ts", "js-bundle", "ts", "js-bundle"]);
}

#[tokio::test]
async fn unknown_task_has_no_side_effects() {
    init_tracing();
    let recorder = Recorder::new();
    let orch = recording_orchestrator(&recorder, ".", &[("a", &[])]);

    let err = orch.run("nope").await.unwrap_err();

    assert!(matches!(err, WebdagError::UnknownTask(ref name) if name == "nope"));
    assert!(recorder.executed().is_empty());
}

#[test]
fn duplicate_registration_preserves_first() {
    let recorder = Recorder::new();
    let mut registry = TaskRegistry::new();
    registry.register("sass", &[], recorder.action()).unwrap();

    let err = registry.register("sass", &[], Action::none()).unwrap_err();
    assert!(matches!(err, WebdagError::ConfigError(_)));

    let table = registry.finish();
    assert_eq!(table.len(), 1);
    assert!(!table.get("sass").unwrap().action().is_none());
}

#[tokio::test]
async fn first_failure_aborts_the_invocation() {
    init_tracing();
    let recorder = Recorder::new();
    let table = recording_table(
        &recorder,
        &[
            ("ts-lint", &[]),
            ("ts", &[]),
            ("js-bundle", &["ts"]),
            ("sass", &[]),
            ("default", &["ts-lint", "js-bundle", "sass"]),
        ],
        &["ts"],
    );
    let orch = Orchestrator::new(table, OrchestratorOptions::new("."));

    let err = orch.run("default").await.unwrap_err();

    assert_eq!(err.failed_task(), Some("ts"));
    assert!(matches!(err.root_cause(), WebdagError::ExternalProcess { .. }));
    // js-bundle, sass and default never start.
    assert_eq!(recorder.executed(), vec!["ts-lint", "ts"]);
}

#[tokio::test]
async fn plan_does_not_execute() {
    let recorder = Recorder::new();
    let orch = recording_orchestrator(&recorder, ".", &[("a", &[]), ("b", &["a"])]);

    assert_eq!(orch.plan("b").unwrap(), vec!["a", "b"]);
    assert!(recorder.executed().is_empty());
}
