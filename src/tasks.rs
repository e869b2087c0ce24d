// src/tasks.rs

//! The built-in task table.
//!
//! | task          | prerequisites                                      |
//! |---------------|----------------------------------------------------|
//! | `ts-lint`     |                                                    |
//! | `ts`          |                                                    |
//! | `js-bundle`   | `ts`                                               |
//! | `scss-lint`   |                                                    |
//! | `sass`        |                                                    |
//! | `js-minify`   | `js-bundle`                                        |
//! | `css-minify`  | `sass`                                             |
//! | `copy-assets` |                                                    |
//! | `build`       | `js-minify`, `css-minify`                          |
//! | `clean`       |                                                    |
//! | `default`     | `ts-lint`, `js-bundle`, `scss-lint`, `sass`, `copy-assets` |
//! | `watch`       | `default`                                          |
//! | `serve`       | `watch`                                            |
//! | `test`        |                                                    |
//!
//! `[task.<name>]` command tasks are registered after the built-ins.

use std::sync::Arc;

use crate::action::{
    Action, CleanAction, CommandAction, ServeAction, TestRunnerAction, WatchAction, WatchSpec,
};
use crate::config::validate::command_task_order;
use crate::config::{ConfigFile, RawConfigFile, load_manifest};
use crate::dag::{TaskRegistry, TaskTable};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{
    CompileSass, CompileTypeScript, Concat, InitMaps, Lint, MinifyCss, MinifyJs, Pipeline,
    WriteMaps,
};
use crate::server::ServerSettings;

/// Names of every built-in task, in registration order.
pub const BUILTIN_TASKS: &[&str] = &[
    "ts-lint",
    "ts",
    "js-bundle",
    "scss-lint",
    "sass",
    "js-minify",
    "css-minify",
    "copy-assets",
    "build",
    "clean",
    "default",
    "watch",
    "serve",
    "test",
];

/// Build the full task table for `cfg` on the real filesystem.
pub fn build_task_table(cfg: &ConfigFile) -> Result<TaskTable> {
    build_task_table_with_fs(cfg, Arc::new(RealFileSystem))
}

pub fn build_task_table_with_fs(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<TaskTable> {
    let root = cfg.root().to_path_buf();
    let paths = &cfg.paths;
    let src = |patterns: Vec<String>| Pipeline::src(root.clone(), patterns).with_fs(fs.clone());

    let mut registry = TaskRegistry::new();

    registry.register(
        "ts-lint",
        &[],
        Action::new(src(vec![paths.scripts.clone()]).pipe(Lint::typescript(cfg.tools.max_line_length))),
    )?;

    let mut ts_sources = vec![paths.scripts.clone()];
    if let Some(manifest) = load_manifest(cfg)? {
        ts_sources.push(manifest.bundle);
    }
    registry.register(
        "ts",
        &[],
        Action::new(
            src(ts_sources)
                .pipe(InitMaps::new())
                .pipe(CompileTypeScript::new(cfg.tools.typescript.clone()))
                .pipe(WriteMaps)
                .dest(paths.temp_dir.clone()),
        ),
    )?;

    let mut bundle_sources = cfg.tools.vendor_scripts.clone();
    bundle_sources.push(paths.compiled_scripts());
    registry.register(
        "js-bundle",
        &["ts"],
        Action::new(
            src(bundle_sources)
                .pipe(InitMaps::load_maps())
                .pipe(Concat::new(paths.script_bundle.clone()))
                .pipe(WriteMaps)
                .dest(paths.output_dir.clone()),
        ),
    )?;

    registry.register(
        "scss-lint",
        &[],
        Action::new(src(vec![paths.styles.clone()]).pipe(Lint::scss())),
    )?;

    registry.register(
        "sass",
        &[],
        Action::new(
            src(vec![paths.styles.clone()])
                .pipe(InitMaps::new())
                .pipe(CompileSass::new())
                .pipe(Concat::new(paths.style_bundle.clone()))
                .pipe(WriteMaps)
                .dest(paths.output_dir.clone()),
        ),
    )?;

    registry.register(
        "js-minify",
        &["js-bundle"],
        Action::new(
            src(vec![paths.script_bundle_path()])
                .pipe(MinifyJs)
                .dest(paths.output_dir.clone()),
        ),
    )?;

    registry.register(
        "css-minify",
        &["sass"],
        Action::new(
            src(vec![paths.style_bundle_path()])
                .pipe(MinifyCss)
                .dest(paths.output_dir.clone()),
        ),
    )?;

    registry.register(
        "copy-assets",
        &[],
        Action::new(src(vec![paths.assets.clone()]).dest(paths.output_dir.clone())),
    )?;

    registry.register("build", &["js-minify", "css-minify"], Action::none())?;

    registry.register(
        "clean",
        &[],
        Action::new(CleanAction::new(
            vec![cfg.resolve(&paths.output_dir), cfg.resolve(&paths.temp_dir)],
            fs.clone(),
        )),
    )?;

    registry.register(
        "default",
        &["ts-lint", "js-bundle", "scss-lint", "sass", "copy-assets"],
        Action::none(),
    )?;

    registry.register(
        "watch",
        &["default"],
        Action::new(WatchAction::new(vec![
            WatchSpec::new(paths.scripts.clone(), &["ts-lint", "js-bundle"]),
            WatchSpec::new(paths.styles.clone(), &["scss-lint", "sass"]),
            WatchSpec::new(paths.assets.clone(), &["copy-assets"]),
        ])),
    )?;

    registry.register(
        "serve",
        &["watch"],
        Action::new(ServeAction::new(ServerSettings::from_config(cfg))),
    )?;

    registry.register(
        "test",
        &[],
        Action::new(TestRunnerAction::new(&cfg.test, root.clone())),
    )?;

    register_command_tasks(&mut registry, cfg)?;

    Ok(registry.finish())
}

fn register_command_tasks(registry: &mut TaskRegistry, cfg: &ConfigFile) -> Result<()> {
    let raw = RawConfigFile {
        task: cfg.task.clone(),
        ..RawConfigFile::default()
    };

    for name in command_task_order(&raw)? {
        let Some(task) = cfg.task.get(&name) else {
            continue;
        };
        let after: Vec<&str> = task.after.iter().map(String::as_str).collect();
        registry.register(
            name.clone(),
            &after,
            Action::new(CommandAction::new(task.cmd.clone(), cfg.root())),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandTaskConfig;
    use crate::dag::DagGraph;

    fn config(raw: RawConfigFile) -> ConfigFile {
        let dir = std::env::temp_dir().join("webdag-tasks-test-missing");
        ConfigFile::try_from(raw).unwrap().with_root(dir)
    }

    #[test]
    fn every_builtin_is_registered_in_order() {
        let table = build_task_table(&config(RawConfigFile::default())).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), BUILTIN_TASKS.to_vec());
    }

    #[test]
    fn build_plan_runs_bundles_before_minifying() {
        let table = build_task_table(&config(RawConfigFile::default())).unwrap();
        let order = DagGraph::from_table(&table).execution_order("build").unwrap();
        assert_eq!(
            order,
            vec!["ts", "js-bundle", "js-minify", "sass", "css-minify", "build"]
        );
    }

    #[test]
    fn serve_plan_includes_default_once() {
        let table = build_task_table(&config(RawConfigFile::default())).unwrap();
        let order = DagGraph::from_table(&table).execution_order("serve").unwrap();
        assert_eq!(
            order,
            vec![
                "ts-lint",
                "ts",
                "js-bundle",
                "scss-lint",
                "sass",
                "copy-assets",
                "default",
                "watch",
                "serve"
            ]
        );
    }

    #[test]
    fn command_tasks_can_depend_on_builtins() {
        let mut raw = RawConfigFile::default();
        raw.task.insert(
            "deploy".into(),
            CommandTaskConfig {
                cmd: "echo deploy".into(),
                after: vec!["build".into(), "lint-all".into()],
            },
        );
        raw.task.insert(
            "lint-all".into(),
            CommandTaskConfig {
                cmd: "echo lint".into(),
                after: vec!["ts-lint".into(), "scss-lint".into()],
            },
        );

        let table = build_task_table(&config(raw)).unwrap();
        let order = DagGraph::from_table(&table).execution_order("deploy").unwrap();
        assert_eq!(order.last().map(String::as_str), Some("deploy"));
        assert!(order.iter().position(|t| t == "lint-all") < order.iter().position(|t| t == "deploy"));
        assert_eq!(table.get("deploy").unwrap().action().describe(), "sh: echo deploy");
    }
}
