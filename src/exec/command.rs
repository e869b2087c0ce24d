// src/exec/command.rs

use std::path::Path;
use std::process::{Output, Stdio};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{Result, WebdagError};

/// Build a shell command appropriate for the platform.
pub fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// First word of a command line, used to name the program in errors.
pub(crate) fn program_name(line: &str) -> String {
    line.split_whitespace().next().unwrap_or(line).to_string()
}

/// Run `line` through the shell in `cwd` and wait for it to exit.
///
/// The child's stdout is echoed to our stdout line by line; its stderr goes
/// to the log at `warn`. A non-zero exit status is an `ExternalProcess`
/// error.
pub async fn run_command(label: &str, line: &str, cwd: &Path) -> Result<()> {
    info!(task = label, cmd = %line, "starting process");

    let mut cmd = shell_command(line);
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", label))?;

    let stdout_pump = child.stdout.take().map(|stdout| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{line}");
            }
        })
    });

    // Always consume stderr so buffers don't fill.
    let stderr_pump = child.stderr.take().map(|stderr| {
        let label = label.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(task = %label, "stderr: {}", line);
            }
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{}'", label))?;

    // Let the pumps drain whatever the child wrote before exiting.
    for pump in [stdout_pump, stderr_pump].into_iter().flatten() {
        let _ = pump.await;
    }

    let code = status.code().unwrap_or(-1);
    info!(task = label, exit_code = code, success = status.success(), "process exited");

    if status.success() {
        Ok(())
    } else {
        Err(WebdagError::ExternalProcess {
            program: program_name(line),
            code,
        })
    }
}

/// Feed `input` to `line` on stdin and collect its output.
///
/// The exit status is returned to the caller untouched so that compile
/// stages can turn stderr into a precise error.
pub async fn pipe_through(line: &str, input: &[u8], cwd: &Path) -> anyhow::Result<Output> {
    debug!(cmd = %line, bytes = input.len(), "piping through external command");

    let mut cmd = shell_command(line);
    cmd.current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{}'", line))?;

    // Write from a separate task: a child that fills its stdout pipe before
    // reading all of stdin would otherwise deadlock us.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        })
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for '{}'", line))?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Err(err)) if err.kind() != std::io::ErrorKind::BrokenPipe => {
                return Err(err).with_context(|| format!("writing stdin of '{}'", line));
            }
            _ => {}
        }
    }

    Ok(output)
}
