use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Verbosity of the development server.
///
/// - `Silent`: only the startup line printed by the `serve` task.
/// - `Info`: listen address and each live-reload broadcast.
/// - `Debug`: additionally every changed path in the served directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerLogLevel {
    Silent,
    Info,
    Debug,
}

impl Default for ServerLogLevel {
    fn default() -> Self {
        ServerLogLevel::Silent
    }
}

/// Output style for lint reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// `path[line, col]: rule: message`
    Prose,
    /// `path:line:col [W] Rule: message`
    Compact,
}
