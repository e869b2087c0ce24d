// src/pipeline/lint.rs

//! Line-based linters for scripts and stylesheets.
//!
//! Linting never fails a task: findings are printed as a report and the
//! stream passes through unchanged.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::errors::WebdagError;
use crate::pipeline::{FileRecord, Stage, StageContext, StageFuture};
use crate::types::ReportFormat;

static VAR_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvar\s").expect("static regex"));
static DEBUGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdebugger\b").expect("static regex"));
static LOOSE_EQUALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^=!<>])(==|!=)(?:$|[^=])").expect("static regex"));
static IMPORTANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!important\b").expect("static regex"));
static ZERO_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s:(,])(0(?:px|em|rem|pt|vh|vw|%))(?:$|[\s;,)])").expect("static regex")
});
static EMPTY_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*\}").expect("static regex"));

/// Which rule set a [`Lint`] stage applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintRules {
    Typescript { max_line_length: usize },
    Scss,
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub path: String,
    /// One-based.
    pub line: usize,
    /// One-based.
    pub column: usize,
    pub rule: &'static str,
    pub message: String,
}

impl LintFinding {
    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Prose => format!(
                "{}[{}, {}]: {}: {}",
                self.path, self.line, self.column, self.rule, self.message
            ),
            ReportFormat::Compact => format!(
                "{}:{}:{} [W] {}: {}",
                self.path, self.line, self.column, self.rule, self.message
            ),
        }
    }
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(ReportFormat::Prose))
    }
}

/// Lint stage; pass-through.
#[derive(Debug, Clone)]
pub struct Lint {
    rules: LintRules,
    format: ReportFormat,
}

impl Lint {
    /// TypeScript rules with a prose report.
    pub fn typescript(max_line_length: usize) -> Self {
        Self {
            rules: LintRules::Typescript { max_line_length },
            format: ReportFormat::Prose,
        }
    }

    /// SCSS rules with a compact report.
    pub fn scss() -> Self {
        Self {
            rules: LintRules::Scss,
            format: ReportFormat::Compact,
        }
    }

    pub fn check(&self, path: &str, text: &str) -> Vec<LintFinding> {
        match self.rules {
            LintRules::Typescript { max_line_length } => check_script(path, text, max_line_length),
            LintRules::Scss => check_style(path, text),
        }
    }

    fn linter_name(&self) -> &'static str {
        match self.rules {
            LintRules::Typescript { .. } => "ts-lint",
            LintRules::Scss => "scss-lint",
        }
    }
}

impl Stage for Lint {
    fn name(&self) -> &'static str {
        self.linter_name()
    }

    fn process<'a>(&'a self, files: Vec<FileRecord>, ctx: &'a StageContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut total = 0;
            for file in &files {
                let shown = file
                    .source_path()
                    .strip_prefix(&ctx.root)
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_else(|_| file.rel_str());
                for finding in self.check(&shown, file.text()?) {
                    println!("{}", finding.render(self.format));
                    total += 1;
                }
            }

            if total > 0 {
                let summary = WebdagError::LintError {
                    linter: self.linter_name().to_string(),
                    count: total,
                };
                warn!(files = files.len(), "{}", summary);
            } else {
                info!(linter = self.linter_name(), files = files.len(), "no lint findings");
            }
            Ok(files)
        })
    }
}

fn finding(path: &str, line: usize, column: usize, rule: &'static str, message: impl Into<String>) -> LintFinding {
    LintFinding {
        path: path.to_string(),
        line,
        column,
        rule,
        message: message.into(),
    }
}

/// Column (one-based, in chars) of byte offset `at` in `line`.
fn column_of(line: &str, at: usize) -> usize {
    line[..at].chars().count() + 1
}

fn trailing_whitespace(line: &str) -> Option<usize> {
    let trimmed = line.trim_end_matches([' ', '\t']);
    (trimmed.len() < line.len()).then(|| column_of(line, trimmed.len()))
}

fn is_comment_line(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("//") || t.starts_with("/*") || t.starts_with('*')
}

fn check_script(path: &str, text: &str, max_line_length: usize) -> Vec<LintFinding> {
    let mut out = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let n = i + 1;

        if let Some(col) = trailing_whitespace(line) {
            out.push(finding(path, n, col, "no-trailing-whitespace", "trailing whitespace"));
        }
        let len = line.chars().count();
        if len > max_line_length {
            out.push(finding(
                path,
                n,
                max_line_length + 1,
                "max-line-length",
                format!("exceeds maximum line length of {max_line_length}"),
            ));
        }
        if is_comment_line(line) {
            continue;
        }
        if let Some(m) = VAR_KEYWORD.find(line) {
            out.push(finding(
                path,
                n,
                column_of(line, m.start()),
                "no-var-keyword",
                "forbidden 'var' keyword, use 'let' or 'const' instead",
            ));
        }
        if let Some(m) = DEBUGGER.find(line) {
            out.push(finding(
                path,
                n,
                column_of(line, m.start()),
                "no-debugger",
                "use of debugger statements is forbidden",
            ));
        }
        for caps in LOOSE_EQUALITY.captures_iter(line) {
            if let Some(op) = caps.get(1) {
                out.push(finding(
                    path,
                    n,
                    column_of(line, op.start()),
                    "triple-equals",
                    format!("{} should be {}=", op.as_str(), op.as_str()),
                ));
            }
        }
    }

    if !text.is_empty() && !text.ends_with('\n') {
        out.push(finding(
            path,
            text.lines().count(),
            1,
            "eofline",
            "file should end with a newline",
        ));
    }
    out
}

fn check_style(path: &str, text: &str) -> Vec<LintFinding> {
    let mut out = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let n = i + 1;

        if let Some(col) = trailing_whitespace(line) {
            out.push(finding(path, n, col, "TrailingWhitespace", "Line contains trailing whitespace"));
        }
        if is_comment_line(line) {
            continue;
        }
        if let Some(m) = IMPORTANT.find(line) {
            out.push(finding(
                path,
                n,
                column_of(line, m.start()),
                "ImportantRule",
                "!important should not be used",
            ));
        }
        for caps in ZERO_UNIT.captures_iter(line) {
            if let Some(value) = caps.get(1) {
                out.push(finding(
                    path,
                    n,
                    column_of(line, value.start()),
                    "ZeroUnit",
                    format!("`{}` should be written without units as `0`", value.as_str()),
                ));
            }
        }
        if let Some(m) = EMPTY_RULE.find(line) {
            out.push(finding(path, n, column_of(line, m.start()), "EmptyRule", "Empty rule"));
        }
    }

    if !text.is_empty() && !text.ends_with('\n') {
        out.push(finding(
            path,
            text.lines().count(),
            1,
            "FinalNewline",
            "Files should end with a trailing newline",
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(findings: &[LintFinding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.rule).collect()
    }

    #[test]
    fn script_rules_report_positions() {
        let lint = Lint::typescript(20);
        let text = "var a = 1; \nif (a == 2) { debugger; }\nconst b = a === 1;\n";
        let findings = lint.check("src/main.ts", text);

        assert_eq!(
            rules(&findings),
            vec!["no-trailing-whitespace", "no-var-keyword", "max-line-length", "no-debugger", "triple-equals"]
        );
        assert_eq!(findings[0].column, 11);
        assert_eq!(
            findings[4].render(ReportFormat::Prose),
            "src/main.ts[2, 7]: triple-equals: == should be ==="
        );
    }

    #[test]
    fn comments_are_not_checked_for_keywords() {
        let lint = Lint::typescript(140);
        assert!(lint.check("a.ts", "// var x == y\n").is_empty());
    }

    #[test]
    fn missing_final_newline_is_reported() {
        let findings = Lint::typescript(140).check("a.ts", "let a = 1;");
        assert_eq!(rules(&findings), vec!["eofline"]);
    }

    #[test]
    fn style_rules_use_compact_format() {
        let lint = Lint::scss();
        let text = ".a {\n  margin: 0px;\n  color: red !important;\n}\n.b { }\n";
        let findings = lint.check("src/app.scss", text);

        assert_eq!(rules(&findings), vec!["ZeroUnit", "ImportantRule", "EmptyRule"]);
        assert_eq!(
            findings[0].render(ReportFormat::Compact),
            "src/app.scss:2:11 [W] ZeroUnit: `0px` should be written without units as `0`"
        );
    }

    #[tokio::test]
    async fn stage_passes_files_through() {
        let file = FileRecord::new("/p/src", "a.ts", "var a = 1");
        let ctx = StageContext {
            root: "/p".into(),
        };
        let out = Lint::typescript(140).process(vec![file], &ctx).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].contents, b"var a = 1");
    }
}
