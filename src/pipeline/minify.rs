// src/pipeline/minify.rs

//! Script and stylesheet minification.
//!
//! Script minification is conservative: comments, indentation, trailing
//! whitespace and blank lines go away, line breaks stay (so automatic
//! semicolon insertion is never affected). `/*! ... */` license comments are
//! kept. Strings, regex literals and template literals (including nested
//! `${ ... }` expressions) are copied verbatim. Stylesheets are re-emitted
//! compressed by `grass`.

use grass::{Options, OutputStyle};

use crate::errors::WebdagError;
use crate::pipeline::{FileRecord, Stage, StageContext, StageFuture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Quoted(char),
    Template,
    Regex { in_class: bool },
    LineComment,
    BlockComment { keep: bool, saw_newline: bool },
}

/// Characters after which a `/` starts a regular expression literal.
const REGEX_PRECEDERS: &str = "(,=:[!&|?{};+-*%<>~^";

/// Keywords after which a `/` starts a regular expression literal.
const REGEX_KEYWORDS: &[&str] = &[
    "await", "case", "delete", "do", "else", "in", "instanceof", "new", "of", "return",
    "throw", "typeof", "void", "yield",
];

pub fn minify_js(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut mode = Mode::Code;
    let mut at_line_start = true;
    // One entry per open `${`: the number of unclosed `{` inside it.
    let mut templates: Vec<u32> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match mode {
            Mode::Code => match c {
                '\n' => {
                    end_line(&mut out);
                    at_line_start = true;
                }
                ' ' | '\t' | '\r' if at_line_start => {}
                '/' if next == Some('/') => {
                    mode = Mode::LineComment;
                    i += 1;
                }
                '/' if next == Some('*') => {
                    let keep = chars.get(i + 2) == Some(&'!');
                    if keep {
                        out.push_str("/*");
                        at_line_start = false;
                    }
                    mode = Mode::BlockComment {
                        keep,
                        saw_newline: false,
                    };
                    i += 1;
                }
                '/' if starts_regex(&out) => {
                    out.push(c);
                    at_line_start = false;
                    mode = Mode::Regex { in_class: false };
                }
                '"' | '\'' => {
                    out.push(c);
                    at_line_start = false;
                    mode = Mode::Quoted(c);
                }
                '`' => {
                    out.push(c);
                    at_line_start = false;
                    mode = Mode::Template;
                }
                '{' => {
                    if let Some(depth) = templates.last_mut() {
                        *depth += 1;
                    }
                    out.push(c);
                    at_line_start = false;
                }
                '}' => {
                    out.push(c);
                    at_line_start = false;
                    if let Some(depth) = templates.last_mut() {
                        if *depth == 0 {
                            templates.pop();
                            mode = Mode::Template;
                        } else {
                            *depth -= 1;
                        }
                    }
                }
                _ => {
                    out.push(c);
                    at_line_start = false;
                }
            },
            Mode::Quoted(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(n) = next {
                        out.push(n);
                        i += 1;
                    }
                } else if c == quote || c == '\n' {
                    mode = Mode::Code;
                    if c == '\n' {
                        at_line_start = true;
                    }
                }
            }
            Mode::Template => {
                out.push(c);
                if c == '\\' {
                    if let Some(n) = next {
                        out.push(n);
                        i += 1;
                    }
                } else if c == '`' {
                    mode = Mode::Code;
                } else if c == '$' && next == Some('{') {
                    out.push('{');
                    i += 1;
                    templates.push(0);
                    mode = Mode::Code;
                }
            }
            Mode::Regex { in_class } => {
                if c == '\n' {
                    mode = Mode::Code;
                    continue;
                }
                out.push(c);
                match c {
                    '\\' => {
                        if let Some(n) = next {
                            out.push(n);
                            i += 1;
                        }
                    }
                    '[' => mode = Mode::Regex { in_class: true },
                    ']' if in_class => mode = Mode::Regex { in_class: false },
                    '/' if !in_class => mode = Mode::Code,
                    _ => {}
                }
            }
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Code;
                    continue;
                }
            }
            Mode::BlockComment { keep, saw_newline } => {
                if c == '*' && next == Some('/') {
                    i += 1;
                    if keep {
                        out.push_str("*/");
                    } else if saw_newline {
                        end_line(&mut out);
                        at_line_start = true;
                    } else if !at_line_start {
                        out.push(' ');
                    }
                    mode = Mode::Code;
                } else {
                    if keep {
                        out.push(c);
                    }
                    if c == '\n' {
                        mode = Mode::BlockComment {
                            keep,
                            saw_newline: true,
                        };
                    }
                }
            }
        }
        i += 1;
    }

    end_line(&mut out);
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Trim trailing blanks of the current output line and terminate it, unless
/// it is empty.
fn end_line(out: &mut String) {
    while out.ends_with([' ', '\t', '\r']) {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn starts_regex(out: &str) -> bool {
    let before = out.trim_end_matches([' ', '\t']);
    match before.chars().last() {
        None | Some('\n') => true,
        Some(prev) if is_ident_char(prev) => {
            let word_start = before
                .rfind(|ch: char| !is_ident_char(ch))
                .map(|at| at + 1)
                .unwrap_or(0);
            REGEX_KEYWORDS.contains(&&before[word_start..])
        }
        Some(prev) => REGEX_PRECEDERS.contains(prev),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Compress a stylesheet.
pub fn minify_css(source: &str) -> std::result::Result<String, Box<grass::Error>> {
    let options = Options::default().style(OutputStyle::Compressed);
    grass::from_string(source.to_string(), &options)
}

/// Minify every `.js` file of the stream; source maps are dropped.
#[derive(Debug, Clone, Default)]
pub struct MinifyJs;

impl Stage for MinifyJs {
    fn name(&self) -> &'static str {
        "minify-js"
    }

    fn process<'a>(&'a self, files: Vec<FileRecord>, _ctx: &'a StageContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(files.len());
            for mut file in files {
                if file.has_extension("js") {
                    let minified = minify_js(file.text()?);
                    file.set_text(minified);
                    file.source_map = None;
                }
                out.push(file);
            }
            Ok(out)
        })
    }
}

/// Minify every `.css` file of the stream; source maps are dropped.
#[derive(Debug, Clone, Default)]
pub struct MinifyCss;

impl Stage for MinifyCss {
    fn name(&self) -> &'static str {
        "minify-css"
    }

    fn process<'a>(&'a self, files: Vec<FileRecord>, _ctx: &'a StageContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(files.len());
            for mut file in files {
                if file.has_extension("css") {
                    let minified = minify_css(file.text()?).map_err(|err| WebdagError::CompileError {
                        path: file.source_path().display().to_string(),
                        message: err.to_string(),
                    })?;
                    file.set_text(minified);
                    file.source_map = None;
                }
                out.push(file);
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_indentation_are_removed() {
        let src = "/*! lib v1 */\n// header\nfunction add(a, b) {\n    /* sum */\n    return a + b; // done\n}\n\n\nadd(1, 2);\n";
        assert_eq!(
            minify_js(src),
            "/*! lib v1 */\nfunction add(a, b) {\nreturn a + b;\n}\nadd(1, 2);"
        );
    }

    #[test]
    fn strings_templates_and_regexes_are_untouched() {
        let src = "var url = \"http://example.com\";\nvar re = /\\/\\/ not a comment/g;\nvar t = `line one\n    // kept`;\n";
        assert_eq!(
            minify_js(src),
            "var url = \"http://example.com\";\nvar re = /\\/\\/ not a comment/g;\nvar t = `line one\n    // kept`;"
        );
    }

    #[test]
    fn inline_source_map_comment_is_dropped() {
        let src = "var a = 1;\n//# sourceMappingURL=data:application/json;base64,e30=\n";
        assert_eq!(minify_js(src), "var a = 1;");
    }

    #[test]
    fn regex_after_a_keyword_is_not_a_comment() {
        let src = "function isUrl(u) {\n    return /^https?:\\/\\//.test(u);\n}\n";
        assert_eq!(
            minify_js(src),
            "function isUrl(u) {\nreturn /^https?:\\/\\//.test(u);\n}"
        );

        let src = "switch (k) {\n  case /\\/\\//.source: break;\n}\nif (typeof /x/ === 'object') {}\n";
        assert_eq!(
            minify_js(src),
            "switch (k) {\ncase /\\/\\//.source: break;\n}\nif (typeof /x/ === 'object') {}"
        );
    }

    #[test]
    fn division_before_a_comment_stays_division() {
        let src = "var half = total / 2; // halve\nvar ratio = (a) / b // per item\nvar returned = x / y;\n";
        assert_eq!(
            minify_js(src),
            "var half = total / 2;\nvar ratio = (a) / b\nvar returned = x / y;"
        );
    }

    #[test]
    fn nested_templates_are_tracked() {
        let src = "const u = `${b ? `https://${b}/x` : ''}`; // url\n";
        assert_eq!(minify_js(src), "const u = `${b ? `https://${b}/x` : ''}`;");

        let src = "const s = `${ {a: 1}.a } // kept`;\nconst t = `${f({ k: `//${v}` })}`; // gone\n";
        assert_eq!(
            minify_js(src),
            "const s = `${ {a: 1}.a } // kept`;\nconst t = `${f({ k: `//${v}` })}`;"
        );
    }

    #[test]
    fn css_is_compressed() {
        let css = minify_css(".a {\n  color: red;\n}\n\n.b {\n  margin: 0;\n}\n").unwrap();
        assert!(css.starts_with(".a{color:red}.b{margin:0}"), "unexpected css: {css}");
        assert!(!css.trim_end().contains('\n'));
    }
}
