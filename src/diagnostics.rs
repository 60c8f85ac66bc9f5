//! Source diagnostics
//!
//! Two producers feed the same [`Diagnostic`] list: a pre-run lint that catches
//! structural typos without a remote round trip, and a parser for the compiler
//! errors the execution service reports.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Origin used for lint findings
pub const SYNTAX_ORIGIN: &str = "Syntax";

/// One located problem in the learner's source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
    pub message: String,
    /// `Syntax` for lint findings, the compiler error code otherwise (e.g. `CS1002`)
    pub origin: String,
}

impl Diagnostic {
    fn syntax(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            origin: SYNTAX_ORIGIN.to_string(),
        }
    }
}

fn compiler_error_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\((\d+),(\d+)\): error ([^:]+): (.*)").expect("valid diagnostic pattern")
    })
}

/// Extract diagnostics from compiler output such as
/// `Main.cs(10,25): error CS1002: ; expected`
pub fn parse_compiler_output(stderr: &str) -> Vec<Diagnostic> {
    compiler_error_pattern()
        .captures_iter(stderr)
        .filter_map(|caps| {
            Some(Diagnostic {
                line: caps[1].parse().ok()?,
                column: caps[2].parse().ok()?,
                message: caps[4].trim().to_string(),
                origin: caps[3].trim().to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LexState {
    Code,
    LineComment,
    BlockComment { line: u32, column: u32 },
    Str { line: u32, column: u32 },
    VerbatimStr { line: u32, column: u32 },
    CharLit { line: u32, column: u32 },
}

/// Check brackets, string and character literals, and block comments.
///
/// Literal and comment contents are skipped, so braces inside `$"..{x}.."` or a
/// commented-out line do not count.
pub fn lint(source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut open: Vec<(char, u32, u32)> = Vec::new();
    let mut state = LexState::Code;
    let (mut line, mut column) = (1u32, 0u32);
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            match state {
                LexState::LineComment => state = LexState::Code,
                LexState::Str { line, column } => {
                    diagnostics.push(Diagnostic::syntax(line, column, "Unterminated string literal"));
                    state = LexState::Code;
                }
                LexState::CharLit { line, column } => {
                    diagnostics.push(Diagnostic::syntax(
                        line,
                        column,
                        "Unterminated character literal",
                    ));
                    state = LexState::Code;
                }
                _ => {}
            }
            line += 1;
            column = 0;
            continue;
        }
        column += 1;

        match state {
            LexState::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    column += 1;
                    state = LexState::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = LexState::BlockComment { line, column };
                    column += 1;
                }
                '@' if chars.peek() == Some(&'"') => {
                    chars.next();
                    state = LexState::VerbatimStr { line, column };
                    column += 1;
                }
                '"' => state = LexState::Str { line, column },
                '\'' => state = LexState::CharLit { line, column },
                '(' | '[' | '{' => open.push((c, line, column)),
                ')' | ']' | '}' => {
                    match open.iter().rposition(|&(opener, _, _)| closer_of(opener) == c) {
                        Some(idx) => {
                            for (opener, l, col) in open.drain(idx + 1..) {
                                diagnostics.push(Diagnostic::syntax(
                                    l,
                                    col,
                                    format!("Unclosed '{}'", opener),
                                ));
                            }
                            open.pop();
                        }
                        None => diagnostics.push(Diagnostic::syntax(
                            line,
                            column,
                            format!("Unexpected '{}'", c),
                        )),
                    }
                }
                _ => {}
            },
            LexState::LineComment => {}
            LexState::BlockComment { .. } => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    column += 1;
                    state = LexState::Code;
                }
            }
            LexState::Str { .. } | LexState::CharLit { .. } => match c {
                '\\' => {
                    if chars.next_if(|next| *next != '\n').is_some() {
                        column += 1;
                    }
                }
                '"' if matches!(state, LexState::Str { .. }) => state = LexState::Code,
                '\'' if matches!(state, LexState::CharLit { .. }) => state = LexState::Code,
                _ => {}
            },
            LexState::VerbatimStr { .. } => {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        column += 1;
                    } else {
                        state = LexState::Code;
                    }
                }
            }
        }
    }

    match state {
        LexState::BlockComment { line, column } => {
            diagnostics.push(Diagnostic::syntax(line, column, "Unterminated block comment"))
        }
        LexState::Str { line, column } | LexState::VerbatimStr { line, column } => {
            diagnostics.push(Diagnostic::syntax(line, column, "Unterminated string literal"))
        }
        LexState::CharLit { line, column } => diagnostics.push(Diagnostic::syntax(
            line,
            column,
            "Unterminated character literal",
        )),
        LexState::Code | LexState::LineComment => {}
    }

    for (opener, line, column) in open {
        diagnostics.push(Diagnostic::syntax(
            line,
            column,
            format!("Unclosed '{}'", opener),
        ));
    }

    diagnostics.sort_by_key(|d| (d.line, d.column));
    diagnostics
}

/// Source with `//` and `/* */` comments removed.
///
/// String, verbatim string and character literals are copied through untouched,
/// so `"http://..."` keeps the rest of its line. Newlines ending a line comment
/// are kept; block comments vanish whole.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut state = LexState::Code;
    let (mut line, mut column) = (1u32, 0u32);
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            match state {
                LexState::BlockComment { .. } => {}
                LexState::VerbatimStr { .. } => out.push(c),
                _ => {
                    state = LexState::Code;
                    out.push(c);
                }
            }
            line += 1;
            column = 0;
            continue;
        }
        column += 1;

        match state {
            LexState::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = LexState::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = LexState::BlockComment { line, column };
                }
                '@' if chars.peek() == Some(&'"') => {
                    chars.next();
                    out.push_str("@\"");
                    state = LexState::VerbatimStr { line, column };
                }
                '"' => {
                    out.push(c);
                    state = LexState::Str { line, column };
                }
                '\'' => {
                    out.push(c);
                    state = LexState::CharLit { line, column };
                }
                _ => out.push(c),
            },
            LexState::LineComment => {}
            LexState::BlockComment { .. } => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = LexState::Code;
                }
            }
            LexState::Str { .. } | LexState::CharLit { .. } => {
                out.push(c);
                match c {
                    '\\' => {
                        if let Some(next) = chars.next_if(|next| *next != '\n') {
                            out.push(next);
                        }
                    }
                    '"' if matches!(state, LexState::Str { .. }) => state = LexState::Code,
                    '\'' if matches!(state, LexState::CharLit { .. }) => state = LexState::Code,
                    _ => {}
                }
            }
            LexState::VerbatimStr { .. } => {
                out.push(c);
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        out.push('"');
                    } else {
                        state = LexState::Code;
                    }
                }
            }
        }
    }

    out
}

fn closer_of(opener: char) -> char {
    match opener {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Terminal text shown when the lint blocks a run
pub fn syntax_error_report(diagnostics: &[Diagnostic]) -> String {
    let lines = diagnostics
        .iter()
        .map(|d| format!("Line {}: {}", d.line, d.message))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Syntax Error:\n{}\n\nFix these errors before running.", lines)
}
