//! Input shim injection
//!
//! Rewrites console read calls so that every consumed line is echoed back into
//! stdout. The interactive wrapper additionally fails with [`INPUT_SENTINEL`]
//! once stdin runs dry, which is how a replayed run reports that it wants more input.
//!
//! Call sites are replaced in place and the wrapper class is appended after the
//! last original line, so line numbers of the learner's code never move.

use crate::languages::LanguageConfig;

/// Error text thrown by the interactive wrapper when stdin is exhausted
pub const INPUT_SENTINEL: &str = "_INPUT_REQUIRED_";

/// Byte written in front of every echoed input value (ASCII group separator)
pub const INPUT_MARKER: char = '\u{1D}';

const SHIM_BEGIN: &str = "// <mp-input-shim>";
const SHIM_END: &str = "// </mp-input-shim>";
const SHIM_CALL: &str = "_InputShim.ReadLine()";

const INTERACTIVE_BODY: &str = r#"        if (s == null) throw new System.Exception("_INPUT_REQUIRED_");
        System.Console.Write("\u001D" + s);
        System.Console.WriteLine();
        return s;"#;

const ECHO_ONLY_BODY: &str = r#"        if (s == null) return null;
        System.Console.Write(s);
        System.Console.WriteLine();
        return s;"#;

/// Which wrapper to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimMode {
    /// Live sessions: missing input is an error, echoes carry the marker byte
    Interactive,
    /// Verification runs: missing input reads as null, echoes are plain
    EchoOnly,
}

/// Rewrite `source` so that all read calls go through the injected wrapper.
///
/// Any wrapper block left by a previous call is removed first, so shimming is
/// idempotent and switching modes never stacks two wrappers.
pub fn shim(source: &str, language: &LanguageConfig, mode: ShimMode) -> String {
    let base = strip_shim(source);
    let rewritten = language.read_call_pattern.replace_all(&base, SHIM_CALL);

    let body = match mode {
        ShimMode::Interactive => INTERACTIVE_BODY,
        ShimMode::EchoOnly => ECHO_ONLY_BODY,
    };

    let mut out = String::with_capacity(rewritten.len() + 512);
    out.push_str(&rewritten);
    out.push('\n');
    out.push_str(SHIM_BEGIN);
    out.push_str("\npublic static class _InputShim {\n    public static string ReadLine() {\n        string s = System.Console.ReadLine();\n");
    out.push_str(body);
    out.push_str("\n    }\n}\n");
    out.push_str(SHIM_END);
    out.push('\n');
    out
}

/// Remove a previously injected wrapper block, if any
pub fn strip_shim(source: &str) -> String {
    let Some(begin) = source.find(SHIM_BEGIN) else {
        return source.to_string();
    };
    let head = &source[..begin];
    let head = head.strip_suffix('\n').unwrap_or(head);
    let tail = source[begin..]
        .find(SHIM_END)
        .map(|end| &source[begin + end + SHIM_END.len()..])
        .map(|rest| rest.strip_prefix('\n').unwrap_or(rest))
        .unwrap_or("");
    format!("{}{}", head, tail)
}
