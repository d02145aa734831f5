//! Rewriting of interactive-shell directives into benign syntax.
//!
//! Cell text may contain line magics (`%matplotlib inline`), cell magics
//! (`%%capture out`), shell escapes (`!pip install …`) and help queries
//! (`obj?`). None of these parse as the subject language, so every such
//! line is rewritten before parsing into syntax that is harmless to the
//! analyses while preserving the line structure of the fragment.
//!
//! Magics that *bind* names are rewritten so the binding survives analysis:
//! assignments from shell output keep their target, and `%%capture var`
//! emits a `"defs: …"` annotation literal that the extractor's
//! def-annotation analysis turns into a definition at the right columns.

use once_cell::sync::Lazy;
use regex::Regex;

static SHELL_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)([A-Za-z_][A-Za-z0-9_]*\s*=\s*)[%!].*$").expect("static pattern")
});

static CAPTURE_MAGIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^%%capture\s+([A-Za-z_][A-Za-z0-9_]*)\s*$").expect("static pattern")
});

static TIME_MAGIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)%time\s+(.*)$").expect("static pattern"));

static HELP_QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[A-Za-z_][A-Za-z0-9_.]*\s*\?{1,2}\s*$").expect("static pattern")
});

/// Rewrite interactive directives in a fragment, one pass, line-preserving.
pub fn rewrite(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        lines.push(rewrite_line(line));
    }
    lines.join("\n")
}

fn rewrite_line(line: &str) -> String {
    let trimmed = line.trim_start();

    // `%%capture out` binds `out`; annotate the definition so the def/use
    // extractor still sees it.
    if let Some(caps) = CAPTURE_MAGIC.captures(trimmed) {
        let name = caps.get(1).expect("group 1").as_str();
        let col = line.find(name).unwrap_or(0);
        return format!(
            "'defs: [{{\"name\": \"{}\", \"pos\": [[0, {}], [0, {}]]}}]'",
            name,
            col,
            col + name.len()
        );
    }

    // `%time stmt` executes the statement; strip the directive so the
    // statement itself is analysed. Padding the gap would indent the line,
    // so columns shift left while the line number is preserved.
    if let Some(caps) = TIME_MAGIC.captures(line) {
        let indent = caps.get(1).expect("group 1").as_str();
        return format!("{indent}{}", caps.get(2).expect("group 2").as_str());
    }

    // `files = !ls` keeps its assignment target.
    if let Some(caps) = SHELL_ASSIGN.captures(line) {
        let indent = caps.get(1).expect("group 1").as_str();
        let lhs = caps.get(2).expect("group 2").as_str();
        let rhs = &line[indent.len() + lhs.len()..];
        return format!("{indent}{lhs}{}", quoted(rhs));
    }

    if trimmed.starts_with('%') || trimmed.starts_with('!') {
        let indent = &line[..line.len() - trimmed.len()];
        return format!("{indent}{}", quoted(trimmed));
    }

    if HELP_QUERY.is_match(line) {
        let trimmed_start = line.len() - trimmed.len();
        let indent = &line[..trimmed_start];
        return format!("{indent}{}", quoted(trimmed));
    }

    line.to_string()
}

fn quoted(content: &str) -> String {
    format!("'{}'", content.replace('\\', "\\\\").replace('\'', "\\'"))
}
