//! Static lint for generated trail text.
//!
//! Generation never depends on this module; the CLI runs it on request and reports the
//! findings. Checks are line based:
//!
//! - syntax: every non-blank line that is not a `#` note must be ``~ Command `X` ``,
//!   ``~ Activate `X` ``, ``~ Input `X` `Y`...`` or `! comment`;
//! - semantics: `~ Command` names must be in [`KNOWN_COMMANDS`];
//! - parameters: an `~ Input` value that starts like a number must parse as one.

use std::fmt;

pub const KNOWN_COMMANDS: &[&str] = &[
    "ProCmdDashboardActivate",
    "ProCmdModelNew",
    "ProCmdExtrudeDashboard",
    "ProCmdDashboardAccept",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailLine<'a> {
    Command(&'a str),
    Activate(&'a str),
    Input(Vec<&'a str>),
    Comment(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Syntax,
    UnknownCommand,
    Parameter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailIssue {
    /// 1-based line number.
    pub line: usize,
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for TrailIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailStatus {
    Valid,
    SyntaxError,
    SemanticError,
    ParameterError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailReport {
    pub status: TrailStatus,
    pub issues: Vec<TrailIssue>,
}

impl TrailReport {
    pub fn is_valid(&self) -> bool {
        self.status == TrailStatus::Valid
    }
}

/// Parses one trimmed line; `None` means it matches no known form.
pub fn parse_line(line: &str) -> Option<TrailLine<'_>> {
    if let Some(rest) = line.strip_prefix("~ Command ") {
        return single_arg(rest).map(TrailLine::Command);
    }
    if let Some(rest) = line.strip_prefix("~ Activate ") {
        return single_arg(rest).map(TrailLine::Activate);
    }
    if let Some(rest) = line.strip_prefix("~ Input ") {
        return backticked_args(rest).map(TrailLine::Input);
    }
    if let Some(text) = line.strip_prefix("! ") {
        if !text.is_empty() {
            return Some(TrailLine::Comment(text));
        }
    }
    None
}

fn single_arg(rest: &str) -> Option<&str> {
    match backticked_args(rest)?.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

// One or more `arg` groups separated by single spaces, nothing else.
fn backticked_args(mut rest: &str) -> Option<Vec<&str>> {
    let mut args = Vec::new();
    loop {
        let body = rest.strip_prefix('`')?;
        let end = body.find('`')?;
        if end == 0 {
            return None;
        }
        args.push(&body[..end]);
        rest = &body[end + 1..];
        if rest.is_empty() {
            return Some(args);
        }
        rest = rest.strip_prefix(' ')?;
    }
}

fn looks_numeric(value: &str) -> bool {
    value
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}

pub fn check_trail(content: &str) -> TrailReport {
    let mut issues = Vec::new();

    for (idx, raw) in content.trim().lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line) {
            None => issues.push(TrailIssue {
                line: line_no,
                kind: IssueKind::Syntax,
                message: format!("Invalid syntax format: {}", line),
            }),
            Some(TrailLine::Command(name)) if !KNOWN_COMMANDS.contains(&name) => {
                issues.push(TrailIssue {
                    line: line_no,
                    kind: IssueKind::UnknownCommand,
                    message: format!("Unknown command '{}'", name),
                })
            }
            Some(TrailLine::Input(args)) => {
                let value = args[0];
                if looks_numeric(value) && value.parse::<f64>().is_err() {
                    issues.push(TrailIssue {
                        line: line_no,
                        kind: IssueKind::Parameter,
                        message: format!("Expected numeric value, got '{}'", value),
                    });
                }
            }
            Some(_) => {}
        }
    }

    let has = |kind: IssueKind| issues.iter().any(|issue| issue.kind == kind);
    let status = if has(IssueKind::Syntax) {
        TrailStatus::SyntaxError
    } else if has(IssueKind::UnknownCommand) {
        TrailStatus::SemanticError
    } else if has(IssueKind::Parameter) {
        TrailStatus::ParameterError
    } else {
        TrailStatus::Valid
    };

    TrailReport { status, issues }
}
