//! Terminal states of a single submission and the response contract derived
//! from them.

use std::path::Path;
use std::time::Duration;

pub const NO_OUTPUT_MARKER: &str = "[no output]";
pub const INTERNAL_ERROR_RESPONSE: &str = "Error: internal execution failure";

const MAX_DIAGNOSTIC_CHARS: usize = 500;
const PATH_PLACEHOLDER: &str = "<path>";

/// Text captured from the submission's standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub text: String,
    /// Set to the cap in bytes when output beyond it was dropped.
    pub truncated_at: Option<usize>,
}

impl CapturedOutput {
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated_at: None,
        }
    }
}

/// Exactly one of these is produced per submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed(CapturedOutput),
    Raised { kind: String, message: String },
    TimedOut { limit: Duration },
}

impl ExecutionOutcome {
    /// Builds a `Raised` outcome with a message safe to hand back to callers.
    pub fn raised(kind: &str, message: &str, data_dir: &Path) -> Self {
        let kind = kind.trim();
        ExecutionOutcome::Raised {
            kind: if kind.is_empty() { "Error".to_string() } else { kind.to_string() },
            message: sanitize_message(message, data_dir),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExecutionOutcome::Completed(_) => "completed",
            ExecutionOutcome::Raised { .. } => "raised",
            ExecutionOutcome::TimedOut { .. } => "timed_out",
        }
    }
}

/// Maps an outcome to the single string returned to the caller.
pub fn normalize(outcome: &ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::Completed(output) => {
            let mut response = if output.text.is_empty() {
                NO_OUTPUT_MARKER.to_string()
            } else {
                output.text.clone()
            };
            if let Some(limit) = output.truncated_at {
                if !response.ends_with('\n') {
                    response.push('\n');
                }
                response.push_str(&format!("[output truncated after {} bytes]", limit));
            }
            response
        }
        ExecutionOutcome::Raised { kind, message } => {
            if message.is_empty() {
                format!("Error: {}", kind)
            } else {
                format!("Error: {}: {}", kind, message)
            }
        }
        ExecutionOutcome::TimedOut { limit } => {
            format!("Error: execution exceeded the {}s timeout", limit.as_secs_f64())
        }
    }
}

/// Replaces host paths outside `data_dir` and caps the message length.
pub fn sanitize_message(message: &str, data_dir: &Path) -> String {
    let allowed = data_dir.to_string_lossy();
    let allowed = allowed.trim_end_matches('/');
    let message = message.trim();

    let mut out = String::with_capacity(message.len());
    let mut prev: Option<char> = None;
    let mut i = 0;

    while i < message.len() {
        let rest = &message[i..];
        let Some(c) = rest.chars().next() else { break };

        if c == '/' && starts_token(prev) && looks_like_path(rest) {
            let end = rest.find(is_path_delimiter).unwrap_or(rest.len());
            let token = &rest[..end];
            if is_within(token, allowed) {
                out.push_str(token);
            } else {
                out.push_str(PATH_PLACEHOLDER);
            }
            prev = token.chars().last();
            i += end;
            continue;
        }

        out.push(c);
        prev = Some(c);
        i += c.len_utf8();
    }

    truncate_chars(out, MAX_DIAGNOSTIC_CHARS)
}

fn starts_token(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(p) => p.is_whitespace() || matches!(p, '\'' | '"' | '(' | '[' | '{' | '<' | '=' | ':' | ','),
    }
}

fn looks_like_path(rest: &str) -> bool {
    rest[1..]
        .chars()
        .next()
        .map(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '~'))
        .unwrap_or(false)
}

fn is_path_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '\'' | '"' | ')' | ']' | '}' | '>' | ',' | ':' | ';')
}

fn is_within(token: &str, allowed: &str) -> bool {
    !allowed.is_empty()
        && (token == allowed
            || token
                .strip_prefix(allowed)
                .map(|tail| tail.starts_with('/'))
                .unwrap_or(false))
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_paths_are_masked() {
        let msg = "[Errno 2] No such file or directory: '/home/alice/secret.csv'";
        let clean = sanitize_message(msg, Path::new("/srv/data"));
        assert_eq!(clean, "[Errno 2] No such file or directory: '<path>'");
    }

    #[test]
    fn test_data_dir_paths_are_kept() {
        let msg = "No such file or directory: '/srv/data/missing.csv'";
        let clean = sanitize_message(msg, Path::new("/srv/data"));
        assert_eq!(clean, msg);
    }

    #[test]
    fn test_sibling_of_data_dir_is_masked() {
        let msg = "cannot open /srv/data2/x.csv";
        let clean = sanitize_message(msg, Path::new("/srv/data"));
        assert_eq!(clean, "cannot open <path>");
    }

    #[test]
    fn test_bracketed_paths_are_masked() {
        let data_dir = Path::new("/srv/data");
        assert_eq!(sanitize_message("{/home/x/y}", data_dir), "{<path>}");
        assert_eq!(sanitize_message("</etc/z>", data_dir), "<<path>>");
        assert_eq!(
            sanitize_message("{/srv/data/a.csv}", data_dir),
            "{/srv/data/a.csv}"
        );
    }

    #[test]
    fn test_division_operator_is_not_a_path() {
        let msg = "unsupported operand type(s) for /: 'int' and 'str'";
        assert_eq!(sanitize_message(msg, Path::new("/srv/data")), msg);
    }

    #[test]
    fn test_long_messages_are_capped() {
        let msg = "x".repeat(2000);
        let clean = sanitize_message(&msg, Path::new("/srv/data"));
        assert_eq!(clean.chars().count(), MAX_DIAGNOSTIC_CHARS + 3);
        assert!(clean.ends_with("..."));
    }
}
