//! Engine error diagnostics
//!
//! Maps yt-dlp's stderr to a [`FailureKind`] and reduces it to a single
//! readable line.

use crate::utils::error::FailureKind;
use regex::Regex;
use std::sync::OnceLock;

const MAX_MESSAGE_CHARS: usize = 300;

const FORMAT_PATTERNS: &[&str] = &[
    "requested format is not available",
    "requested format not available",
    "format is not available",
    "no video formats found",
    "no formats found",
];

const AUTH_PATTERNS: &[&str] = &[
    "sign in",
    "login required",
    "log in to",
    "--cookies",
    "use cookies",
    "private video",
    "members-only",
    "members only",
    "confirm your age",
    "age-restricted",
    "authentication",
    "http error 401",
];

const NETWORK_PATTERNS: &[&str] = &[
    "timed out",
    "connection refused",
    "connection reset",
    "connection aborted",
    "temporary failure in name resolution",
    "name or service not known",
    "nodename nor servname",
    "network is unreachable",
    "getaddrinfo failed",
    "urlopen error",
    "unable to connect",
    "remote end closed connection",
];

const CRASH_PATTERNS: &[&str] = &["traceback (most recent call last)", "segmentation fault"];

/// Classify raw engine error output.
pub fn classify(raw: &str) -> FailureKind {
    let text = strip_ansi(raw).to_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| text.contains(p));

    if matches(FORMAT_PATTERNS) {
        FailureKind::FormatUnavailable
    } else if matches(AUTH_PATTERNS) {
        FailureKind::AuthRequired
    } else if matches(NETWORK_PATTERNS) {
        FailureKind::NetworkError
    } else if matches(CRASH_PATTERNS) {
        FailureKind::EngineCrash
    } else {
        FailureKind::Unknown
    }
}

/// One concise line suitable for an API response.
pub fn normalize_message(raw: &str) -> String {
    let clean = strip_ansi(raw);
    let lines: Vec<&str> = clean
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let chosen = lines
        .iter()
        .find(|l| l.starts_with("ERROR:"))
        .copied()
        .or_else(|| {
            if lines.iter().any(|l| l.starts_with("Traceback")) {
                lines.last().copied()
            } else {
                lines.first().copied()
            }
        })
        .unwrap_or("");

    let without_prefix = chosen.strip_prefix("ERROR:").unwrap_or(chosen).trim();
    let without_tag = extractor_tag().replace(without_prefix, "");
    let collapsed = without_tag.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return "extraction engine reported no details".to_string();
    }
    truncate(&collapsed, MAX_MESSAGE_CHARS)
}

/// Remove terminal color and cursor sequences.
pub fn strip_ansi(raw: &str) -> String {
    ansi_escape().replace_all(raw, "").into_owned()
}

fn ansi_escape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("valid ANSI regex"))
}

/// `[youtube] dQw4w9WgXcQ: ` style prefix
fn extractor_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[[^\]]+\]\s*(?:[^\s:]+:\s+)?").expect("valid tag regex"))
}

fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", value[..idx].trim_end()),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_unavailable() {
        let stderr = "ERROR: [youtube] abc: Requested format is not available. Use --list-formats for a list of available formats";
        assert_eq!(classify(stderr), FailureKind::FormatUnavailable);
    }

    #[test]
    fn test_auth_required() {
        let stderr = "ERROR: [youtube] abc: Sign in to confirm your age. This video may be inappropriate for some users. Use --cookies-from-browser or --cookies for the authentication.";
        assert_eq!(classify(stderr), FailureKind::AuthRequired);
        assert_eq!(
            classify("ERROR: [vimeo] 1: This video is private video"),
            FailureKind::AuthRequired
        );
    }

    #[test]
    fn test_network_error() {
        let stderr = "ERROR: [generic] Unable to download webpage: <urlopen error [Errno -3] Temporary failure in name resolution>";
        assert_eq!(classify(stderr), FailureKind::NetworkError);
        assert_eq!(classify("ERROR: Read timed out."), FailureKind::NetworkError);
    }

    #[test]
    fn test_crash_and_unknown() {
        let trace = "Traceback (most recent call last):\n  File \"yt_dlp/__main__.py\", line 1\nKeyError: 'formats'";
        assert_eq!(classify(trace), FailureKind::EngineCrash);
        assert_eq!(classify("ERROR: Unsupported URL: https://x"), FailureKind::Unknown);
    }

    #[test]
    fn test_format_wins_over_cookie_hint() {
        let stderr = "ERROR: [youtube] abc: Requested format is not available. Try --cookies";
        assert_eq!(classify(stderr), FailureKind::FormatUnavailable);
    }

    #[test]
    fn test_classification_ignores_color_codes() {
        let stderr = "\x1b[0;31mERROR:\x1b[0m [youtube] abc: Sign \x1b[1min\x1b[0m required";
        assert_eq!(classify(stderr), FailureKind::AuthRequired);
    }

    #[test]
    fn test_normalize_strips_noise() {
        let stderr = "\x1b[0;33mWARNING:\x1b[0m something minor\n\x1b[0;31mERROR:\x1b[0m [youtube] dQw4w9WgXcQ: Video unavailable.   This video has been removed\n";
        assert_eq!(
            normalize_message(stderr),
            "Video unavailable. This video has been removed"
        );
    }

    #[test]
    fn test_normalize_traceback_uses_last_line() {
        let trace = "Traceback (most recent call last):\n  File \"x.py\", line 3, in <module>\nKeyError: 'formats'\n";
        assert_eq!(normalize_message(trace), "KeyError: 'formats'");
    }

    #[test]
    fn test_normalize_truncates_and_handles_empty() {
        let long = format!("ERROR: {}", "x".repeat(1000));
        let normalized = normalize_message(&long);
        assert!(normalized.ends_with("..."));
        assert_eq!(normalized.chars().count(), MAX_MESSAGE_CHARS + 3);

        assert_eq!(
            normalize_message("  \n "),
            "extraction engine reported no details"
        );
    }
}
