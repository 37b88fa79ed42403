//! Error signature extraction.
//!
//! A signature is the structurally stable part of a failure log: the first
//! declared `Error:` message, or a Jest failure header with its first detail
//! line. Timestamps and whitespace runs are normalized away so reruns of the
//! same defect produce the same key.

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix of signatures taken from an `Error:` line.
pub const BUILD_ERROR_PREFIX: &str = "build_error";

/// Prefix of signatures taken from a Jest failure block.
pub const JEST_ERROR_PREFIX: &str = "jest_error";

static BUILD_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Error: (.*?)\n").expect("valid build error pattern"));

static JEST_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)● (.*?)\n\n\s*(.*?)\n").expect("valid jest failure pattern")
});

static ISO_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?")
        .expect("valid timestamp pattern")
});

static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[?\b\d{1,2}:\d{2}:\d{2}(?:\.\d+)?\b\]?").expect("valid clock pattern")
});

/// Derive the signature of a raw failure log.
///
/// Returns `None` when the log has no recognizable error header; callers then
/// skip the knowledge base for this failure.
pub fn signature(raw_log: &str) -> Option<String> {
    let mut log = raw_log.replace("\r\n", "\n");
    log.push('\n');

    if let Some(caps) = BUILD_ERROR.captures(&log) {
        let message = normalize(caps.get(1)?.as_str());
        if !message.is_empty() {
            return Some(format!("{}:{}", BUILD_ERROR_PREFIX, message));
        }
    }

    if let Some(caps) = JEST_FAILURE.captures(&log) {
        let header = normalize(caps.get(1)?.as_str());
        let detail = normalize(caps.get(2)?.as_str());
        if !header.is_empty() {
            return Some(format!("{}:{}:{}", JEST_ERROR_PREFIX, header, detail));
        }
    }

    None
}

/// The distinguishing suffix used for similarity search: the text after the
/// last `:`.
pub fn distinguishing_suffix(signature: &str) -> &str {
    signature
        .rsplit(':')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(signature)
}

fn normalize(text: &str) -> String {
    let out = ISO_TIMESTAMP.replace_all(text, "");
    let out = CLOCK_TIME.replace_all(&out, "");
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_signature() {
        let log = "info  - Creating an optimized build...\nError: Module not found: Can't resolve './Hero'\n    at foo (bar.js:1:2)\n";
        assert_eq!(
            signature(log).as_deref(),
            Some("build_error:Module not found: Can't resolve './Hero'")
        );
    }

    #[test]
    fn test_first_error_wins() {
        let log = "Error: first problem\nError: second problem\n";
        assert_eq!(signature(log).as_deref(), Some("build_error:first problem"));
    }

    #[test]
    fn test_error_on_last_line_without_newline() {
        assert_eq!(
            signature("Type Error: x is undefined").as_deref(),
            Some("build_error:x is undefined")
        );
    }

    #[test]
    fn test_jest_signature() {
        let log = "FAIL tests/api.test.js\n  ● ComponentX renders\n\n    expected true\n\n      at Object.<anonymous>\n";
        assert_eq!(
            signature(log).as_deref(),
            Some("jest_error:ComponentX renders:expected true")
        );
    }

    #[test]
    fn test_stable_across_timestamps_and_whitespace() {
        let a = "2024-05-01T10:00:00.123Z Error: Build   failed at  step 3\n  at x\n";
        let b = "2024-06-11T23:59:01Z Error: Build failed at step 3\r\n  at y (other.js)\n";
        let c = "[10:00:01] Error: [12:30:45] Build failed at step 3\n";
        assert_eq!(signature(a), signature(b));
        assert_eq!(signature(a).as_deref(), Some("build_error:Build failed at step 3"));
        assert_eq!(signature(c), signature(a));
    }

    #[test]
    fn test_unrecognized_log() {
        assert_eq!(signature("all good\nnothing to see\n"), None);
        assert_eq!(signature(""), None);
        assert_eq!(signature("Error: \n"), None);
    }

    #[test]
    fn test_patterns_compile_once_and_are_reused() {
        for pattern in [&BUILD_ERROR, &JEST_FAILURE, &ISO_TIMESTAMP, &CLOCK_TIME] {
            let first: *const Regex = Lazy::force(pattern);
            let second: *const Regex = Lazy::force(pattern);
            assert_eq!(first, second);
        }
        let log = "Error: first\n";
        assert_eq!(signature(log), signature(log));
    }

    #[test]
    fn test_distinguishing_suffix() {
        assert_eq!(
            distinguishing_suffix("jest_error:ComponentX renders:expected true"),
            "expected true"
        );
        assert_eq!(distinguishing_suffix("plain"), "plain");
        assert_eq!(distinguishing_suffix("build_error:"), "build_error:");
    }
}
