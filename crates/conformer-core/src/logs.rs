//! Activation log verification
//!
//! A compliant action proxy writes [`ACTIVATION_LOG_SENTINEL`] once to stdout
//! and once to stderr at the end of every completed activation. Counting the
//! markers first tells a truncated or duplicated capture apart from a genuine
//! content mismatch, so content checks only ever see a structurally sound log.

use crate::errors::{Stream, VerificationFailure};

pub const ACTIVATION_LOG_SENTINEL: &str = "XXX_THE_END_OF_A_WHISK_ACTIVATION_XXX";

/// Raw output of one container, split by the stream it was written to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogCapture {
    pub stdout: String,
    pub stderr: String,
}

impl LogCapture {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn without_sentinels(&self) -> LogCapture {
        LogCapture {
            stdout: self.stdout.replace(ACTIVATION_LOG_SENTINEL, ""),
            stderr: self.stderr.replace(ACTIVATION_LOG_SENTINEL, ""),
        }
    }
}

pub fn count_sentinels(text: &str) -> usize {
    text.matches(ACTIVATION_LOG_SENTINEL).count()
}

/// True for empty or whitespace-only output.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Verifies that both streams carry exactly `sentinel_count` markers, then
/// runs `additional_check` on the sentinel-free streams.
///
/// Returns the cleaned capture when every check passes.
pub fn check_streams<F>(
    capture: &LogCapture,
    sentinel_count: usize,
    additional_check: F,
) -> Result<LogCapture, VerificationFailure>
where
    F: FnOnce(&str, &str) -> Result<(), String>,
{
    for (stream, text) in [
        (Stream::Stdout, &capture.stdout),
        (Stream::Stderr, &capture.stderr),
    ] {
        let actual = count_sentinels(text);
        if actual != sentinel_count {
            return Err(VerificationFailure::SentinelCount {
                stream,
                expected: sentinel_count,
                actual,
            });
        }
    }

    let cleaned = capture.without_sentinels();
    additional_check(&cleaned.stdout, &cleaned.stderr).map_err(VerificationFailure::Content)?;
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activation(out: &str, err: &str, times: usize) -> LogCapture {
        let mut capture = LogCapture::default();
        for _ in 0..times {
            capture.stdout.push_str(&format!("{}\n{}\n", out, ACTIVATION_LOG_SENTINEL));
            capture.stderr.push_str(&format!("{}\n{}\n", err, ACTIVATION_LOG_SENTINEL));
        }
        capture
    }

    #[test]
    fn test_matching_counts_pass_and_strip() {
        let capture = activation("hello stdout", "hello stderr", 2);
        let cleaned = check_streams(&capture, 2, |o, e| {
            if o.contains("hello stdout") && e.contains("hello stderr") {
                Ok(())
            } else {
                Err("markers missing".to_string())
            }
        })
        .unwrap();

        assert_eq!(count_sentinels(&cleaned.stdout), 0);
        assert_eq!(count_sentinels(&cleaned.stderr), 0);
        assert_eq!(cleaned.stdout, "hello stdout\n\nhello stdout\n\n");
    }

    #[test]
    fn test_stdout_mismatch_is_reported_first() {
        let capture = LogCapture::new("", "");
        let failure = check_streams(&capture, 1, |_, _| Ok(())).unwrap_err();
        assert_eq!(
            failure,
            VerificationFailure::SentinelCount {
                stream: Stream::Stdout,
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn test_stderr_mismatch_names_stderr() {
        let capture = LogCapture::new(
            ACTIVATION_LOG_SENTINEL,
            format!("{0}{0}", ACTIVATION_LOG_SENTINEL),
        );
        let failure = check_streams(&capture, 1, |_, _| Ok(())).unwrap_err();
        assert_eq!(
            failure,
            VerificationFailure::SentinelCount {
                stream: Stream::Stderr,
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(failure.to_string(), "expected 1 stderr sentinel(s), found 2");
    }

    #[test]
    fn test_predicate_not_run_on_count_mismatch() {
        let capture = LogCapture::new("no markers", "no markers");
        let mut called = false;
        let _ = check_streams(&capture, 1, |_, _| {
            called = true;
            Ok(())
        });
        assert!(!called);
    }

    #[test]
    fn test_predicate_message_is_propagated() {
        let capture = activation("noise", "", 1);
        let failure = check_streams(&capture, 1, |o, _| {
            if is_blank(o) {
                Ok(())
            } else {
                Err("expected stdout to be empty after sentinel filter".to_string())
            }
        })
        .unwrap_err();

        assert_eq!(
            failure,
            VerificationFailure::Content(
                "expected stdout to be empty after sentinel filter".to_string()
            )
        );
    }

    #[test]
    fn test_zero_expected_sentinels() {
        let capture = LogCapture::new("", "Cannot initialize the action more than once.\n");
        assert!(check_streams(&capture, 0, |o, e| {
            if format!("{}{}", o, e).contains("Cannot initialize the action more than once.") {
                Ok(())
            } else {
                Err("missing message".to_string())
            }
        })
        .is_ok());
    }
}
