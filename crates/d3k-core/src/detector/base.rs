//! Framework-agnostic critical-error detection.

use std::sync::LazyLock;

use regex::Regex;

use super::{ErrorDetector, is_noise, matches_unless_warned, normalize_message};

/// Critical patterns in evaluation order.
static CRITICAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // OS / resource errors
        r"EADDRINUSE",
        r"(?i)address already in use",
        r"EACCES",
        r"(?i)permission denied",
        r"ENOENT",
        r"ECONNREFUSED",
        // Fatal errors and signals
        r"(?i)\bfatal\b",
        r"(?i)\bpanic(?:ked)?\b",
        r"SIGKILL",
        r"SIGTERM",
        r"SIGSEGV",
        r"SIGABRT",
        r"(?i)\bkilled\b",
        // Memory
        r"(?i)(?:heap )?out of memory",
        r"(?i)segmentation fault",
        r"(?i)stack overflow",
        r"(?i)maximum call stack size exceeded",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid critical regex"))
    .collect()
});

/// Patterns that only count when no `warning` precedes them in the line.
static GUARDED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)cannot find (?:module|package)",
        r"(?i)module not found",
        r"MODULE_NOT_FOUND",
        r"SyntaxError",
        r"(?i)parse error",
        r"(?i)unexpected token",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid guarded regex"))
    .collect()
});

/// Base detector used on its own for generic projects and as the inner
/// detector of every framework wrapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseErrorDetector;

impl BaseErrorDetector {
    pub const fn new() -> Self {
        Self
    }
}

impl ErrorDetector for BaseErrorDetector {
    fn is_critical(&self, message: &str) -> bool {
        let message = normalize_message(message);
        if message.is_empty() || is_noise(&message) {
            return false;
        }
        CRITICAL.iter().any(|re| re.is_match(&message))
            || GUARDED.iter().any(|re| matches_unless_warned(re, &message))
    }

    fn name(&self) -> &'static str {
        "base"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn critical(msg: &str) -> bool {
        BaseErrorDetector.is_critical(msg)
    }

    #[test]
    fn empty_whitespace_and_escape_only_are_not_critical() {
        assert!(!critical(""));
        assert!(!critical("   \t\n"));
        assert!(!critical("\u{1b}[31m\u{1b}[0m"));
        assert!(!critical("\u{1b}[2K\u{1b}[1G  "));
    }

    #[test]
    fn address_in_use_is_critical() {
        assert!(critical("Error: listen EADDRINUSE: address already in use :::3000"));
    }

    #[test]
    fn routine_output_is_not_critical() {
        assert!(!critical("Ready in 1.2s"));
        assert!(!critical("GET /api/health 200 in 12ms"));
        assert!(!critical("Compiled successfully"));
    }

    #[test]
    fn warning_overrides_missing_module() {
        assert!(!critical("warning: Cannot find module 'optional-dep' but continuing"));
        assert!(!critical("Build completed with warning: Cannot find module"));
    }

    #[test]
    fn noise_overrides_every_critical_pattern() {
        let critical_messages = [
            "EADDRINUSE",
            "fatal: repository not found",
            "Segmentation fault",
            "SyntaxError: Unexpected token",
            "ECONNREFUSED 127.0.0.1:5432",
        ];
        for message in critical_messages {
            assert!(critical(message), "{message} should be critical alone");
            for noise in ["warning", "WARNING", "WaRnInG", "WARN", "deprecated", "DEPRECATED"] {
                assert!(!critical(&format!("{message} {noise}")));
                assert!(!critical(&format!("{noise}: {message}")));
            }
        }
    }

    #[test]
    fn warn_inside_a_word_does_not_suppress() {
        assert!(critical("FORWARNED: listen EADDRINUSE :::3000"));
        assert!(!critical("WARN listen EADDRINUSE :::3000"));
    }

    #[test]
    fn missing_module_without_warning_is_critical() {
        assert!(critical("Error: Cannot find module 'express'"));
        assert!(critical("Module not found: Can't resolve './missing'"));
        assert!(critical("code: 'MODULE_NOT_FOUND'"));
    }

    #[test]
    fn signals_and_memory_errors() {
        assert!(critical("Process exited with SIGKILL"));
        assert!(critical("FATAL ERROR: Reached heap limit Allocation failed - JavaScript heap out of memory"));
        assert!(critical("RangeError: Maximum call stack size exceeded"));
        assert!(critical("thread 'main' panicked at src/main.rs:4:5"));
    }

    #[test]
    fn colored_critical_output_is_detected() {
        assert!(critical("\u{1b}[31mError: EACCES: permission denied, open '/etc/x'\u{1b}[39m"));
    }
}
