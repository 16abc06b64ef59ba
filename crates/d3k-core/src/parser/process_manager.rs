//! Parser for output multiplexed by a process manager.
//!
//! Recognised decorations:
//!
//! ```text
//! 10:42:01 web.1  | Listening on :3000     foreman / honcho
//! web    | Listening on :3000              overmind
//! [web] Listening on :3000                 concurrently
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{LogFormatParser, split_lines};
use crate::domain::ParsedLogLine;

static PIPE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<time>\d{1,2}:\d{2}:\d{2}(?:\s?[AaPp][Mm])?)\s+)?(?P<name>[A-Za-z][A-Za-z0-9_-]*)(?:\.(?P<instance>\d+))?\s*\|\s?(?P<msg>.*)$",
    )
    .expect("valid pipe prefix regex")
});

static BRACKET_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<name>[A-Za-z][A-Za-z0-9_.-]*)\]\s?(?P<msg>.*)$")
        .expect("valid bracket prefix regex")
});

/// Strips process-manager prefixes so detectors see the bare message.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessManagerParser;

impl ProcessManagerParser {
    pub const fn new() -> Self {
        Self
    }

    fn parse_line(line: &str) -> Option<ParsedLogLine> {
        if let Some(caps) = PIPE_PREFIX.captures(line) {
            let name = caps["name"].to_string();
            let message = caps["msg"].to_string();
            let mut metadata = BTreeMap::new();
            if let Some(instance) = caps.name("instance") {
                metadata.insert("instance".to_string(), instance.as_str().to_string());
            }
            if let Some(time) = caps.name("time") {
                metadata.insert("time".to_string(), time.as_str().to_string());
            }
            return Some(Self::decorated(name, message, metadata));
        }

        let caps = BRACKET_PREFIX.captures(line)?;
        Some(Self::decorated(
            caps["name"].to_string(),
            caps["msg"].to_string(),
            BTreeMap::new(),
        ))
    }

    fn decorated(name: String, message: String, metadata: BTreeMap<String, String>) -> ParsedLogLine {
        ParsedLogLine {
            formatted: format!("[{name}] {message}"),
            message,
            process_name: Some(name),
            metadata: (!metadata.is_empty()).then_some(metadata),
        }
    }
}

impl LogFormatParser for ProcessManagerParser {
    fn parse(&self, raw: &str) -> Vec<ParsedLogLine> {
        split_lines(raw)
            .filter_map(|line| match Self::parse_line(line) {
                // A prefix with nothing after it is a blank line from that process.
                Some(parsed) if parsed.message.trim().is_empty() => None,
                Some(parsed) => Some(parsed),
                None => Some(ParsedLogLine::plain(line)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_foreman_prefix_with_time_and_instance() {
        let lines = ProcessManagerParser.parse("10:42:01 web.1  | Listening on :3000");
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.message, "Listening on :3000");
        assert_eq!(line.process_name.as_deref(), Some("web"));
        assert_eq!(line.formatted, "[web] Listening on :3000");
        let metadata = line.metadata.as_ref().unwrap();
        assert_eq!(metadata.get("instance").map(String::as_str), Some("1"));
        assert_eq!(metadata.get("time").map(String::as_str), Some("10:42:01"));
    }

    #[test]
    fn strips_overmind_and_concurrently_prefixes() {
        let lines = ProcessManagerParser.parse("css    | Done in 120ms\n[js] Error: Cannot find module 'x'");
        assert_eq!(lines[0].message, "Done in 120ms");
        assert_eq!(lines[0].process_name.as_deref(), Some("css"));
        assert!(lines[0].metadata.is_none());
        assert_eq!(lines[1].message, "Error: Cannot find module 'x'");
        assert_eq!(lines[1].process_name.as_deref(), Some("js"));
    }

    #[test]
    fn undecorated_lines_pass_through() {
        let lines = ProcessManagerParser.parse("plain output\n[2025-01-01T00:00:00Z] not a prefix");
        assert_eq!(lines[0], ParsedLogLine::plain("plain output"));
        assert_eq!(lines[1].message, "[2025-01-01T00:00:00Z] not a prefix");
        assert!(lines[1].process_name.is_none());
    }

    #[test]
    fn prefix_only_lines_are_dropped() {
        assert!(ProcessManagerParser.parse("web.1 | \nweb.1 |").is_empty());
    }

    #[test]
    fn message_never_contains_prefix() {
        let raw = "web.1 | a\n[api] b\n12:00:00 PM worker.2 | c";
        for line in ProcessManagerParser.parse(raw) {
            assert!(!line.message.contains('|'));
            assert!(!line.message.starts_with('['));
        }
    }

    #[test]
    fn reparsing_formatted_output_keeps_messages() {
        let raw = "web.1 | Compiled /page in 200ms\n[api] GET /health 200\nuntagged";
        let first = ProcessManagerParser.parse(raw);
        let rejoined = first
            .iter()
            .map(|line| line.formatted.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let second = ProcessManagerParser.parse(&rejoined);
        let messages = |lines: &[ParsedLogLine]| {
            lines.iter().map(|l| l.message.clone()).collect::<Vec<_>>()
        };
        assert_eq!(messages(&first), messages(&second));
    }
}
