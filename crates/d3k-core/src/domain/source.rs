//! Source tags for unified log lines.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Origin of a unified log line, rendered as the `[SOURCE]` column.
///
/// Unknown tags are preserved in `Other` so that new browser-side event
/// kinds round-trip without a code change here. They are upper-cased and
/// restricted to `[A-Z0-9_.-]`; anything else becomes `_`, so a tag can
/// never break the line or forge another column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogSource {
    /// Output of the spawned dev-server process.
    Server,
    /// Browser console messages and page errors.
    Browser,
    /// Network requests and responses observed in the browser.
    Network,
    /// Errors raised by the tool itself.
    Error,
    /// DOM snapshots.
    Dom,
    /// Raw browser-control protocol events.
    Cdp,
    /// Screenshot captures.
    Screenshot,
    /// User interactions (clicks, key presses, scrolls).
    Interaction,
    /// Page navigations.
    Navigation,
    /// Any other tag.
    Other(String),
}

impl LogSource {
    /// The upper-case tag written between brackets.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Server => "SERVER",
            Self::Browser => "BROWSER",
            Self::Network => "NETWORK",
            Self::Error => "ERROR",
            Self::Dom => "DOM",
            Self::Cdp => "CDP",
            Self::Screenshot => "SCREENSHOT",
            Self::Interaction => "INTERACTION",
            Self::Navigation => "NAVIGATION",
            Self::Other(tag) => tag,
        }
    }

    /// Parse a tag case-insensitively.
    pub fn from_tag(tag: &str) -> Self {
        let upper = normalize_tag(tag);
        match upper.as_str() {
            "SERVER" => Self::Server,
            "BROWSER" => Self::Browser,
            "NETWORK" => Self::Network,
            "ERROR" => Self::Error,
            "DOM" => Self::Dom,
            "CDP" => Self::Cdp,
            "SCREENSHOT" => Self::Screenshot,
            "INTERACTION" => Self::Interaction,
            "NAVIGATION" => Self::Navigation,
            _ => Self::Other(upper),
        }
    }
}

fn normalize_tag(tag: &str) -> String {
    let normalized: String = tag
        .trim()
        .chars()
        .map(|c| match c.to_ascii_uppercase() {
            c @ ('A'..='Z' | '0'..='9' | '_' | '.' | '-') => c,
            _ => '_',
        })
        .collect();
    if normalized.is_empty() {
        "UNKNOWN".to_string()
    } else {
        normalized
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl From<String> for LogSource {
    fn from(value: String) -> Self {
        Self::from_tag(&value)
    }
}

impl From<LogSource> for String {
    fn from(value: LogSource) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_case_insensitively() {
        assert_eq!(LogSource::from_tag("server"), LogSource::Server);
        assert_eq!(LogSource::from_tag(" Interaction "), LogSource::Interaction);
        assert_eq!(
            LogSource::from_tag("console"),
            LogSource::Other("CONSOLE".to_string())
        );
    }

    #[test]
    fn unknown_tags_are_restricted_to_safe_characters() {
        assert_eq!(
            LogSource::from_tag("console\ninjected"),
            LogSource::Other("CONSOLE_INJECTED".to_string())
        );
        assert_eq!(
            LogSource::from_tag("x] [SERVER"),
            LogSource::Other("X___SERVER".to_string())
        );
        assert_eq!(LogSource::from_tag("web-vitals.v2"), LogSource::Other("WEB-VITALS.V2".to_string()));
        assert_eq!(LogSource::from_tag("  "), LogSource::Other("UNKNOWN".to_string()));

        let parsed: LogSource = serde_json::from_str(r#""a]\r\nb""#).unwrap();
        assert_eq!(parsed.as_str(), "A___B");
    }

    #[test]
    fn serializes_as_plain_tag() {
        let json = serde_json::to_string(&LogSource::Network).unwrap();
        assert_eq!(json, "\"NETWORK\"");
        let parsed: LogSource = serde_json::from_str("\"dom\"").unwrap();
        assert_eq!(parsed, LogSource::Dom);
    }
}
