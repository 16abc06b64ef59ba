//! Critical-error detection.
//!
//! A detector is any implementation of [`ErrorDetector`]. Framework
//! detectors wrap another detector instead of re-implementing it: they
//! check their exclusions first, then delegate, then add their own
//! patterns. New frameworks add a wrapper; the base detector never changes.

mod base;
mod nextjs;

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use base::BaseErrorDetector;
pub use nextjs::NextJsErrorDetector;

/// Port for deciding whether a message is a critical failure.
///
/// Implementations are pure functions over strings and must not panic.
pub trait ErrorDetector: Send + Sync {
    fn is_critical(&self, message: &str) -> bool;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;
}

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-Z\\-_])")
        .expect("valid ANSI regex")
});

static NOISE: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)warning").expect("valid noise regex"),
        Regex::new(r"\bWARN\b").expect("valid noise regex"),
        Regex::new(r"(?i)deprecated").expect("valid noise regex"),
    ]
});

/// Strip terminal escape sequences and surrounding whitespace.
pub fn normalize_message(message: &str) -> Cow<'_, str> {
    match ANSI_ESCAPE.replace_all(message, "") {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
    }
}

/// Whether a message carries a noise token. Noise overrides every
/// critical pattern, in every detector.
pub fn is_noise(message: &str) -> bool {
    NOISE.iter().any(|re| re.is_match(message))
}

/// Match `re` only if no `warning` appears earlier in the line.
pub(crate) fn matches_unless_warned(re: &Regex, message: &str) -> bool {
    re.find(message).is_some_and(|m| {
        !message[..m.start()]
            .to_ascii_lowercase()
            .contains("warning")
    })
}

/// Frameworks with a dedicated detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    Generic,
    NextJs,
}

impl Framework {
    /// Inspect a project directory for framework markers.
    pub fn detect(project_dir: &Path) -> Self {
        let next_config = ["next.config.js", "next.config.mjs", "next.config.ts"]
            .iter()
            .any(|name| project_dir.join(name).is_file());
        if next_config || package_depends_on(project_dir, "next") {
            debug!(dir = %project_dir.display(), "Detected Next.js project");
            return Self::NextJs;
        }
        Self::Generic
    }

    /// Build the detector stack for this framework.
    pub fn detector(self) -> Arc<dyn ErrorDetector> {
        match self {
            Self::Generic => Arc::new(BaseErrorDetector::new()),
            Self::NextJs => Arc::new(NextJsErrorDetector::default()),
        }
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "base" | "node" => Ok(Self::Generic),
            "next" | "nextjs" | "next.js" => Ok(Self::NextJs),
            other => Err(format!("unknown framework '{other}'")),
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => f.write_str("generic"),
            Self::NextJs => f.write_str("nextjs"),
        }
    }
}

fn package_depends_on(project_dir: &Path, dependency: &str) -> bool {
    let Ok(raw) = std::fs::read_to_string(project_dir.join("package.json")) else {
        return false;
    };
    let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return false;
    };
    ["dependencies", "devDependencies"]
        .iter()
        .any(|key| manifest.get(key).and_then(|deps| deps.get(dependency)).is_some())
}
