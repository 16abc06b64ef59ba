//! Next.js detector: wraps another detector with build-tool exclusions and
//! compile/prerender failure patterns.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::{BaseErrorDetector, ErrorDetector, is_noise, normalize_message};

/// Messages the inner detector would flag that are benign in Next.js.
static EXCLUSIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Static params generation reports expected failures as "fatal".
        r"(?i)fatal.*generateStaticParams",
        r"(?i)fatal.*static params",
        r"(?i)generateStaticParams.*fatal",
        // Missing build-artifact directories, not missing dependencies.
        r"(?i)(?:cannot find module|module not found|enoent).*[/\\]\.next[/\\]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid exclusion regex"))
    .collect()
});

static OWN_CRITICAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)failed to compile",
        r"(?i)webpack errors?\b",
        r"ModuleBuildError",
        r"(?i)build failed",
        r"(?i)Error occurred prerendering page",
        r"(?i)Export encountered errors",
        r"Type error:",
        r"\berror TS\d+",
        r"Parsing error",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid nextjs regex"))
    .collect()
});

/// Exclusions, then `inner || own patterns`.
#[derive(Clone)]
pub struct NextJsErrorDetector {
    inner: Arc<dyn ErrorDetector>,
}

impl NextJsErrorDetector {
    pub fn new(inner: Arc<dyn ErrorDetector>) -> Self {
        Self { inner }
    }

    pub fn is_excluded(message: &str) -> bool {
        EXCLUSIONS.iter().any(|re| re.is_match(message))
    }
}

impl Default for NextJsErrorDetector {
    fn default() -> Self {
        Self::new(Arc::new(BaseErrorDetector::new()))
    }
}

impl std::fmt::Debug for NextJsErrorDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NextJsErrorDetector")
            .field("inner", &self.inner.name())
            .finish()
    }
}

impl ErrorDetector for NextJsErrorDetector {
    fn is_critical(&self, message: &str) -> bool {
        let message = normalize_message(message);
        if message.is_empty() || Self::is_excluded(&message) {
            return false;
        }
        if self.inner.is_critical(&message) {
            return true;
        }
        !is_noise(&message) && OWN_CRITICAL.iter().any(|re| re.is_match(&message))
    }

    fn name(&self) -> &'static str {
        "nextjs"
    }
}
