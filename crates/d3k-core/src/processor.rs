//! Output processor: the single entry point for raw dev-server output.
//!
//! Pairs a [`LogFormatParser`] with an [`ErrorDetector`]. Stream origin is
//! decided here: stdout is never classified, every stderr line gets the
//! [`ERROR_PREFIX`] marker whether or not it is critical.

use std::sync::Arc;

use crate::detector::{ErrorDetector, Framework};
use crate::domain::LogEntry;
use crate::parser::{LogFormatParser, ParserKind};

/// Marks a line as stderr-originated. Not a severity.
pub const ERROR_PREFIX: &str = "ERROR: ";

#[derive(Clone)]
pub struct OutputProcessor {
    parser: Arc<dyn LogFormatParser>,
    detector: Arc<dyn ErrorDetector>,
}

impl OutputProcessor {
    pub fn new(parser: Arc<dyn LogFormatParser>, detector: Arc<dyn ErrorDetector>) -> Self {
        Self { parser, detector }
    }

    /// Standard pairing for a framework and parser kind.
    pub fn for_framework(framework: Framework, parser: ParserKind) -> Self {
        Self::new(parser.build(), framework.detector())
    }

    /// Shared handle to the detector, for query-time classification.
    pub fn detector(&self) -> Arc<dyn ErrorDetector> {
        Arc::clone(&self.detector)
    }

    /// Turn one raw chunk into annotated entries, in input order.
    pub fn process(&self, text: &str, is_error_stream: bool) -> Vec<LogEntry> {
        self.parser
            .parse(text)
            .into_iter()
            .map(|line| {
                if !is_error_stream {
                    return LogEntry::plain(line.formatted);
                }
                let formatted = format!("{ERROR_PREFIX}{}", line.formatted);
                if self.detector.is_critical(&line.message) {
                    LogEntry::critical_with(formatted, line.message)
                } else {
                    LogEntry::plain(formatted)
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for OutputProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputProcessor")
            .field("detector", &self.detector.name())
            .finish_non_exhaustive()
    }
}
