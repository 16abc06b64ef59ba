//! Plain line-per-record parser.

use super::{LogFormatParser, split_lines};
use crate::domain::ParsedLogLine;

/// Every non-blank input line is one record with `message == formatted`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardParser;

impl LogFormatParser for StandardParser {
    fn parse(&self, raw: &str) -> Vec<ParsedLogLine> {
        split_lines(raw).map(ParsedLogLine::plain).collect()
    }
}
