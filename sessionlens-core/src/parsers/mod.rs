//! Source-specific session parsers
//!
//! Each supported source has a parser module that implements the
//! [`SessionParser`] trait. The two formats share no parsing code; they meet
//! only at the canonical model and the stats folding in [`crate::stats`].
//!
//! ## Design Principles
//!
//! 1. **Resilience**: undecodable lines are skipped, and whole-file failures
//!    map to "no session", so a corrupt file never takes the caller down
//! 2. **Determinism**: parsing is a pure function of file content, so
//!    repeated parses of an unchanged file are interchangeable
//! 3. **Isolation**: each format's quirks stay inside its own module,
//!    selected by an explicit [`SessionSource`] tag

mod claude;
mod copilot;

pub use claude::ClaudeParser;
pub use copilot::CopilotParser;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{SessionDetail, SessionSource, SessionSummary};

/// Trait implemented by all session parsers.
///
/// `try_parse` returns `Ok(None)` when the file decodes to zero events (an
/// empty or fully-garbled file is "no session", not an error). The provided
/// [`parse`](SessionParser::parse) wrapper additionally absorbs whole-file
/// failures: an unreadable file is logged and mapped to `None` so one bad
/// file never stops the caller from serving other sessions.
pub trait SessionParser: Send + Sync {
    /// Which source this parser handles
    fn source(&self) -> SessionSource;

    /// Parse a log file into a normalized session.
    fn try_parse(&self, path: &Path) -> Result<Option<SessionDetail>>;

    /// Parse, mapping whole-file failures to "no session".
    fn parse(&self, path: &Path) -> Option<SessionDetail> {
        match self.try_parse(path) {
            Ok(detail) => detail,
            Err(e) => {
                tracing::error!(
                    source = %self.source(),
                    path = %path.display(),
                    error = %e,
                    "Failed to parse session file"
                );
                None
            }
        }
    }

    /// Project a parsed session down to its listing record.
    fn summarize(&self, detail: &SessionDetail) -> SessionSummary {
        detail.summary()
    }
}

/// Create all available parsers, in listing order.
pub fn create_all_parsers() -> Vec<Box<dyn SessionParser>> {
    vec![Box::new(ClaudeParser::new()), Box::new(CopilotParser::new())]
}

/// Get the parser for a specific source.
pub fn parser_for(source: SessionSource) -> Box<dyn SessionParser> {
    match source {
        SessionSource::Claude => Box::new(ClaudeParser::new()),
        SessionSource::Copilot => Box::new(CopilotParser::new()),
    }
}

/// Parse a session file with the parser for the given source.
///
/// Returns `None` for empty, fully-garbled, or unreadable files.
pub fn parse_session_file(path: &Path, source: SessionSource) -> Option<SessionDetail> {
    parser_for(source).parse(path)
}

/// Project a detail to its summary, dispatching on the detail's source tag.
pub fn session_summary(detail: &SessionDetail) -> SessionSummary {
    parser_for(detail.source).summarize(detail)
}

/// Parse an RFC 3339 timestamp, falling back to the current time.
///
/// Sources occasionally emit records without timestamps; the canonical model
/// requires one, so the observation time stands in.
pub(crate) fn parse_timestamp(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Last path component of a display path, tolerant of both separators.
pub(crate) fn path_display_name(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .find(|component| !component.is_empty())
        .unwrap_or(path)
        .to_string()
}
