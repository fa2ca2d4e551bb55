//! Classification and handling of file-watch events.
//!
//! The actual filesystem watcher lives in the binary; this module owns the
//! policy side: deciding which source and session a changed path belongs to,
//! and applying the change to a [`SessionCache`].

use std::path::Path;

use crate::cache::SessionCache;
use crate::config::Config;
use crate::directory::session_id_for;
use crate::types::{SessionSource, SessionSummary};

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Add,
    Change,
    Unlink,
}

/// A classified change to one session's log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub source: SessionSource,
    pub session_id: String,
}

/// Classify a changed path into the session it belongs to.
///
/// A path matches a source when it sits under one of that source's
/// configured base directories; as a fallback for symlinked or otherwise
/// re-rooted layouts, the well-known directory names are matched anywhere in
/// the path. Non-session files (and Copilot files other than `events.jsonl`)
/// classify to `None`.
pub fn classify_path(config: &Config, kind: WatchEventKind, path: &Path) -> Option<WatchEvent> {
    let source = source_for_path(config, path)?;

    match source {
        SessionSource::Claude => {
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                return None;
            }
        }
        SessionSource::Copilot => {
            if path.file_name().and_then(|n| n.to_str()) != Some("events.jsonl") {
                return None;
            }
        }
    }

    let session_id = session_id_for(source, path).filter(|id| !id.is_empty())?;

    Some(WatchEvent {
        kind,
        source,
        session_id,
    })
}

fn source_for_path(config: &Config, path: &Path) -> Option<SessionSource> {
    for base in &config.paths.claude {
        if path.starts_with(base) {
            return Some(SessionSource::Claude);
        }
    }
    for base in &config.paths.copilot {
        if path.starts_with(base) {
            return Some(SessionSource::Copilot);
        }
    }

    let display = path.to_string_lossy();
    if display.contains(".claude/projects") {
        Some(SessionSource::Claude)
    } else if display.contains(".copilot/session-state") {
        Some(SessionSource::Copilot)
    } else {
        None
    }
}

/// Apply a classified event to the cache.
///
/// Every event drops the stale entry. Adds and changes then reparse and
/// return the fresh summary so callers can surface the update; an unlink
/// returns `None`.
pub fn apply(event: &WatchEvent, cache: &SessionCache) -> Option<SessionSummary> {
    cache.invalidate(event.source, &event.session_id);

    match event.kind {
        WatchEventKind::Add | WatchEventKind::Change => {
            let detail = cache.get(event.source, &event.session_id)?;
            tracing::debug!(
                source = %event.source,
                session_id = %event.session_id,
                "Session refreshed from watch event"
            );
            Some(detail.summary())
        }
        WatchEventKind::Unlink => {
            tracing::debug!(
                source = %event.source,
                session_id = %event.session_id,
                "Session removed from cache"
            );
            None
        }
    }
}
