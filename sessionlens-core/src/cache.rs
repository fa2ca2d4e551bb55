//! Parsed-session cache and the read API built on it.
//!
//! The cache is an explicitly owned object: callers construct one, share it
//! (it is internally synchronized), and every read of session data flows
//! through it. Entries are keyed by `(source, session id)` since ids are
//! only unique within a source. There is no expiry; entries leave the cache
//! only through [`invalidate`](SessionCache::invalidate) or
//! [`clear`](SessionCache::clear), normally driven by file-watch events.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::directory::SessionDirectory;
use crate::error::{Error, Result};
use crate::parsers::parse_session_file;
use crate::types::{Message, SessionDetail, SessionSource, SessionStats, SessionSummary};

/// One page of a session's message list.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: usize,
    pub offset: usize,
}

/// Cache of parsed sessions, backed by a [`SessionDirectory`].
///
/// A lookup miss triggers discovery and a parse; a hit returns the cached
/// value without touching the filesystem, so a stale entry persists until
/// invalidated. Concurrent lookups of the same missing key may both parse;
/// whichever insert lands last wins, which is harmless since both parsed the
/// same file.
pub struct SessionCache {
    directory: SessionDirectory,
    sessions: RwLock<HashMap<(SessionSource, String), Arc<SessionDetail>>>,
}

impl SessionCache {
    pub fn new(directory: SessionDirectory) -> Self {
        Self {
            directory,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    /// Get a session, parsing and caching it on first access.
    ///
    /// Returns `None` when no file exists for the id or the file parses to
    /// no session.
    pub fn get(&self, source: SessionSource, session_id: &str) -> Option<Arc<SessionDetail>> {
        let key = (source, session_id.to_string());

        if let Some(detail) = self.sessions.read().ok()?.get(&key) {
            return Some(Arc::clone(detail));
        }

        let path = self.directory.find_session_file(source, session_id)?;
        let detail = Arc::new(parse_session_file(&path, source)?);

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(key, Arc::clone(&detail));
        }

        Some(detail)
    }

    /// Get a session, mapping absence to an error.
    pub fn try_get(&self, source: SessionSource, session_id: &str) -> Result<Arc<SessionDetail>> {
        self.get(source, session_id).ok_or_else(|| {
            Error::SessionNotFound(format!("{}:{}", source.as_str(), session_id))
        })
    }

    /// Drop the cached entry for one session.
    pub fn invalidate(&self, source: SessionSource, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            if sessions
                .remove(&(source, session_id.to_string()))
                .is_some()
            {
                tracing::debug!(source = %source, session_id, "Invalidated cached session");
            }
        }
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.clear();
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// List all sessions, newest activity first.
    ///
    /// `source` narrows the listing to one source; `None` lists everything.
    /// Files that fail to parse are skipped, so one corrupt session never
    /// empties the listing.
    pub fn list_sessions(&self, source: Option<SessionSource>) -> Vec<SessionSummary> {
        let sources: Vec<SessionSource> = match source {
            Some(s) => vec![s],
            None => SessionSource::all().to_vec(),
        };

        let mut summaries: Vec<SessionSummary> = Vec::new();

        for source in sources {
            for (session_id, path) in self.directory.find_session_files(source) {
                match self.get(source, &session_id) {
                    Some(detail) => summaries.push(detail.summary()),
                    None => {
                        tracing::debug!(
                            source = %source,
                            session_id,
                            path = %path.display(),
                            "Skipping unparseable session"
                        );
                    }
                }
            }
        }

        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        summaries
    }

    /// One page of a session's messages.
    pub fn session_messages(
        &self,
        source: SessionSource,
        session_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<MessagePage> {
        let detail = self.try_get(source, session_id)?;
        let total = detail.messages.len();
        let start = offset.min(total);
        let end = start.saturating_add(limit).min(total);

        Ok(MessagePage {
            messages: detail.messages[start..end].to_vec(),
            total,
            offset: start,
        })
    }

    /// Aggregated statistics for one session.
    pub fn session_stats(&self, source: SessionSource, session_id: &str) -> Result<SessionStats> {
        Ok(self.try_get(source, session_id)?.stats.clone())
    }

    /// Paths watched for changes, across all sources.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        SessionSource::all()
            .iter()
            .flat_map(|source| self.directory.base_paths(*source).iter().cloned())
            .collect()
    }
}
