//! Session file discovery.
//!
//! Maps each configured base directory to the session files underneath it.
//! Claude Code keeps one `<session-id>.jsonl` per session inside an
//! encoded-project folder; Copilot CLI keeps one `events.jsonl` inside a
//! folder named after the session id. Discovery is glob-based and tolerant:
//! an unreadable base path yields no entries rather than an error.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::types::SessionSource;

/// Knows where session logs live and how session ids map to files.
#[derive(Debug, Clone)]
pub struct SessionDirectory {
    claude_paths: Vec<PathBuf>,
    copilot_paths: Vec<PathBuf>,
}

impl SessionDirectory {
    pub fn new(config: &Config) -> Self {
        Self {
            claude_paths: config.paths.claude.clone(),
            copilot_paths: config.paths.copilot.clone(),
        }
    }

    /// Base directories scanned for the given source.
    pub fn base_paths(&self, source: SessionSource) -> &[PathBuf] {
        match source {
            SessionSource::Claude => &self.claude_paths,
            SessionSource::Copilot => &self.copilot_paths,
        }
    }

    /// Find all session files for a source, keyed by session id.
    ///
    /// When the same session id appears under more than one base path, the
    /// later base path wins.
    pub fn find_session_files(&self, source: SessionSource) -> HashMap<String, PathBuf> {
        let mut files = HashMap::new();

        for base in self.base_paths(source) {
            let pattern = match source {
                SessionSource::Claude => base.join("*/*.jsonl"),
                SessionSource::Copilot => base.join("*/events.jsonl"),
            };
            let pattern = pattern.to_string_lossy().to_string();

            let paths = match glob::glob(&pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Invalid glob pattern");
                    continue;
                }
            };

            for entry in paths {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        tracing::debug!(error = %e, "Skipping unreadable path");
                        continue;
                    }
                };

                if let Some(id) = session_id_for(source, &path) {
                    files.insert(id, path);
                }
            }
        }

        files
    }

    /// Locate the session file for a specific session id, if present.
    pub fn find_session_file(&self, source: SessionSource, session_id: &str) -> Option<PathBuf> {
        self.find_session_files(source).remove(session_id)
    }
}

/// Derive the session id a file represents from its location.
///
/// Claude: the file stem. Copilot: the containing folder name.
pub fn session_id_for(source: SessionSource, path: &std::path::Path) -> Option<String> {
    match source {
        SessionSource::Claude => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string()),
        SessionSource::Copilot => path
            .parent()
            .and_then(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().to_string()),
    }
}
