//! Parser for Claude Code session logs.
//!
//! Claude Code writes one JSONL file per session under
//! `~/.claude/projects/<encoded-project-path>/<session-id>.jsonl`. Each line
//! is an entry envelope whose `message` field (when present) holds the actual
//! conversation turn. Token usage rides on assistant messages, and turn
//! timing arrives as separate `system`/`turn_duration` entries.

use std::path::Path;

use serde::Deserialize;

use crate::decode::decode_lines;
use crate::error::Result;
use crate::stats::{TokenTally, ToolUsageTally};
use crate::types::{
    Message, MessageRole, SessionDetail, SessionSource, SessionStats, TokenUsage, ToolCall,
};

use super::{parse_timestamp, path_display_name, SessionParser};

/// Parser for Claude Code JSONL session files.
pub struct ClaudeParser;

impl ClaudeParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClaudeParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// Raw log schema
// ============================================

/// One log line. Every field is optional; entries that carry nothing we
/// understand are skipped rather than rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawEntry {
    #[serde(rename = "type")]
    entry_type: Option<String>,
    uuid: Option<String>,
    parent_uuid: Option<String>,
    session_id: Option<String>,
    timestamp: Option<String>,
    subtype: Option<String>,
    duration_ms: Option<u64>,
    message: Option<RawMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawMessage {
    role: Option<String>,
    model: Option<String>,
    content: Option<RawContent>,
    usage: Option<RawUsage>,
}

/// Message content is either a bare string or a list of typed blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Blocks(Vec<RawContentBlock>),
}

/// Content block variants we extract data from. Anything else (thinking,
/// images, tool results echoed into content) falls into `Other` and is
/// ignored without failing the line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        input: Option<serde_json::Value>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
}

// ============================================
// Project path decoding
// ============================================

/// Decode a Claude project folder name back into a display path.
///
/// Claude Code flattens the project path into the folder name by replacing
/// separators with dashes. Two encodings exist:
///
/// - Windows drive form `E--git-MyProject` decodes to `E:\git\MyProject`
/// - POSIX form `-home-user-dev-myproject` decodes to
///   `/home/user/dev/myproject`
///
/// The encoding is lossy (a dash in a real directory name is
/// indistinguishable from a separator), so this is display-oriented
/// best-effort decoding, never used for filesystem access.
fn decode_project_path(folder_name: &str) -> String {
    let bytes = folder_name.as_bytes();
    // Byte 0 being ASCII makes the [1..] slice boundary-safe even when the
    // rest of the name is multi-byte
    if !bytes.is_empty() && bytes[0].is_ascii_uppercase() && folder_name[1..].starts_with("--") {
        let mut decoded = String::with_capacity(folder_name.len());
        decoded.push(bytes[0] as char);
        decoded.push_str(":\\");
        decoded.push_str(&folder_name[3..].replace('-', "\\"));
        return decoded;
    }

    folder_name.replace('-', "/")
}

// ============================================
// Parsing
// ============================================

impl SessionParser for ClaudeParser {
    fn source(&self) -> SessionSource {
        SessionSource::Claude
    }

    fn try_parse(&self, path: &Path) -> Result<Option<SessionDetail>> {
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<RawEntry> = decode_lines(&content);

        if entries.is_empty() {
            tracing::debug!(path = %path.display(), "No decodable entries in session file");
            return Ok(None);
        }

        // Session id lives on the first entry; later entries repeat it
        let session_id = entries[0]
            .session_id
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        let project_path = path
            .parent()
            .and_then(|dir| dir.file_name())
            .map(|name| decode_project_path(&name.to_string_lossy()))
            .unwrap_or_default();
        let project = path_display_name(&project_path);

        let mut messages: Vec<Message> = Vec::new();
        let mut token_tally = TokenTally::new();
        let mut tool_tally = ToolUsageTally::new();
        let mut model: Option<String> = None;
        let mut total_duration: u64 = 0;
        let mut turn_durations: Vec<u64> = Vec::new();

        for entry in &entries {
            let entry_type = entry.entry_type.as_deref().unwrap_or("");

            // Turn timing rides on dedicated system entries, not messages
            if entry_type == "system" {
                if entry.subtype.as_deref() == Some("turn_duration") {
                    if let Some(duration) = entry.duration_ms {
                        total_duration += duration;
                        turn_durations.push(duration);
                    }
                }
                continue;
            }

            if entry_type == "file-history-snapshot" {
                continue;
            }

            let Some(raw_message) = &entry.message else {
                continue;
            };

            let (text, tool_calls) = extract_content(raw_message.content.as_ref());

            // First non-empty model value wins for the session
            if model.is_none() {
                if let Some(m) = raw_message.model.as_deref().filter(|m| !m.is_empty()) {
                    model = Some(m.to_string());
                }
            }

            let tokens = raw_message.usage.as_ref().map(|usage| TokenUsage {
                input: usage.input_tokens.unwrap_or(0),
                output: usage.output_tokens.unwrap_or(0),
                cache_read: usage.cache_read_input_tokens,
                cache_creation: usage.cache_creation_input_tokens,
            });
            if let Some(usage) = &tokens {
                token_tally.record(usage);
            }

            // Claude logs carry no per-call outcome, so every observed call
            // counts as successful
            for call in &tool_calls {
                tool_tally.record(&call.name, true);
            }

            let role = match raw_message.role.as_deref() {
                Some("assistant") => MessageRole::Assistant,
                Some("system") => MessageRole::System,
                Some("tool") => MessageRole::Tool,
                _ => MessageRole::User,
            };

            messages.push(Message {
                id: entry.uuid.clone().unwrap_or_default(),
                parent_id: entry.parent_uuid.clone(),
                role,
                content: text,
                timestamp: parse_timestamp(entry.timestamp.as_deref()),
                model: raw_message.model.clone(),
                tokens,
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
                tool_result: None,
            });
        }

        let start_time = messages
            .first()
            .map(|m| m.timestamp)
            .unwrap_or_else(chrono::Utc::now);
        let last_activity = messages.last().map(|m| m.timestamp).unwrap_or(start_time);

        let total_tokens = token_tally.total();
        let user_messages = messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count();
        let assistant_messages = messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();

        let tool_usage = tool_tally.into_summaries();
        let average_turn_duration = if turn_durations.is_empty() {
            None
        } else {
            Some(total_duration as f64 / turn_durations.len() as f64)
        };

        let stats = SessionStats {
            message_count: messages.len(),
            user_messages,
            assistant_messages,
            tokens: Some(token_tally.into_stats()),
            tools: tool_usage.clone(),
            duration: total_duration,
            average_turn_duration,
        };

        Ok(Some(SessionDetail {
            id: session_id,
            source: SessionSource::Claude,
            project,
            project_path,
            start_time,
            last_activity,
            message_count: messages.len(),
            total_tokens: Some(total_tokens),
            model,
            messages,
            stats,
            tool_usage,
        }))
    }
}

/// Flatten raw content into display text plus any tool calls it carried.
///
/// Text blocks join with newlines; empty text blocks are dropped. Tool-use
/// blocks missing an id or name are ignored.
fn extract_content(content: Option<&RawContent>) -> (String, Vec<ToolCall>) {
    match content {
        None => (String::new(), Vec::new()),
        Some(RawContent::Text(text)) => (text.clone(), Vec::new()),
        Some(RawContent::Blocks(blocks)) => {
            let mut parts: Vec<&str> = Vec::new();
            let mut tool_calls = Vec::new();

            for block in blocks {
                match block {
                    RawContentBlock::Text { text } if !text.is_empty() => parts.push(text),
                    RawContentBlock::ToolUse { id, name, input }
                        if !id.is_empty() && !name.is_empty() =>
                    {
                        let arguments = match input {
                            Some(serde_json::Value::Object(map)) => map.clone(),
                            _ => serde_json::Map::new(),
                        };
                        tool_calls.push(ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            arguments,
                        });
                    }
                    _ => {}
                }
            }

            (parts.join("\n"), tool_calls)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_session(dir: &Path, project_folder: &str, name: &str, lines: &[&str]) -> std::path::PathBuf {
        let project_dir = dir.join(project_folder);
        std::fs::create_dir_all(&project_dir).unwrap();
        let path = project_dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    #[test]
    fn test_decode_project_path_windows_drive() {
        assert_eq!(decode_project_path("E--git-MyProject"), "E:\\git\\MyProject");
        assert_eq!(
            decode_project_path("C--Users-dev-repo"),
            "C:\\Users\\dev\\repo"
        );
    }

    #[test]
    fn test_decode_project_path_posix() {
        assert_eq!(
            decode_project_path("-home-user-dev-myproject"),
            "/home/user/dev/myproject"
        );
        assert_eq!(decode_project_path("plain"), "plain");
    }

    #[test]
    fn test_decode_project_path_multibyte_folder() {
        // An uppercase first letter followed by a multi-byte char must not
        // be mistaken for a drive prefix, and must not panic
        assert_eq!(decode_project_path("A€-proj"), "A€/proj");
        assert_eq!(decode_project_path("É--x"), "É//x");
        assert_eq!(decode_project_path(""), "");
    }

    #[test]
    fn test_parse_survives_multibyte_project_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "A€-proj",
            "s9.jsonl",
            &[r#"{"type":"user","uuid":"u1","timestamp":"2024-01-01T00:00:00Z","message":{"role":"user","content":"hi"}}"#],
        );

        let detail = ClaudeParser::new().try_parse(&path).unwrap().unwrap();
        assert_eq!(detail.project_path, "A€/proj");
        assert_eq!(detail.messages.len(), 1);
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "-home-u-proj",
            "abc.jsonl",
            &[
                r#"{"type":"user","uuid":"u1","sessionId":"abc","timestamp":"2024-01-01T00:00:00Z","message":{"role":"user","content":"hello"}}"#,
                r#"{"type":"assistant","uuid":"a1","parentUuid":"u1","#,
            ],
        );

        let detail = ClaudeParser::new().try_parse(&path).unwrap().unwrap();
        assert_eq!(detail.id, "abc");
        assert_eq!(detail.messages.len(), 1);
        assert_eq!(detail.messages[0].content, "hello");
        assert_eq!(detail.messages[0].role, MessageRole::User);
        assert_eq!(detail.project_path, "/home/u/proj");
        assert_eq!(detail.project, "proj");
    }

    #[test]
    fn test_parse_tokens_and_first_model_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "-p",
            "s1.jsonl",
            &[
                r#"{"type":"user","uuid":"u1","timestamp":"2024-01-01T00:00:00Z","message":{"role":"user","content":"hi"}}"#,
                r#"{"type":"assistant","uuid":"a1","parentUuid":"u1","timestamp":"2024-01-01T00:00:05Z","message":{"role":"assistant","model":"model-one","content":[{"type":"text","text":"hello"}],"usage":{"input_tokens":10,"output_tokens":5,"cache_read_input_tokens":100}}}"#,
                r#"{"type":"assistant","uuid":"a2","parentUuid":"a1","timestamp":"2024-01-01T00:00:09Z","message":{"role":"assistant","model":"model-two","content":[{"type":"text","text":"more"}],"usage":{"input_tokens":3,"output_tokens":7}}}"#,
            ],
        );

        let detail = ClaudeParser::new().try_parse(&path).unwrap().unwrap();
        // Session id falls back to the file stem
        assert_eq!(detail.id, "s1");
        assert_eq!(detail.model.as_deref(), Some("model-one"));
        assert_eq!(detail.total_tokens, Some(25));

        let tokens = detail.stats.tokens.as_ref().unwrap();
        assert_eq!(tokens.total_input, 13);
        assert_eq!(tokens.total_output, 12);
        assert_eq!(tokens.total_cache_read, 100);
        assert_eq!(tokens.input_per_message, vec![10, 3]);
        assert_eq!(tokens.cumulative_tokens, vec![15, 25]);
    }

    #[test]
    fn test_parse_tool_calls_always_successful() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "-p",
            "s2.jsonl",
            &[
                r#"{"type":"assistant","uuid":"a1","timestamp":"2024-01-01T00:00:00Z","message":{"role":"assistant","content":[{"type":"text","text":"running"},{"type":"tool_use","id":"t1","name":"Bash","input":{"command":"ls"}},{"type":"tool_use","id":"t2","name":"Bash","input":{"command":"pwd"}}]}}"#,
            ],
        );

        let detail = ClaudeParser::new().try_parse(&path).unwrap().unwrap();
        let calls = detail.messages[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "Bash");
        assert_eq!(calls[0].arguments["command"], "ls");

        assert_eq!(detail.tool_usage.len(), 1);
        assert_eq!(detail.tool_usage[0].count, 2);
        assert_eq!(detail.tool_usage[0].success_rate, 1.0);
    }

    #[test]
    fn test_parse_turn_durations() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            "-p",
            "s3.jsonl",
            &[
                r#"{"type":"user","uuid":"u1","timestamp":"2024-01-01T00:00:00Z","message":{"role":"user","content":"go"}}"#,
                r#"{"type":"system","subtype":"turn_duration","durationMs":1200}"#,
                r#"{"type":"system","subtype":"turn_duration","durationMs":800}"#,
                r#"{"type":"file-history-snapshot","uuid":"f1"}"#,
            ],
        );

        let detail = ClaudeParser::new().try_parse(&path).unwrap().unwrap();
        assert_eq!(detail.messages.len(), 1);
        assert_eq!(detail.stats.duration, 2000);
        assert_eq!(detail.stats.average_turn_duration, Some(1000.0));
    }

    #[test]
    fn test_empty_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(dir.path(), "-p", "empty.jsonl", &[]);
        assert!(ClaudeParser::new().try_parse(&path).unwrap().is_none());

        let garbled = write_session(dir.path(), "-p", "bad.jsonl", &["not json", "{oops"]);
        assert!(ClaudeParser::new().try_parse(&garbled).unwrap().is_none());
    }

    #[test]
    fn test_unreadable_file_maps_to_none() {
        let missing = Path::new("/nonexistent/sessions/missing.jsonl");
        assert!(ClaudeParser::new().try_parse(missing).is_err());
        assert!(ClaudeParser::new().parse(missing).is_none());
    }
}
