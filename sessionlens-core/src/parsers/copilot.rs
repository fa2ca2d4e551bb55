//! Parser for Copilot CLI session logs.
//!
//! Copilot CLI writes one `events.jsonl` per session under
//! `~/.copilot/session-state/<session-id>/`. Every line is a typed event with
//! a `data` payload whose shape depends on the event type. Tool outcomes
//! arrive as separate `tool.execution_complete` events, so parsing runs in
//! two passes: results and session-level facts are indexed first, then the
//! message list is built with the index available.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::decode::decode_lines;
use crate::error::Result;
use crate::stats::ToolUsageTally;
use crate::types::{
    Message, MessageRole, SessionDetail, SessionSource, SessionStats, ToolCall, ToolResult,
};

use super::{parse_timestamp, path_display_name, SessionParser};

/// Parser for Copilot CLI event logs.
pub struct CopilotParser;

impl CopilotParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CopilotParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// Raw log schema
// ============================================

/// One event line. The `data` payload is a union of all event payloads with
/// every field optional; the event type decides which fields are read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: Option<String>,
    id: Option<String>,
    parent_id: Option<String>,
    timestamp: Option<String>,
    data: RawData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawData {
    session_id: Option<String>,
    context: Option<RawContext>,
    content: Option<String>,
    transformed_content: Option<String>,
    tool_requests: Option<Vec<RawToolRequest>>,
    reasoning_text: Option<String>,
    tool_call_id: Option<String>,
    tool_name: Option<String>,
    success: Option<bool>,
    result: Option<RawToolOutput>,
    new_model: Option<String>,
    error_type: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawContext {
    cwd: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawToolRequest {
    tool_call_id: String,
    name: String,
    arguments: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawToolOutput {
    content: Option<String>,
}

// ============================================
// Parsing
// ============================================

impl SessionParser for CopilotParser {
    fn source(&self) -> SessionSource {
        SessionSource::Copilot
    }

    fn try_parse(&self, path: &Path) -> Result<Option<SessionDetail>> {
        let content = std::fs::read_to_string(path)?;
        let events: Vec<RawEvent> = decode_lines(&content);

        if events.is_empty() {
            tracing::debug!(path = %path.display(), "No decodable events in session file");
            return Ok(None);
        }

        let start_event = events
            .iter()
            .find(|e| e.event_type.as_deref() == Some("session.start"));

        // Session folder name doubles as the session id when the start event
        // is missing or incomplete
        let folder_name = path
            .parent()
            .and_then(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let session_id = start_event
            .and_then(|e| e.data.session_id.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or(folder_name);

        let project_path = start_event
            .and_then(|e| e.data.context.as_ref())
            .and_then(|ctx| ctx.cwd.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                path.parent()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_default()
            });
        let project = path_display_name(&project_path);

        // Pass 1: index tool outcomes and track model changes. The last
        // model change wins for the whole session, unlike Claude logs where
        // the first message-carried model does.
        let mut results_by_call: HashMap<String, ToolResult> = HashMap::new();
        let mut tool_tally = ToolUsageTally::new();
        let mut model: Option<String> = None;

        for event in &events {
            match event.event_type.as_deref() {
                Some("tool.execution_complete") => {
                    let Some(call_id) = event
                        .data
                        .tool_call_id
                        .as_deref()
                        .filter(|id| !id.is_empty())
                    else {
                        continue;
                    };

                    let success = event.data.success.unwrap_or(true);
                    let result_content = event
                        .data
                        .result
                        .as_ref()
                        .and_then(|r| r.content.clone())
                        .unwrap_or_default();

                    results_by_call.insert(
                        call_id.to_string(),
                        ToolResult {
                            tool_call_id: call_id.to_string(),
                            success,
                            content: result_content,
                        },
                    );

                    let name = event
                        .data
                        .tool_name
                        .as_deref()
                        .filter(|n| !n.is_empty())
                        .unwrap_or("unknown");
                    tool_tally.record(name, success);
                }
                Some("session.model_change") => {
                    if let Some(m) = event.data.new_model.as_deref().filter(|m| !m.is_empty()) {
                        model = Some(m.to_string());
                    }
                }
                _ => {}
            }
        }

        // Pass 2: build the message list in log order
        let mut messages: Vec<Message> = Vec::new();

        for event in &events {
            let id = event.id.clone().unwrap_or_default();
            let parent_id = event.parent_id.clone();
            let timestamp = parse_timestamp(event.timestamp.as_deref());

            match event.event_type.as_deref() {
                Some("user.message") => {
                    // Empty content falls through to the transformed text
                    let text = event
                        .data
                        .content
                        .clone()
                        .filter(|s| !s.is_empty())
                        .or_else(|| event.data.transformed_content.clone())
                        .unwrap_or_default();

                    messages.push(Message {
                        id,
                        parent_id,
                        role: MessageRole::User,
                        content: text,
                        timestamp,
                        model: None,
                        tokens: None,
                        tool_calls: None,
                        tool_result: None,
                    });
                }
                Some("assistant.message") => {
                    let tool_calls: Vec<ToolCall> = event
                        .data
                        .tool_requests
                        .as_deref()
                        .unwrap_or_default()
                        .iter()
                        .map(|req| ToolCall {
                            id: req.tool_call_id.clone(),
                            name: req.name.clone(),
                            arguments: match &req.arguments {
                                Some(serde_json::Value::Object(map)) => map.clone(),
                                _ => serde_json::Map::new(),
                            },
                        })
                        .collect();

                    messages.push(Message {
                        id,
                        parent_id,
                        role: MessageRole::Assistant,
                        content: event.data.reasoning_text.clone().unwrap_or_default(),
                        timestamp,
                        model: model.clone(),
                        tokens: None,
                        tool_calls: if tool_calls.is_empty() {
                            None
                        } else {
                            Some(tool_calls)
                        },
                        tool_result: None,
                    });
                }
                Some("tool.execution_complete") => {
                    // Only emit a tool message when pass 1 indexed an
                    // outcome for this call id
                    let call_id = event.data.tool_call_id.as_deref().unwrap_or("");
                    if let Some(result) = results_by_call.get(call_id) {
                        messages.push(Message {
                            id,
                            parent_id,
                            role: MessageRole::Tool,
                            content: result.content.clone(),
                            timestamp,
                            model: None,
                            tokens: None,
                            tool_calls: None,
                            tool_result: Some(result.clone()),
                        });
                    }
                }
                Some("session.error") => {
                    let error_type = event.data.error_type.as_deref().unwrap_or("Unknown");
                    let detail = event.data.message.as_deref().unwrap_or("");

                    messages.push(Message {
                        id,
                        parent_id,
                        role: MessageRole::System,
                        content: format!("Error: {} - {}", error_type, detail),
                        timestamp,
                        model: None,
                        tokens: None,
                        tool_calls: None,
                        tool_result: None,
                    });
                }
                _ => {}
            }
        }

        let start_time = messages
            .first()
            .map(|m| m.timestamp)
            .unwrap_or_else(chrono::Utc::now);
        let last_activity = messages.last().map(|m| m.timestamp).unwrap_or(start_time);

        // Wall-clock span between first and last message, clamped so clock
        // skew in the log cannot go negative
        let duration = if messages.len() >= 2 {
            (last_activity - start_time).num_milliseconds().max(0) as u64
        } else {
            0
        };

        let user_messages = messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count();
        let assistant_messages = messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();

        let tool_usage = tool_tally.into_summaries();

        let stats = SessionStats {
            message_count: messages.len(),
            user_messages,
            assistant_messages,
            tokens: None,
            tools: tool_usage.clone(),
            duration,
            average_turn_duration: None,
        };

        Ok(Some(SessionDetail {
            id: session_id,
            source: SessionSource::Copilot,
            project,
            project_path,
            start_time,
            last_activity,
            message_count: messages.len(),
            total_tokens: None,
            model,
            messages,
            stats,
            tool_usage,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_events(dir: &Path, session_folder: &str, lines: &[&str]) -> std::path::PathBuf {
        let session_dir = dir.join(session_folder);
        std::fs::create_dir_all(&session_dir).unwrap();
        let path = session_dir.join("events.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    #[test]
    fn test_parse_basic_session() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let path = write_events(
            dir.path(),
            "s2",
            &[
                r#"{"type":"session.start","id":"e1","timestamp":"2024-01-01T00:00:00Z","data":{"sessionId":"s2","context":{"cwd":"/proj"}}}"#,
                r#"{"type":"user.message","id":"e2","timestamp":"2024-01-01T00:00:01Z","data":{"content":"hello"}}"#,
            ],
        );

        let detail = CopilotParser::new().try_parse(&path).unwrap().unwrap();
        assert_eq!(detail.id, "s2");
        assert_eq!(detail.project_path, "/proj");
        assert_eq!(detail.project, "proj");
        assert_eq!(detail.messages.len(), 1);
        assert_eq!(detail.messages[0].role, MessageRole::User);
        assert_eq!(detail.messages[0].content, "hello");
        assert_eq!(detail.total_tokens, None);
        assert!(detail.stats.tokens.is_none());
    }

    #[test]
    fn test_last_model_change_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_events(
            dir.path(),
            "s3",
            &[
                r#"{"type":"session.start","id":"e1","timestamp":"2024-01-01T00:00:00Z","data":{"sessionId":"s3"}}"#,
                r#"{"type":"session.model_change","id":"e2","timestamp":"2024-01-01T00:00:01Z","data":{"newModel":"model-a"}}"#,
                r#"{"type":"assistant.message","id":"e3","timestamp":"2024-01-01T00:00:02Z","data":{"reasoningText":"thinking"}}"#,
                r#"{"type":"session.model_change","id":"e4","timestamp":"2024-01-01T00:00:03Z","data":{"newModel":"model-b"}}"#,
            ],
        );

        let detail = CopilotParser::new().try_parse(&path).unwrap().unwrap();
        assert_eq!(detail.model.as_deref(), Some("model-b"));
        // Messages carry the final model since changes are indexed up front
        assert_eq!(detail.messages[0].model.as_deref(), Some("model-b"));
    }

    #[test]
    fn test_tool_results_join_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_events(
            dir.path(),
            "s4",
            &[
                r#"{"type":"session.start","id":"e1","timestamp":"2024-01-01T00:00:00Z","data":{"sessionId":"s4"}}"#,
                r#"{"type":"assistant.message","id":"e2","timestamp":"2024-01-01T00:00:01Z","data":{"reasoningText":"running it","toolRequests":[{"toolCallId":"t1","name":"shell","arguments":{"cmd":"ls"}}]}}"#,
                r#"{"type":"tool.execution_complete","id":"e3","timestamp":"2024-01-01T00:00:02Z","data":{"toolCallId":"t1","toolName":"shell","success":true,"result":{"content":"file.txt"}}}"#,
                r#"{"type":"tool.execution_complete","id":"e4","timestamp":"2024-01-01T00:00:03Z","data":{"toolName":"shell","success":false}}"#,
            ],
        );

        let detail = CopilotParser::new().try_parse(&path).unwrap().unwrap();
        // The second completion has no call id, so no tool message appears
        assert_eq!(detail.messages.len(), 2);

        let tool_msg = &detail.messages[1];
        assert_eq!(tool_msg.role, MessageRole::Tool);
        assert_eq!(tool_msg.content, "file.txt");
        let result = tool_msg.tool_result.as_ref().unwrap();
        assert_eq!(result.tool_call_id, "t1");
        assert!(result.success);

        let calls = detail.messages[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id, "t1");
        assert_eq!(calls[0].arguments["cmd"], "ls");

        assert_eq!(detail.tool_usage.len(), 1);
        assert_eq!(detail.tool_usage[0].name, "shell");
        assert_eq!(detail.tool_usage[0].count, 1);
    }

    #[test]
    fn test_user_message_content_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_events(
            dir.path(),
            "s9",
            &[
                r#"{"type":"user.message","id":"e1","timestamp":"2024-01-01T00:00:00Z","data":{"content":"","transformedContent":"expanded prompt"}}"#,
                r#"{"type":"user.message","id":"e2","timestamp":"2024-01-01T00:00:01Z","data":{"transformedContent":"only transformed"}}"#,
                r#"{"type":"user.message","id":"e3","timestamp":"2024-01-01T00:00:02Z","data":{}}"#,
            ],
        );

        let detail = CopilotParser::new().try_parse(&path).unwrap().unwrap();
        assert_eq!(detail.messages[0].content, "expanded prompt");
        assert_eq!(detail.messages[1].content, "only transformed");
        assert_eq!(detail.messages[2].content, "");
    }

    #[test]
    fn test_success_defaults_true() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_events(
            dir.path(),
            "s5",
            &[
                r#"{"type":"tool.execution_complete","id":"e1","timestamp":"2024-01-01T00:00:00Z","data":{"toolCallId":"t1","toolName":"read"}}"#,
                r#"{"type":"tool.execution_complete","id":"e2","timestamp":"2024-01-01T00:00:01Z","data":{"toolCallId":"t2","toolName":"read","success":false}}"#,
            ],
        );

        let detail = CopilotParser::new().try_parse(&path).unwrap().unwrap();
        assert!(detail.messages[0].tool_result.as_ref().unwrap().success);
        assert!(!detail.messages[1].tool_result.as_ref().unwrap().success);
        assert_eq!(detail.tool_usage[0].count, 2);
        assert_eq!(detail.tool_usage[0].success_rate, 0.5);
    }

    #[test]
    fn test_session_error_becomes_system_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_events(
            dir.path(),
            "s6",
            &[
                r#"{"type":"session.error","id":"e1","timestamp":"2024-01-01T00:00:00Z","data":{"errorType":"RateLimit","message":"too many requests"}}"#,
                r#"{"type":"session.error","id":"e2","timestamp":"2024-01-01T00:00:01Z","data":{"message":"boom"}}"#,
            ],
        );

        let detail = CopilotParser::new().try_parse(&path).unwrap().unwrap();
        assert_eq!(detail.messages[0].role, MessageRole::System);
        assert_eq!(detail.messages[0].content, "Error: RateLimit - too many requests");
        assert_eq!(detail.messages[1].content, "Error: Unknown - boom");
    }

    #[test]
    fn test_duration_between_first_and_last_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_events(
            dir.path(),
            "s7",
            &[
                r#"{"type":"user.message","id":"e1","timestamp":"2024-01-01T00:00:00Z","data":{"content":"a"}}"#,
                r#"{"type":"user.message","id":"e2","timestamp":"2024-01-01T00:00:30Z","data":{"content":"b"}}"#,
            ],
        );

        let detail = CopilotParser::new().try_parse(&path).unwrap().unwrap();
        assert_eq!(detail.stats.duration, 30_000);
        assert!(detail.stats.average_turn_duration.is_none());
    }

    #[test]
    fn test_missing_start_event_uses_folder_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_events(
            dir.path(),
            "fallback-session",
            &[r#"{"type":"user.message","id":"e1","timestamp":"2024-01-01T00:00:00Z","data":{"content":"hi"}}"#],
        );

        let detail = CopilotParser::new().try_parse(&path).unwrap().unwrap();
        assert_eq!(detail.id, "fallback-session");
    }

    #[test]
    fn test_empty_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_events(dir.path(), "s8", &[]);
        assert!(CopilotParser::new().try_parse(&path).unwrap().is_none());
    }
}
