//! Canonical domain types for sessionlens
//!
//! These types are the source-independent model that every consumer (listing,
//! export, CLI output) works against. The two source parsers normalize their
//! native log schemas into this one shape; nothing downstream needs to know
//! which tool produced a session.
//!
//! Serialized field names are camelCase so the JSON form of the model is
//! stable across consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Session Source
// ============================================

/// Which tool produced a session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    Claude,
    Copilot,
}

impl SessionSource {
    /// Returns the display name for this source
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionSource::Claude => "Claude Code",
            SessionSource::Copilot => "Copilot CLI",
        }
    }

    /// Returns the identifier used in cache keys and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionSource::Claude => "claude",
            SessionSource::Copilot => "copilot",
        }
    }

    /// All supported sources, in listing order.
    pub fn all() -> [SessionSource; 2] {
        [SessionSource::Claude, SessionSource::Copilot]
    }
}

impl std::fmt::Display for SessionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" | "Claude" => Ok(SessionSource::Claude),
            "copilot" | "Copilot" => Ok(SessionSource::Copilot),
            _ => Err(format!("unknown session source: {}", s)),
        }
    }
}

// ============================================
// Messages
// ============================================

/// Role of a message author within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Tool => "tool",
        }
    }
}

/// Token usage carried by a single message, when the source recorded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation: Option<u64>,
}

/// A model-issued request to invoke an external capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of a tool call. `tool_call_id` is a back-reference into the
/// tool-call id space, not an ownership edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_call_id: String,
    pub success: bool,
    pub content: String,
}

/// One normalized message within a session.
///
/// `parent_id` forms a tree via back-reference: a child looks up its parent
/// by id. Ids are log-emission-ordered, so the references can never cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub parent_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
}

// ============================================
// Statistics
// ============================================

/// Per-tool usage rollup. `name` is unique within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsageSummary {
    pub name: String,
    pub count: u64,
    pub success_rate: f64,
}

/// Token accounting for a session.
///
/// The three per-message sequences are parallel to each other but NOT to
/// `messages`: a message that carried no usage data contributes no entry, so
/// the sequences may be shorter than the message list. `cumulative_tokens`
/// is the running input+output total and is non-decreasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub total_input: u64,
    pub total_output: u64,
    pub total_cache_read: u64,
    pub total_cache_creation: u64,
    pub input_per_message: Vec<u64>,
    pub output_per_message: Vec<u64>,
    pub cumulative_tokens: Vec<u64>,
}

/// Aggregated statistics for a session.
///
/// The counts are derivable from `messages` but kept denormalized for cheap
/// reads. `tokens` is absent when the source format carries no usage data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub message_count: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenStats>,
    pub tools: Vec<ToolUsageSummary>,
    /// Total duration in milliseconds.
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_turn_duration: Option<f64>,
}

// ============================================
// Sessions
// ============================================

/// Lightweight listing record for a session.
///
/// Invariant: `last_activity >= start_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Unique within a source
    pub id: String,
    pub source: SessionSource,
    /// Display name (last component of `project_path`)
    pub project: String,
    pub project_path: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub message_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Full normalized session: summary fields plus the ordered message list
/// and derived statistics.
///
/// Constructed once per parse from an immutable snapshot of the log file and
/// never mutated; an update produces a fresh value that replaces the cached
/// one wholesale. Invariant: `message_count == messages.len()`; `messages`
/// keeps original log order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub id: String,
    pub source: SessionSource,
    pub project: String,
    pub project_path: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub message_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub stats: SessionStats,
    pub tool_usage: Vec<ToolUsageSummary>,
}

impl SessionDetail {
    /// Project a detail down to its listing fields.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            source: self.source,
            project: self.project.clone(),
            project_path: self.project_path.clone(),
            start_time: self.start_time,
            last_activity: self.last_activity,
            message_count: self.message_count,
            total_tokens: self.total_tokens,
            model: self.model.clone(),
        }
    }
}
