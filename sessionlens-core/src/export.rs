//! Session export to CSV and JSON.
//!
//! CSV export is a per-message flat table aimed at spreadsheets; JSON export
//! is the canonical model serialized verbatim.

use crate::error::Result;
use crate::types::{SessionDetail, SessionSummary};

/// Render a session's messages as CSV, one row per message.
///
/// Token columns render as `0` for messages that carried no usage data.
/// Tool columns are filled from the first tool call on the message, or from
/// the tool result for tool messages.
pub fn export_to_csv(detail: &SessionDetail) -> String {
    let mut out = String::new();
    out.push_str(
        "timestamp,role,content,input_tokens,output_tokens,cache_read,cache_creation,tool_name,tool_success\n",
    );

    for message in &detail.messages {
        let (input, output, cache_read, cache_creation) = match &message.tokens {
            Some(tokens) => (
                tokens.input,
                tokens.output,
                tokens.cache_read.unwrap_or(0),
                tokens.cache_creation.unwrap_or(0),
            ),
            None => (0, 0, 0, 0),
        };

        let tool_name = message
            .tool_calls
            .as_ref()
            .and_then(|calls| calls.first())
            .map(|call| call.name.clone())
            .or_else(|| {
                message
                    .tool_result
                    .as_ref()
                    .map(|result| result.tool_call_id.clone())
            })
            .unwrap_or_default();

        let tool_success = message
            .tool_result
            .as_ref()
            .map(|result| result.success.to_string())
            .unwrap_or_default();

        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            message.timestamp.to_rfc3339(),
            message.role.as_str(),
            escape_csv(&message.content),
            input,
            output,
            cache_read,
            cache_creation,
            escape_csv(&tool_name),
            tool_success,
        ));
    }

    out
}

/// Serialize the full session as pretty-printed JSON.
pub fn export_to_json(detail: &SessionDetail) -> Result<String> {
    Ok(serde_json::to_string_pretty(detail)?)
}

/// Serialize just the listing record as pretty-printed JSON.
pub fn export_summary_to_json(summary: &SessionSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

/// Make a value safe for one CSV cell.
///
/// Newlines flatten to spaces so a message never spans rows. Quoting is
/// applied only when the value needs it.
fn escape_csv(value: &str) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    if flattened.contains(',') || flattened.contains('"') {
        format!("\"{}\"", flattened.replace('"', "\"\""))
    } else {
        flattened
    }
}
