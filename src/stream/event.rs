// streamchat - A terminal chat client for streaming model endpoints
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde_json::Value;

pub const DATA_PREFIX: &str = "data:";

/// Terminator some servers append after the last record.
const DONE_SENTINEL: &str = "[DONE]";

/// A typed record from the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Thinking { chunk: String },
    Content { chunk: String },
    Done { conversation_id: Option<String> },
    Error { message: String },
}

/// One decoded `data:` record. The server stamps `conversation_id` on every
/// payload, so it is carried even when the payload itself is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: Option<StreamEvent>,
    pub conversation_id: Option<String>,
}

impl Frame {
    #[must_use]
    pub fn new(event: StreamEvent) -> Self {
        let conversation_id = match &event {
            StreamEvent::Done { conversation_id } => conversation_id.clone(),
            _ => None,
        };
        Self { event: Some(event), conversation_id }
    }

    #[must_use]
    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }
}

/// Classify a single line into a stream event, dropping anything else.
pub fn classify(line: &str) -> Option<StreamEvent> {
    classify_frame(line)?.event
}

pub fn classify_frame(line: &str) -> Option<Frame> {
    let payload = data_payload(line)?;
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, line, "dropping malformed stream record");
            return None;
        }
    };
    if !value.is_object() {
        tracing::debug!(line, "dropping non-object stream record");
        return None;
    }

    let conversation_id = value.get("conversation_id").and_then(id_string);
    let event = event_from_payload(&value, conversation_id.as_ref());
    if event.is_none() {
        tracing::debug!(line, "stream record has no recognized type");
    }
    Some(Frame { event, conversation_id })
}

/// Strip the `data:` prefix (plus one optional space). Blank lines, other
/// fields and the `[DONE]` sentinel yield `None` without a diagnostic.
fn data_payload(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let rest = line.strip_prefix(DATA_PREFIX)?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    if rest.trim().is_empty() || rest.trim() == DONE_SENTINEL {
        return None;
    }
    Some(rest)
}

fn event_from_payload(value: &Value, conversation_id: Option<&String>) -> Option<StreamEvent> {
    // An error wins over whatever `type` says.
    if let Some(message) = value.get("error").and_then(error_message) {
        return Some(StreamEvent::Error { message });
    }

    let chunk = || value.get("chunk").and_then(Value::as_str).map(str::to_owned);
    match value.get("type").and_then(Value::as_str) {
        Some("thinking") => return chunk().map(|chunk| StreamEvent::Thinking { chunk }),
        Some("content") => return chunk().map(|chunk| StreamEvent::Content { chunk }),
        Some("done") => {
            return Some(StreamEvent::Done { conversation_id: conversation_id.cloned() });
        }
        _ => {}
    }

    if value.get("done").and_then(Value::as_bool) == Some(true) {
        return Some(StreamEvent::Done { conversation_id: conversation_id.cloned() });
    }
    None
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => Some(
            map.get("message").and_then(Value::as_str).map_or_else(|| value.to_string(), str::to_owned),
        ),
        other => Some(other.to_string()),
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
