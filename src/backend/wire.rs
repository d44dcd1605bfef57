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

use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// `data:image/<type>;base64,..`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// One persisted turn, as returned by the server and as kept in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: String,
    #[serde(default, deserialize_with = "content_text")]
    pub content: String,
}

impl StoredMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_owned(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_owned(), content: content.into() }
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}

/// Content is either plain text or a list of typed parts; only text parts
/// are kept (attached images are not replayed from history).
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentRepr {
    Text(String),
    Parts(Vec<ContentPart>),
    Other(serde_json::Value),
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn content_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ContentRepr::deserialize(deserializer)? {
        ContentRepr::Text(text) => text,
        ContentRepr::Parts(parts) => parts
            .into_iter()
            .filter(|p| p.kind == "text")
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n"),
        ContentRepr::Other(serde_json::Value::Null) => String::new(),
        ContentRepr::Other(value) => value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationMessagesResponse {
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub first_message: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub message_count: u64,
}

impl ConversationSummary {
    /// Title if the server generated one, else the first message.
    #[must_use]
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.first_message.as_deref())
            .unwrap_or("(untitled)")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationListResponse {
    #[serde(default)]
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationResponse {
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateCodeRequest<'a> {
    pub code: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ValidateCodeResponse {
    #[serde(default)]
    pub valid: bool,
}

#[derive(Debug, Deserialize)]
pub struct UploadDocumentResponse {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearDocumentRequest<'a> {
    pub conversation_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chat_request_omits_absent_fields() {
        let req = ChatRequest { message: "hi".into(), image: None, conversation_id: None };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"message":"hi"}"#);

        let req = ChatRequest {
            message: "hi".into(),
            image: Some("data:image/png;base64,AA==".into()),
            conversation_id: Some("c1".into()),
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"message":"hi","image":"data:image/png;base64,AA==","conversation_id":"c1"}"#
        );
    }

    #[test]
    fn message_content_accepts_string_or_parts() {
        let body = r#"{"messages":[
            {"role":"user","content":"plain"},
            {"role":"user","content":[{"type":"text","text":"look"},{"type":"image_url","image_url":{"url":"x"}}]},
            {"role":"assistant","content":null}
        ]}"#;
        let parsed: ConversationMessagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.messages,
            vec![StoredMessage::user("plain"), StoredMessage::user("look"), StoredMessage::assistant("")]
        );
    }

    #[test]
    fn missing_messages_is_empty() {
        let parsed: ConversationMessagesResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.messages.is_empty());
    }

    #[test]
    fn clear_document_sends_null_without_conversation() {
        let body = serde_json::to_string(&ClearDocumentRequest { conversation_id: None }).unwrap();
        assert_eq!(body, r#"{"conversation_id":null}"#);
    }

    #[test]
    fn upload_response_tolerates_missing_fields() {
        let parsed: UploadDocumentResponse =
            serde_json::from_str(r#"{"success":true,"file_type":"pdf"}"#).unwrap();
        assert_eq!(parsed.filename, None);
        assert_eq!(parsed.message, None);
    }

    #[test]
    fn summary_label_prefers_title() {
        let summary: ConversationSummary = serde_json::from_str(
            r#"{"conversation_id":"a","title":"","first_message":"hello there","message_count":2}"#,
        )
        .unwrap();
        assert_eq!(summary.label(), "hello there");
    }
}
