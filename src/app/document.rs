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


//! Document context: one PDF or DOCX the server reads alongside the next
//! question. The server holds the extracted text; the client only tracks
//! the file name so it can pick the placeholder and show the indicator.

use super::attachment::{self, PREMIUM_DOCUMENT_NOTICE};
use super::conversation::background;
use super::effects::note_mutation;
use super::slash::push_system_message;
use super::state::{App, ChatMessage};
use crate::backend::ClientEvent;
use std::path::Path;

pub const DOCUMENT_CLEARED: &str =
    "Uploaded document cleared. You can upload a new document or continue chatting.";
pub const DOCUMENT_CLEARED_LOCALLY: &str = "Document cleared locally.";

/// `/doc <path>`: validate locally, then upload in the background.
pub fn upload_document(app: &mut App, path: &str) {
    if !app.has_premium() {
        push_system_message(app, PREMIUM_DOCUMENT_NOTICE);
        return;
    }
    let document = match attachment::load_document(Path::new(path)) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("document load failed: {e:#}");
            push_system_message(app, format!("Could not upload document: {e:#}"));
            return;
        }
    };
    let Some((client, tx)) = background(app) else {
        return;
    };
    push_system_message(app, format!("Uploading {}...", document.name));
    let conversation_id = app.conversation_id.clone();
    tokio::task::spawn_local(async move {
        let result = client
            .upload_document(
                &document.name,
                document.mime,
                document.bytes,
                conversation_id.as_deref(),
            )
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(ClientEvent::DocumentUploaded { name: document.name, result });
    });
}

pub fn handle_document_uploaded(app: &mut App, name: String, result: Result<String, String>) {
    match result {
        Ok(message) => {
            tracing::info!(document = %name, "document uploaded");
            app.active_document = Some(name);
            app.messages.push(ChatMessage::assistant(message));
            note_mutation(app, true);
        }
        Err(e) => {
            tracing::warn!(document = %name, "document upload failed: {e}");
            push_system_message(app, format!("Error: {e}"));
        }
    }
}

/// `/doc` with no argument: forget the document here and on the server.
pub fn clear_document(app: &mut App) {
    if app.active_document.take().is_none() {
        push_system_message(app, "No document uploaded. Usage: /doc <path>");
        return;
    }
    let Some((client, tx)) = background(app) else {
        return;
    };
    let conversation_id = app.conversation_id.clone();
    tokio::task::spawn_local(async move {
        let result =
            client.clear_document(conversation_id.as_deref()).await.map_err(|e| e.to_string());
        let _ = tx.send(ClientEvent::DocumentCleared(result));
    });
}

pub fn handle_document_cleared(app: &mut App, result: Result<(), String>) {
    match result {
        Ok(()) => app.messages.push(ChatMessage::assistant(DOCUMENT_CLEARED)),
        Err(e) => {
            tracing::error!("failed to clear document on server: {e}");
            app.messages.push(ChatMessage::assistant(DOCUMENT_CLEARED_LOCALLY));
        }
    }
    note_mutation(app, true);
}

/// A completed answer has used the document; release it quietly.
pub(super) fn release_after_answer(app: &mut App) {
    let Some(name) = app.active_document.take() else {
        return;
    };
    tracing::debug!(document = %name, "releasing document after answer");
    let Some(client) = app.client.clone() else {
        return;
    };
    let conversation_id = app.conversation_id.clone();
    tokio::task::spawn_local(async move {
        if let Err(e) = client.clear_document(conversation_id.as_deref()).await {
            tracing::warn!("failed to release document: {e}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::MessageBlock;
    use pretty_assertions::assert_eq;

    fn last_text(app: &App) -> &str {
        match app.messages.last().and_then(|m| m.blocks.first()) {
            Some(MessageBlock::Text(text, _)) => text,
            Some(MessageBlock::Answer(answer)) => &answer.markdown,
            _ => "",
        }
    }

    #[test]
    fn upload_requires_premium() {
        let mut app = App::test_default();
        upload_document(&mut app, "report.pdf");
        assert_eq!(last_text(&app), PREMIUM_DOCUMENT_NOTICE);
        assert_eq!(app.active_document, None);
    }

    #[test]
    fn unsupported_document_is_rejected_locally() {
        let mut app = App::test_default();
        app.credentials.premium = true;
        upload_document(&mut app, "notes.doc");
        assert!(last_text(&app).starts_with("Could not upload document: .doc files"));
    }

    #[test]
    fn successful_upload_activates_document() {
        let mut app = App::test_default();
        handle_document_uploaded(&mut app, "report.pdf".into(), Ok("Document ready.".into()));
        assert_eq!(app.active_document.as_deref(), Some("report.pdf"));
        assert_eq!(last_text(&app), "Document ready.");
    }

    #[test]
    fn failed_upload_leaves_no_document() {
        let mut app = App::test_default();
        handle_document_uploaded(
            &mut app,
            "report.pdf".into(),
            Err("Document upload is only available for premium users.".into()),
        );
        assert_eq!(app.active_document, None);
        assert_eq!(last_text(&app), "Error: Document upload is only available for premium users.");
    }

    #[test]
    fn clearing_without_a_document_shows_usage() {
        let mut app = App::test_default();
        clear_document(&mut app);
        assert_eq!(last_text(&app), "No document uploaded. Usage: /doc <path>");
    }

    #[test]
    fn clear_result_is_reported_either_way() {
        let mut app = App::test_default();
        handle_document_cleared(&mut app, Ok(()));
        assert_eq!(last_text(&app), DOCUMENT_CLEARED);
        handle_document_cleared(&mut app, Err("Network error".into()));
        assert_eq!(last_text(&app), DOCUMENT_CLEARED_LOCALLY);
    }

    #[test]
    fn release_without_client_just_forgets() {
        let mut app = App::test_default();
        app.active_document = Some("report.pdf".into());
        release_after_answer(&mut app);
        assert_eq!(app.active_document, None);
    }
}
