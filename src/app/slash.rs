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

use super::attachment::{self, PREMIUM_IMAGE_NOTICE};
use super::conversation;
use super::document;
use super::effects::note_mutation;
use super::state::{App, ChatMessage};
use super::submit::request_cancel;
use crate::backend::ClientEvent;
use std::path::Path;

pub const COMMANDS: &[(&str, &str)] = &[
    ("/new", "Start a new conversation"),
    ("/open <id>", "Switch to a conversation"),
    ("/list", "List your conversations"),
    ("/delete <id>", "Delete a conversation"),
    ("/login <code>", "Unlock premium features with an access code"),
    ("/logout", "Forget the access code"),
    ("/clear", "Clear the server-side chat context"),
    ("/image <path>", "Attach an image to the next message"),
    ("/doc <path>", "Upload a PDF or DOCX for the next question; /doc alone removes it"),
    ("/save <n> <path>", "Write code block n of the last answer to a file"),
    ("/cancel", "Stop the current response"),
    ("/help", "Show this list"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedSlash<'a> {
    name: &'a str,
    args: Vec<&'a str>,
}

fn parse(text: &str) -> Option<ParsedSlash<'_>> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let mut parts = trimmed.split_whitespace();
    let name = parts.next()?;
    Some(ParsedSlash { name, args: parts.collect() })
}

pub fn push_system_message(app: &mut App, text: impl Into<String>) {
    app.messages.push(ChatMessage::system(text));
    note_mutation(app, true);
}

/// Returns `true` when `text` was a slash command (handled or rejected).
pub fn try_handle_submit(app: &mut App, text: &str) -> bool {
    let Some(parsed) = parse(text) else {
        return false;
    };

    match (parsed.name, parsed.args.as_slice()) {
        ("/new", []) => conversation::new_conversation(app),
        ("/open", [id]) => conversation::switch_conversation(app, id),
        ("/list", []) => conversation::list_conversations(app),
        ("/delete", [id]) => conversation::delete_conversation(app, id),
        ("/login", [code]) => login(app, code),
        ("/logout", []) => {
            app.credentials.clear(app.credential_store.as_mut());
            if let Some(client) = app.client.as_mut() {
                client.set_access_code(None);
            }
            push_system_message(app, "Access code removed.");
        }
        ("/clear", []) => conversation::clear_context(app),
        ("/image", [_, ..]) => attach_image(app, &parsed.args.join(" ")),
        ("/image", []) => match app.pending_image.take() {
            Some(image) => push_system_message(app, format!("Removed attachment {}.", image.name)),
            None => push_system_message(app, "Usage: /image <path>"),
        },
        ("/doc", [_, ..]) => document::upload_document(app, &parsed.args.join(" ")),
        ("/doc", []) => document::clear_document(app),
        ("/save", [n, path @ ..]) if !path.is_empty() => save_code_block(app, n, &path.join(" ")),
        ("/cancel", []) => {
            if !request_cancel(app) {
                push_system_message(app, "Cannot cancel: no active response.");
            }
        }
        ("/help", []) => push_system_message(app, help_text()),
        (name, _) if COMMANDS.iter().any(|(usage, _)| usage.split(' ').next() == Some(name)) => {
            let usage = COMMANDS
                .iter()
                .find(|(usage, _)| usage.split(' ').next() == Some(name))
                .map_or(name, |(usage, _)| *usage);
            push_system_message(app, format!("Usage: {usage}"));
        }
        (name, _) => push_system_message(app, format!("Unknown command: {name}. Try /help.")),
    }
    true
}

fn help_text() -> String {
    let width = COMMANDS.iter().map(|(usage, _)| usage.len()).max().unwrap_or(0);
    let mut text = String::from("Commands:");
    for (usage, description) in COMMANDS {
        text.push_str(&format!("\n  {usage:<width$}  {description}"));
    }
    text.push_str(
        "\nKeys: Enter send, Shift+Enter newline, Esc stop, Ctrl+O toggle reasoning, Ctrl+C quit",
    );
    text
}

fn login(app: &mut App, code: &str) {
    let Some((client, tx)) = conversation::background(app) else {
        return;
    };
    let code = code.to_owned();
    tokio::task::spawn_local(async move {
        let result = client.validate_code(&code).await.map_err(|e| e.to_string());
        let _ = tx.send(ClientEvent::AccessCodeValidated { code, result });
    });
}

pub fn handle_access_code_validated(app: &mut App, code: &str, result: Result<bool, String>) {
    match result {
        Ok(true) => {
            app.credentials.save_access_code(app.credential_store.as_mut(), code);
            if let Some(client) = app.client.as_mut() {
                client.set_access_code(Some(code.to_owned()));
            }
            tracing::info!("access code accepted");
            push_system_message(app, "Premium features unlocked.");
        }
        Ok(false) => push_system_message(app, "Invalid access code."),
        Err(e) => push_system_message(app, format!("Failed to validate code: {e}")),
    }
}

fn attach_image(app: &mut App, path: &str) {
    if !app.has_premium() {
        push_system_message(app, PREMIUM_IMAGE_NOTICE);
        return;
    }
    match attachment::load_image(Path::new(path)) {
        Ok(image) => {
            let notice = format!("Attached {}; it will be sent with your next message.", image.name);
            app.pending_image = Some(image);
            push_system_message(app, notice);
        }
        Err(e) => {
            tracing::warn!("image attach failed: {e:#}");
            push_system_message(app, format!("Could not attach image: {e:#}"));
        }
    }
}

fn save_code_block(app: &mut App, n: &str, path: &str) {
    let Ok(index) = n.parse::<usize>() else {
        push_system_message(app, "Usage: /save <n> <path>");
        return;
    };
    let block = app
        .last_code_blocks()
        .and_then(|blocks| index.checked_sub(1).and_then(|i| blocks.get(i)))
        .cloned();
    let Some(block) = block else {
        push_system_message(app, format!("No code block {index} in the last answer."));
        return;
    };
    match std::fs::write(path, &block.code) {
        Ok(()) => push_system_message(app, format!("Saved code block {index} to {path}.")),
        Err(e) => push_system_message(app, format!("Failed to save {path}: {e}")),
    }
}
