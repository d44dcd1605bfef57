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

//! Conversation switching (stale-while-revalidate) and the other
//! conversation-level server calls.

use super::effects::note_mutation;
use super::slash::push_system_message;
use super::state::{App, ChatMessage, PendingSwitch};
use super::submit::supersede_active_session;
use crate::backend::{ChatClient, ClientEvent, ConversationSummary, StoredMessage};
use tokio::sync::mpsc;

pub const GREETING: &str = "New conversation started! How can I help you?";
pub const CONTEXT_CLEARED: &str = "Chat history cleared! How can I help you today?";

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// How fetched history is merged into what the cache already rendered.
/// Length-based: a fetched list that differs in content but not in
/// length is not detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing was rendered from cache; render everything fetched.
    Replace,
    /// Render only messages past this index.
    AppendSuffix(usize),
    Keep,
}

#[must_use]
pub fn reconcile(cached_len: Option<usize>, fetched_len: usize) -> Reconciliation {
    match cached_len {
        None => Reconciliation::Replace,
        Some(n) if fetched_len > n => Reconciliation::AppendSuffix(n),
        Some(_) => Reconciliation::Keep,
    }
}

/// Show `id`: cached messages now, the server's copy when it lands.
pub fn switch_conversation(app: &mut App, id: &str) {
    let id = id.trim();
    if id.is_empty() {
        return;
    }
    supersede_active_session(app);
    reset_view(app);
    app.conversation_id = Some(id.to_owned());

    let cached_len = app.cache.get(id).map(|messages| {
        render_history(app, &messages);
        messages.len()
    });
    tracing::info!(conversation = %id, cached = ?cached_len, "switching conversation");
    app.pending_switch = Some(PendingSwitch { conversation_id: id.to_owned(), cached_len });
    note_mutation(app, true);

    let Some((client, tx)) = background(app) else {
        return;
    };
    let conversation_id = id.to_owned();
    tokio::task::spawn_local(async move {
        let result =
            client.conversation_messages(&conversation_id).await.map_err(|e| e.to_string());
        let _ = tx.send(ClientEvent::ConversationLoaded { conversation_id, result });
    });
}

pub fn handle_conversation_loaded(
    app: &mut App,
    conversation_id: &str,
    result: Result<Vec<StoredMessage>, String>,
) {
    let Some(pending) = app.pending_switch.take_if(|p| p.conversation_id == conversation_id) else {
        tracing::debug!(conversation = %conversation_id, "discarding history for a conversation no longer shown");
        return;
    };

    let messages = match result {
        Ok(messages) => messages,
        Err(e) => {
            tracing::error!(conversation = %conversation_id, "failed to load conversation: {e}");
            if pending.cached_len.is_none() {
                push_system_message(app, &format!("Failed to load conversation: {e}"));
            }
            return;
        }
    };

    match reconcile(pending.cached_len, messages.len()) {
        Reconciliation::Replace if messages.is_empty() => {
            app.messages.push(ChatMessage::assistant(GREETING));
        }
        Reconciliation::Replace => render_history(app, &messages),
        Reconciliation::AppendSuffix(n) => render_history(app, &messages[n..]),
        Reconciliation::Keep => {}
    }
    if !messages.is_empty() {
        app.cache.put(conversation_id, messages);
    }
    note_mutation(app, true);
}

/// Anything the server did not tag as the user is shown as the assistant.
pub fn render_history(app: &mut App, messages: &[StoredMessage]) {
    app.messages.extend(messages.iter().map(|m| {
        if m.is_user() {
            ChatMessage::user(m.content.as_str())
        } else {
            ChatMessage::assistant(strip_think_blocks(&m.content))
        }
    }));
}

/// Remove `<think>..</think>` spans; an unclosed span runs to the end.
#[must_use]
pub fn strip_think_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(THINK_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + THINK_OPEN.len()..];
        match after.find(THINK_CLOSE) {
            Some(end) => rest = &after[end + THINK_CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out.trim().to_owned()
}

pub fn new_conversation(app: &mut App) {
    let Some((client, tx)) = background(app) else {
        return;
    };
    tokio::task::spawn_local(async move {
        let result = client.create_conversation().await.map_err(|e| e.to_string());
        let _ = tx.send(ClientEvent::ConversationCreated(result));
    });
}

pub fn handle_conversation_created(app: &mut App, result: Result<String, String>) {
    match result {
        Ok(id) => switch_conversation(app, &id),
        Err(e) => push_system_message(app, &format!("Failed to create conversation: {e}")),
    }
}

pub fn list_conversations(app: &mut App) {
    let Some((client, tx)) = background(app) else {
        return;
    };
    tokio::task::spawn_local(async move {
        let result = client.list_conversations().await.map_err(|e| e.to_string());
        let _ = tx.send(ClientEvent::ConversationsListed(result));
    });
}

pub fn handle_conversations_listed(app: &mut App, result: Result<Vec<ConversationSummary>, String>) {
    match result {
        Ok(list) if list.is_empty() => push_system_message(app, "No conversations yet."),
        Ok(list) => {
            let current = app.conversation_id.as_deref();
            let mut text = String::from("Conversations:");
            for conv in &list {
                let marker = if current == Some(conv.conversation_id.as_str()) { "*" } else { " " };
                text.push_str(&format!(
                    "\n{marker} {}  {}  ({} messages)",
                    conv.conversation_id,
                    conv.label(),
                    conv.message_count
                ));
            }
            text.push_str("\nUse /open <id> to switch.");
            push_system_message(app, &text);
        }
        Err(e) => push_system_message(app, &format!("Failed to list conversations: {e}")),
    }
}

pub fn delete_conversation(app: &mut App, id: &str) {
    let Some((client, tx)) = background(app) else {
        return;
    };
    let conversation_id = id.to_owned();
    tokio::task::spawn_local(async move {
        let result = client.delete_conversation(&conversation_id).await.map_err(|e| e.to_string());
        let _ = tx.send(ClientEvent::ConversationDeleted { conversation_id, result });
    });
}

pub fn handle_conversation_deleted(app: &mut App, conversation_id: &str, result: Result<(), String>) {
    if let Err(e) = result {
        push_system_message(app, &format!("Failed to delete conversation: {e}"));
        return;
    }
    app.cache.remove(conversation_id);
    if app.conversation_id.as_deref() == Some(conversation_id) {
        supersede_active_session(app);
        reset_view(app);
        app.conversation_id = None;
    }
    push_system_message(app, &format!("Deleted conversation {conversation_id}."));
}

pub fn clear_context(app: &mut App) {
    let Some((client, tx)) = background(app) else {
        return;
    };
    tokio::task::spawn_local(async move {
        let result = client.clear_context().await.map_err(|e| e.to_string());
        let _ = tx.send(ClientEvent::ContextCleared(result));
    });
}

pub fn handle_context_cleared(app: &mut App, result: Result<(), String>) {
    match result {
        Ok(()) => {
            app.pending_image = None;
            reset_view(app);
            app.messages.push(ChatMessage::assistant(CONTEXT_CLEARED));
            note_mutation(app, true);
        }
        Err(e) => push_system_message(app, &format!("Error: {e}")),
    }
}

fn reset_view(app: &mut App) {
    app.messages.clear();
    app.pending_switch = None;
    app.scroll_target = 0;
    app.scroll_offset = 0;
    app.scroll_pos = 0.0;
    app.scroll.reset_for_session();
}

/// Client and event sender for a background call, or a notice when offline.
pub(super) fn background(app: &mut App) -> Option<(ChatClient, mpsc::UnboundedSender<ClientEvent>)> {
    if let Some(client) = app.client.clone() {
        Some((client, app.event_tx.clone()))
    } else {
        push_system_message(app, "Not connected to a server.");
        None
    }
}
