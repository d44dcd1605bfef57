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

use super::conversation;
use super::document;
use super::effects::drive_session;
use super::slash;
use super::state::{App, MessageBlock};
use super::submit::{request_cancel, submit_input};
use crate::backend::ClientEvent;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};

const MOUSE_SCROLL_LINES: usize = 3;

pub fn handle_terminal_event(app: &mut App, event: Event) {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Paste(text) => app.input.insert_str(&text),
        // Resize is handled automatically by ratatui
        _ => {}
    }
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => scroll_up(app, MOUSE_SCROLL_LINES),
        MouseEventKind::ScrollDown => scroll_down(app, MOUSE_SCROLL_LINES),
        _ => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match (key.code, key.modifiers) {
        // Ctrl+C: stop any active response, then quit
        (KeyCode::Char('c'), _) if ctrl => {
            request_cancel(app);
            app.should_quit = true;
        }
        (KeyCode::Esc, _) => {
            request_cancel(app);
        }
        (KeyCode::Enter, m) if !m.contains(KeyModifiers::SHIFT) => submit_input(app),
        (KeyCode::Enter, _) => app.input.insert_newline(),
        (KeyCode::Up, _) if ctrl => scroll_up(app, 1),
        (KeyCode::Down, _) if ctrl => scroll_down(app, 1),
        (KeyCode::PageUp, _) => scroll_up(app, page(app)),
        (KeyCode::PageDown, _) => scroll_down(app, page(app)),
        (KeyCode::Left, _) => app.input.move_left(),
        (KeyCode::Right, _) => app.input.move_right(),
        (KeyCode::Up, _) => app.input.move_up(),
        (KeyCode::Down, _) => app.input.move_down(),
        (KeyCode::Home, _) => app.input.move_home(),
        (KeyCode::End, _) => app.input.move_end(),
        // Ctrl+O: collapse/expand every reasoning region
        (KeyCode::Char('o'), _) if ctrl => toggle_reasoning(app),
        // Ctrl+L: force full terminal redraw
        (KeyCode::Char('l'), _) if ctrl => app.force_redraw = true,
        (KeyCode::Backspace, _) => app.input.delete_char_before(),
        (KeyCode::Delete, _) => app.input.delete_char_after(),
        (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => app.input.insert_char(c),
        _ => {}
    }
}

fn page(app: &App) -> usize {
    app.chat_metrics.viewport_height.saturating_sub(1).max(1)
}

fn scroll_up(app: &mut App, rows: usize) {
    app.scroll_target = app.scroll_target.saturating_sub(rows);
    after_user_scroll(app);
}

fn scroll_down(app: &mut App, rows: usize) {
    app.scroll_target = app.scroll_target.saturating_add(rows).min(app.chat_metrics.max_offset());
    after_user_scroll(app);
}

fn after_user_scroll(app: &mut App) {
    // The user's scroll wins over a jump that has not been applied yet.
    app.pending_scroll_to_bottom = false;
    // Later mutations in this loop pass must measure from where the user went.
    app.chat_metrics.offset = app.scroll_target;
    app.scroll.on_scroll_event(app.loading, app.chat_metrics);
}

fn toggle_reasoning(app: &mut App) {
    app.reasoning_collapsed = !app.reasoning_collapsed;
    for msg in &mut app.messages {
        for block in &mut msg.blocks {
            if let MessageBlock::Reasoning(reasoning) = block {
                reasoning.cache.invalidate();
            }
        }
    }
}

pub fn handle_client_event(app: &mut App, event: ClientEvent) {
    match event {
        ClientEvent::Exchange { exchange, input } => {
            let current = app.session.as_ref().map(crate::stream::StreamSession::exchange_id);
            if current == Some(exchange) {
                drive_session(app, input);
            } else {
                tracing::debug!(exchange = exchange.0, ?input, "dropping input for superseded exchange");
            }
        }
        ClientEvent::ConversationLoaded { conversation_id, result } => {
            conversation::handle_conversation_loaded(app, &conversation_id, result);
        }
        ClientEvent::ConversationsListed(result) => {
            conversation::handle_conversations_listed(app, result);
        }
        ClientEvent::ConversationCreated(result) => {
            conversation::handle_conversation_created(app, result);
        }
        ClientEvent::ConversationDeleted { conversation_id, result } => {
            conversation::handle_conversation_deleted(app, &conversation_id, result);
        }
        ClientEvent::AccessCodeValidated { code, result } => {
            slash::handle_access_code_validated(app, &code, result);
        }
        ClientEvent::ContextCleared(result) => conversation::handle_context_cleared(app, result),
        ClientEvent::DocumentUploaded { name, result } => {
            document::handle_document_uploaded(app, name, result);
        }
        ClientEvent::DocumentCleared(result) => document::handle_document_cleared(app, result),
    }
}
