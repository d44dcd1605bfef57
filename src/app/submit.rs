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

use super::effects::{apply_effects, drive_session, note_mutation};
use super::slash;
use super::state::{App, ChatMessage};
use crate::backend::ChatRequest;
use crate::backend::driver::spawn_exchange;
use crate::stream::{ExchangeId, Placeholder, SessionInput, SessionStatus, StreamSession};
use tokio_util::sync::CancellationToken;

pub fn submit_input(app: &mut App) {
    let text = app.input.text();
    if text.trim().is_empty() {
        return;
    }
    app.input.clear();

    if slash::try_handle_submit(app, &text) {
        return;
    }
    send_message(app, text.trim());
}

/// Start a new exchange. Returns its id, or `None` for blank text.
pub fn send_message(app: &mut App, text: &str) -> Option<ExchangeId> {
    if text.trim().is_empty() {
        return None;
    }
    supersede_active_session(app);

    app.messages.push(ChatMessage::user(text));
    app.scroll.reset_for_session();
    note_mutation(app, true);

    let exchange = app.allocate_exchange();
    let token = CancellationToken::new();
    let image = app.pending_image.take();
    let placeholder = if image.is_some() {
        Placeholder::AnalyzingImage
    } else if app.active_document.is_some() {
        Placeholder::AnalyzingDocument
    } else {
        Placeholder::Thinking
    };

    let mut session =
        StreamSession::new(exchange, text, app.conversation_id.clone(), token.clone());
    let effects = session.begin(placeholder);
    apply_effects(app, &session, effects);
    app.session = Some(session);

    let Some(client) = app.client.clone() else {
        tracing::debug!(exchange = exchange.0, "no client configured; exchange left awaiting");
        return Some(exchange);
    };
    let request = ChatRequest {
        message: text.to_owned(),
        image: image.map(|img| img.data_uri),
        conversation_id: app.conversation_id.clone(),
    };
    tracing::info!(
        exchange = exchange.0,
        conversation = ?request.conversation_id,
        with_image = request.image.is_some(),
        "sending message"
    );
    spawn_exchange(client, request, exchange, token, app.event_tx.clone());
    Some(exchange)
}

/// Esc: stop the active exchange, if any.
pub fn request_cancel(app: &mut App) -> bool {
    if !app.is_streaming() {
        return false;
    }
    drive_session(app, SessionInput::CancelRequested);
    true
}

/// A new send takes over the loading affordances. The old reader keeps
/// running; its events no longer match the current exchange and are dropped.
pub(super) fn supersede_active_session(app: &mut App) {
    let Some(old) = app.session.take() else {
        return;
    };
    tracing::info!(exchange = old.exchange_id().0, status = ?old.status(), "session superseded");
    app.render_queue.cancel();
    if let Some(msg) = app.streaming_message.take().and_then(|i| app.messages.get_mut(i)) {
        msg.blocks.retain(|b| !matches!(b, super::MessageBlock::Placeholder(_)));
        if !old.content().is_empty() {
            msg.blocks.retain(|b| !matches!(b, super::MessageBlock::Answer(_)));
            msg.blocks.push(super::MessageBlock::Answer(super::AnswerBlock::finalized(
                old.content().to_owned(),
            )));
        }
        if old.status() == SessionStatus::Cancelling {
            msg.blocks.push(super::MessageBlock::Stopped);
        }
    }
    app.loading = false;
}
