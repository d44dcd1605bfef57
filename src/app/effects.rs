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

//! Executes session effects against the message list.

use super::scroll::ScrollAction;
use super::state::{AnswerBlock, App, ChatMessage, MessageBlock, ReasoningBlock};
use crate::backend::StoredMessage;
use crate::stream::{Effect, SessionInput, StreamSession};

/// Collapses any number of content-render requests within one frame into a
/// single re-render of the latest buffer.
#[derive(Debug, Default)]
pub struct RenderCoalescer {
    pending: bool,
    coalesced: usize,
}

impl RenderCoalescer {
    pub fn schedule(&mut self) {
        if self.pending {
            self.coalesced += 1;
        }
        self.pending = true;
    }

    /// Returns whether a render was pending, clearing it.
    pub fn take(&mut self) -> bool {
        if self.pending && self.coalesced > 0 {
            tracing::trace!(coalesced = self.coalesced, "content renders coalesced");
        }
        self.coalesced = 0;
        std::mem::take(&mut self.pending)
    }

    pub fn cancel(&mut self) {
        self.pending = false;
        self.coalesced = 0;
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Ask the scroll tracker about a mutation. A bottom jump is deferred to the
/// next render pass, where the new content height is known.
pub fn note_mutation(app: &mut App, force: bool) {
    let action = app.scroll.on_mutation(force, app.loading, app.chat_metrics);
    if action == ScrollAction::ScrollToBottom {
        app.pending_scroll_to_bottom = true;
    }
}

/// Render the latest content buffer if a render was scheduled. Called once
/// per frame, before drawing.
pub fn flush_pending_render(app: &mut App) {
    if !app.render_queue.take() {
        return;
    }
    let Some(session) = app.session.as_ref() else {
        return;
    };
    let Some(msg) = app.streaming_message.and_then(|i| app.messages.get_mut(i)) else {
        return;
    };
    if let Some(answer) = ensure_answer(msg) {
        answer.set_markdown(session.content());
    }
    note_mutation(app, false);
}

/// Feed one input to the current session and execute what it asks for.
/// The session is dropped once it reaches a terminal state.
pub fn drive_session(app: &mut App, input: SessionInput) {
    let Some(mut session) = app.session.take() else {
        return;
    };
    let effects = session.apply(input);
    apply_effects(app, &session, effects);
    if session.status().is_terminal() {
        tracing::debug!(exchange = session.exchange_id().0, status = ?session.status(), "session retired");
    } else {
        app.session = Some(session);
    }
}

pub fn apply_effects(app: &mut App, session: &StreamSession, effects: Vec<Effect>) {
    for effect in effects {
        apply_effect(app, session, effect);
    }
}

#[allow(clippy::too_many_lines)]
fn apply_effect(app: &mut App, session: &StreamSession, effect: Effect) {
    match effect {
        Effect::ShowPlaceholder(kind) => {
            app.messages.push(ChatMessage::placeholder(kind));
            app.streaming_message = Some(app.messages.len() - 1);
            app.loading = true;
            note_mutation(app, true);
        }
        Effect::BeginAnswer => {
            if let Some(msg) = streaming_msg(app) {
                let _ = ensure_answer(msg);
            }
            note_mutation(app, false);
        }
        Effect::AssignConversation(id) => {
            if app.conversation_id.is_none() {
                tracing::info!(conversation = %id, "conversation assigned by server");
                app.conversation_id = Some(id);
            }
        }
        Effect::OpenReasoning => {
            if let Some(msg) = streaming_msg(app)
                && msg.reasoning().is_none()
            {
                msg.blocks.insert(0, MessageBlock::Reasoning(ReasoningBlock::default()));
            }
        }
        Effect::RenderReasoning => {
            if let Some(reasoning) = streaming_msg(app).and_then(ChatMessage::reasoning_mut) {
                session.thinking().clone_into(&mut reasoning.text);
                reasoning.cache.invalidate();
            }
            note_mutation(app, false);
        }
        Effect::ScheduleContentRender => app.render_queue.schedule(),
        Effect::Finalize => finalize(app, session),
        Effect::ShowError(message) => {
            app.render_queue.cancel();
            if let Some(msg) = streaming_msg(app) {
                msg.blocks = vec![MessageBlock::Error(message)];
            } else {
                app.messages.push(ChatMessage {
                    role: super::MessageRole::Assistant,
                    blocks: vec![MessageBlock::Error(message)],
                });
            }
            note_mutation(app, false);
        }
        Effect::ClearLoading => {
            app.loading = false;
            app.streaming_message = None;
        }
        Effect::CloseReader => {
            tracing::debug!(exchange = session.exchange_id().0, "reader close requested");
        }
        Effect::NotifyCancel => {
            if let Some(client) = app.client.clone() {
                app.cancel_notify = Some(tokio::task::spawn_local(async move {
                    if let Err(e) = client.cancel_stream().await {
                        tracing::error!("failed to notify server of cancel: {e}");
                    }
                }));
            }
        }
        Effect::AppendStoppedMarker => {
            app.render_queue.cancel();
            if let Some(msg) = streaming_msg(app) {
                msg.blocks.retain(|b| !matches!(b, MessageBlock::Placeholder(_)));
                if !session.content().is_empty()
                    && let Some(answer) = ensure_answer(msg)
                {
                    answer.set_markdown(session.content());
                }
                msg.blocks.push(MessageBlock::Stopped);
            } else {
                app.messages.push(ChatMessage {
                    role: super::MessageRole::Assistant,
                    blocks: vec![MessageBlock::Stopped],
                });
            }
            note_mutation(app, false);
        }
    }
}

fn finalize(app: &mut App, session: &StreamSession) {
    app.render_queue.cancel();
    let conversation_id =
        session.conversation_id().map(str::to_owned).or_else(|| app.conversation_id.clone());

    if let Some(answer) = streaming_msg(app).and_then(ensure_answer) {
        answer.set_markdown(session.content());
        if answer.code_blocks.is_none() {
            answer.code_blocks = Some(crate::ui::markdown::extract_code_blocks(&answer.markdown));
        }
        answer.conversation_id.clone_from(&conversation_id);
        answer.finalized = true;
    }

    if let Some(id) = conversation_id.as_deref() {
        app.cache.append(
            id,
            &[StoredMessage::user(session.prompt()), StoredMessage::assistant(session.content())],
        );
    }
    super::document::release_after_answer(app);
    note_mutation(app, false);
}

fn streaming_msg(app: &mut App) -> Option<&mut ChatMessage> {
    app.streaming_message.and_then(|i| app.messages.get_mut(i))
}

/// The message's answer block, replacing the placeholder if needed.
fn ensure_answer(msg: &mut ChatMessage) -> Option<&mut AnswerBlock> {
    msg.blocks.retain(|b| !matches!(b, MessageBlock::Placeholder(_)));
    if msg.answer().is_none() {
        msg.blocks.push(MessageBlock::Answer(AnswerBlock::default()));
    }
    msg.answer_mut()
}
