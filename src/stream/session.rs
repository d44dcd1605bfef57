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

//! Lifecycle of a single streamed exchange.
//!
//! `StreamSession` owns the accumulated buffers and the cancel handle and
//! never touches the UI. Each input returns the effects the controller must
//! perform; the controller reads buffers back from the session when an effect
//! needs them (e.g. `RenderReasoning` renders `thinking()` in full).

use super::event::{Frame, StreamEvent};
use tokio_util::sync::CancellationToken;

pub const STOPPED_MARKER: &str = "Response stopped by user.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Awaiting,
    Streaming,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Awaiting or streaming: the exchange still owns the loading affordances.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Awaiting | Self::Streaming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Thinking,
    AnalyzingImage,
    AnalyzingDocument,
}

impl Placeholder {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Thinking => "Thinking...",
            Self::AnalyzingImage => "Analyzing image...",
            Self::AnalyzingDocument => "Analyzing document...",
        }
    }
}

/// Tags driver events so the controller can drop those of a superseded exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// First bytes of the response body arrived.
    Opened,
    Frame(Frame),
    /// The body ended without error.
    Ended,
    TransportFailed(String),
    CancelRequested,
    /// The reader observed its cancel handle and stopped.
    ReaderClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowPlaceholder(Placeholder),
    /// Replace the placeholder with an empty answer container.
    BeginAnswer,
    AssignConversation(String),
    OpenReasoning,
    RenderReasoning,
    ScheduleContentRender,
    Finalize,
    ShowError(String),
    ClearLoading,
    CloseReader,
    NotifyCancel,
    AppendStoppedMarker,
}

#[derive(Debug)]
pub struct StreamSession {
    exchange_id: ExchangeId,
    prompt: String,
    status: SessionStatus,
    conversation_id: Option<String>,
    content: String,
    thinking: String,
    reasoning_opened: bool,
    cancel_handle: Option<CancellationToken>,
}

impl StreamSession {
    pub fn new(
        exchange_id: ExchangeId,
        prompt: impl Into<String>,
        conversation_id: Option<String>,
        cancel_handle: CancellationToken,
    ) -> Self {
        Self {
            exchange_id,
            prompt: prompt.into(),
            status: SessionStatus::Idle,
            conversation_id,
            content: String::new(),
            thinking: String::new(),
            reasoning_opened: false,
            cancel_handle: Some(cancel_handle),
        }
    }

    #[must_use]
    pub fn exchange_id(&self) -> ExchangeId {
        self.exchange_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    #[must_use]
    pub fn holds_cancel_handle(&self) -> bool {
        self.cancel_handle.is_some()
    }

    /// `Idle -> Awaiting`. Calling it in any other state is a no-op.
    pub fn begin(&mut self, placeholder: Placeholder) -> Vec<Effect> {
        if self.status != SessionStatus::Idle {
            return Vec::new();
        }
        self.status = SessionStatus::Awaiting;
        tracing::info!(exchange = self.exchange_id.0, "stream session awaiting response");
        vec![Effect::ShowPlaceholder(placeholder)]
    }

    pub fn apply(&mut self, input: SessionInput) -> Vec<Effect> {
        if self.status.is_terminal() {
            tracing::debug!(exchange = self.exchange_id.0, status = ?self.status, ?input, "input after terminal state ignored");
            return Vec::new();
        }

        match self.status {
            SessionStatus::Idle => {
                tracing::debug!(exchange = self.exchange_id.0, ?input, "input before begin ignored");
                Vec::new()
            }
            SessionStatus::Cancelling => self.apply_cancelling(input),
            _ => self.apply_active(input),
        }
    }

    fn apply_cancelling(&mut self, input: SessionInput) -> Vec<Effect> {
        match input {
            SessionInput::ReaderClosed | SessionInput::Ended | SessionInput::TransportFailed(_) => {
                self.status = SessionStatus::Cancelled;
                tracing::info!(exchange = self.exchange_id.0, "stream session cancelled");
                vec![Effect::AppendStoppedMarker, Effect::ClearLoading]
            }
            // A chunk already in flight may still land; it must not reopen anything.
            SessionInput::Opened | SessionInput::Frame(_) | SessionInput::CancelRequested => {
                Vec::new()
            }
        }
    }

    fn apply_active(&mut self, input: SessionInput) -> Vec<Effect> {
        let mut effects = Vec::new();
        match input {
            SessionInput::Opened => self.open(&mut effects),
            SessionInput::Frame(frame) => self.apply_frame(frame, &mut effects),
            SessionInput::Ended => {
                self.open(&mut effects);
                self.complete(&mut effects);
            }
            SessionInput::TransportFailed(message) => self.fail(message, &mut effects),
            SessionInput::CancelRequested => {
                self.status = SessionStatus::Cancelling;
                self.release_handle();
                effects.extend([Effect::CloseReader, Effect::NotifyCancel]);
            }
            SessionInput::ReaderClosed => {
                // Handle cancelled from outside the session (shutdown).
                self.status = SessionStatus::Cancelled;
                self.release_handle();
                effects.extend([Effect::AppendStoppedMarker, Effect::ClearLoading]);
            }
        }
        effects
    }

    fn apply_frame(&mut self, frame: Frame, effects: &mut Vec<Effect>) {
        self.open(effects);
        if let Some(id) = frame.conversation_id {
            self.adopt_conversation(id, effects);
        }

        match frame.event {
            None => {}
            Some(StreamEvent::Thinking { chunk }) => {
                self.thinking.push_str(&chunk);
                if !self.reasoning_opened {
                    self.reasoning_opened = true;
                    effects.push(Effect::OpenReasoning);
                }
                effects.push(Effect::RenderReasoning);
            }
            Some(StreamEvent::Content { chunk }) => {
                self.content.push_str(&chunk);
                effects.push(Effect::ScheduleContentRender);
            }
            Some(StreamEvent::Done { conversation_id }) => {
                if let Some(id) = conversation_id {
                    self.adopt_conversation(id, effects);
                }
                self.complete(effects);
            }
            Some(StreamEvent::Error { message }) => self.fail(message, effects),
        }
    }

    fn open(&mut self, effects: &mut Vec<Effect>) {
        if self.status == SessionStatus::Awaiting {
            self.status = SessionStatus::Streaming;
            effects.push(Effect::BeginAnswer);
        }
    }

    fn adopt_conversation(&mut self, id: String, effects: &mut Vec<Effect>) {
        if self.conversation_id.is_none() {
            effects.push(Effect::AssignConversation(id.clone()));
            self.conversation_id = Some(id);
        }
    }

    fn complete(&mut self, effects: &mut Vec<Effect>) {
        self.status = SessionStatus::Completed;
        self.release_handle();
        tracing::info!(
            exchange = self.exchange_id.0,
            content_len = self.content.len(),
            thinking_len = self.thinking.len(),
            "stream session completed"
        );
        effects.extend([Effect::Finalize, Effect::ClearLoading]);
    }

    fn fail(&mut self, message: String, effects: &mut Vec<Effect>) {
        self.status = SessionStatus::Failed;
        self.content.clear();
        self.thinking.clear();
        self.release_handle();
        tracing::info!(exchange = self.exchange_id.0, %message, "stream session failed");
        effects.extend([Effect::ShowError(message), Effect::ClearLoading]);
    }

    fn release_handle(&mut self) {
        if let Some(token) = self.cancel_handle.take() {
            token.cancel();
        }
    }
}
