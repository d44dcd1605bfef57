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

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use std::cell::Cell;
use std::rc::Rc;
use streamchat::app::{App, ChatMessage, MessageBlock, MessageRole};
use streamchat::backend::ClientEvent;
use streamchat::store::Clock;
use streamchat::stream::{Frame, SessionInput, StreamEvent};

/// Hand-driven clock for cache expiry; clones share the same time.
#[derive(Debug, Clone)]
pub struct TestClock(Rc<Cell<u64>>);

impl TestClock {
    pub fn at(millis: u64) -> Self {
        Self(Rc::new(Cell::new(millis)))
    }

    pub fn advance(&self, millis: u64) {
        self.0.set(self.0.get().saturating_add(millis));
    }
}

impl Clock for TestClock {
    fn now_millis(&self) -> u64 {
        self.0.get()
    }
}

/// Build a minimal `App` for integration testing.
/// No server, no TUI -- just state.
pub fn test_app() -> App {
    App::test_default()
}

/// Feed one driver input for the exchange that is currently active.
pub fn send_input(app: &mut App, input: SessionInput) {
    let exchange = app
        .session
        .as_ref()
        .map(streamchat::stream::StreamSession::exchange_id)
        .expect("an active exchange");
    streamchat::app::handle_client_event(app, ClientEvent::Exchange { exchange, input });
}

pub fn content(chunk: &str) -> SessionInput {
    SessionInput::Frame(Frame::new(StreamEvent::Content { chunk: chunk.into() }))
}

pub fn thinking(chunk: &str) -> SessionInput {
    SessionInput::Frame(Frame::new(StreamEvent::Thinking { chunk: chunk.into() }))
}

pub fn done(conversation_id: Option<&str>) -> SessionInput {
    SessionInput::Frame(Frame::new(StreamEvent::Done {
        conversation_id: conversation_id.map(str::to_owned),
    }))
}

/// Answer markdown of an assistant message, if it has one.
pub fn answer_text(msg: &ChatMessage) -> Option<&str> {
    msg.answer().map(|a| a.markdown.as_str())
}

/// Text shown for a message, ignoring notices and placeholders.
pub fn visible_text(msg: &ChatMessage) -> Option<String> {
    match msg.role {
        MessageRole::System => None,
        MessageRole::User => msg.blocks.iter().find_map(|b| match b {
            MessageBlock::Text(text, _) => Some(text.clone()),
            _ => None,
        }),
        MessageRole::Assistant => answer_text(msg).map(str::to_owned),
    }
}

/// User and assistant text in display order; notices are skipped.
pub fn transcript(app: &App) -> Vec<String> {
    app.messages.iter().filter_map(visible_text).collect()
}

pub fn draw(app: &mut App, width: u16, height: u16) {
    let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("test terminal");
    terminal.draw(|f| streamchat::ui::render(f, app)).expect("draw");
}
