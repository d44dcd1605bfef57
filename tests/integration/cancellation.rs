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

// Cancellation integration tests.
// A stop request must win over chunks already in flight.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use streamchat::app::{MessageBlock, handle_terminal_event, request_cancel, send_message};
use streamchat::stream::{SessionInput, SessionStatus};

use crate::helpers::{answer_text, content, send_input, test_app};

fn status(app: &streamchat::app::App) -> Option<SessionStatus> {
    app.session.as_ref().map(streamchat::stream::StreamSession::status)
}

#[tokio::test]
async fn content_after_cancel_is_discarded() {
    let mut app = test_app();
    send_message(&mut app, "long story");
    send_input(&mut app, content("Once upon"));
    streamchat::app::flush_pending_render(&mut app);

    assert!(request_cancel(&mut app));
    assert_eq!(status(&app), Some(SessionStatus::Cancelling));
    assert!(!app.session.as_ref().unwrap().holds_cancel_handle());

    send_input(&mut app, content(" a time"));
    assert_eq!(status(&app), Some(SessionStatus::Cancelling));
    assert_eq!(app.session.as_ref().unwrap().content(), "Once upon");

    send_input(&mut app, SessionInput::ReaderClosed);
    assert!(app.session.is_none());
    assert!(!app.loading);

    let msg = app.messages.last().unwrap();
    assert_eq!(answer_text(msg), Some("Once upon"));
    assert!(matches!(msg.blocks.last(), Some(MessageBlock::Stopped)));
}

#[tokio::test]
async fn cancel_before_first_chunk_shows_only_the_marker() {
    let mut app = test_app();
    send_message(&mut app, "hi");
    request_cancel(&mut app);
    send_input(&mut app, SessionInput::Ended);

    let msg = app.messages.last().unwrap();
    assert!(!msg.has_placeholder());
    assert!(msg.answer().is_none());
    assert!(matches!(msg.blocks.as_slice(), [MessageBlock::Stopped]));
}

#[tokio::test]
async fn second_cancel_is_a_no_op() {
    let mut app = test_app();
    send_message(&mut app, "hi");
    request_cancel(&mut app);
    request_cancel(&mut app);
    send_input(&mut app, SessionInput::ReaderClosed);

    let stopped = app.messages.iter().flat_map(|m| &m.blocks).filter(|b| matches!(b, MessageBlock::Stopped)).count();
    assert_eq!(stopped, 1);
}

#[tokio::test]
async fn cancel_after_completion_is_rejected() {
    let mut app = test_app();
    send_message(&mut app, "hi");
    send_input(&mut app, SessionInput::Ended);
    assert!(!request_cancel(&mut app));
}

#[tokio::test]
async fn escape_key_stops_the_stream() {
    let mut app = test_app();
    send_message(&mut app, "hi");
    handle_terminal_event(&mut app, Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    assert_eq!(status(&app), Some(SessionStatus::Cancelling));
}

#[tokio::test]
async fn slash_cancel_stops_the_stream() {
    let mut app = test_app();
    send_message(&mut app, "hi");
    app.input.insert_str("/cancel");
    streamchat::app::submit_input(&mut app);
    assert_eq!(status(&app), Some(SessionStatus::Cancelling));
}
