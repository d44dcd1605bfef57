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

// Streaming integration tests.
// Drives the reader and the session together the way the UI loop does.

use futures::stream;
use pretty_assertions::assert_eq;
use streamchat::app::{MessageBlock, send_message};
use streamchat::backend::{ClientEvent, StoredMessage};
use streamchat::backend::driver::pump;
use streamchat::stream::{ExchangeId, SessionInput};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::helpers::{answer_text, content, done, send_input, test_app, thinking, transcript};

/// Run `chunks` through the reader and collect what it forwards.
async fn pump_chunks(chunks: Vec<&'static str>) -> Vec<SessionInput> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let body = stream::iter(chunks.into_iter().map(|c| Ok::<_, std::io::Error>(c.as_bytes())));
    pump(body, ExchangeId(1), CancellationToken::new(), &tx).await;
    drop(tx);

    let mut inputs = Vec::new();
    while let Some(event) = rx.recv().await {
        if let ClientEvent::Exchange { input, .. } = event {
            inputs.push(input);
        }
    }
    inputs
}

#[tokio::test]
async fn hello_world_renders_incrementally_and_finalizes() {
    let mut app = test_app();
    send_message(&mut app, "Say hello");
    assert!(app.loading);

    send_input(&mut app, SessionInput::Opened);
    send_input(&mut app, content("Hello"));
    streamchat::app::flush_pending_render(&mut app);
    assert_eq!(app.messages.last().and_then(answer_text), Some("Hello"));

    send_input(&mut app, content(", world"));
    send_input(&mut app, done(Some("c1")));

    assert!(!app.loading);
    assert!(app.session.is_none());
    assert_eq!(app.conversation_id.as_deref(), Some("c1"));
    let last = app.messages.last().unwrap();
    let answer = last.answer().unwrap();
    assert_eq!(answer.markdown, "Hello, world");
    assert!(answer.finalized);
    assert_eq!(answer.conversation_id.as_deref(), Some("c1"));
    assert_eq!(transcript(&app), vec!["Say hello".to_owned(), "Hello, world".to_owned()]);
}

#[tokio::test]
async fn completed_exchange_extends_cached_conversation() {
    let mut app = test_app();
    app.cache.put("c9", vec![StoredMessage::user("q0"), StoredMessage::assistant("a0")]);
    app.conversation_id = Some("c9".into());
    send_message(&mut app, "q");
    send_input(&mut app, content("a"));
    send_input(&mut app, done(Some("c9")));

    let cached = app.cache.get("c9").unwrap();
    let roles: Vec<_> = cached.iter().map(|m| (m.role.as_str(), m.content.as_str())).collect();
    assert_eq!(roles, vec![("user", "q0"), ("assistant", "a0"), ("user", "q"), ("assistant", "a")]);
}

#[tokio::test]
async fn uncached_conversation_is_not_seeded_with_one_exchange() {
    let mut app = test_app();
    send_message(&mut app, "q");
    send_input(&mut app, content("a"));
    send_input(&mut app, done(Some("c10")));
    assert!(app.cache.get("c10").is_none());
}

#[tokio::test]
async fn duplicate_done_is_ignored() {
    let mut app = test_app();
    send_message(&mut app, "hi");
    send_input(&mut app, content("once"));
    let exchange = app.session.as_ref().unwrap().exchange_id();
    send_input(&mut app, done(None));
    let count = app.messages.len();

    streamchat::app::handle_client_event(
        &mut app,
        ClientEvent::Exchange { exchange, input: done(None) },
    );
    assert_eq!(app.messages.len(), count);
    assert_eq!(app.messages.last().and_then(answer_text), Some("once"));
}

#[tokio::test]
async fn reasoning_arrives_before_the_answer() {
    let mut app = test_app();
    send_message(&mut app, "think");
    send_input(&mut app, thinking("step one; "));
    send_input(&mut app, thinking("step two"));
    send_input(&mut app, content("answer"));
    send_input(&mut app, done(None));

    let msg = app.messages.last().unwrap();
    assert_eq!(msg.reasoning().map(|r| r.text.as_str()), Some("step one; step two"));
    assert!(matches!(msg.blocks.first(), Some(MessageBlock::Reasoning(_))));
    assert_eq!(answer_text(msg), Some("answer"));
}

#[tokio::test]
async fn server_error_replaces_the_placeholder() {
    let mut app = test_app();
    send_message(&mut app, "hi");
    let error = SessionInput::Frame(streamchat::stream::Frame::new(
        streamchat::stream::StreamEvent::Error { message: "model overloaded".into() },
    ));
    send_input(&mut app, error);

    assert!(!app.loading);
    let msg = app.messages.last().unwrap();
    assert!(matches!(msg.blocks.as_slice(), [MessageBlock::Error(m)] if m == "model overloaded"));
}

#[tokio::test]
async fn transport_failure_shows_error_and_releases_loading() {
    let mut app = test_app();
    send_message(&mut app, "hi");
    send_input(&mut app, SessionInput::TransportFailed("connection reset".into()));
    assert!(!app.loading);
    assert!(app.session.is_none());
    assert!(!app.messages.last().unwrap().has_placeholder());
}

#[tokio::test]
async fn reader_skips_malformed_lines() {
    let inputs = pump_chunks(vec![
        "data: not-json\n",
        "data: {\"type\":\"content\",\"chunk\":\"ok\"}\n",
        ": keep-alive\n\n",
    ])
    .await;

    let chunks: Vec<_> = inputs
        .iter()
        .filter_map(|i| match i {
            SessionInput::Frame(f) => f.event.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(chunks, vec![streamchat::stream::StreamEvent::Content { chunk: "ok".into() }]);
    assert_eq!(inputs.first(), Some(&SessionInput::Opened));
    assert_eq!(inputs.last(), Some(&SessionInput::Ended));
}

#[tokio::test]
async fn malformed_line_between_chunks_leaves_the_answer_intact() {
    let inputs = pump_chunks(vec![
        "data: {\"type\":\"content\",\"chunk\":\"a\"}\n",
        "data: not-json\n",
        "data: {\"type\":\"content\",\"chunk\":\"b\"}\n",
        "data: {\"type\":\"done\"}\n",
    ])
    .await;

    let mut app = test_app();
    send_message(&mut app, "letters");
    for input in inputs {
        if app.session.is_none() {
            break;
        }
        send_input(&mut app, input);
    }

    assert!(!app.loading);
    assert!(app.session.is_none());
    let msg = app.messages.last().unwrap();
    assert_eq!(answer_text(msg), Some("ab"));
    assert!(msg.answer().is_some_and(|a| a.finalized));
}

#[tokio::test]
async fn reader_reassembles_records_split_across_chunks() {
    let inputs = pump_chunks(vec![
        "data: {\"type\":\"cont",
        "ent\",\"chunk\":\"Hel",
        "lo\"}\ndata: {\"type\":\"done\",\"conversation_id\":\"c7\"}",
    ])
    .await;

    let mut app = test_app();
    send_message(&mut app, "hi");
    for input in inputs {
        if app.session.is_none() {
            break;
        }
        send_input(&mut app, input);
    }
    assert_eq!(app.messages.last().and_then(answer_text), Some("Hello"));
    assert_eq!(app.conversation_id.as_deref(), Some("c7"));
}

#[tokio::test]
async fn body_ending_without_done_still_completes() {
    let inputs = pump_chunks(vec!["data: {\"type\":\"content\",\"chunk\":\"partial\"}\n"]).await;
    let mut app = test_app();
    send_message(&mut app, "hi");
    for input in inputs {
        send_input(&mut app, input);
    }
    assert!(app.session.is_none());
    assert!(app.messages.last().unwrap().answer().is_some_and(|a| a.finalized));
}
