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

// Auto-scroll integration tests.
// Drawn through the real UI so decisions use actual wrapped heights.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use streamchat::app::{App, flush_pending_render, handle_terminal_event, send_message};
use streamchat::stream::SessionInput;

use crate::helpers::{content, draw, send_input, test_app};

const WIDTH: u16 = 60;
const HEIGHT: u16 = 20;

fn paragraphs(n: usize) -> String {
    (0..n).map(|i| format!("Paragraph number {i}.\n\n")).collect()
}

fn stream_and_draw(app: &mut App, chunk: &str) {
    send_input(app, content(chunk));
    flush_pending_render(app);
    draw(app, WIDTH, HEIGHT);
}

fn press(app: &mut App, code: KeyCode) {
    handle_terminal_event(app, Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
}

fn at_bottom(app: &App) -> bool {
    app.scroll_target == app.chat_metrics.max_offset()
}

#[tokio::test]
async fn streaming_follows_the_bottom() {
    let mut app = test_app();
    send_message(&mut app, "write a lot");
    draw(&mut app, WIDTH, HEIGHT);
    stream_and_draw(&mut app, &paragraphs(20));

    assert!(app.chat_metrics.max_offset() > 0);
    assert!(at_bottom(&app));

    stream_and_draw(&mut app, &paragraphs(5));
    assert!(at_bottom(&app));
}

#[tokio::test]
async fn scrolling_up_detaches_until_the_user_returns() {
    let mut app = test_app();
    send_message(&mut app, "write a lot");
    draw(&mut app, WIDTH, HEIGHT);
    stream_and_draw(&mut app, &paragraphs(20));

    press(&mut app, KeyCode::PageUp);
    assert!(app.scroll.user_scrolled_away());
    let held = app.scroll_target;

    stream_and_draw(&mut app, &paragraphs(5));
    assert_eq!(app.scroll_target, held);
    assert!(!at_bottom(&app));

    press(&mut app, KeyCode::PageDown);
    press(&mut app, KeyCode::PageDown);
    assert!(!app.scroll.user_scrolled_away());

    stream_and_draw(&mut app, &paragraphs(5));
    assert!(at_bottom(&app));
}

#[tokio::test]
async fn page_up_between_chunk_and_frame_is_not_undone() {
    let mut app = test_app();
    send_message(&mut app, "write a lot");
    draw(&mut app, WIDTH, HEIGHT);
    stream_and_draw(&mut app, &paragraphs(20));
    assert!(at_bottom(&app));

    // A chunk lands, then the key arrives before the coalesced render runs.
    send_input(&mut app, content(&paragraphs(2)));
    press(&mut app, KeyCode::PageUp);
    let held = app.scroll_target;
    assert!(app.scroll.user_scrolled_away());

    flush_pending_render(&mut app);
    draw(&mut app, WIDTH, HEIGHT);
    assert_eq!(app.scroll_target, held);
    assert!(!at_bottom(&app));
}

#[tokio::test]
async fn new_message_forces_the_bottom_after_detach() {
    let mut app = test_app();
    send_message(&mut app, "first");
    draw(&mut app, WIDTH, HEIGHT);
    stream_and_draw(&mut app, &paragraphs(20));
    press(&mut app, KeyCode::PageUp);
    send_input(&mut app, SessionInput::Ended);
    draw(&mut app, WIDTH, HEIGHT);
    assert!(!at_bottom(&app));

    send_message(&mut app, "second");
    assert!(!app.scroll.user_scrolled_away());
    draw(&mut app, WIDTH, HEIGHT);
    assert!(at_bottom(&app));
}

#[tokio::test]
async fn short_transcript_never_scrolls() {
    let mut app = test_app();
    send_message(&mut app, "hi");
    stream_and_draw(&mut app, "Hello");
    assert_eq!(app.scroll_target, 0);
    assert_eq!(app.chat_metrics.max_offset(), 0);
}
