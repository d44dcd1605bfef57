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

// Conversation switching integration tests.
// Cached history shows immediately; the server's copy reconciles later.

use pretty_assertions::assert_eq;
use streamchat::app::conversation::{GREETING, switch_conversation};
use streamchat::app::{App, handle_client_event};
use streamchat::backend::{ClientEvent, ConversationSummary, StoredMessage};
use streamchat::store::cache::DEFAULT_TTL_MS;
use streamchat::store::{CachePolicy, ConversationCache, MemoryStore};

use crate::helpers::{TestClock, content, send_input, test_app, transcript};

fn history(pairs: &[(&str, &str)]) -> Vec<StoredMessage> {
    pairs
        .iter()
        .flat_map(|(q, a)| [StoredMessage::user(*q), StoredMessage::assistant(*a)])
        .collect()
}

fn loaded(app: &mut App, id: &str, result: Result<Vec<StoredMessage>, String>) {
    handle_client_event(app, ClientEvent::ConversationLoaded { conversation_id: id.into(), result });
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

#[tokio::test]
async fn cached_history_renders_then_fetched_suffix_appends() {
    let mut app = test_app();
    app.cache.put("c1", history(&[("q1", "a1")]));

    switch_conversation(&mut app, "c1");
    assert_eq!(app.conversation_id.as_deref(), Some("c1"));
    assert_eq!(transcript(&app), strings(&["q1", "a1"]));
    assert_eq!(app.pending_switch.as_ref().and_then(|p| p.cached_len), Some(2));

    loaded(&mut app, "c1", Ok(history(&[("q1", "a1"), ("q2", "a2")])));
    assert_eq!(transcript(&app), strings(&["q1", "a1", "q2", "a2"]));
    assert!(app.pending_switch.is_none());
    assert_eq!(app.cache.get("c1").map(|m| m.len()), Some(4));
}

#[tokio::test]
async fn fetched_history_no_longer_than_cache_is_kept() {
    let mut app = test_app();
    app.cache.put("c1", history(&[("q1", "a1")]));
    switch_conversation(&mut app, "c1");
    loaded(&mut app, "c1", Ok(history(&[("q1", "a1")])));
    assert_eq!(transcript(&app), strings(&["q1", "a1"]));
}

#[tokio::test]
async fn stale_fetch_for_previous_conversation_is_discarded() {
    let mut app = test_app();
    switch_conversation(&mut app, "c1");
    switch_conversation(&mut app, "c2");

    loaded(&mut app, "c1", Ok(history(&[("old", "stale")])));
    assert!(transcript(&app).is_empty());
    assert_eq!(app.pending_switch.as_ref().map(|p| p.conversation_id.as_str()), Some("c2"));

    loaded(&mut app, "c2", Ok(Vec::new()));
    assert_eq!(transcript(&app), strings(&[GREETING]));
    assert!(app.cache.get("c2").is_none());
}

#[tokio::test]
async fn expired_cache_entry_is_not_rendered() {
    let clock = TestClock::at(1_000);
    let mut app = test_app();
    app.cache = ConversationCache::new(
        Box::new(MemoryStore::new()),
        Box::new(clock.clone()),
        CachePolicy::default(),
    );
    app.cache.put("c1", history(&[("q1", "a1")]));

    clock.advance(DEFAULT_TTL_MS + 1);
    switch_conversation(&mut app, "c1");
    assert!(transcript(&app).is_empty());
    assert_eq!(app.pending_switch.as_ref().and_then(|p| p.cached_len), None);

    loaded(&mut app, "c1", Ok(history(&[("q1", "a1")])));
    assert_eq!(transcript(&app), strings(&["q1", "a1"]));
}

#[tokio::test]
async fn load_failure_with_cache_keeps_cached_view() {
    let mut app = test_app();
    app.cache.put("c1", history(&[("q1", "a1")]));
    switch_conversation(&mut app, "c1");
    let before = app.messages.len();
    loaded(&mut app, "c1", Err("Network error".into()));
    assert_eq!(app.messages.len(), before);
}

#[tokio::test]
async fn history_hides_think_blocks() {
    let mut app = test_app();
    switch_conversation(&mut app, "c1");
    loaded(&mut app, "c1", Ok(history(&[("q", "<think>hmm</think>The answer")])));
    assert_eq!(transcript(&app), strings(&["q", "The answer"]));
}

#[tokio::test]
async fn switching_mid_stream_keeps_partial_answer_out_of_new_view() {
    let mut app = test_app();
    streamchat::app::send_message(&mut app, "hi");
    send_input(&mut app, content("par"));
    let old = app.session.as_ref().unwrap().exchange_id();

    switch_conversation(&mut app, "c2");
    assert!(app.session.is_none());
    assert!(!app.loading);

    handle_client_event(&mut app, ClientEvent::Exchange { exchange: old, input: content("tial") });
    assert!(transcript(&app).is_empty());
}

#[tokio::test]
async fn deleting_the_open_conversation_resets_the_view() {
    let mut app = test_app();
    app.cache.put("c1", history(&[("q1", "a1")]));
    switch_conversation(&mut app, "c1");

    handle_client_event(
        &mut app,
        ClientEvent::ConversationDeleted { conversation_id: "c1".into(), result: Ok(()) },
    );
    assert_eq!(app.conversation_id, None);
    assert!(transcript(&app).is_empty());
    assert!(app.cache.get("c1").is_none());
}

#[tokio::test]
async fn created_conversation_becomes_current() {
    let mut app = test_app();
    handle_client_event(&mut app, ClientEvent::ConversationCreated(Ok("fresh".into())));
    assert_eq!(app.conversation_id.as_deref(), Some("fresh"));
    loaded(&mut app, "fresh", Ok(Vec::new()));
    assert_eq!(transcript(&app), strings(&[GREETING]));
}

#[tokio::test]
async fn listing_marks_the_current_conversation() {
    let mut app = test_app();
    app.conversation_id = Some("b".into());
    let summary = |id: &str, title: &str| ConversationSummary {
        conversation_id: id.into(),
        title: Some(title.into()),
        first_message: None,
        last_updated: None,
        created_at: None,
        message_count: 2,
    };
    handle_client_event(
        &mut app,
        ClientEvent::ConversationsListed(Ok(vec![summary("a", "First"), summary("b", "Second")])),
    );
    let Some(streamchat::app::MessageBlock::Text(text, _)) =
        app.messages.last().and_then(|m| m.blocks.first())
    else {
        panic!("expected a notice");
    };
    assert!(text.contains("  a  First  (2 messages)"));
    assert!(text.contains("* b  Second"));
}
