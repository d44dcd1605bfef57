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

pub mod attachment;
pub mod conversation;
pub mod document;
pub mod effects;
pub mod events;
mod input;
pub mod scroll;
pub mod slash;
mod state;
pub mod submit;

pub use effects::{apply_effects, drive_session, flush_pending_render, note_mutation};
pub use events::{handle_client_event, handle_terminal_event};
pub use input::InputState;
pub use scroll::{ScrollAction, ScrollMetrics, ScrollTracker};
pub use state::{
    AnswerBlock, App, BlockCache, ChatMessage, MessageBlock, MessageRole, PendingImage,
    PendingSwitch, ReasoningBlock,
};
pub use submit::{request_cancel, send_message, submit_input};

use crate::backend::ChatClient;
use crate::config::Config;
use crate::store::{
    CONVERSATIONS_FILE, CREDENTIALS_FILE, CachePolicy, ConversationCache, Credentials, FileStore,
    KeyValueStore, MemoryStore, SystemClock,
};
use anyhow::Context as _;
use crossterm::event::{
    EventStream, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use futures::{FutureExt as _, StreamExt};
use std::time::{Duration, Instant};

/// How long shutdown waits for the server to acknowledge a stop.
const SHUTDOWN_CANCEL_TIMEOUT: Duration = Duration::from_millis(500);

/// Build the app from resolved config. Must run inside the `LocalSet`:
/// an initial conversation starts fetching immediately.
pub fn create_app(config: &Config) -> anyhow::Result<App> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create data directory {}", config.data_dir.display()))?;

    let mut credential_store = FileStore::open(config.data_dir.join(CREDENTIALS_FILE));
    let credentials = Credentials::load(&mut credential_store);

    let cache_store: Box<dyn KeyValueStore> = if config.persist_cache {
        Box::new(FileStore::open(config.data_dir.join(CONVERSATIONS_FILE)))
    } else {
        Box::new(MemoryStore::new())
    };
    let mut cache = ConversationCache::new(cache_store, Box::new(SystemClock), CachePolicy::default());
    cache.evict_expired_or_excess();

    let client = ChatClient::new(config.server.clone(), credentials.user_id.clone())?
        .with_access_code(credentials.access_code.clone());
    tracing::info!(
        server = %config.server,
        data_dir = %config.data_dir.display(),
        persist_cache = config.persist_cache,
        premium = credentials.premium,
        "client configured"
    );

    let mut app = App::new(
        cache,
        credentials,
        Box::new(credential_store),
        Some(client),
        config.server.to_string(),
    );
    if let Some(id) = config.initial_conversation.as_deref() {
        conversation::switch_conversation(&mut app, id);
    }
    Ok(app)
}

// ---------------------------------------------------------------------------
// TUI event loop
// ---------------------------------------------------------------------------

pub async fn run_tui(app: &mut App) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    // Ignore errors on terminals without these features
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::EnableBracketedPaste,
        crossterm::event::EnableMouseCapture,
        // Enhanced keyboard protocol for reliable Shift+Enter
        PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
        )
    );

    let mut events = EventStream::new();
    let tick_duration = Duration::from_millis(16);
    let mut last_render = Instant::now();

    loop {
        // Phase 1: wait for at least one event or the next frame tick
        let time_to_next = tick_duration.saturating_sub(last_render.elapsed());
        tokio::select! {
            Some(Ok(event)) = events.next() => {
                events::handle_terminal_event(app, event);
            }
            Some(event) = app.event_rx.recv() => {
                events::handle_client_event(app, event);
            }
            () = tokio::time::sleep(time_to_next) => {}
        }

        // Phase 2: drain all remaining queued events (non-blocking)
        loop {
            // Terminal events first keeps typing responsive
            if let Some(Some(Ok(event))) = events.next().now_or_never() {
                events::handle_terminal_event(app, event);
                continue;
            }
            match app.event_rx.try_recv() {
                Ok(event) => events::handle_client_event(app, event),
                Err(_) => break,
            }
        }

        if app.should_quit {
            break;
        }

        // Phase 3: one coalesced content render, then draw
        if app.loading {
            app.spinner_frame = app.spinner_frame.wrapping_add(1);
        }
        effects::flush_pending_render(app);
        if app.force_redraw {
            terminal.clear()?;
            app.force_redraw = false;
        }
        terminal.draw(|f| crate::ui::render(f, app))?;
        last_render = Instant::now();
    }

    finish_cancel_notify(app, SHUTDOWN_CANCEL_TIMEOUT).await;

    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableBracketedPaste,
        crossterm::event::DisableMouseCapture,
        PopKeyboardEnhancementFlags
    );
    ratatui::restore();

    Ok(())
}

/// A stop requested on the way out may not have reached the server yet.
/// Waits for the notification already in flight; never sends a second one.
async fn finish_cancel_notify(app: &mut App, limit: Duration) {
    let Some(handle) = app.cancel_notify.take() else {
        return;
    };
    if handle.is_finished() {
        return;
    }
    if tokio::time::timeout(limit, handle).await.is_err() {
        tracing::warn!("cancel notification timed out during shutdown");
    }
}
