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

use super::effects::RenderCoalescer;
use super::input::InputState;
use super::scroll::{ScrollMetrics, ScrollTracker};
use crate::backend::{ChatClient, ClientEvent};
use crate::store::{
    CachePolicy, ConversationCache, Credentials, KeyValueStore, MemoryStore, SystemClock,
};
use crate::stream::{ExchangeId, Placeholder, StreamSession};
use crate::ui::markdown::CodeBlock;
use tokio::sync::mpsc;

/// An image waiting to go out with the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub name: String,
    /// `data:image/<type>;base64,..`
    pub data_uri: String,
}

/// A conversation switch whose background fetch has not landed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSwitch {
    pub conversation_id: String,
    /// Number of cached messages rendered up front, if the cache had any.
    pub cached_len: Option<usize>,
}

pub struct App {
    pub messages: Vec<ChatMessage>,
    /// Rendered scroll offset (rounded from scroll_pos).
    pub scroll_offset: usize,
    /// Target scroll offset requested by user input or auto-scroll.
    pub scroll_target: usize,
    /// Smooth scroll position (fractional) for animation.
    pub scroll_pos: f32,
    pub scroll: ScrollTracker,
    /// A scroll-to-bottom decision waiting for the next render pass, which
    /// is the first point where the new content height is known.
    pub pending_scroll_to_bottom: bool,
    /// Geometry of the chat view as of the last rendered frame.
    pub chat_metrics: ScrollMetrics,
    pub input: InputState,
    pub should_quit: bool,
    /// The exchange currently owning the loading affordances, if any.
    pub session: Option<StreamSession>,
    /// Index into `messages` of the assistant message being streamed.
    pub streaming_message: Option<usize>,
    pub loading: bool,
    pub render_queue: RenderCoalescer,
    pub(crate) next_exchange: u64,
    pub conversation_id: Option<String>,
    pub pending_switch: Option<PendingSwitch>,
    pub cache: ConversationCache,
    pub credentials: Credentials,
    pub credential_store: Box<dyn KeyValueStore>,
    /// `None` only in tests that never touch the network.
    pub client: Option<ChatClient>,
    /// The `/cancel_stream` notification spawned for the last stop, so
    /// shutdown can wait for it instead of sending another.
    pub cancel_notify: Option<tokio::task::JoinHandle<()>>,
    pub pending_image: Option<PendingImage>,
    /// File name of the document the server holds as context, if any.
    pub active_document: Option<String>,
    pub server_label: String,
    pub event_tx: mpsc::UnboundedSender<ClientEvent>,
    pub event_rx: mpsc::UnboundedReceiver<ClientEvent>,
    pub spinner_frame: usize,
    /// Toggled by Ctrl+O; applies to every reasoning region.
    pub reasoning_collapsed: bool,
    /// Force a full terminal clear on next render frame.
    pub force_redraw: bool,
}

impl App {
    pub fn new(
        cache: ConversationCache,
        credentials: Credentials,
        credential_store: Box<dyn KeyValueStore>,
        client: Option<ChatClient>,
        server_label: String,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            messages: Vec::new(),
            scroll_offset: 0,
            scroll_target: 0,
            scroll_pos: 0.0,
            scroll: ScrollTracker::default(),
            pending_scroll_to_bottom: false,
            chat_metrics: ScrollMetrics::default(),
            input: InputState::new(),
            should_quit: false,
            session: None,
            streaming_message: None,
            loading: false,
            render_queue: RenderCoalescer::default(),
            next_exchange: 0,
            conversation_id: None,
            pending_switch: None,
            cache,
            credentials,
            credential_store,
            client,
            cancel_notify: None,
            pending_image: None,
            active_document: None,
            server_label,
            event_tx,
            event_rx,
            spinner_frame: 0,
            reasoning_collapsed: false,
            force_redraw: false,
        }
    }

    /// In-memory app with no client; for tests.
    pub fn test_default() -> Self {
        let cache = ConversationCache::new(
            Box::new(MemoryStore::new()),
            Box::new(SystemClock),
            CachePolicy::default(),
        );
        let mut credential_store = MemoryStore::new();
        let credentials = Credentials::load(&mut credential_store);
        Self::new(cache, credentials, Box::new(credential_store), None, "test".to_owned())
    }

    pub(crate) fn allocate_exchange(&mut self) -> ExchangeId {
        self.next_exchange += 1;
        ExchangeId(self.next_exchange)
    }

    /// True while an exchange is awaiting or receiving its answer.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.status().is_active())
    }

    #[must_use]
    pub fn has_premium(&self) -> bool {
        self.credentials.premium
    }

    /// Code blocks of the most recent finalized answer.
    #[must_use]
    pub fn last_code_blocks(&self) -> Option<&[CodeBlock]> {
        self.messages.iter().rev().flat_map(|m| m.blocks.iter().rev()).find_map(|b| match b {
            MessageBlock::Answer(answer) if answer.finalized => answer.code_blocks.as_deref(),
            _ => None,
        })
    }
}

pub struct ChatMessage {
    pub role: MessageRole,
    pub blocks: Vec<MessageBlock>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: MessageRole::User, blocks: vec![MessageBlock::text(text)] }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self { role: MessageRole::System, blocks: vec![MessageBlock::text(text)] }
    }

    /// A finished assistant answer, e.g. replayed from history.
    pub fn assistant(markdown: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            blocks: vec![MessageBlock::Answer(AnswerBlock::finalized(markdown.into()))],
        }
    }

    pub fn placeholder(kind: Placeholder) -> Self {
        Self { role: MessageRole::Assistant, blocks: vec![MessageBlock::Placeholder(kind)] }
    }

    pub fn answer_mut(&mut self) -> Option<&mut AnswerBlock> {
        self.blocks.iter_mut().find_map(|b| match b {
            MessageBlock::Answer(answer) => Some(answer),
            _ => None,
        })
    }

    #[must_use]
    pub fn answer(&self) -> Option<&AnswerBlock> {
        self.blocks.iter().find_map(|b| match b {
            MessageBlock::Answer(answer) => Some(answer),
            _ => None,
        })
    }

    pub fn reasoning_mut(&mut self) -> Option<&mut ReasoningBlock> {
        self.blocks.iter_mut().find_map(|b| match b {
            MessageBlock::Reasoning(reasoning) => Some(reasoning),
            _ => None,
        })
    }

    #[must_use]
    pub fn reasoning(&self) -> Option<&ReasoningBlock> {
        self.blocks.iter().find_map(|b| match b {
            MessageBlock::Reasoning(reasoning) => Some(reasoning),
            _ => None,
        })
    }

    #[must_use]
    pub fn has_placeholder(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, MessageBlock::Placeholder(_)))
    }
}

/// Cached rendered lines for a block. Stores a version counter so the cache
/// is only recomputed when the block content actually changes.
///
/// Fields are private: use `invalidate()` to mark stale, `get()` to read
/// cached lines, and `store()` to populate.
#[derive(Default)]
pub struct BlockCache {
    version: u64,
    lines: Option<Vec<ratatui::text::Line<'static>>>,
}

impl BlockCache {
    /// Bump the version to invalidate cached lines.
    pub fn invalidate(&mut self) {
        self.version += 1;
    }

    /// Get a reference to the cached lines, if fresh.
    #[must_use]
    pub fn get(&self) -> Option<&Vec<ratatui::text::Line<'static>>> {
        if self.version == 0 { self.lines.as_ref() } else { None }
    }

    /// Store freshly rendered lines, marking the cache as clean.
    pub fn store(&mut self, lines: Vec<ratatui::text::Line<'static>>) {
        self.lines = Some(lines);
        self.version = 0;
    }
}

/// The collapsible thinking region. Always shows the whole buffer.
#[derive(Default)]
pub struct ReasoningBlock {
    pub text: String,
    pub cache: BlockCache,
}

#[derive(Default)]
pub struct AnswerBlock {
    pub markdown: String,
    pub cache: BlockCache,
    /// Extracted once, when the answer is finalized.
    pub code_blocks: Option<Vec<CodeBlock>>,
    pub conversation_id: Option<String>,
    pub finalized: bool,
}

impl AnswerBlock {
    #[must_use]
    pub fn finalized(markdown: String) -> Self {
        let code_blocks = Some(crate::ui::markdown::extract_code_blocks(&markdown));
        Self { markdown, code_blocks, finalized: true, ..Self::default() }
    }

    pub fn set_markdown(&mut self, markdown: &str) {
        if self.markdown != markdown {
            markdown.clone_into(&mut self.markdown);
            self.cache.invalidate();
        }
    }
}

/// Ordered content of a message.
pub enum MessageBlock {
    Text(String, BlockCache),
    Placeholder(Placeholder),
    Reasoning(ReasoningBlock),
    Answer(AnswerBlock),
    Error(String),
    /// The exchange was stopped by the user.
    Stopped,
}

impl MessageBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into(), BlockCache::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    System,
}
