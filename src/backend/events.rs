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

use super::wire::{ConversationSummary, StoredMessage};
use crate::stream::{ExchangeId, SessionInput};

/// Messages from background tasks to the UI loop.
/// Errors are carried as display strings; the UI only ever shows them.
#[derive(Debug)]
pub enum ClientEvent {
    /// Driver output for one streamed exchange.
    Exchange { exchange: ExchangeId, input: SessionInput },
    ConversationLoaded { conversation_id: String, result: Result<Vec<StoredMessage>, String> },
    ConversationsListed(Result<Vec<ConversationSummary>, String>),
    ConversationCreated(Result<String, String>),
    ConversationDeleted { conversation_id: String, result: Result<(), String> },
    AccessCodeValidated { code: String, result: Result<bool, String> },
    ContextCleared(Result<(), String>),
    DocumentUploaded { name: String, result: Result<String, String> },
    DocumentCleared(Result<(), String>),
}
