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

//! Async reader for one streamed exchange.
//!
//! The driver owns the transport and the decoder; everything it learns is
//! forwarded to the UI loop as `SessionInput`s tagged with the exchange id.
//! It never looks at session state: the cancel token is its only input.

use super::client::ChatClient;
use super::events::ClientEvent;
use super::wire::ChatRequest;
use crate::stream::{ExchangeId, FrameDecoder, SessionInput, classify_frame};
use futures::{Stream, StreamExt as _};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Open the request and pump its body on the local task set.
pub fn spawn_exchange(
    client: ChatClient,
    request: ChatRequest,
    exchange: ExchangeId,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<ClientEvent>,
) {
    tokio::task::spawn_local(async move {
        let response = tokio::select! {
            biased;
            () = token.cancelled() => {
                send(&tx, exchange, SessionInput::ReaderClosed);
                return;
            }
            response = client.open_chat_stream(&request) => response,
        };

        match response {
            Ok(response) => pump(response.bytes_stream(), exchange, token, &tx).await,
            Err(e) => {
                tracing::warn!(exchange = exchange.0, "chat stream request failed: {e}");
                send(&tx, exchange, SessionInput::TransportFailed(e.to_string()));
            }
        }
    });
}

/// Read `body` to the end (or until `token` fires), decoding records as
/// they complete. Exactly one terminal input is sent: `Ended`,
/// `TransportFailed` or `ReaderClosed`.
pub async fn pump<S, B, E>(
    body: S,
    exchange: ExchangeId,
    token: CancellationToken,
    tx: &mpsc::UnboundedSender<ClientEvent>,
) where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = FrameDecoder::new();
    let mut opened = false;

    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!(exchange = exchange.0, "reader closed by cancel handle");
                send(tx, exchange, SessionInput::ReaderClosed);
                return;
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                let bytes = chunk.as_ref();
                if bytes.is_empty() {
                    continue;
                }
                if !opened {
                    opened = true;
                    if !send(tx, exchange, SessionInput::Opened) {
                        return;
                    }
                }
                for line in decoder.feed(bytes) {
                    if let Some(frame) = classify_frame(&line)
                        && !send(tx, exchange, SessionInput::Frame(frame))
                    {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                tracing::warn!(exchange = exchange.0, "stream transport error: {e}");
                send(tx, exchange, SessionInput::TransportFailed(e.to_string()));
                return;
            }
            None => {
                if let Some(line) = decoder.finish()
                    && let Some(frame) = classify_frame(&line)
                {
                    send(tx, exchange, SessionInput::Frame(frame));
                }
                send(tx, exchange, SessionInput::Ended);
                return;
            }
        }
    }
}

/// Returns `false` once the UI loop has gone away.
fn send(tx: &mpsc::UnboundedSender<ClientEvent>, exchange: ExchangeId, input: SessionInput) -> bool {
    tx.send(ClientEvent::Exchange { exchange, input }).is_ok()
}
