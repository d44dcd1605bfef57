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

//! Incremental line decoder for the chunked response body.
//!
//! The transport hands us arbitrary byte slices: a chunk may end in the
//! middle of a record, or in the middle of a multi-byte UTF-8 sequence.
//! `FrameDecoder` holds both kinds of tail back until the next chunk
//! completes them, so every emitted line is whole and correctly decoded.

use std::char::REPLACEMENT_CHARACTER;

/// Separates records on the wire.
pub const RECORD_SEPARATOR: char = '\n';

#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Undecoded tail that may be the start of a multi-byte character.
    pending_bytes: Vec<u8>,
    /// Decoded text not yet terminated by `RECORD_SEPARATOR`.
    pending_line: String,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk` and return every line it completes, in order.
    /// The trailing partial line (possibly empty) is held for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let decoded = self.decode(chunk);
        if decoded.is_empty() {
            return Vec::new();
        }

        let mut text = std::mem::take(&mut self.pending_line);
        text.push_str(&decoded);

        let mut lines: Vec<String> = text.split(RECORD_SEPARATOR).map(str::to_owned).collect();
        self.pending_line = lines.pop().unwrap_or_default();
        lines
    }

    /// Flush at end of stream. The last record has no guaranteed terminator,
    /// so a non-empty remainder is returned as a final line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.pending_line.push_str(&String::from_utf8_lossy(&tail));
        }
        let rest = std::mem::take(&mut self.pending_line);
        (!rest.is_empty()).then_some(rest)
    }

    /// Text held back because it has no terminator yet.
    #[cfg(test)]
    fn pending_line(&self) -> &str {
        &self.pending_line
    }

    /// Number of bytes held back as a possibly incomplete character.
    #[cfg(test)]
    fn pending_byte_count(&self) -> usize {
        self.pending_bytes.len()
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending_bytes);
        buf.extend_from_slice(chunk);

        let mut out = String::with_capacity(buf.len());
        let mut input = buf.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    if let Some(invalid_len) = err.error_len() {
                        // Definitively invalid, not just cut short.
                        out.push(REPLACEMENT_CHARACTER);
                        input = &rest[invalid_len..];
                    } else {
                        self.pending_bytes = rest.to_vec();
                        break;
                    }
                }
            }
        }
        out
    }
}
