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

/// Multi-line prompt buffer. The cursor column counts chars, not bytes.
#[derive(Debug)]
pub struct InputState {
    pub lines: Vec<String>,
    pub cursor_row: usize,
    pub cursor_col: usize,
}

impl InputState {
    pub fn new() -> Self {
        Self { lines: vec![String::new()], cursor_row: 0, cursor_col: 0 }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(String::is_empty) && self.lines.len() == 1
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn insert_char(&mut self, c: char) {
        let col = self.cursor_col;
        let line = self.line_mut();
        let at = byte_index(line, col);
        line.insert(at, c);
        self.cursor_col += 1;
    }

    pub fn insert_newline(&mut self) {
        let col = self.cursor_col;
        let line = self.line_mut();
        let at = byte_index(line, col);
        let tail = line.split_off(at);
        self.cursor_row += 1;
        self.lines.insert(self.cursor_row, tail);
        self.cursor_col = 0;
    }

    /// Pasted text; CRLF and lone CR both count as one line break.
    pub fn insert_str(&mut self, s: &str) {
        let normalized = s.replace("\r\n", "\n").replace('\r', "\n");
        for c in normalized.chars() {
            if c == '\n' { self.insert_newline() } else { self.insert_char(c) }
        }
    }

    pub fn delete_char_before(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
            let col = self.cursor_col;
            let line = self.line_mut();
            let at = byte_index(line, col);
            line.remove(at);
        } else if self.cursor_row > 0 {
            let joined = self.lines.remove(self.cursor_row);
            self.cursor_row -= 1;
            self.cursor_col = self.line_len();
            self.line_mut().push_str(&joined);
        }
    }

    pub fn delete_char_after(&mut self) {
        if self.cursor_col < self.line_len() {
            let col = self.cursor_col;
            let line = self.line_mut();
            let at = byte_index(line, col);
            line.remove(at);
        } else if self.cursor_row + 1 < self.lines.len() {
            let next = self.lines.remove(self.cursor_row + 1);
            self.line_mut().push_str(&next);
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_row > 0 {
            self.cursor_row -= 1;
            self.cursor_col = self.line_len();
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor_col < self.line_len() {
            self.cursor_col += 1;
        } else if self.cursor_row + 1 < self.lines.len() {
            self.cursor_row += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor_row > 0 {
            self.cursor_row -= 1;
            self.cursor_col = self.cursor_col.min(self.line_len());
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor_row + 1 < self.lines.len() {
            self.cursor_row += 1;
            self.cursor_col = self.cursor_col.min(self.line_len());
        }
    }

    pub fn move_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_col = self.line_len();
    }

    fn line_len(&self) -> usize {
        self.lines.get(self.cursor_row).map_or(0, |l| l.chars().count())
    }

    fn line_mut(&mut self) -> &mut String {
        if self.cursor_row >= self.lines.len() {
            self.lines.resize(self.cursor_row + 1, String::new());
        }
        &mut self.lines[self.cursor_row]
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

fn byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}
