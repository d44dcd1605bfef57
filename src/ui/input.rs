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

use crate::app::App;
use crate::ui::theme;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

/// Horizontal padding to match header/footer inset.
const INPUT_PAD: u16 = 2;

/// Prompt prefix width: "❯ " = 2 columns
const PROMPT_WIDTH: u16 = 2;

/// Keeps a long draft from pushing the transcript off screen.
const MAX_INPUT_HEIGHT: u16 = 12;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Rect {
        x: area.x + INPUT_PAD,
        y: area.y,
        width: area.width.saturating_sub(INPUT_PAD * 2),
        height: area.height,
    };
    let prompt = || Span::styled(format!("{} ", theme::PROMPT_CHAR), Style::default().fg(theme::ACCENT));

    if app.input.is_empty() {
        let hint = if app.loading { "Esc to stop the response..." } else { "Type a message..." };
        let line = Line::from(vec![prompt(), Span::styled(hint, Style::default().fg(theme::DIM))]);
        frame.render_widget(Paragraph::new(line), padded);
        frame.set_cursor_position((padded.x + PROMPT_WIDTH, padded.y));
        return;
    }

    let lines: Vec<Line> = app
        .input
        .lines
        .iter()
        .enumerate()
        .map(|(row, text)| {
            let prefix = if row == 0 { prompt() } else { Span::raw("  ") };
            Line::from(vec![prefix, Span::raw(text.clone())])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), padded);

    let content_width = usize::from(padded.width.saturating_sub(PROMPT_WIDTH));
    if content_width == 0 {
        return;
    }
    let rows_before: usize = app
        .input
        .lines
        .iter()
        .take(app.input.cursor_row)
        .map(|line| wrapped_rows(line, content_width))
        .sum();
    let wrap_row = app.input.cursor_col / content_width;
    let wrap_col = app.input.cursor_col % content_width;

    let cursor_x = padded.x + PROMPT_WIDTH + to_u16(wrap_col);
    let cursor_y = padded.y.saturating_add(to_u16(rows_before + wrap_row));
    if cursor_x < padded.right() && cursor_y < padded.bottom() {
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

/// Rows the input needs at `area_width`, capped at [`MAX_INPUT_HEIGHT`].
pub fn visual_line_count(app: &App, area_width: u16) -> u16 {
    if app.input.is_empty() {
        return 1;
    }
    let content_width = usize::from(area_width.saturating_sub(INPUT_PAD * 2).saturating_sub(PROMPT_WIDTH));
    let total = if content_width == 0 {
        app.input.lines.len()
    } else {
        app.input.lines.iter().map(|line| wrapped_rows(line, content_width)).sum()
    };
    to_u16(total).min(MAX_INPUT_HEIGHT)
}

/// A line exactly filling the width wraps the cursor onto a fresh row.
fn wrapped_rows(line: &str, content_width: usize) -> usize {
    (line.chars().count() + content_width) / content_width
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
