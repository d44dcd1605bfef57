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
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

const HEADER_PAD: u16 = 2;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Rect {
        x: area.x + HEADER_PAD,
        y: area.y,
        width: area.width.saturating_sub(HEADER_PAD * 2),
        height: area.height,
    };
    frame.render_widget(Paragraph::new(header_line(app)), padded);
}

fn header_line(app: &App) -> Line<'static> {
    let sep = || Span::styled("  \u{2502}  ", Style::default().fg(theme::DIM));
    let dim = Style::default().fg(theme::DIM);

    let mut spans = vec![
        Span::styled("streamchat", Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD)),
        sep(),
        Span::styled("Server: ", dim),
        Span::styled(app.server_label.clone(), Style::default().fg(Color::White)),
        sep(),
        Span::styled("Conversation: ", dim),
    ];
    match app.conversation_id.as_deref() {
        Some(id) => spans.push(Span::styled(id.to_owned(), Style::default().fg(Color::White))),
        None => spans.push(Span::styled("new", dim)),
    }
    if app.has_premium() {
        spans.push(sep());
        spans.push(Span::styled(
            "\u{2605} Premium",
            Style::default().fg(theme::PREMIUM).add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(image) = app.pending_image.as_ref() {
        spans.push(sep());
        spans.push(Span::styled(format!("\u{1F4CE} {}", image.name), dim));
    }
    Line::from(spans)
}
